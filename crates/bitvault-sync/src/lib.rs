//! Gap-limit address discovery, Electrum-driven transaction
//! materialization, balance projection, and canonical snapshot
//! persistence.

pub mod db;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod retry;

pub use discovery::{discover_highest_used_index, DEFAULT_GAP_LIMIT};
pub use engine::{AddressSource, SyncEngine, SyncSummary};
pub use error::SyncError;
pub use materialize::{BalanceProjection, TxDirection};
