//! BitVault Key Derivation
//!
//! BIP32 chain derivation, the BIP44/49/84/86/48 path presets, and
//! script-type-to-address materialization across legacy, wrapped-segwit,
//! native-segwit, taproot, and multisig (P2WSH/P2SH-P2WSH).

pub mod derive;
pub mod error;
pub mod multisig;
pub mod script_type;

pub use derive::*;
pub use error::KeyError;
pub use script_type::{DerivationPreset, ScriptType};
