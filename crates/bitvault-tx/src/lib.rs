//! UTXO selection, PSBT assembly/signing/finalization, RBF/CPFP fee
//! bumping, BIP21 payment URIs, and pre-broadcast policy/address-safety
//! checks.

pub mod bip21;
pub mod error;
pub mod policy;
pub mod psbt;
pub mod rbf;
pub mod safety;
pub mod selector;

pub use bip21::{create_bip21, parse_bip21, Bip21Payment};
pub use error::TxError;
pub use policy::{check_policy, has_blocking_errors, PolicyCode, PolicyViolation, Severity};
pub use rbf::{bump_child, bump_fee, signals_rbf};
pub use safety::{analyze_recipient_risk, deep_sanitize_address, detect_address_similarity, format_address_chunked, RiskHint, RiskLevel};
pub use selector::{select, AvoidUnconfirmed, CandidateUtxo, SelectionPolicy, SelectionResult};

use bitvault_electrum::ElectrumClient;

use crate::error::TxError as Error;

/// Broadcast a finalized raw transaction via an already-connected
/// Electrum client, returning the txid the server accepted.
pub async fn broadcast(client: &ElectrumClient, tx: &bitcoin::Transaction) -> Result<String, Error> {
    let raw_hex = hex::encode(bitcoin::consensus::serialize(tx));
    let response = client.broadcast(&raw_hex).await?;
    response
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Internal("broadcast response was not a txid string".to_string()))
}
