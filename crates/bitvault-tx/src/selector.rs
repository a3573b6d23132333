//! UTXO selection: branch-and-bound exact match, falling back to
//! accumulated-greedy; fee estimation by per-script-type vbyte weight
//! (spec §4.8).

use bitvault_keys::ScriptType;

use crate::error::TxError;

pub const DEFAULT_DUST_THRESHOLD: u64 = 547;
const DEFAULT_CONSOLIDATION_CAP: usize = 8;
const BNB_MAX_TRIES: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidUnconfirmed {
    Never,
    WhenPossible,
    Always,
}

#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub prefer_single_input: bool,
    pub avoid_consolidation: bool,
    pub consolidation_cap: usize,
    pub avoid_unconfirmed: AvoidUnconfirmed,
    pub exclude_frozen: bool,
    pub exclude_locked: bool,
    pub respect_tags: bool,
    pub dust_threshold: u64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            prefer_single_input: true,
            avoid_consolidation: true,
            consolidation_cap: DEFAULT_CONSOLIDATION_CAP,
            avoid_unconfirmed: AvoidUnconfirmed::WhenPossible,
            exclude_frozen: true,
            exclude_locked: true,
            respect_tags: true,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateUtxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub confirmations: u32,
    pub script_type: ScriptType,
    pub is_frozen: bool,
    pub is_locked: bool,
    pub privacy_tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub selected: Vec<CandidateUtxo>,
    pub change: u64,
    pub fee: u64,
}

/// Base (non-witness) and witness vbyte contribution of spending one input
/// of a given script type, per spec §4.8 ("vbytes = base_size*4 +
/// witness_size, then /4 ceiling" — expressed here per-input so the
/// selector can sum linearly and the caller adds the fixed overhead).
fn input_weight_units(script_type: ScriptType) -> u64 {
    match script_type {
        ScriptType::P2pkh => 148 * 4,
        ScriptType::P2shP2wpkh => 91 * 4 + 107,
        ScriptType::P2wpkh => 68 * 4 + 107,
        ScriptType::P2tr => 57 * 4 + 65,
        ScriptType::P2wsh | ScriptType::P2shP2wsh => 104 * 4 + 255,
    }
}

/// Fixed overhead for the transaction shell plus one recipient output and
/// one change output, in weight units (version, locktime, segwit marker,
/// input/output counts, two p2wpkh-sized outputs as a representative
/// estimate).
const BASE_TX_WEIGHT_UNITS: u64 = (10 + 2 * 31) * 4;

fn weight_to_vbytes(weight_units: u64) -> u64 {
    weight_units.div_ceil(4)
}

fn estimate_fee(input_script_types: &[ScriptType], fee_rate_per_vb: f64) -> u64 {
    let weight: u64 = BASE_TX_WEIGHT_UNITS
        + input_script_types.iter().map(|st| input_weight_units(*st)).sum::<u64>();
    let vbytes = weight_to_vbytes(weight);
    (vbytes as f64 * fee_rate_per_vb).ceil() as u64
}

fn eligible(utxos: &[CandidateUtxo], policy: &SelectionPolicy) -> Vec<CandidateUtxo> {
    utxos
        .iter()
        .filter(|u| !(policy.exclude_frozen && u.is_frozen))
        .filter(|u| !(policy.exclude_locked && u.is_locked))
        .filter(|u| match policy.avoid_unconfirmed {
            AvoidUnconfirmed::Never => true,
            AvoidUnconfirmed::WhenPossible => true,
            AvoidUnconfirmed::Always => u.confirmations >= 1,
        })
        .cloned()
        .collect()
}

/// Branch-and-bound exact match over `candidates` for `target` (spec
/// §4.8's "Murch-style, bounded tries"): a depth-first search that tries
/// including/excluding each UTXO, pruning once the accumulated value
/// exceeds target plus an acceptable slack (the dust threshold — an
/// "exact" match within dust is still exact, since the excess rolls into
/// fee rather than a new change output).
fn branch_and_bound(
    candidates: &[CandidateUtxo],
    target: u64,
    dust_threshold: u64,
) -> Option<Vec<usize>> {
    let mut sorted: Vec<usize> = (0..candidates.len()).collect();
    sorted.sort_by(|&a, &b| candidates[b].value.cmp(&candidates[a].value));

    let mut tries = 0usize;
    let mut best: Option<Vec<usize>> = None;

    fn search(
        sorted: &[usize],
        candidates: &[CandidateUtxo],
        depth: usize,
        remaining: i64,
        current: &mut Vec<usize>,
        best: &mut Option<Vec<usize>>,
        tries: &mut usize,
        dust_threshold: u64,
    ) {
        *tries += 1;
        if *tries > BNB_MAX_TRIES || best.is_some() {
            return;
        }
        if remaining <= 0 {
            if (-remaining) as u64 <= dust_threshold {
                *best = Some(current.clone());
            }
            return;
        }
        if depth == sorted.len() {
            return;
        }

        let idx = sorted[depth];
        current.push(idx);
        search(
            sorted,
            candidates,
            depth + 1,
            remaining - candidates[idx].value as i64,
            current,
            best,
            tries,
            dust_threshold,
        );
        current.pop();
        if best.is_none() {
            search(sorted, candidates, depth + 1, remaining, current, best, tries, dust_threshold);
        }
    }

    let mut current = Vec::new();
    search(&sorted, candidates, 0, target as i64, &mut current, &mut best, &mut tries, dust_threshold);
    best
}

/// Accumulated-greedy fallback: largest-first among eligible UTXOs until
/// the target (plus the fee of the accumulated input set) is covered.
fn accumulated_greedy(candidates: &[CandidateUtxo], target: u64, fee_rate_per_vb: f64) -> Option<Vec<usize>> {
    let mut sorted: Vec<usize> = (0..candidates.len()).collect();
    sorted.sort_by(|&a, &b| candidates[b].value.cmp(&candidates[a].value));

    let mut chosen = Vec::new();
    let mut total = 0u64;
    let mut script_types = Vec::new();

    for idx in sorted {
        chosen.push(idx);
        total += candidates[idx].value;
        script_types.push(candidates[idx].script_type);
        let fee = estimate_fee(&script_types, fee_rate_per_vb);
        if total >= target + fee {
            return Some(chosen);
        }
    }
    None
}

/// Select UTXOs covering `target` at `fee_rate_per_vb`, honoring `policy`.
pub fn select(
    utxos: &[CandidateUtxo],
    target: u64,
    fee_rate_per_vb: f64,
    policy: &SelectionPolicy,
) -> Result<SelectionResult, TxError> {
    let mut pool = eligible(utxos, policy);

    if policy.respect_tags {
        if let Some(tag) = pool.iter().find_map(|u| u.privacy_tag.clone()) {
            pool.retain(|u| u.privacy_tag.as_deref() == Some(tag.as_str()) || u.privacy_tag.is_none());
        }
    }

    if policy.prefer_single_input {
        if let Some(single) = pool
            .iter()
            .filter(|u| {
                let fee = estimate_fee(&[u.script_type], fee_rate_per_vb);
                u.value >= target + fee
            })
            .min_by_key(|u| u.value)
        {
            let fee = estimate_fee(&[single.script_type], fee_rate_per_vb);
            let change_raw = single.value - target - fee;
            return Ok(finalize_selection(vec![single.clone()], target, fee, change_raw, policy));
        }
    }

    let indices = branch_and_bound(&pool, target, policy.dust_threshold)
        .or_else(|| accumulated_greedy(&pool, target, fee_rate_per_vb))
        .ok_or(TxError::InsufficientFunds)?;

    let capped_indices = if policy.avoid_consolidation && indices.len() > policy.consolidation_cap {
        // Re-sort by value desc and keep the cap-largest; if that no longer
        // covers the target the caller truly needs more inputs than the
        // cap allows, so fall through uncapped.
        let mut by_value: Vec<usize> = indices.clone();
        by_value.sort_by(|&a, &b| pool[b].value.cmp(&pool[a].value));
        let capped = &by_value[..policy.consolidation_cap];
        let capped_total: u64 = capped.iter().map(|&i| pool[i].value).sum();
        let script_types: Vec<ScriptType> = capped.iter().map(|&i| pool[i].script_type).collect();
        let fee = estimate_fee(&script_types, fee_rate_per_vb);
        if capped_total >= target + fee {
            capped.to_vec()
        } else {
            indices
        }
    } else {
        indices
    };

    let selected: Vec<CandidateUtxo> = capped_indices.iter().map(|&i| pool[i].clone()).collect();
    let script_types: Vec<ScriptType> = selected.iter().map(|u| u.script_type).collect();
    let fee = estimate_fee(&script_types, fee_rate_per_vb);
    let total: u64 = selected.iter().map(|u| u.value).sum();
    let change_raw = total.saturating_sub(target).saturating_sub(fee);

    Ok(finalize_selection(selected, target, fee, change_raw, policy))
}

fn finalize_selection(
    mut selected: Vec<CandidateUtxo>,
    _target: u64,
    fee: u64,
    change_raw: u64,
    policy: &SelectionPolicy,
) -> SelectionResult {
    // Tie-break: among equal-value UTXOs, prefer higher confirmations
    // (older coins) — stabilize the final ordering without affecting
    // which UTXOs were chosen.
    selected.sort_by(|a, b| b.value.cmp(&a.value).then(b.confirmations.cmp(&a.confirmations)));

    if change_raw < policy.dust_threshold {
        SelectionResult { selected, change: 0, fee: fee + change_raw }
    } else {
        SelectionResult { selected, change: change_raw, fee }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(value: u64, confirmations: u32) -> CandidateUtxo {
        CandidateUtxo {
            txid: format!("tx-{value}-{confirmations}"),
            vout: 0,
            value,
            confirmations,
            script_type: ScriptType::P2wpkh,
            is_frozen: false,
            is_locked: false,
            privacy_tag: None,
        }
    }

    #[test]
    fn single_input_covers_target_without_extra_inputs() {
        let utxos = vec![utxo(100_000, 6), utxo(5_000, 1)];
        let policy = SelectionPolicy::default();
        let result = select(&utxos, 50_000, 10.0, &policy).unwrap();
        assert_eq!(result.selected.len(), 1);
        assert_eq!(result.selected[0].value, 100_000);
    }

    #[test]
    fn insufficient_funds_errors() {
        let utxos = vec![utxo(1_000, 6)];
        let policy = SelectionPolicy::default();
        let result = select(&utxos, 50_000, 10.0, &policy);
        assert!(matches!(result, Err(TxError::InsufficientFunds)));
    }

    #[test]
    fn frozen_utxos_are_excluded() {
        let mut frozen = utxo(100_000, 6);
        frozen.is_frozen = true;
        let utxos = vec![frozen];
        let policy = SelectionPolicy::default();
        let result = select(&utxos, 50_000, 10.0, &policy);
        assert!(matches!(result, Err(TxError::InsufficientFunds)));
    }

    #[test]
    fn dust_change_rolls_into_fee() {
        let utxos = vec![utxo(50_200, 6)];
        let policy = SelectionPolicy::default();
        let result = select(&utxos, 50_000, 1.0, &policy).unwrap();
        assert_eq!(result.change, 0);
    }

    #[test]
    fn never_selects_the_same_utxo_twice() {
        let mut utxos = vec![utxo(30_000, 1), utxo(30_000, 1), utxo(30_000, 1)];
        for (i, u) in utxos.iter_mut().enumerate() {
            u.vout = i as u32;
        }
        let policy = SelectionPolicy { prefer_single_input: false, ..SelectionPolicy::default() };
        let result = select(&utxos, 50_000, 1.0, &policy).unwrap();
        let mut keys: Vec<(String, u32)> =
            result.selected.iter().map(|u| (u.txid.clone(), u.vout)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), result.selected.len());
    }
}
