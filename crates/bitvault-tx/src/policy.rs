//! Local pre-broadcast mempool policy checks (spec §4.10).

use serde::{Deserialize, Serialize};

const DUST_THRESHOLD_SAT: u64 = 547;
const MIN_FEE_RATE_PER_VB: f64 = 1.0;
const HIGH_FEE_RATE_PER_VB: f64 = 500.0;
const HIGH_FEE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyCode {
    DustOutput,
    FeeTooLow,
    FeeRateHigh,
    FeeRatioHigh,
    OutputExceedsInput,
    NegativeFee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub code: PolicyCode,
    pub severity: Severity,
    pub message: String,
}

/// Check a would-be transaction's outputs and fee against the local
/// policy thresholds. Returns every violation found (errors and
/// warnings); callers decide whether warnings block broadcast.
pub fn check_policy(
    output_values: &[u64],
    total_input: u64,
    fee: i64,
    fee_rate_per_vb: f64,
) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    for &value in output_values {
        if value < DUST_THRESHOLD_SAT {
            violations.push(PolicyViolation {
                code: PolicyCode::DustOutput,
                severity: Severity::Error,
                message: format!("output of {value} sats is below the dust threshold ({DUST_THRESHOLD_SAT})"),
            });
        }
    }

    if fee < 0 {
        violations.push(PolicyViolation {
            code: PolicyCode::NegativeFee,
            severity: Severity::Error,
            message: format!("fee is negative: {fee}"),
        });
    }

    if fee_rate_per_vb < MIN_FEE_RATE_PER_VB {
        violations.push(PolicyViolation {
            code: PolicyCode::FeeTooLow,
            severity: Severity::Error,
            message: format!("fee rate {fee_rate_per_vb:.2} sat/vB is below the {MIN_FEE_RATE_PER_VB} sat/vB floor"),
        });
    }

    if fee_rate_per_vb > HIGH_FEE_RATE_PER_VB {
        violations.push(PolicyViolation {
            code: PolicyCode::FeeRateHigh,
            severity: Severity::Warning,
            message: format!("fee rate {fee_rate_per_vb:.2} sat/vB exceeds {HIGH_FEE_RATE_PER_VB} sat/vB"),
        });
    }

    let total_output: u64 = output_values.iter().sum();
    if fee > 0 {
        let total_with_fee = total_output + fee as u64;
        if total_with_fee > total_input {
            violations.push(PolicyViolation {
                code: PolicyCode::OutputExceedsInput,
                severity: Severity::Error,
                message: format!("outputs + fee ({total_with_fee}) exceed inputs ({total_input})"),
            });
        }
        if total_output > 0 && (fee as f64 / total_output as f64) > HIGH_FEE_RATIO {
            violations.push(PolicyViolation {
                code: PolicyCode::FeeRatioHigh,
                severity: Severity::Warning,
                message: format!("fee is more than {:.0}% of total output value", HIGH_FEE_RATIO * 100.0),
            });
        }
    }

    violations
}

pub fn has_blocking_errors(violations: &[PolicyViolation]) -> bool {
    violations.iter().any(|v| v.severity == Severity::Error)
}
