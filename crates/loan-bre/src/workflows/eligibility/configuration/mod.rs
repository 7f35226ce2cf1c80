//! Admin-owned rule configuration: score weights and per-lender rules.
//!
//! Every type here is validated at save time and again before a computation uses it, so a
//! lead is never scored against a configuration that breaks the band or tier invariants.

mod lender;
mod weights;

pub use lender::{
    Lender, LenderConfig, LoanBand, RateConfig, RateTier, RateTierName, TierScores,
    UniversityGradeMapping,
};
pub use weights::ScoreWeights;

/// Fatal configuration fault; blocks every computation that would use the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("score weights must sum to 100 (got {total})")]
    WeightsDoNotSumTo100 { total: u16 },
    #[error("lender maximum loan amount must be greater than zero")]
    ZeroMaxLoanAmount,
    #[error("lender has no loan bands configured")]
    NoLoanBands,
    #[error("loan band {label} has an inverted or out-of-range score range")]
    InvalidBandRange { label: String },
    #[error("loan band {label} must satisfy 0 <= min_percent <= max_percent <= 100")]
    InvalidBandPercent { label: String },
    #[error("loan bands must start at score 0 (first band starts at {min_score})")]
    BandsDoNotStartAtZero { min_score: u8 },
    #[error("loan bands must end at score 100 (last band ends at {max_score})")]
    BandsDoNotReachHundred { max_score: u8 },
    #[error("loan bands leave scores {from}-{to} uncovered")]
    BandGap { from: u8, to: u8 },
    #[error("loan bands {first} and {second} overlap")]
    BandOverlap { first: String, second: String },
    #[error("no loan band contains score {score}")]
    NoBandForScore { score: u8 },
    #[error("rate tier {tier} has min_rate above max_rate or a negative rate")]
    InvalidRateRange { tier: &'static str },
    #[error("rate tier {better} must have a higher score threshold than {worse}")]
    ThresholdsNotDescending {
        better: &'static str,
        worse: &'static str,
    },
    #[error("rate tier {better} must offer strictly lower rates than {worse}")]
    RatesNotImproving {
        better: &'static str,
        worse: &'static str,
    },
    #[error("lowest rate tier must start at score 0 (got {threshold})")]
    LowestTierThreshold { threshold: u8 },
    #[error("{field} must be between 0 and 100 (got {value})")]
    ScoreOutOfRange { field: &'static str, value: u8 },
    #[error("university tier scores must not increase from S to C")]
    TierScoresNotOrdered,
}
