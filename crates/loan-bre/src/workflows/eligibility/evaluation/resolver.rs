use serde::{Deserialize, Serialize};
use tracing::error;

use crate::workflows::eligibility::configuration::{
    ConfigurationError, LenderConfig, LoanBand, RateConfig, RateTier, RateTierName,
};

/// Loan band and rate tier a score resolves to under one lender configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanOffer {
    pub band_label: String,
    pub eligible_loan_min: u64,
    pub eligible_loan_max: u64,
    pub rate_tier: RateTierName,
    pub interest_rate_min: f64,
    pub interest_rate_max: f64,
}

impl LoanOffer {
    pub fn rate_midpoint(&self) -> f64 {
        (self.interest_rate_min + self.interest_rate_max) / 2.0
    }
}

/// Finds the single band containing `score`; a miss means the configuration is broken.
pub fn resolve_band(bands: &[LoanBand], score: u8) -> Result<&LoanBand, ConfigurationError> {
    let mut matches = bands.iter().filter(|band| band.contains(score));
    let band = match matches.next() {
        Some(band) => band,
        None => {
            error!(score, "no loan band contains score; lender configuration is corrupt");
            return Err(ConfigurationError::NoBandForScore { score });
        }
    };

    if let Some(other) = matches.next() {
        error!(score, "score matched more than one loan band");
        return Err(ConfigurationError::BandOverlap {
            first: band.label(),
            second: other.label(),
        });
    }

    Ok(band)
}

/// Best tier the score qualifies for: the highest threshold not above `score`.
pub fn resolve_rate_tier(
    rates: &RateConfig,
    score: u8,
) -> Result<(RateTierName, RateTier), ConfigurationError> {
    rates
        .ordered()
        .into_iter()
        .filter(|(_, tier)| tier.score_threshold <= score)
        .max_by_key(|(_, tier)| tier.score_threshold)
        .map(|(name, tier)| (name, *tier))
        .ok_or_else(|| {
            error!(score, "no rate tier admits score; lender configuration is corrupt");
            ConfigurationError::LowestTierThreshold {
                threshold: rates.below_average.score_threshold,
            }
        })
}

/// Applies a share of the requested amount, capped at the lender maximum.
fn capped_share(requested: u64, percent: u8, cap: u64) -> u64 {
    let share = u128::from(requested) * u128::from(percent) / 100;
    share.min(u128::from(cap)) as u64
}

pub fn resolve_offer(
    config: &LenderConfig,
    score: u8,
    requested_amount: u64,
) -> Result<LoanOffer, ConfigurationError> {
    let band = resolve_band(&config.loan_bands, score)?;
    let (rate_tier, tier) = resolve_rate_tier(&config.rate_config, score)?;

    Ok(LoanOffer {
        band_label: band.label(),
        eligible_loan_min: capped_share(requested_amount, band.min_percent, config.max_loan_amount),
        eligible_loan_max: capped_share(requested_amount, band.max_percent, config.max_loan_amount),
        rate_tier,
        interest_rate_min: tier.min_rate,
        interest_rate_max: tier.max_rate,
    })
}
