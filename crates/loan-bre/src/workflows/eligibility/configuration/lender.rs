use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigurationError;
use crate::workflows::eligibility::domain::{LenderId, UniversityChoice, UniversityTier};

/// Onboarded lender as returned by the lender directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lender {
    pub id: LenderId,
    pub name: String,
    pub active: bool,
    /// Bumped every time an admin saves a new configuration.
    pub config_revision: u64,
    pub config: LenderConfig,
}

impl Lender {
    /// Onboards a lender with the default rule configuration.
    pub fn onboard(id: LenderId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            config_revision: 1,
            config: LenderConfig::default(),
        }
    }
}

/// Score range mapped to the approvable share of the requested loan amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoanBand {
    pub min_score: u8,
    pub max_score: u8,
    pub min_percent: u8,
    pub max_percent: u8,
}

impl LoanBand {
    pub const fn new(min_score: u8, max_score: u8, min_percent: u8, max_percent: u8) -> Self {
        Self {
            min_score,
            max_score,
            min_percent,
            max_percent,
        }
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.min_score, self.max_score)
    }

    pub fn contains(&self, score: u8) -> bool {
        score >= self.min_score && score <= self.max_score
    }
}

/// Closed set of rate tier names, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTierName {
    Excellent,
    Good,
    Average,
    BelowAverage,
}

impl RateTierName {
    pub const ORDERED: [Self; 4] = [
        Self::Excellent,
        Self::Good,
        Self::Average,
        Self::BelowAverage,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RateTierName::Excellent => "excellent",
            RateTierName::Good => "good",
            RateTierName::Average => "average",
            RateTierName::BelowAverage => "below_average",
        }
    }

    /// Zero for the best tier, increasing as rates get worse.
    pub const fn rank(self) -> u8 {
        match self {
            RateTierName::Excellent => 0,
            RateTierName::Good => 1,
            RateTierName::Average => 2,
            RateTierName::BelowAverage => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateTier {
    pub min_rate: f64,
    pub max_rate: f64,
    pub score_threshold: u8,
}

impl RateTier {
    pub fn midpoint(&self) -> f64 {
        (self.min_rate + self.max_rate) / 2.0
    }
}

/// Interest-rate tiers keyed by the fixed tier names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateConfig {
    pub excellent: RateTier,
    pub good: RateTier,
    pub average: RateTier,
    pub below_average: RateTier,
}

impl RateConfig {
    pub fn tier(&self, name: RateTierName) -> &RateTier {
        match name {
            RateTierName::Excellent => &self.excellent,
            RateTierName::Good => &self.good,
            RateTierName::Average => &self.average,
            RateTierName::BelowAverage => &self.below_average,
        }
    }

    /// Tiers ordered by descending score threshold.
    pub fn ordered(&self) -> [(RateTierName, &RateTier); 4] {
        RateTierName::ORDERED.map(|name| (name, self.tier(name)))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, tier) in self.ordered() {
            if tier.min_rate < 0.0 || tier.min_rate > tier.max_rate {
                return Err(ConfigurationError::InvalidRateRange { tier: name.label() });
            }
            if tier.score_threshold > 100 {
                return Err(ConfigurationError::ScoreOutOfRange {
                    field: "score_threshold",
                    value: tier.score_threshold,
                });
            }
        }

        let ordered = self.ordered();
        for pair in ordered.windows(2) {
            let (better_name, better) = pair[0];
            let (worse_name, worse) = pair[1];
            if better.score_threshold <= worse.score_threshold {
                return Err(ConfigurationError::ThresholdsNotDescending {
                    better: better_name.label(),
                    worse: worse_name.label(),
                });
            }
            if better.min_rate >= worse.min_rate || better.max_rate >= worse.max_rate {
                return Err(ConfigurationError::RatesNotImproving {
                    better: better_name.label(),
                    worse: worse_name.label(),
                });
            }
        }

        if self.below_average.score_threshold != 0 {
            return Err(ConfigurationError::LowestTierThreshold {
                threshold: self.below_average.score_threshold,
            });
        }

        Ok(())
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            excellent: RateTier {
                min_rate: 8.5,
                max_rate: 9.5,
                score_threshold: 90,
            },
            good: RateTier {
                min_rate: 9.75,
                max_rate: 10.75,
                score_threshold: 75,
            },
            average: RateTier {
                min_rate: 11.0,
                max_rate: 12.0,
                score_threshold: 60,
            },
            below_average: RateTier {
                min_rate: 12.5,
                max_rate: 14.0,
                score_threshold: 0,
            },
        }
    }
}

/// Score awarded per university tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierScores {
    pub s: u8,
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

impl TierScores {
    pub const fn score(&self, tier: UniversityTier) -> u8 {
        match tier {
            UniversityTier::S => self.s,
            UniversityTier::A => self.a,
            UniversityTier::B => self.b,
            UniversityTier::C => self.c,
        }
    }
}

impl Default for TierScores {
    fn default() -> Self {
        Self {
            s: 95,
            a: 80,
            b: 65,
            c: 50,
        }
    }
}

/// Lender-specific view of university reputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniversityGradeMapping {
    /// University id to grade, overriding the reference tier.
    #[serde(default)]
    pub overrides: BTreeMap<String, UniversityTier>,
    #[serde(default)]
    pub tier_scores: TierScores,
    /// Conservative score for universities with neither an override nor a reference tier.
    pub unmapped_score: u8,
    pub accept_unmapped: bool,
}

impl UniversityGradeMapping {
    pub fn grade(&self, university: &UniversityChoice) -> Option<UniversityTier> {
        self.overrides
            .get(&university.university_id)
            .copied()
            .or(university.reference_tier)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let scores = self.tier_scores;
        for (field, value) in [
            ("tier_scores.s", scores.s),
            ("tier_scores.a", scores.a),
            ("tier_scores.b", scores.b),
            ("tier_scores.c", scores.c),
            ("unmapped_score", self.unmapped_score),
        ] {
            if value > 100 {
                return Err(ConfigurationError::ScoreOutOfRange { field, value });
            }
        }
        if !(scores.s >= scores.a && scores.a >= scores.b && scores.b >= scores.c) {
            return Err(ConfigurationError::TierScoresNotOrdered);
        }
        Ok(())
    }
}

impl Default for UniversityGradeMapping {
    fn default() -> Self {
        Self {
            overrides: BTreeMap::new(),
            tier_scores: TierScores::default(),
            unmapped_score: 40,
            accept_unmapped: true,
        }
    }
}

/// Per-lender rule set: loan cap, loan bands, rate tiers and university grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LenderConfig {
    pub max_loan_amount: u64,
    pub loan_bands: Vec<LoanBand>,
    pub rate_config: RateConfig,
    pub university_grade_mapping: UniversityGradeMapping,
    /// Destinations this lender funds; empty means every destination.
    #[serde(default)]
    pub supported_destinations: Vec<String>,
}

impl LenderConfig {
    pub fn supports_destination(&self, destination: &str) -> bool {
        self.supported_destinations.is_empty()
            || self
                .supported_destinations
                .iter()
                .any(|supported| supported.trim().eq_ignore_ascii_case(destination.trim()))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_loan_amount == 0 {
            return Err(ConfigurationError::ZeroMaxLoanAmount);
        }
        validate_bands(&self.loan_bands)?;
        self.rate_config.validate()?;
        self.university_grade_mapping.validate()
    }
}

impl Default for LenderConfig {
    fn default() -> Self {
        Self {
            max_loan_amount: 7_500_000,
            loan_bands: vec![
                LoanBand::new(90, 100, 90, 100),
                LoanBand::new(75, 89, 75, 90),
                LoanBand::new(60, 74, 50, 75),
                LoanBand::new(0, 59, 0, 50),
            ],
            rate_config: RateConfig::default(),
            university_grade_mapping: UniversityGradeMapping::default(),
            supported_destinations: Vec::new(),
        }
    }
}

fn validate_bands(bands: &[LoanBand]) -> Result<(), ConfigurationError> {
    if bands.is_empty() {
        return Err(ConfigurationError::NoLoanBands);
    }

    for band in bands {
        if band.min_score > band.max_score || band.max_score > 100 {
            return Err(ConfigurationError::InvalidBandRange {
                label: band.label(),
            });
        }
        if band.min_percent > band.max_percent || band.max_percent > 100 {
            return Err(ConfigurationError::InvalidBandPercent {
                label: band.label(),
            });
        }
    }

    let mut sorted = bands.to_vec();
    sorted.sort_by_key(|band| (band.min_score, band.max_score));

    let first = sorted[0];
    if first.min_score != 0 {
        return Err(ConfigurationError::BandsDoNotStartAtZero {
            min_score: first.min_score,
        });
    }

    for pair in sorted.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if next.min_score <= previous.max_score {
            return Err(ConfigurationError::BandOverlap {
                first: previous.label(),
                second: next.label(),
            });
        }
        if next.min_score > previous.max_score + 1 {
            return Err(ConfigurationError::BandGap {
                from: previous.max_score + 1,
                to: next.min_score - 1,
            });
        }
    }

    let last = sorted[sorted.len() - 1];
    if last.max_score != 100 {
        return Err(ConfigurationError::BandsDoNotReachHundred {
            max_score: last.max_score,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LenderConfig::default().validate().is_ok());
    }

    #[test]
    fn detects_gaps_between_bands() {
        let mut config = LenderConfig::default();
        config.loan_bands[1] = LoanBand::new(76, 89, 75, 90);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::BandGap { from: 75, to: 75 })
        );
    }

    #[test]
    fn detects_overlapping_bands() {
        let mut config = LenderConfig::default();
        config.loan_bands[2] = LoanBand::new(60, 80, 50, 75);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::BandOverlap { .. })
        ));
    }

    #[test]
    fn bands_must_cover_both_ends_of_the_score_axis() {
        let mut config = LenderConfig::default();
        config.loan_bands[3] = LoanBand::new(5, 59, 0, 50);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::BandsDoNotStartAtZero { min_score: 5 })
        );

        let mut config = LenderConfig::default();
        config.loan_bands[0] = LoanBand::new(90, 99, 90, 100);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::BandsDoNotReachHundred { max_score: 99 })
        );
    }

    #[test]
    fn band_percent_must_be_ordered() {
        let mut config = LenderConfig::default();
        config.loan_bands[0] = LoanBand::new(90, 100, 100, 90);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidBandPercent { .. })
        ));
    }

    #[test]
    fn rate_tiers_must_improve_as_threshold_rises() {
        let mut config = LenderConfig::default();
        config.rate_config.good.min_rate = 8.0;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::RatesNotImproving {
                better: "excellent",
                worse: "good",
            })
        );
    }

    #[test]
    fn rate_thresholds_must_descend() {
        let mut config = LenderConfig::default();
        config.rate_config.average.score_threshold = 80;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ThresholdsNotDescending {
                better: "good",
                worse: "average",
            })
        );
    }

    #[test]
    fn lowest_tier_must_start_at_zero() {
        let mut config = LenderConfig::default();
        config.rate_config.below_average.score_threshold = 10;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::LowestTierThreshold { threshold: 10 })
        );
    }

    #[test]
    fn override_beats_reference_tier() {
        let mut mapping = UniversityGradeMapping::default();
        mapping
            .overrides
            .insert("uni-toronto".to_string(), UniversityTier::S);
        let university = UniversityChoice {
            university_id: "uni-toronto".to_string(),
            name: "University of Toronto".to_string(),
            reference_tier: Some(UniversityTier::A),
        };
        assert_eq!(mapping.grade(&university), Some(UniversityTier::S));
    }

    #[test]
    fn rate_config_rejects_unknown_tier_names() {
        let raw = serde_json::json!({
            "excellent": {"min_rate": 8.5, "max_rate": 9.5, "score_threshold": 90},
            "good": {"min_rate": 9.75, "max_rate": 10.75, "score_threshold": 75},
            "average": {"min_rate": 11.0, "max_rate": 12.0, "score_threshold": 60},
            "below_average": {"min_rate": 12.5, "max_rate": 14.0, "score_threshold": 0},
            "platinum": {"min_rate": 7.0, "max_rate": 8.0, "score_threshold": 98}
        });
        assert!(serde_json::from_value::<RateConfig>(raw).is_err());
    }

    #[test]
    fn destination_matching_ignores_case() {
        let mut config = LenderConfig::default();
        assert!(config.supports_destination("Germany"));
        config.supported_destinations = vec!["USA".to_string(), "Canada".to_string()];
        assert!(config.supports_destination("usa"));
        assert!(!config.supports_destination("Germany"));
    }
}
