use serde::{Deserialize, Serialize};

use super::ConfigurationError;

/// Percentage-point weights applied to the three component scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    pub university_weight: u8,
    pub student_weight: u8,
    pub co_applicant_weight: u8,
}

impl ScoreWeights {
    pub fn new(
        university_weight: u8,
        student_weight: u8,
        co_applicant_weight: u8,
    ) -> Result<Self, ConfigurationError> {
        let weights = Self {
            university_weight,
            student_weight,
            co_applicant_weight,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn total(&self) -> u16 {
        u16::from(self.university_weight)
            + u16::from(self.student_weight)
            + u16::from(self.co_applicant_weight)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let total = self.total();
        if total != 100 {
            return Err(ConfigurationError::WeightsDoNotSumTo100 { total });
        }
        Ok(())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            university_weight: 40,
            student_weight: 30,
            co_applicant_weight: 30,
        }
    }
}
