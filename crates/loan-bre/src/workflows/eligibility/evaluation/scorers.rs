use serde::{Deserialize, Serialize};

use super::policy::MissingField;
use crate::workflows::eligibility::configuration::UniversityGradeMapping;
use crate::workflows::eligibility::domain::{
    CoApplicantFinancials, LeadProfile, StudentAcademics, TestKind, UniversityTier,
};

const ACADEMIC_SHARE: f32 = 0.7;
const TEST_SHARE: f32 = 0.3;
const INCOME_SHARE: f32 = 0.7;
const STABILITY_SHARE: f32 = 0.3;
const DEFAULT_CGPA_SCALE: f32 = 10.0;

/// Component score with the raw signals that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<B> {
    pub score: u8,
    pub breakdown: B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeSource {
    LenderOverride,
    ReferenceTier,
    Unmapped,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversityBreakdown {
    pub university_id: Option<String>,
    pub university_name: Option<String>,
    pub grade: Option<UniversityTier>,
    pub grade_source: Option<GradeSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicSource {
    Percentage,
    Cgpa,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentBreakdown {
    pub academic_percent: Option<f32>,
    pub academic_source: Option<AcademicSource>,
    pub best_test: Option<TestKind>,
    pub test_percent: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoApplicantBreakdown {
    pub monthly_salary: Option<u64>,
    pub existing_emi: Option<u64>,
    pub annual_net_income: u64,
    pub income_to_loan_ratio: Option<f32>,
    pub income_score: u8,
    pub stability_score: u8,
}

/// Scores the primary university through the lender's grade mapping.
pub fn score_university(
    lead: &LeadProfile,
    mapping: &UniversityGradeMapping,
) -> Result<Scored<UniversityBreakdown>, MissingField> {
    let university = lead
        .primary_university()
        .ok_or(MissingField::UniversitySelection)?;

    let grade = mapping.grade(university);
    let grade_source = if mapping.overrides.contains_key(&university.university_id) {
        GradeSource::LenderOverride
    } else if grade.is_some() {
        GradeSource::ReferenceTier
    } else {
        GradeSource::Unmapped
    };

    let score = grade
        .map(|tier| mapping.tier_scores.score(tier))
        .unwrap_or(mapping.unmapped_score)
        .min(100);

    Ok(Scored {
        score,
        breakdown: UniversityBreakdown {
            university_id: Some(university.university_id.clone()),
            university_name: Some(university.name.clone()),
            grade,
            grade_source: Some(grade_source),
        },
    })
}

/// Blends academic percentage with the best standardized test; missing signals count as zero.
pub fn score_student(academics: &StudentAcademics) -> Scored<StudentBreakdown> {
    let (academic_percent, academic_source) = academic_percent(academics);

    let best_test = academics
        .test_scores
        .iter()
        .map(|test| (test.kind, test.kind.normalize(test.score)))
        .max_by(|left, right| left.1.total_cmp(&right.1));

    let test_percent = best_test.map(|(_, percent)| percent);
    let blended = academic_percent.unwrap_or(0.0) * ACADEMIC_SHARE
        + test_percent.unwrap_or(0.0) * TEST_SHARE;

    Scored {
        score: to_score(blended),
        breakdown: StudentBreakdown {
            academic_percent,
            academic_source,
            best_test: best_test.map(|(kind, _)| kind),
            test_percent,
        },
    }
}

fn academic_percent(academics: &StudentAcademics) -> (Option<f32>, Option<AcademicSource>) {
    if let Some(percentage) = academics.percentage.filter(|value| *value > 0.0) {
        return (
            Some(percentage.clamp(0.0, 100.0)),
            Some(AcademicSource::Percentage),
        );
    }

    if let Some(cgpa) = academics.cgpa.filter(|value| *value > 0.0) {
        let scale = academics
            .cgpa_scale
            .filter(|scale| *scale > 0.0)
            .unwrap_or(DEFAULT_CGPA_SCALE);
        return (
            Some((cgpa * 100.0 / scale).clamp(0.0, 100.0)),
            Some(AcademicSource::Cgpa),
        );
    }

    (None, None)
}

/// Scores co-applicant income against the requested amount plus employment stability.
///
/// Fails only when the loan amount is absent; a missing or zero salary scores 0.
pub fn score_co_applicant(
    financials: &CoApplicantFinancials,
    loan_amount: Option<u64>,
) -> Result<Scored<CoApplicantBreakdown>, MissingField> {
    let loan_amount = loan_amount
        .filter(|amount| *amount > 0)
        .ok_or(MissingField::LoanAmount)?;

    let salary = match financials.monthly_salary.filter(|salary| *salary > 0) {
        Some(salary) => salary,
        None => {
            return Ok(Scored {
                score: 0,
                breakdown: CoApplicantBreakdown {
                    monthly_salary: financials.monthly_salary,
                    existing_emi: financials.existing_emi,
                    ..CoApplicantBreakdown::default()
                },
            })
        }
    };

    let monthly_net = salary.saturating_sub(financials.existing_emi.unwrap_or(0));
    let annual_net_income = monthly_net.saturating_mul(12);
    let ratio = annual_net_income as f32 / loan_amount as f32;
    let income_score = to_score(ratio.min(1.0) * 100.0);
    let stability_score = stability_score(financials);

    let blended =
        f32::from(income_score) * INCOME_SHARE + f32::from(stability_score) * STABILITY_SHARE;

    Ok(Scored {
        score: to_score(blended),
        breakdown: CoApplicantBreakdown {
            monthly_salary: Some(salary),
            existing_emi: financials.existing_emi,
            annual_net_income,
            income_to_loan_ratio: Some(ratio),
            income_score,
            stability_score,
        },
    })
}

fn stability_score(financials: &CoApplicantFinancials) -> u8 {
    let Some(employment) = financials.employment_type else {
        return 0;
    };
    let tenure = match financials.years_in_current_job {
        Some(years) if years >= 5.0 => 100.0,
        Some(years) if years >= 3.0 => 80.0,
        Some(years) if years >= 1.0 => 60.0,
        Some(years) if years > 0.0 => 40.0,
        _ => 0.0,
    };
    to_score(tenure * employment.stability_factor())
}

fn to_score(value: f32) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::eligibility::domain::{
        EmploymentType, LeadId, LeadStatus, TestScore, UniversityChoice,
    };

    fn lead_at(university_id: &str, reference_tier: Option<UniversityTier>) -> LeadProfile {
        LeadProfile {
            lead_id: LeadId("lead-u".to_string()),
            status: LeadStatus::New,
            loan_amount: Some(1_000_000),
            study_destination: None,
            loan_type: None,
            loan_classification: None,
            intake_month: None,
            intake_year: None,
            universities: vec![UniversityChoice {
                university_id: university_id.to_string(),
                name: university_id.to_string(),
                reference_tier,
            }],
            student: StudentAcademics::default(),
            co_applicant: CoApplicantFinancials::default(),
            assigned_lender: None,
        }
    }

    #[test]
    fn university_grade_matches_mapping_lookup() {
        let mut mapping = UniversityGradeMapping::default();
        mapping
            .overrides
            .insert("uni-eth".to_string(), UniversityTier::S);

        let cases = [
            (lead_at("uni-eth", Some(UniversityTier::B)), GradeSource::LenderOverride, 95),
            (lead_at("uni-tum", Some(UniversityTier::A)), GradeSource::ReferenceTier, 80),
            (lead_at("uni-new", None), GradeSource::Unmapped, 40),
        ];
        for (lead, source, score) in cases {
            let primary = lead.primary_university().expect("university selected");
            let scored = score_university(&lead, &mapping).expect("scored");
            assert_eq!(scored.breakdown.grade, mapping.grade(primary));
            assert_eq!(scored.breakdown.grade_source, Some(source));
            assert_eq!(scored.score, score);
        }
    }

    #[test]
    fn cgpa_is_normalized_by_scale() {
        let academics = StudentAcademics {
            cgpa: Some(8.0),
            cgpa_scale: None,
            ..StudentAcademics::default()
        };
        let scored = score_student(&academics);
        assert_eq!(scored.breakdown.academic_source, Some(AcademicSource::Cgpa));
        assert_eq!(scored.breakdown.academic_percent, Some(80.0));
        assert_eq!(scored.score, 56);

        let four_point = StudentAcademics {
            cgpa: Some(3.6),
            cgpa_scale: Some(4.0),
            ..StudentAcademics::default()
        };
        assert_eq!(score_student(&four_point).score, 63);
    }

    #[test]
    fn best_test_is_used() {
        let academics = StudentAcademics {
            percentage: Some(80.0),
            cgpa: None,
            cgpa_scale: None,
            test_scores: vec![
                TestScore {
                    kind: TestKind::Ielts,
                    score: 4.5,
                },
                TestScore {
                    kind: TestKind::Gre,
                    score: 320.0,
                },
            ],
        };
        let scored = score_student(&academics);
        assert_eq!(scored.breakdown.best_test, Some(TestKind::Gre));
        // 80 * 0.7 + 75 * 0.3
        assert_eq!(scored.score, 79);
    }

    #[test]
    fn empty_academics_score_zero_without_failing() {
        let scored = score_student(&StudentAcademics::default());
        assert_eq!(scored.score, 0);
        assert_eq!(scored.breakdown.academic_percent, None);
    }

    #[test]
    fn missing_salary_scores_zero() {
        let scored = score_co_applicant(&CoApplicantFinancials::default(), Some(1_000_000))
            .expect("loan amount present");
        assert_eq!(scored.score, 0);
    }

    #[test]
    fn missing_loan_amount_is_a_hard_failure() {
        assert_eq!(
            score_co_applicant(&CoApplicantFinancials::default(), None),
            Err(MissingField::LoanAmount)
        );
        assert_eq!(
            score_co_applicant(&CoApplicantFinancials::default(), Some(0)),
            Err(MissingField::LoanAmount)
        );
    }

    #[test]
    fn income_ratio_and_stability_combine() {
        let financials = CoApplicantFinancials {
            monthly_salary: Some(60_000),
            existing_emi: Some(10_000),
            employment_type: Some(EmploymentType::Salaried),
            years_in_current_job: Some(6.0),
        };
        let scored = score_co_applicant(&financials, Some(1_200_000)).expect("scored");
        // 50k * 12 / 1.2M = 0.5 -> 50; stability 100
        assert_eq!(scored.breakdown.annual_net_income, 600_000);
        assert_eq!(scored.breakdown.income_score, 50);
        assert_eq!(scored.breakdown.stability_score, 100);
        assert_eq!(scored.score, 65);
    }

    #[test]
    fn self_employment_discounts_stability() {
        let financials = CoApplicantFinancials {
            monthly_salary: Some(200_000),
            existing_emi: None,
            employment_type: Some(EmploymentType::SelfEmployed),
            years_in_current_job: Some(3.5),
        };
        let scored = score_co_applicant(&financials, Some(1_000_000)).expect("scored");
        assert_eq!(scored.breakdown.income_score, 100);
        assert_eq!(scored.breakdown.stability_score, 68);
    }
}
