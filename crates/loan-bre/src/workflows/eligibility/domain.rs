use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for CRM leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Identifier wrapper for onboarded lenders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LenderId(pub String);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for LenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lead profile as read from the CRM; only the slices the engine scores on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub lead_id: LeadId,
    pub status: LeadStatus,
    pub loan_amount: Option<u64>,
    pub study_destination: Option<String>,
    pub loan_type: Option<LoanType>,
    pub loan_classification: Option<String>,
    pub intake_month: Option<u8>,
    pub intake_year: Option<u16>,
    pub universities: Vec<UniversityChoice>,
    pub student: StudentAcademics,
    pub co_applicant: CoApplicantFinancials,
    pub assigned_lender: Option<LenderId>,
}

impl LeadProfile {
    /// The first university on the lead drives university scoring.
    pub fn primary_university(&self) -> Option<&UniversityChoice> {
        self.universities.first()
    }
}

/// A university the student has applied to, with its reference-data tier when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityChoice {
    pub university_id: String,
    pub name: String,
    pub reference_tier: Option<UniversityTier>,
}

/// Reputation grade of a university; S is the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UniversityTier {
    S,
    A,
    B,
    C,
}

impl UniversityTier {
    pub const fn label(self) -> &'static str {
        match self {
            UniversityTier::S => "S",
            UniversityTier::A => "A",
            UniversityTier::B => "B",
            UniversityTier::C => "C",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentAcademics {
    pub percentage: Option<f32>,
    pub cgpa: Option<f32>,
    pub cgpa_scale: Option<f32>,
    #[serde(default)]
    pub test_scores: Vec<TestScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScore {
    pub kind: TestKind,
    pub score: f32,
}

/// Standardized tests the engine knows how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Gre,
    Gmat,
    Sat,
    Ielts,
    Toefl,
}

impl TestKind {
    /// Official (floor, ceiling) of the reported score.
    pub const fn range(self) -> (f32, f32) {
        match self {
            TestKind::Gre => (260.0, 340.0),
            TestKind::Gmat => (200.0, 800.0),
            TestKind::Sat => (400.0, 1600.0),
            TestKind::Ielts => (0.0, 9.0),
            TestKind::Toefl => (0.0, 120.0),
        }
    }

    /// Maps a raw score onto 0-100, clamping out-of-range input.
    pub fn normalize(self, score: f32) -> f32 {
        let (floor, ceiling) = self.range();
        (((score - floor) / (ceiling - floor)) * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoApplicantFinancials {
    pub monthly_salary: Option<u64>,
    pub existing_emi: Option<u64>,
    pub employment_type: Option<EmploymentType>,
    pub years_in_current_job: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Salaried,
    SelfEmployed,
    Retired,
    Unemployed,
}

impl EmploymentType {
    /// Scales stability for income sources that are harder to verify.
    pub const fn stability_factor(self) -> f32 {
        match self {
            EmploymentType::Salaried => 1.0,
            EmploymentType::SelfEmployed => 0.85,
            EmploymentType::Retired => 0.6,
            EmploymentType::Unemployed => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Secured,
    Unsecured,
}

/// Pipeline status as tracked by the CRM workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    InProgress,
    DocumentsPending,
    Verified,
    Sanctioned,
    Disbursed,
    Rejected,
    Closed,
}

impl LeadStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            LeadStatus::Disbursed | LeadStatus::Rejected | LeadStatus::Closed
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::InProgress => "in_progress",
            LeadStatus::DocumentsPending => "documents_pending",
            LeadStatus::Verified => "verified",
            LeadStatus::Sanctioned => "sanctioned",
            LeadStatus::Disbursed => "disbursed",
            LeadStatus::Rejected => "rejected",
            LeadStatus::Closed => "closed",
        }
    }
}

/// Append-only audit entry written whenever the lender bound to a lead changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LenderAssignmentHistory {
    pub lead_id: LeadId,
    pub old_lender_id: Option<LenderId>,
    pub new_lender_id: LenderId,
    pub changed_by: String,
    pub change_reason: String,
    pub assignment_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Authenticated caller as resolved by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub role: CallerRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    SuperAdmin,
    Admin,
    Staff,
    Partner,
}

impl CallerRole {
    pub const fn is_administrative(self) -> bool {
        matches!(self, CallerRole::SuperAdmin | CallerRole::Admin)
    }

    pub const fn label(self) -> &'static str {
        match self {
            CallerRole::SuperAdmin => "super_admin",
            CallerRole::Admin => "admin",
            CallerRole::Staff => "staff",
            CallerRole::Partner => "partner",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "super_admin" | "superadmin" => Some(CallerRole::SuperAdmin),
            "admin" => Some(CallerRole::Admin),
            "staff" => Some(CallerRole::Staff),
            "partner" => Some(CallerRole::Partner),
            _ => None,
        }
    }
}
