//! Debounced recompute queue keyed by lead id.
//!
//! A lead moves `idle -> pending -> running -> idle`. Triggers that land while a lead is
//! pending restart its debounce window, so a burst of edits collapses into one run that reads
//! the latest lead state when it fires. A trigger that lands while running schedules a single
//! follow-up run once the current one completes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use super::domain::LeadId;
use super::repository::{ConfigurationStore, EligibilityStore, LeadRepository};
use super::service::{RecommendationError, RecommendationService};

/// Lead fields whose edits can change eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedField {
    LoanAmount,
    StudyDestination,
    LoanType,
    LoanClassification,
    IntakeMonth,
    IntakeYear,
}

impl WatchedField {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "loan_amount" => Some(Self::LoanAmount),
            "study_destination" => Some(Self::StudyDestination),
            "loan_type" => Some(Self::LoanType),
            "loan_classification" => Some(Self::LoanClassification),
            "intake_month" => Some(Self::IntakeMonth),
            "intake_year" => Some(Self::IntakeYear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerPolicy {
    pub debounce: Duration,
    /// Minimum relative loan amount change that warrants a recompute.
    pub loan_amount_change_ratio: f64,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            loan_amount_change_ratio: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDecision {
    Scheduled,
    UnwatchedField,
    InsignificantChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    Idle,
    Pending,
    Running,
}

/// Work the queue runs once a lead's debounce window closes.
pub trait RecomputeJob: Send + Sync + 'static {
    fn recompute(&self, lead_id: &LeadId) -> Result<(), RecommendationError>;
}

impl<L, C, S> RecomputeJob for RecommendationService<L, C, S>
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
{
    fn recompute(&self, lead_id: &LeadId) -> Result<(), RecommendationError> {
        self.compute_recommendation(lead_id).map(|_| ())
    }
}

/// Whether an edit to `field` is large enough to rescore the lead.
pub fn is_material_change(
    field: WatchedField,
    old_value: &Value,
    new_value: &Value,
    policy: &TriggerPolicy,
) -> bool {
    match field {
        WatchedField::LoanAmount => match (as_amount(old_value), as_amount(new_value)) {
            (Some(old), Some(new)) if old > 0.0 => {
                (new - old).abs() / old >= policy.loan_amount_change_ratio
            }
            (old, new) => old != new,
        },
        _ => normalized(old_value) != normalized(new_value),
    }
}

fn as_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

fn normalized(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(raw) if raw.trim().is_empty() => None,
        Value::String(raw) => Some(raw.trim().to_ascii_lowercase()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Pending { generation: u64 },
    Running { rerun: bool },
}

struct QueueInner {
    job: Arc<dyn RecomputeJob>,
    policy: TriggerPolicy,
    runtime: Handle,
    slots: Mutex<HashMap<LeadId, Slot>>,
}

/// Cloneable handle to the recompute queue; enqueueing never blocks the caller.
#[derive(Clone)]
pub struct RecomputeQueue {
    inner: Arc<QueueInner>,
}

impl RecomputeQueue {
    pub fn new(job: Arc<dyn RecomputeJob>, policy: TriggerPolicy, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                job,
                policy,
                runtime,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn policy(&self) -> &TriggerPolicy {
        &self.inner.policy
    }

    /// Fire-and-forget entry point for lead edits.
    pub fn trigger_recompute_on_change(
        &self,
        lead_id: &LeadId,
        field: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> TriggerDecision {
        let Some(field) = WatchedField::parse(field) else {
            return TriggerDecision::UnwatchedField;
        };
        if !is_material_change(field, old_value, new_value, &self.inner.policy) {
            debug!(lead_id = %lead_id, ?field, "change below recompute threshold");
            return TriggerDecision::InsignificantChange;
        }
        self.enqueue(lead_id.clone());
        TriggerDecision::Scheduled
    }

    pub fn enqueue(&self, lead_id: LeadId) {
        self.inner.enqueue(lead_id);
    }

    pub fn state(&self, lead_id: &LeadId) -> TriggerState {
        match self.inner.slots().get(lead_id) {
            None => TriggerState::Idle,
            Some(Slot::Pending { .. }) => TriggerState::Pending,
            Some(Slot::Running { .. }) => TriggerState::Running,
        }
    }
}

impl QueueInner {
    fn slots(&self) -> MutexGuard<'_, HashMap<LeadId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(self: &Arc<Self>, lead_id: LeadId) {
        let generation = {
            let mut slots = self.slots();
            match slots.get_mut(&lead_id) {
                Some(Slot::Running { rerun }) => {
                    *rerun = true;
                    return;
                }
                Some(Slot::Pending { generation }) => {
                    *generation += 1;
                    *generation
                }
                None => {
                    slots.insert(lead_id.clone(), Slot::Pending { generation: 0 });
                    0
                }
            }
        };

        self.schedule(lead_id, generation);
    }

    fn schedule(self: &Arc<Self>, lead_id: LeadId, generation: u64) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(inner.policy.debounce).await;
            inner.fire(lead_id, generation).await;
        });
    }

    async fn fire(self: Arc<Self>, lead_id: LeadId, generation: u64) {
        {
            let mut slots = self.slots();
            match slots.get(&lead_id) {
                Some(Slot::Pending { generation: current }) if *current == generation => {
                    slots.insert(lead_id.clone(), Slot::Running { rerun: false });
                }
                // Superseded by a later trigger for the same lead.
                _ => return,
            }
        }

        let job = Arc::clone(&self.job);
        let target = lead_id.clone();
        match tokio::task::spawn_blocking(move || job.recompute(&target)).await {
            Ok(Ok(())) => debug!(lead_id = %lead_id, "background recompute finished"),
            Ok(Err(err)) => {
                warn!(lead_id = %lead_id, error = %err, "background recompute failed")
            }
            Err(err) => error!(lead_id = %lead_id, error = %err, "background recompute aborted"),
        }

        let rerun = {
            let mut slots = self.slots();
            match slots.remove(&lead_id) {
                Some(Slot::Running { rerun: true }) => {
                    slots.insert(lead_id.clone(), Slot::Pending { generation: 0 });
                    true
                }
                _ => false,
            }
        };
        if rerun {
            debug!(lead_id = %lead_id, "lead changed during recompute; running again");
            self.schedule(lead_id, 0);
        }
    }
}
