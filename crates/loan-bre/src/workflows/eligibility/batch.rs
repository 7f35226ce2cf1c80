use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Caller, LeadId};
use super::repository::{ConfigurationStore, EligibilityStore, LeadRepository, RepositoryError};
use super::service::RecommendationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
    /// Pause between consecutive leads so bulk runs do not starve interactive traffic.
    pub inter_lead_delay: Duration,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            inter_lead_delay: Duration::from_millis(100),
            default_limit: 50,
            max_limit: 200,
        }
    }
}

impl BatchPolicy {
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

/// Gate deciding who may run administrative operations such as bulk recomputes.
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, caller: &Caller) -> Result<(), AuthorizationError>;
}

/// Allows super admins and admins.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminRolePolicy;

impl AccessPolicy for AdminRolePolicy {
    fn authorize(&self, caller: &Caller) -> Result<(), AuthorizationError> {
        if caller.role.is_administrative() {
            Ok(())
        } else {
            Err(AuthorizationError::InsufficientRole {
                user_id: caller.user_id.clone(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("caller {user_id} lacks an administrative role")]
    InsufficientRole { user_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub lead_ids: Option<Vec<LeadId>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub lead_id: LeadId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<BatchFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Forbidden(#[from] AuthorizationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Sequential recompute over many leads; one lead failing never aborts the run.
pub struct BatchRecompute<L, C, S, P> {
    service: Arc<RecommendationService<L, C, S>>,
    access: Arc<P>,
    policy: BatchPolicy,
}

impl<L, C, S, P> BatchRecompute<L, C, S, P>
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    pub fn new(
        service: Arc<RecommendationService<L, C, S>>,
        access: Arc<P>,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            service,
            access,
            policy,
        }
    }

    pub fn service(&self) -> &Arc<RecommendationService<L, C, S>> {
        &self.service
    }

    pub fn access(&self) -> &Arc<P> {
        &self.access
    }

    pub async fn run(
        &self,
        caller: &Caller,
        request: BatchRequest,
    ) -> Result<BatchResult, BatchError> {
        self.access.authorize(caller).map_err(|err| {
            warn!(user_id = %caller.user_id, role = caller.role.label(), "batch recompute denied");
            err
        })?;

        let limit = self.policy.effective_limit(request.limit);
        let lead_ids = match request.lead_ids {
            Some(mut ids) => {
                ids.truncate(limit);
                ids
            }
            None => self.service.leads().non_terminal(limit)?,
        };

        let mut result = BatchResult {
            total: lead_ids.len(),
            ..BatchResult::default()
        };
        info!(user_id = %caller.user_id, total = result.total, "batch recompute started");

        for (index, lead_id) in lead_ids.into_iter().enumerate() {
            if index > 0 && !self.policy.inter_lead_delay.is_zero() {
                tokio::time::sleep(self.policy.inter_lead_delay).await;
            }

            let service = Arc::clone(&self.service);
            let target = lead_id.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                service.compute_recommendation(&target).map(|_| ())
            })
            .await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(err) => Some(format!("recompute task aborted: {err}")),
            };
            match failure {
                None => result.processed += 1,
                Some(error) => {
                    warn!(lead_id = %lead_id, error = %error, "batch recompute failed for lead");
                    result.failed += 1;
                    result.errors.push(BatchFailure { lead_id, error });
                }
            }
        }

        info!(
            total = result.total,
            processed = result.processed,
            failed = result.failed,
            "batch recompute finished"
        );
        Ok(result)
    }
}
