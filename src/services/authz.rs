//! Authorization gate: one `data.auth` query per request.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{debug, info};

use crate::error::AppError;
use crate::model::{AuthQueryInput, AuthQueryOutput};
use crate::services::policy::{AUTH_QUERY, PolicyClient, query_as};

#[derive(Clone)]
pub struct AuthorizationGate {
    policy: Arc<dyn PolicyClient>,
    deny_status: StatusCode,
}

impl AuthorizationGate {
    pub fn new(policy: Arc<dyn PolicyClient>, deny_status: StatusCode) -> Self {
        Self {
            policy,
            deny_status,
        }
    }

    /// `Ok(())` when the policy allows; `Forbidden` with the configured status otherwise.
    pub async fn check(&self, input: &AuthQueryInput) -> Result<(), AppError> {
        debug!(input = ?input.redacted(), "authorization query");

        let output: AuthQueryOutput = query_as(self.policy.as_ref(), AUTH_QUERY, input).await?;
        if output.allow {
            Ok(())
        } else {
            info!(method = %input.method, path = %input.path, "request denied by policy");
            Err(AppError::Forbidden {
                status: self.deny_status,
            })
        }
    }
}
