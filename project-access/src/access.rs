use crate::credentials::Credentials;
use crate::metrics_defs::{ACCESS_DENIED, STORE_ERRORS};
use crate::types::{Project, UserId};
use crate::ProjectStore;
use http::StatusCode;
use shared::counter;
use std::sync::Arc;

/// Access granted to a preview of `project`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grant {
    pub project: Project,
    /// Set when the requester was authenticated. Public projects are granted
    /// without resolving the session at all.
    pub user_id: Option<UserId>,
}

#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    /// No valid session was presented
    #[error("Unauthorized")]
    Unauthorized,
    /// Authenticated, but not a member of the owning account
    #[error("Forbidden")]
    Forbidden,
}

impl Denial {
    pub fn status(&self) -> StatusCode {
        match self {
            Denial::Unauthorized => StatusCode::UNAUTHORIZED,
            Denial::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Denial::Unauthorized => "unauthorized",
            Denial::Forbidden => "forbidden",
        }
    }
}

#[derive(Clone)]
pub struct ProjectAccess {
    store: Arc<dyn ProjectStore>,
}

impl ProjectAccess {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        ProjectAccess { store }
    }

    /// Decides whether the requester may view previews of `project_id`.
    ///
    /// Public projects are open to everyone. Private projects require a valid
    /// session belonging to a member of the owning account. A missing project is
    /// reported as `Unauthorized` to anonymous callers and `Forbidden` to
    /// authenticated ones, so neither learns whether the project exists.
    ///
    /// Store failures are logged and fail closed.
    pub async fn authorize(
        &self,
        project_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Grant, Denial> {
        let result = self.decide(project_id, credentials).await;
        if let Err(denial) = &result {
            counter!(ACCESS_DENIED, "reason" => denial.reason()).increment(1);
            tracing::debug!(project_id, reason = denial.reason(), "Preview access denied");
        }
        result
    }

    async fn decide(
        &self,
        project_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Grant, Denial> {
        let project = self.load_project(project_id).await;

        if let Some(project) = &project
            && project.is_public
        {
            return Ok(Grant {
                project: project.clone(),
                user_id: None,
            });
        }

        let user_id = self
            .resolve_user(credentials)
            .await
            .ok_or(Denial::Unauthorized)?;

        let project = project.ok_or(Denial::Forbidden)?;
        let account_id = project.account_id.as_deref().ok_or(Denial::Forbidden)?;

        match self.store.is_member(account_id, &user_id).await {
            Ok(true) => Ok(Grant {
                project,
                user_id: Some(user_id),
            }),
            Ok(false) => Err(Denial::Forbidden),
            Err(e) => {
                counter!(STORE_ERRORS, "lookup" => "membership").increment(1);
                tracing::error!(project_id, account_id, error = %e, "Membership lookup failed");
                Err(Denial::Forbidden)
            }
        }
    }

    async fn load_project(&self, project_id: &str) -> Option<Project> {
        match self.store.project(project_id).await {
            Ok(project) => project,
            Err(e) => {
                counter!(STORE_ERRORS, "lookup" => "project").increment(1);
                tracing::error!(project_id, error = %e, "Project lookup failed");
                None
            }
        }
    }

    async fn resolve_user(&self, credentials: Option<&Credentials>) -> Option<UserId> {
        let credentials = credentials?;
        match self.store.user_for(credentials).await {
            Ok(user) => user,
            Err(e) => {
                counter!(STORE_ERRORS, "lookup" => "session").increment(1);
                tracing::error!(error = %e, "Session lookup failed");
                None
            }
        }
    }
}
