//! Project and membership lookups backing preview authorization.
//!
//! A [`ProjectStore`] answers three read-only questions: which project a preview
//! request targets, which user a set of credentials belongs to, and whether that
//! user belongs to the account owning the project. [`ProjectAccess`] combines the
//! answers into a grant or a denial.

pub mod access;
pub mod config;
pub mod credentials;
pub mod errors;
mod metrics_defs;
pub mod static_store;
pub mod supabase;
pub mod types;

pub use access::{Denial, Grant, ProjectAccess};
pub use credentials::Credentials;
pub use errors::AccessError;
pub use metrics_defs::ALL_METRICS;
pub use types::{Membership, Project, Sandbox, UserId};

use async_trait::async_trait;
use config::StoreConfig;
use std::sync::Arc;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Loads the project record, `None` when it does not exist.
    async fn project(&self, project_id: &str) -> Result<Option<Project>, AccessError>;

    /// Resolves credentials to a user id, `None` when the session is not valid.
    async fn user_for(&self, credentials: &Credentials) -> Result<Option<UserId>, AccessError>;

    async fn is_member(&self, account_id: &str, user_id: &str) -> Result<bool, AccessError>;
}

pub fn get_store(config: StoreConfig) -> Result<Arc<dyn ProjectStore>, AccessError> {
    match config {
        StoreConfig::Static {
            projects,
            memberships,
            sessions,
        } => Ok(Arc::new(static_store::StaticStore::new(
            projects,
            memberships,
            sessions,
        ))),
        StoreConfig::Supabase(supabase_config) => {
            Ok(Arc::new(supabase::SupabaseStore::new(supabase_config)?))
        }
    }
}
