use crate::errors::AccessError;
use crate::types::{Membership, Project, UserId};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Access check configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AccessConfig {
    /// Name of the cookie carrying the user's session, e.g. `sb-<ref>-auth-token`.
    /// When unset, only `Authorization: Bearer` credentials are read.
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(flatten)]
    pub store: StoreConfig,
}

impl AccessConfig {
    pub fn validate(&self) -> Result<(), AccessError> {
        if let Some(cookie) = &self.session_cookie
            && cookie.is_empty()
        {
            return Err(AccessError::InvalidConfig(
                "session_cookie cannot be empty".into(),
            ));
        }

        match &self.store {
            StoreConfig::Static { projects, .. } => {
                for project in projects {
                    if let Some(sandbox_url) = project.sandbox_url() {
                        Url::parse(sandbox_url).map_err(|e| {
                            AccessError::InvalidConfig(format!(
                                "project {}: invalid sandbox_url: {e}",
                                project.project_id
                            ))
                        })?;
                    }
                }
                Ok(())
            }
            StoreConfig::Supabase(supabase) => supabase.validate(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Projects, memberships and session tokens declared inline.
    Static {
        #[serde(default)]
        projects: Vec<Project>,
        #[serde(default)]
        memberships: Vec<Membership>,
        /// Maps session tokens to user ids
        #[serde(default)]
        sessions: HashMap<String, UserId>,
    },
    Supabase(SupabaseConfig),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://<ref>.supabase.co`
    pub url: Url,
    /// Key used for the PostgREST reads. Must be able to read projects and memberships.
    pub service_role_key: String,
    /// Key sent as `apikey` when validating user sessions. Defaults to the service key.
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Schema holding the `account_user` table
    #[serde(default = "default_membership_schema")]
    pub membership_schema: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_membership_schema() -> String {
    "basejump".into()
}

fn default_timeout_secs() -> u64 {
    5
}

impl SupabaseConfig {
    pub fn validate(&self) -> Result<(), AccessError> {
        if self.service_role_key.is_empty() {
            return Err(AccessError::InvalidConfig(
                "service_role_key cannot be empty".into(),
            ));
        }
        if self.anon_key.as_deref() == Some("") {
            return Err(AccessError::InvalidConfig("anon_key cannot be empty".into()));
        }
        if self.membership_schema.is_empty() {
            return Err(AccessError::InvalidConfig(
                "membership_schema cannot be empty".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AccessError::InvalidConfig(
                "timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
