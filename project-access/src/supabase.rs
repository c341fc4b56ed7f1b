//! Reads projects, memberships and sessions from a Supabase backend.
//!
//! Projects and memberships come from PostgREST (`/rest/v1`) using the service
//! role key. Sessions are validated against GoTrue (`/auth/v1/user`) with the
//! requester's own access token.

use crate::config::SupabaseConfig;
use crate::credentials::Credentials;
use crate::errors::AccessError;
use crate::types::{Project, UserId};
use crate::ProjectStore;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::time::Duration;

const PROJECT_COLUMNS: &str = "project_id,account_id,is_public,sandbox";

#[derive(Deserialize)]
struct AuthUser {
    id: UserId,
}

pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
    anon_key: String,
    membership_schema: String,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, AccessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let anon_key = config
            .anon_key
            .unwrap_or_else(|| config.service_role_key.clone());

        Ok(SupabaseStore {
            client,
            base_url: config.url.as_str().trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key,
            anon_key,
            membership_schema: config.membership_schema,
        })
    }

    fn rest(&self, table: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }
}

#[async_trait]
impl ProjectStore for SupabaseStore {
    async fn project(&self, project_id: &str) -> Result<Option<Project>, AccessError> {
        let project_filter = format!("eq.{project_id}");
        let response = self
            .rest("projects")
            .query(&[
                ("select", PROJECT_COLUMNS),
                ("project_id", project_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<Vec<Project>>().await?.into_iter().next()),
            status => Err(AccessError::UnexpectedStatus {
                endpoint: "projects",
                status,
            }),
        }
    }

    async fn user_for(&self, credentials: &Credentials) -> Result<Option<UserId>, AccessError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(credentials.access_token())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<AuthUser>().await?.id)),
            // Expired or forged tokens are an anonymous request, not a failure
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(AccessError::UnexpectedStatus {
                endpoint: "auth/user",
                status,
            }),
        }
    }

    async fn is_member(&self, account_id: &str, user_id: &str) -> Result<bool, AccessError> {
        let account_filter = format!("eq.{account_id}");
        let user_filter = format!("eq.{user_id}");
        let response = self
            .rest("account_user")
            .header("Accept-Profile", &self.membership_schema)
            .query(&[
                ("select", "user_id"),
                ("account_id", account_filter.as_str()),
                ("user_id", user_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(!response.json::<Vec<IgnoredAny>>().await?.is_empty()),
            status => Err(AccessError::UnexpectedStatus {
                endpoint: "account_user",
                status,
            }),
        }
    }
}
