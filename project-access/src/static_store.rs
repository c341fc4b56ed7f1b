use crate::credentials::Credentials;
use crate::errors::AccessError;
use crate::types::{Membership, Project, UserId};
use crate::ProjectStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// In-memory store populated from configuration.
pub struct StaticStore {
    projects: HashMap<String, Project>,
    memberships: HashSet<Membership>,
    sessions: HashMap<String, UserId>,
}

impl StaticStore {
    pub fn new(
        projects: Vec<Project>,
        memberships: Vec<Membership>,
        sessions: HashMap<String, UserId>,
    ) -> Self {
        StaticStore {
            projects: projects
                .into_iter()
                .map(|p| (p.project_id.clone(), p))
                .collect(),
            memberships: memberships.into_iter().collect(),
            sessions,
        }
    }
}

#[async_trait]
impl ProjectStore for StaticStore {
    async fn project(&self, project_id: &str) -> Result<Option<Project>, AccessError> {
        Ok(self.projects.get(project_id).cloned())
    }

    async fn user_for(&self, credentials: &Credentials) -> Result<Option<UserId>, AccessError> {
        Ok(self.sessions.get(credentials.access_token()).cloned())
    }

    async fn is_member(&self, account_id: &str, user_id: &str) -> Result<bool, AccessError> {
        Ok(self.memberships.contains(&Membership {
            account_id: account_id.to_string(),
            user_id: user_id.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_lookups() {
        let store = StaticStore::new(
            vec![Project {
                project_id: "p1".into(),
                account_id: Some("a1".into()),
                is_public: false,
                sandbox: None,
            }],
            vec![Membership {
                account_id: "a1".into(),
                user_id: "u1".into(),
            }],
            HashMap::from([("token".to_string(), "u1".to_string())]),
        );

        assert!(store.project("p1").await.unwrap().is_some());
        assert!(store.project("p2").await.unwrap().is_none());

        let user = store.user_for(&Credentials::new("token")).await.unwrap();
        assert_eq!(user.as_deref(), Some("u1"));
        let user = store.user_for(&Credentials::new("bogus")).await.unwrap();
        assert_eq!(user, None);

        assert!(store.is_member("a1", "u1").await.unwrap());
        assert!(!store.is_member("a1", "u2").await.unwrap());
        assert!(!store.is_member("a2", "u1").await.unwrap());
    }
}
