use serde::{Deserialize, Deserializer};

pub type UserId = String;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Project {
    pub project_id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_public: bool,
    #[serde(default)]
    pub sandbox: Option<Sandbox>,
}

impl Project {
    pub fn sandbox_url(&self) -> Option<&str> {
        self.sandbox
            .as_ref()
            .and_then(|s| s.sandbox_url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Sandbox {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sandbox_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Hash)]
pub struct Membership {
    pub account_id: String,
    pub user_id: UserId,
}

// The projects table allows NULL for is_public on older rows.
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_from_row() {
        let row = r#"{
            "project_id": "p1",
            "account_id": null,
            "is_public": null,
            "sandbox": {"id": "abc", "sandbox_url": "https://8080-abc.proxy.example.works"}
        }"#;
        let project: Project = serde_json::from_str(row).unwrap();
        assert_eq!(project.account_id, None);
        assert!(!project.is_public);
        assert_eq!(
            project.sandbox_url(),
            Some("https://8080-abc.proxy.example.works")
        );

        let project: Project =
            serde_json::from_str(r#"{"project_id": "p2", "sandbox": {}}"#).unwrap();
        assert_eq!(project.sandbox_url(), None);

        let project: Project = serde_json::from_str(
            r#"{"project_id": "p3", "is_public": true, "sandbox": {"sandbox_url": ""}}"#,
        )
        .unwrap();
        assert!(project.is_public);
        assert_eq!(project.sandbox_url(), None);
    }
}
