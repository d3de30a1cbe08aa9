//! Domain records and their Bitbucket Server wire shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address of a repository on the server: the project key plus the repository slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    pub project: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}

/// A repository as observed on (or sent to) the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Repository {
    /// Server-assigned id, absent until the repository is created.
    pub id: Option<i64>,
    pub name: String,
    pub project: String,
    pub description: String,
    pub public: bool,
}

impl Repository {
    pub fn reference(&self) -> RepositoryRef {
        RepositoryRef::new(self.project.clone(), self.name.clone())
    }

    pub(crate) fn payload(&self) -> RepositoryPayload<'_> {
        RepositoryPayload {
            name: &self.name,
            public: self.public,
            description: &self.description,
        }
    }
}

/// Repository access levels a group can be granted.
///
/// Deserializes through [`FromStr`], so manifests and the wire accept the
/// same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Permission {
    #[serde(rename = "REPO_READ")]
    Read,
    #[serde(rename = "REPO_WRITE")]
    Write,
    #[serde(rename = "REPO_ADMIN")]
    Admin,
}

impl Permission {
    /// The value the server uses on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "REPO_READ",
            Self::Write => "REPO_WRITE",
            Self::Admin => "REPO_ADMIN",
        }
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "REPO_READ" | "READ" => Ok(Self::Read),
            "REPO_WRITE" | "WRITE" => Ok(Self::Write),
            "REPO_ADMIN" | "ADMIN" => Ok(Self::Admin),
            other => Err(format!(
                "unknown permission '{other}', expected one of REPO_READ, REPO_WRITE, REPO_ADMIN"
            )),
        }
    }
}

/// A permission binding between a group and a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupGrant {
    pub name: String,
    pub permission: Permission,
}

impl GroupGrant {
    pub fn new(name: impl Into<String>, permission: Permission) -> Self {
        Self {
            name: name.into(),
            permission,
        }
    }
}

impl fmt::Display for GroupGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.permission)
    }
}

// ── Wire shapes ───────────────────────────────────────────────────────

/// Body of create and update calls. Id and project never go in the body.
#[derive(Debug, Serialize)]
pub(crate) struct RepositoryPayload<'a> {
    pub name: &'a str,
    pub public: bool,
    pub description: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryJson {
    pub id: i64,
    pub name: String,
    pub project: ProjectKey,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectKey {
    pub key: String,
}

impl From<RepositoryJson> for Repository {
    fn from(json: RepositoryJson) -> Self {
        Self {
            id: Some(json.id),
            name: json.name,
            project: json.project.key,
            description: json.description,
            public: json.public,
        }
    }
}

/// Paged envelope used by Bitbucket Server collection endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub values: Vec<T>,
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
    #[serde(default)]
    pub next_page_start: Option<u64>,
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupPermissionJson {
    pub group: GroupName,
    pub permission: Permission,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupName {
    pub name: String,
}

impl From<GroupPermissionJson> for GroupGrant {
    fn from(json: GroupPermissionJson) -> Self {
        Self {
            name: json.group.name,
            permission: json.permission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_from_wire() {
        let json = serde_json::json!({
            "id": 42,
            "slug": "svc",
            "name": "svc",
            "project": { "key": "CORE", "id": 1 },
            "public": true,
            "state": "AVAILABLE"
        });
        let repo: Repository = serde_json::from_value::<RepositoryJson>(json).unwrap().into();
        assert_eq!(repo.id, Some(42));
        assert_eq!(repo.project, "CORE");
        assert_eq!(repo.description, "");
        assert!(repo.public);
    }

    #[test]
    fn test_payload_omits_id_and_project() {
        let repo = Repository {
            id: Some(7),
            name: "svc".into(),
            project: "CORE".into(),
            description: "x".into(),
            public: false,
        };
        let body = serde_json::to_value(repo.payload()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "name": "svc", "public": false, "description": "x" })
        );
    }

    #[test]
    fn test_group_page_decoding() {
        let json = serde_json::json!({
            "size": 2,
            "limit": 25,
            "start": 0,
            "isLastPage": true,
            "values": [
                { "group": { "name": "devs" }, "permission": "REPO_WRITE" },
                { "group": { "name": "ops" }, "permission": "REPO_ADMIN" }
            ]
        });
        let page: Page<GroupPermissionJson> = serde_json::from_value(json).unwrap();
        let grants: Vec<GroupGrant> = page.values.into_iter().map(Into::into).collect();
        assert_eq!(
            grants,
            vec![
                GroupGrant::new("devs", Permission::Write),
                GroupGrant::new("ops", Permission::Admin),
            ]
        );
        assert!(page.is_last_page);
    }

    #[test]
    fn test_empty_page_defaults() {
        let page: Page<GroupPermissionJson> = serde_json::from_str("{}").unwrap();
        assert!(page.values.is_empty());
        assert!(page.is_last_page);
        assert_eq!(page.next_page_start, None);
    }

    #[test]
    fn test_permission_parsing() {
        assert_eq!("write".parse::<Permission>().unwrap(), Permission::Write);
        assert_eq!("REPO_ADMIN".parse::<Permission>().unwrap(), Permission::Admin);
        assert_eq!("Read".parse::<Permission>().unwrap(), Permission::Read);
        assert!("owner".parse::<Permission>().is_err());

        let grant: GroupGrant =
            serde_json::from_str(r#"{"name":"devs","permission":"write"}"#).unwrap();
        assert_eq!(grant.permission, Permission::Write);
        assert_eq!(grant.to_string(), "devs:REPO_WRITE");
    }

    #[test]
    fn test_permission_deserialize_matches_from_str() {
        for raw in ["Read", "READ", "read", "repo_read", "REPO_READ"] {
            let parsed: Permission = serde_json::from_value(serde_json::json!(raw)).unwrap();
            assert_eq!(parsed, raw.parse::<Permission>().unwrap(), "{raw}");
        }
        let err = serde_json::from_str::<Permission>(r#""owner""#).unwrap_err();
        assert!(err.to_string().contains("unknown permission"));
        assert_eq!(
            serde_json::to_value(Permission::Admin).unwrap(),
            serde_json::json!("REPO_ADMIN")
        );
    }
}
