use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

use super::{AuthError, AuthProvider, Capability, CapabilitySet, Credentials, Subject};

/// Grants every capability when listed in a role
const WILDCARD: &str = "*";

#[derive(Debug, Clone, Deserialize)]
struct UserEntry {
    password_sha256: String,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RealmFile {
    #[serde(default)]
    users: HashMap<String, UserEntry>,
    #[serde(default)]
    roles: HashMap<String, Vec<String>>,
}

/// User/role realm backing the web login and token issuance.
///
/// ```yaml
/// users:
///   foo: { password_sha256: "<hex digest>", roles: [editor] }
/// roles:
///   editor: [create, update, delete]
///   admin: ["*"]
/// ```
#[derive(Debug, Clone)]
pub struct CredentialRealm {
    users: HashMap<String, UserEntry>,
    roles: HashMap<String, CapabilitySet>,
}

pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl CredentialRealm {
    /// Default realm: `root` (everything), `foo` (editor), `bar` (writer), `baz` (no grants)
    pub fn builtin() -> Self {
        let user = |password: &str, roles: &[&str]| UserEntry {
            password_sha256: password_digest(password),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };

        let users = HashMap::from([
            ("root".to_string(), user("w00t", &["admin"])),
            ("foo".to_string(), user("bar", &["editor", "writer"])),
            ("bar".to_string(), user("baz", &["writer"])),
            ("baz".to_string(), user("baz", &[])),
        ]);
        let roles = HashMap::from([
            ("admin".to_string(), CapabilitySet::all()),
            (
                "editor".to_string(),
                [Capability::Create, Capability::Delete, Capability::Update].into_iter().collect(),
            ),
            ("writer".to_string(), [Capability::Update].into_iter().collect()),
        ]);

        Self { users, roles }
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Realm(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, AuthError> {
        let file: RealmFile = serde_yaml::from_str(raw).map_err(|e| AuthError::Realm(e.to_string()))?;

        let mut roles = HashMap::with_capacity(file.roles.len());
        for (role, grants) in file.roles {
            let set = if grants.iter().any(|g| g == WILDCARD) {
                CapabilitySet::all()
            } else {
                grants.iter().map(|g| g.parse::<Capability>()).collect::<Result<CapabilitySet, _>>()?
            };
            roles.insert(role, set);
        }

        Ok(Self {
            users: file.users,
            roles,
        })
    }

    /// Resolve the current capabilities of a known user
    pub fn subject_for(&self, username: &str) -> Result<Subject, AuthError> {
        let entry = self
            .users
            .get(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;

        let capabilities = entry
            .roles
            .iter()
            .filter_map(|role| self.roles.get(role))
            .flat_map(|set| set.iter())
            .collect();
        Ok(Subject::new(username, capabilities))
    }
}

#[async_trait]
impl AuthProvider for CredentialRealm {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Subject, AuthError> {
        let Credentials::Password { username, password } = credentials else {
            return Err(AuthError::InvalidCredentials);
        };
        let entry = self.users.get(username).ok_or(AuthError::InvalidCredentials)?;

        if entry.password_sha256 != password_digest(password) {
            return Err(AuthError::InvalidCredentials);
        }
        self.subject_for(username)
    }

    async fn is_authorized(&self, subject: &Subject, capability: Capability) -> Result<bool, AuthError> {
        Ok(self.subject_for(&subject.username)?.can(capability))
    }
}
