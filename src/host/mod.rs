//! Host profiles and their persistent store.

mod store;

pub use store::HostStore;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    pub id: i64,
    pub name: String,
    pub user: String,
    pub address: String,
    pub port: u16,
    /// Plain password, or the key passphrase when `key_path` is set.
    pub password: String,
    pub key_path: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every user-supplied field of a host, collected once per invocation.
///
/// Used both to create a host and to replace one wholesale: the store never
/// merges a request with the previous row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRequest {
    pub name: String,
    pub user: String,
    pub address: String,
    pub port: u16,
    pub password: String,
    pub key_path: String,
    pub description: String,
}

impl HostProfile {
    /// A request carrying every current field forward, used to pre-fill edits.
    pub fn to_request(&self) -> HostRequest {
        HostRequest {
            name: self.name.clone(),
            user: self.user.clone(),
            address: self.address.clone(),
            port: self.port,
            password: self.password.clone(),
            key_path: self.key_path.clone(),
            description: self.description.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.password.is_empty() || !self.key_path.is_empty()
    }

    pub fn to_json(&self, pretty: bool) -> String {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        result.unwrap_or_else(|e| e.to_string())
    }
}

impl std::fmt::Display for HostProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.address, self.port)
    }
}

/// Serialized form masks the password so listings never leak it.
impl Serialize for HostProfile {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Masked<'a> {
            id: i64,
            name: &'a str,
            user: &'a str,
            address: &'a str,
            port: u16,
            password: String,
            #[serde(rename = "keypath")]
            key_path: &'a str,
            description: &'a str,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
        }

        Masked {
            id: self.id,
            name: &self.name,
            user: &self.user,
            address: &self.address,
            port: self.port,
            password: "*".repeat(self.password.chars().count()),
            key_path: &self.key_path,
            description: &self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HostProfile {
        HostProfile {
            id: 7,
            name: "web-1".to_string(),
            user: "deploy".to_string(),
            address: "10.0.0.7".to_string(),
            port: 2222,
            password: "hunter2".to_string(),
            key_path: String::new(),
            description: "frontend".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "web-1 (10.0.0.7:2222)");
    }

    #[test]
    fn test_json_masks_password() {
        let json = sample().to_json(false);
        assert!(!json.contains("hunter2"));
        assert!(json.contains(r#""password":"*******""#));
        assert!(json.contains(r#""keypath":"""#));
        assert!(json.contains(r#""createdAt""#));
    }

    #[test]
    fn test_to_request_carries_every_field() {
        let profile = sample();
        let request = profile.to_request();
        assert_eq!(request.name, profile.name);
        assert_eq!(request.port, 2222);
        assert_eq!(request.password, "hunter2");
        assert_eq!(request.description, "frontend");
    }

    #[test]
    fn test_has_credentials() {
        let mut profile = sample();
        assert!(profile.has_credentials());
        profile.password.clear();
        assert!(!profile.has_credentials());
        profile.key_path = "~/.ssh/id_ed25519".to_string();
        assert!(profile.has_credentials());
    }
}
