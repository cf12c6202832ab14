//! Interactive prompts for host fields.

use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use crate::error::{Result, SshelfError};
use crate::host::{HostProfile, HostRequest};

/// How a field is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Typed without echo.
    Secret,
    /// A TCP port number.
    Port,
}

/// The editable fields of a host, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostField {
    Name,
    User,
    Address,
    Port,
    Password,
    KeyPath,
    Description,
}

pub const HOST_FIELDS: [HostField; 7] = [
    HostField::Name,
    HostField::User,
    HostField::Address,
    HostField::Port,
    HostField::Password,
    HostField::KeyPath,
    HostField::Description,
];

impl HostField {
    pub fn label(self) -> &'static str {
        match self {
            HostField::Name => "name",
            HostField::User => "user",
            HostField::Address => "address",
            HostField::Port => "port",
            HostField::Password => "password",
            HostField::KeyPath => "keypath",
            HostField::Description => "description",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            HostField::Port => FieldKind::Port,
            HostField::Password => FieldKind::Secret,
            _ => FieldKind::Text,
        }
    }

    pub fn required(self) -> bool {
        matches!(self, HostField::Name | HostField::User | HostField::Address)
    }

    fn get(self, request: &HostRequest) -> String {
        match self {
            HostField::Name => request.name.clone(),
            HostField::User => request.user.clone(),
            HostField::Address => request.address.clone(),
            HostField::Port => request.port.to_string(),
            HostField::Password => request.password.clone(),
            HostField::KeyPath => request.key_path.clone(),
            HostField::Description => request.description.clone(),
        }
    }

    fn set(self, request: &mut HostRequest, value: String) -> Result<()> {
        match self {
            HostField::Name => request.name = value,
            HostField::User => request.user = value,
            HostField::Address => request.address = value,
            HostField::Port => request.port = parse_port(&value).map_err(SshelfError::Config)?,
            HostField::Password => request.password = value,
            HostField::KeyPath => request.key_path = value,
            HostField::Description => request.description = value,
        }
        Ok(())
    }
}

pub fn parse_port(input: &str) -> std::result::Result<u16, String> {
    match input.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("invalid port '{}'", input.trim())),
        Ok(port) => Ok(port),
    }
}

/// Walk every host field, asking `answer` for its new value.
///
/// `answer` receives the field and its current value and returns the text
/// the user settled on. Prompts and tests share this loop.
pub fn fill_host<F>(initial: HostRequest, mut answer: F) -> Result<HostRequest>
where
    F: FnMut(HostField, &str) -> Result<String>,
{
    let mut request = initial;
    for field in HOST_FIELDS {
        let current = field.get(&request);
        let value = answer(field, &current)?;
        field.set(&mut request, value)?;
    }
    Ok(request)
}

/// Prompt for every host field, pre-filled from `initial`.
pub fn read_host(initial: HostRequest) -> Result<HostRequest> {
    fill_host(initial, ask)
}

/// Typed at a secret prompt to erase the stored value.
pub const CLEAR_SECRET: &str = "-";

/// Resolve what was typed at a secret prompt against the stored value.
fn secret_answer(typed: &str, current: &str) -> String {
    match typed {
        "" => current.to_string(),
        CLEAR_SECRET => String::new(),
        other => other.to_string(),
    }
}

/// Ask for one field according to its kind.
fn ask(field: HostField, current: &str) -> Result<String> {
    let required = field.required();

    match field.kind() {
        FieldKind::Text => {
            let value = Input::<String>::new()
                .with_prompt(field.label())
                .with_initial_text(current)
                .allow_empty(!required)
                .interact_text()?;
            Ok(value.trim().to_string())
        }
        FieldKind::Secret => {
            let prompt = if current.is_empty() {
                field.label().to_string()
            } else {
                format!(
                    "{} (blank keeps current, '{}' clears)",
                    field.label(),
                    CLEAR_SECRET
                )
            };
            let typed = Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()?;
            Ok(secret_answer(&typed, current))
        }
        FieldKind::Port => {
            let value = Input::<String>::new()
                .with_prompt(field.label())
                .default(current.to_string())
                .validate_with(|input: &String| parse_port(input).map(|_| ()))
                .interact_text()?;
            Ok(value)
        }
    }
}

fn host_label(host: &HostProfile) -> String {
    let target = style(format!("{}@{}:{}", host.user, host.address, host.port)).dim();
    if host.description.is_empty() {
        format!("{}  {}", host.name, target)
    } else {
        format!("{}  {}  {}", host.name, target, style(&host.description).dim())
    }
}

/// Let the user pick one of `hosts`. Escape cancels.
pub fn select_host(hosts: &[HostProfile]) -> Result<&HostProfile> {
    if hosts.is_empty() {
        return Err(SshelfError::NoHosts);
    }

    let items: Vec<String> = hosts.iter().map(host_label).collect();
    let idx = Select::new()
        .with_prompt("Select host")
        .items(&items)
        .default(0)
        .max_length(10)
        .interact_opt()?
        .ok_or(SshelfError::UserCancelled)?;

    Ok(&hosts[idx])
}

pub fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact_opt()?
        .ok_or(SshelfError::UserCancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> HostRequest {
        HostRequest {
            name: "db".to_string(),
            user: "postgres".to_string(),
            address: "10.0.0.5".to_string(),
            port: 5022,
            password: "pw".to_string(),
            key_path: String::new(),
            description: "primary".to_string(),
        }
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(HostField::Port.kind(), FieldKind::Port);
        assert_eq!(HostField::Password.kind(), FieldKind::Secret);
        assert_eq!(HostField::KeyPath.kind(), FieldKind::Text);
        assert!(HostField::Name.required());
        assert!(!HostField::Description.required());
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("22"), Ok(22));
        assert_eq!(parse_port(" 2222 "), Ok(2222));
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
        assert!(parse_port("ssh").is_err());
    }

    #[test]
    fn test_fill_host_keeps_accepted_defaults() {
        let mut seen = Vec::new();
        let request = fill_host(existing(), |field, current| {
            seen.push((field, current.to_string()));
            Ok(current.to_string())
        })
        .unwrap();

        assert_eq!(request, existing());
        assert_eq!(seen.len(), HOST_FIELDS.len());
        assert_eq!(seen[3], (HostField::Port, "5022".to_string()));
    }

    #[test]
    fn test_fill_host_applies_answers() {
        let request = fill_host(HostRequest::default(), |field, _| {
            Ok(match field {
                HostField::Name => "web".to_string(),
                HostField::User => "deploy".to_string(),
                HostField::Address => "example.com".to_string(),
                HostField::Port => "2200".to_string(),
                HostField::KeyPath => "~/.ssh/id_ed25519".to_string(),
                _ => String::new(),
            })
        })
        .unwrap();

        assert_eq!(request.name, "web");
        assert_eq!(request.port, 2200);
        assert_eq!(request.key_path, "~/.ssh/id_ed25519");
        assert!(request.password.is_empty());
    }

    #[test]
    fn test_fill_host_stops_on_cancel() {
        let mut asked = 0;
        let result = fill_host(existing(), |field, current| {
            asked += 1;
            if field == HostField::Address {
                Err(SshelfError::UserCancelled)
            } else {
                Ok(current.to_string())
            }
        });

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(asked, 3);
    }

    #[test]
    fn test_fill_host_rejects_bad_port() {
        let result = fill_host(existing(), |field, current| {
            Ok(if field == HostField::Port {
                "nope".to_string()
            } else {
                current.to_string()
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_secret_answer() {
        assert_eq!(secret_answer("", "old"), "old");
        assert_eq!(secret_answer(CLEAR_SECRET, "old"), "");
        assert_eq!(secret_answer("new", "old"), "new");
        assert_eq!(secret_answer("", ""), "");
    }

    #[test]
    fn test_fill_host_clears_optional_fields() {
        let mut start = existing();
        start.key_path = "~/.ssh/id_ed25519".to_string();

        let request = fill_host(start, |field, current| {
            Ok(match field {
                HostField::Password => secret_answer(CLEAR_SECRET, current),
                HostField::KeyPath | HostField::Description => String::new(),
                _ => current.to_string(),
            })
        })
        .unwrap();

        assert!(request.password.is_empty());
        assert!(request.key_path.is_empty());
        assert!(request.description.is_empty());
        assert_eq!(request.name, "db");
        assert_eq!(request.port, 5022);
    }

    #[test]
    fn test_select_host_with_no_hosts() {
        assert!(matches!(select_host(&[]).unwrap_err(), SshelfError::NoHosts));
    }
}
