//! Stored credentials (`.netrc`)
//!
//! `conjur login` stores the API key under the machine `<appliance_url>/authn`
//! so that curl and other Conjur tools can reuse it. Entries for other
//! machines are preserved on rewrite.

use std::fmt;
use std::path::Path;

use super::{paths, Error, Result};

/// A login name and API key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(login: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            api_key: api_key.into(),
        }
    }

    /// Credentials from `CONJUR_AUTHN_LOGIN` and `CONJUR_AUTHN_API_KEY`
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let login = lookup("CONJUR_AUTHN_LOGIN").filter(|v| !v.is_empty())?;
        let api_key = lookup("CONJUR_AUTHN_API_KEY").filter(|v| !v.is_empty())?;
        Some(Self::new(login, api_key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    machine: String,
    login: String,
    password: String,
}

/// Parsed contents of a netrc file
#[derive(Debug, Default)]
pub struct Netrc {
    entries: Vec<Entry>,
}

impl Netrc {
    /// Load a netrc file; a missing file is an empty one
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Ok(Self::parse(&content))
    }

    /// Parse netrc text. Unknown keywords and `default` blocks are skipped.
    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();
        let mut current: Option<Entry> = None;
        let mut tokens = content.split_whitespace();

        while let Some(token) = tokens.next() {
            match token {
                "machine" => {
                    entries.extend(current.take());
                    if let Some(machine) = tokens.next() {
                        current = Some(Entry {
                            machine: machine.to_string(),
                            login: String::new(),
                            password: String::new(),
                        });
                    }
                }
                "default" => entries.extend(current.take()),
                "login" => {
                    let value = tokens.next().unwrap_or_default();
                    if let Some(entry) = current.as_mut() {
                        entry.login = value.to_string();
                    }
                }
                "password" => {
                    let value = tokens.next().unwrap_or_default();
                    if let Some(entry) = current.as_mut() {
                        entry.password = value.to_string();
                    }
                }
                "account" => {
                    tokens.next();
                }
                _ => {}
            }
        }
        entries.extend(current);

        Self { entries }
    }

    /// Credentials stored for a machine
    pub fn get(&self, machine: &str) -> Option<Credentials> {
        self.entries
            .iter()
            .find(|e| e.machine == machine)
            .map(|e| Credentials::new(e.login.clone(), e.password.clone()))
    }

    /// Store credentials for a machine, replacing any existing entry
    pub fn set(&mut self, machine: &str, credentials: &Credentials) {
        let entry = Entry {
            machine: machine.to_string(),
            login: credentials.login.clone(),
            password: credentials.api_key.clone(),
        };
        match self.entries.iter_mut().find(|e| e.machine == machine) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry for a machine, returning whether one existed
    pub fn remove(&mut self, machine: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.machine != machine);
        self.entries.len() != before
    }

    /// Write the file with owner-only permissions
    pub fn save(&self, path: &Path) -> Result<()> {
        paths::write_private(path, self.to_string().as_bytes())?;
        Ok(())
    }
}

impl fmt::Display for Netrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "machine {}", entry.machine)?;
            writeln!(f, "  login {}", entry.login)?;
            writeln!(f, "  password {}", entry.password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "machine github.com login octo password hunter2\n\
                          machine https://conjur.example.com/authn\n  login admin\n  password 1abc\n";

    #[test]
    fn parses_single_and_multi_line_entries() {
        let netrc = Netrc::parse(SAMPLE);
        assert_eq!(
            netrc.get("github.com"),
            Some(Credentials::new("octo", "hunter2"))
        );
        assert_eq!(
            netrc.get("https://conjur.example.com/authn"),
            Some(Credentials::new("admin", "1abc"))
        );
    }

    #[test]
    fn set_replaces_existing_and_keeps_others() {
        let mut netrc = Netrc::parse(SAMPLE);
        netrc.set(
            "https://conjur.example.com/authn",
            &Credentials::new("alice", "2def"),
        );

        let reparsed = Netrc::parse(&netrc.to_string());
        assert_eq!(
            reparsed.get("https://conjur.example.com/authn"),
            Some(Credentials::new("alice", "2def"))
        );
        assert!(reparsed.get("github.com").is_some());
    }

    #[test]
    fn remove_reports_presence() {
        let mut netrc = Netrc::parse(SAMPLE);
        assert!(netrc.remove("github.com"));
        assert!(!netrc.remove("github.com"));
        assert!(netrc.get("github.com").is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let creds = Credentials::new("admin", "topsecret");
        assert!(!format!("{:?}", creds).contains("topsecret"));
    }

    #[test]
    fn env_credentials_need_both_values() {
        assert!(Credentials::from_env(|name| match name {
            "CONJUR_AUTHN_LOGIN" => Some("host/app".to_string()),
            _ => None,
        })
        .is_none());

        let creds = Credentials::from_env(|name| match name {
            "CONJUR_AUTHN_LOGIN" => Some("host/app".to_string()),
            "CONJUR_AUTHN_API_KEY" => Some("key".to_string()),
            _ => None,
        });
        assert_eq!(creds, Some(Credentials::new("host/app", "key")));
    }
}
