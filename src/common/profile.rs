//! Connection profile (`.conjurrc`)
//!
//! The profile is a small YAML document naming the Conjur endpoint, the
//! organization account and, for HTTPS endpoints, the trusted certificate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use reqwest::Url;

use super::{Error, Result};

/// Connection details for a Conjur service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Organization account name
    pub account: String,

    /// Base URL of the Conjur service
    pub appliance_url: String,

    /// PEM certificate to trust for HTTPS endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,

    /// Alternative authenticator type (e.g. `ldap`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authn_type: Option<String>,

    /// Service ID for the alternative authenticator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

impl Profile {
    pub fn new(account: impl Into<String>, appliance_url: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            appliance_url: appliance_url.into(),
            cert_file: None,
            authn_type: None,
            service_id: None,
        }
    }

    /// Read the profile file without overrides or validation
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ProfileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::InvalidProfile(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("CONJUR_APPLIANCE_URL") {
            self.appliance_url = url;
        }
        if let Some(account) = non_empty("CONJUR_ACCOUNT") {
            self.account = account;
        }
        if let Some(cert) = non_empty("CONJUR_CERT_FILE") {
            self.cert_file = Some(PathBuf::from(cert));
        }
    }

    /// Check that the profile can be used to reach a service
    pub fn validate(&self) -> Result<()> {
        if self.account.trim().is_empty() {
            return Err(Error::InvalidProfile("account is required".to_string()));
        }
        if self.appliance_url.trim().is_empty() {
            return Err(Error::InvalidProfile("appliance_url is required".to_string()));
        }
        self.url()?;
        Ok(())
    }

    /// Parsed appliance URL
    pub fn url(&self) -> Result<Url> {
        parse_service_url(&self.appliance_url).map_err(Error::InvalidProfile)
    }

    /// Machine name under which credentials are stored
    pub fn authn_machine(&self) -> String {
        format!("{}/authn", self.appliance_url.trim_end_matches('/'))
    }

    /// Serialize to the on-disk format
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Parse a service URL, accepting only http and https
pub fn parse_service_url(input: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(input.trim()).map_err(|e| format!("invalid URL '{}': {}", input, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported URL scheme '{}' in '{}'", other, input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_omits_unset_fields() {
        let profile = Profile::new("myorg", "https://conjur.example.com");
        let yaml = profile.to_yaml().unwrap();
        assert!(yaml.contains("account: myorg"));
        assert!(yaml.contains("appliance_url: https://conjur.example.com"));
        assert!(!yaml.contains("cert_file"));
    }

    #[test]
    fn read_round_trips_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".conjurrc");
        let mut profile = Profile::new("myorg", "https://conjur.example.com");
        profile.cert_file = Some(dir.path().join("conjur-server.pem"));
        std::fs::write(&path, profile.to_yaml().unwrap()).unwrap();

        assert_eq!(Profile::read(&path).unwrap(), profile);
    }

    #[test]
    fn missing_file_is_profile_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Profile::read(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::ProfileNotFound(_)));
        assert_eq!(err.to_string(), "Profile not found: run 'conjur init' first");
    }

    #[test]
    fn env_overrides_replace_fields() {
        let env: HashMap<&str, &str> = [
            ("CONJUR_ACCOUNT", "other"),
            ("CONJUR_APPLIANCE_URL", ""),
            ("CONJUR_CERT_FILE", "/tmp/cert.pem"),
        ]
        .into_iter()
        .collect();

        let mut profile = Profile::new("myorg", "https://conjur.example.com");
        profile.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(profile.account, "other");
        assert_eq!(profile.appliance_url, "https://conjur.example.com");
        assert_eq!(profile.cert_file, Some(PathBuf::from("/tmp/cert.pem")));
    }

    #[test]
    fn validate_rejects_bad_scheme() {
        let profile = Profile::new("myorg", "ftp://conjur.example.com");
        assert!(matches!(profile.validate(), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn authn_machine_ignores_trailing_slash() {
        let profile = Profile::new("myorg", "https://conjur.example.com/");
        assert_eq!(profile.authn_machine(), "https://conjur.example.com/authn");
    }
}
