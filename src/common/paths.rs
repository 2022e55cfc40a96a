//! Profile, credential and configuration paths
//!
//! The profile and credentials live in the home directory where other Conjur
//! tooling expects them:
//! - `~/.conjurrc` (overridable with `$CONJURRC`)
//! - `~/conjur-server.pem`
//! - `~/.netrc`
//!
//! CLI settings use the platform configuration directory.

use std::io;
use std::path::{Path, PathBuf};

/// Application name used for the settings directory
const APP_NAME: &str = "conjur-cli";

/// Get the user's home directory
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

fn in_home(file_name: &str) -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(file_name)
}

/// Default location of the profile written by `conjur init`
pub fn default_conjurrc_path() -> PathBuf {
    match std::env::var_os("CONJURRC") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => in_home(".conjurrc"),
    }
}

/// Default location of the server certificate written by `conjur init`
pub fn default_cert_path() -> PathBuf {
    in_home("conjur-server.pem")
}

/// Location of the credentials file written by `conjur login`
pub fn netrc_path() -> PathBuf {
    in_home(".netrc")
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/conjur-cli/`
/// - macOS: `~/Library/Application Support/conjur-cli/`
/// - Windows: `%APPDATA%\conjur-cli\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the settings file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Write a file readable only by its owner, creating parent directories
pub fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_valid() {
        let dir = config_dir();
        assert!(dir.is_some());
    }

    #[test]
    fn test_default_cert_path_file_name() {
        assert!(default_cert_path().ends_with("conjur-server.pem"));
    }

    #[test]
    fn test_write_private_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file");
        write_private(&path, b"secret").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"secret");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
