//! Conjur service collaborators
//!
//! Each command depends on the narrow trait for the part of the service it
//! uses. [`HttpClient`] implements all of them against the REST API; tests
//! substitute their own implementations through a [`Connector`].

mod cert;
mod http;

pub use cert::{fingerprint, pem_encode, ServerCertificate};
pub use http::{HttpClient, HttpConnector};

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::netrc::Credentials;
use crate::common::profile::Profile;
use crate::common::Result;

/// A host factory token as returned by Conjur
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFactoryToken {
    pub expiration: String,
    #[serde(default)]
    pub cidr: Vec<String>,
    pub token: String,
}

/// A host created through a host factory token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostFactoryHost {
    pub created_at: String,
    pub id: String,
    pub owner: String,
    pub api_key: String,
    #[serde(default)]
    pub permissions: Vec<serde_json::Value>,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
    #[serde(default)]
    pub restricted_to: Vec<String>,
}

/// Parameters for creating host factory tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub host_factory: String,
    pub duration: Duration,
    pub cidr: Vec<String>,
    pub count: u32,
}

/// How a policy document is applied to a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Add new records; existing ones are left alone (POST)
    Load,
    /// Replace the branch with the document (PUT)
    Replace,
    /// Add and delete records explicitly (PATCH)
    Update,
}

/// Authentication and identity
#[async_trait]
pub trait AuthnClient: Send + Sync {
    /// Exchange a login and password for the user's API key
    async fn login(&self, login: &str, password: &str) -> Result<String>;

    /// Describe the authenticated identity
    async fn whoami(&self) -> Result<serde_json::Value>;
}

/// Secret values
#[async_trait]
pub trait VariableClient: Send + Sync {
    async fn retrieve_secret(&self, variable_id: &str) -> Result<Vec<u8>>;
    async fn add_secret(&self, variable_id: &str, value: &str) -> Result<()>;
}

/// Host identities
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Issue a new API key for the host, returning it
    async fn rotate_host_api_key(&self, host_id: &str) -> Result<String>;
}

/// Host factory tokens and hosts
#[async_trait]
pub trait HostFactoryClient: Send + Sync {
    async fn create_token(&self, request: &TokenRequest) -> Result<Vec<HostFactoryToken>>;
    async fn delete_token(&self, token: &str) -> Result<()>;
    async fn create_host(&self, id: &str, token: &str) -> Result<HostFactoryHost>;
}

/// Policy loading
#[async_trait]
pub trait PolicyClient: Send + Sync {
    async fn load_policy(
        &self,
        mode: PolicyMode,
        branch: &str,
        policy: String,
    ) -> Result<serde_json::Value>;
}

/// Resources and permissions
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Whether `role` (default: the caller) holds `privilege` on a resource
    async fn check_permission(
        &self,
        resource_id: &str,
        privilege: &str,
        role: Option<&str>,
    ) -> Result<bool>;
}

/// Everything a command may ask of the service
pub trait ConjurApi:
    AuthnClient + VariableClient + HostClient + HostFactoryClient + PolicyClient + ResourceClient
{
}

impl<T> ConjurApi for T where
    T: AuthnClient
        + VariableClient
        + HostClient
        + HostFactoryClient
        + PolicyClient
        + ResourceClient
        + ?Sized
{
}

/// Opens service clients for a profile
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a client. Without credentials only unauthenticated calls
    /// (login, host creation with a host factory token) succeed.
    async fn connect(
        &self,
        profile: &Profile,
        credentials: Option<Credentials>,
    ) -> Result<Box<dyn ConjurApi>>;

    /// Retrieve the certificate presented by an HTTPS endpoint
    async fn fetch_certificate(&self, url: &Url, allow_self_signed: bool)
        -> Result<ServerCertificate>;
}
