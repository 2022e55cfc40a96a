//! REST client for the Conjur API
//!
//! Requests are authenticated with a short-lived access token obtained from
//! the stored API key on first use and reused for the client's lifetime.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::common::config::HttpConfig;
use crate::common::netrc::Credentials;
use crate::common::profile::Profile;
use crate::common::{Error, Result};

use super::{
    cert, AuthnClient, ConjurApi, Connector, HostClient, HostFactoryClient, HostFactoryHost,
    HostFactoryToken, PolicyClient, PolicyMode, ResourceClient, ServerCertificate, TokenRequest,
    VariableClient,
};

const USER_AGENT: &str = concat!("conjur-cli/", env!("CARGO_PKG_VERSION"));

/// Production [`Connector`] backed by [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        profile: &Profile,
        credentials: Option<Credentials>,
    ) -> Result<Box<dyn ConjurApi>> {
        Ok(Box::new(HttpClient::new(profile, credentials, self.timeout)?))
    }

    async fn fetch_certificate(
        &self,
        url: &Url,
        allow_self_signed: bool,
    ) -> Result<ServerCertificate> {
        cert::fetch(url, allow_self_signed, self.timeout).await
    }
}

/// Conjur REST API client
#[derive(Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
    account: String,
    authn_type: Option<String>,
    service_id: Option<String>,
    credentials: Option<Credentials>,
    token: OnceCell<String>,
}

impl HttpClient {
    pub fn new(
        profile: &Profile,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = profile.url()?;
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT);

        if base.scheme() == "https" {
            if let Some(cert_file) = &profile.cert_file {
                let pem = std::fs::read(cert_file).map_err(|e| Error::file_read(cert_file, e))?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    Error::Config(format!("Invalid certificate {}: {}", cert_file.display(), e))
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            account: profile.account.clone(),
            authn_type: profile.authn_type.clone().filter(|t| !t.is_empty()),
            service_id: profile.service_id.clone().filter(|s| !s.is_empty()),
            credentials,
            token: OnceCell::new(),
        })
    }

    /// Append percent-encoded path segments to the appliance URL
    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidProfile(format!("not a base URL: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `authn/<account>` or `authn-<type>/<service>/<account>`
    fn authn_segments(&self) -> Vec<String> {
        let mut segments = match &self.authn_type {
            Some(kind) if kind != "authn" => {
                let mut s = vec![format!("authn-{kind}")];
                s.extend(self.service_id.clone());
                s
            }
            _ => vec!["authn".to_string()],
        };
        segments.push(self.account.clone());
        segments
    }

    fn qualify(&self, kind: &str, id: &str) -> String {
        if id.contains(':') {
            id.to_string()
        } else {
            format!("{}:{}:{}", self.account, kind, id)
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<String> {
        let mut segments = self.authn_segments();
        segments.push(credentials.login.clone());
        segments.push("authenticate".to_string());

        tracing::debug!(login = %credentials.login, "Authenticating");
        let response = self
            .http
            .post(self.endpoint(&segments)?)
            .body(credentials.api_key.clone())
            .send()
            .await?;
        let token = check_status(response).await?.bytes().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(token))
    }

    async fn access_token(&self) -> Result<&str> {
        let credentials = self.credentials.as_ref().ok_or(Error::NotLoggedIn)?;
        let token = self
            .token
            .get_or_try_init(|| self.authenticate(credentials))
            .await?;
        Ok(token.as_str())
    }

    async fn send_authorized(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.access_token().await?;
        let response = request
            .header(AUTHORIZATION, format!("Token token=\"{}\"", token))
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, "Conjur request failed");
    Err(Error::api(status.as_u16(), &body))
}

#[async_trait]
impl AuthnClient for HttpClient {
    async fn login(&self, login: &str, password: &str) -> Result<String> {
        let mut segments = self.authn_segments();
        segments.push("login".to_string());

        let response = self
            .http
            .get(self.endpoint(&segments)?)
            .basic_auth(login, Some(password))
            .send()
            .await?;
        Ok(check_status(response).await?.text().await?)
    }

    async fn whoami(&self) -> Result<serde_json::Value> {
        let request = self.http.get(self.endpoint(&["whoami"])?);
        Ok(self.send_authorized(request).await?.json().await?)
    }
}

#[async_trait]
impl VariableClient for HttpClient {
    async fn retrieve_secret(&self, variable_id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&["secrets", self.account.as_str(), "variable", variable_id])?;
        let response = self.send_authorized(self.http.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn add_secret(&self, variable_id: &str, value: &str) -> Result<()> {
        let url = self.endpoint(&["secrets", self.account.as_str(), "variable", variable_id])?;
        self.send_authorized(self.http.post(url).body(value.to_string()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HostClient for HttpClient {
    async fn rotate_host_api_key(&self, host_id: &str) -> Result<String> {
        let mut url = self.endpoint(&["authn", self.account.as_str(), "api_key"])?;
        url.query_pairs_mut()
            .append_pair("role", &self.qualify("host", host_id));
        let response = self.send_authorized(self.http.put(url)).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl HostFactoryClient for HttpClient {
    async fn create_token(&self, request: &TokenRequest) -> Result<Vec<HostFactoryToken>> {
        let lifetime = chrono::Duration::from_std(request.duration)
            .map_err(|e| Error::InvalidArgument(format!("duration out of range: {}", e)))?;
        let expiration = (chrono::Utc::now() + lifetime)
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let mut form = vec![
            ("expiration", expiration),
            (
                "host_factory",
                self.qualify("host_factory", &request.host_factory),
            ),
            ("count", request.count.to_string()),
        ];
        form.extend(request.cidr.iter().map(|c| ("cidr[]", c.clone())));

        let url = self.endpoint(&["host_factory_tokens"])?;
        let response = self.send_authorized(self.http.post(url).form(&form)).await?;
        Ok(response.json().await?)
    }

    async fn delete_token(&self, token: &str) -> Result<()> {
        let url = self.endpoint(&["host_factory_tokens", token])?;
        self.send_authorized(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_host(&self, id: &str, token: &str) -> Result<HostFactoryHost> {
        // Authorized by the host factory token itself, not by a login
        let url = self.endpoint(&["host_factories", "hosts"])?;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Token token=\"{}\"", token))
            .form(&[("id", id)])
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

#[async_trait]
impl PolicyClient for HttpClient {
    async fn load_policy(
        &self,
        mode: PolicyMode,
        branch: &str,
        policy: String,
    ) -> Result<serde_json::Value> {
        let method = match mode {
            PolicyMode::Load => Method::POST,
            PolicyMode::Replace => Method::PUT,
            PolicyMode::Update => Method::PATCH,
        };
        let url = self.endpoint(&["policies", self.account.as_str(), "policy", branch])?;
        let response = self
            .send_authorized(self.http.request(method, url).body(policy))
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ResourceClient for HttpClient {
    async fn check_permission(
        &self,
        resource_id: &str,
        privilege: &str,
        role: Option<&str>,
    ) -> Result<bool> {
        let (account, kind, id) = split_resource_id(resource_id, &self.account)?;
        let mut url = self.endpoint(&["resources", account, kind, id])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("check", "true");
            query.append_pair("privilege", privilege);
            if let Some(role) = role {
                query.append_pair("role", role);
            }
        }

        match self.send_authorized(self.http.get(url)).await {
            Ok(_) => Ok(true),
            Err(Error::Api { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Split `account:kind:id` (or `kind:id`, using the default account)
fn split_resource_id<'a>(
    resource_id: &'a str,
    default_account: &'a str,
) -> Result<(&'a str, &'a str, &'a str)> {
    let parts: Vec<&str> = resource_id.splitn(3, ':').collect();
    match parts.as_slice() {
        [account, kind, id] if !kind.is_empty() && !id.is_empty() => Ok((*account, *kind, *id)),
        [kind, id] if !kind.is_empty() && !id.is_empty() => Ok((default_account, *kind, *id)),
        _ => Err(Error::InvalidArgument(format!(
            "resource id '{}' must look like [account:]kind:identifier",
            resource_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(profile: Profile) -> HttpClient {
        HttpClient::new(&profile, None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_encodes_identifiers() {
        let client = client(Profile::new("myorg", "https://conjur.example.com/api/"));
        let url = client
            .endpoint(&["secrets", "myorg", "variable", "db/password"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://conjur.example.com/api/secrets/myorg/variable/db%2Fpassword"
        );
    }

    #[test]
    fn authn_segments_for_alternative_authenticator() {
        let mut profile = Profile::new("myorg", "https://conjur.example.com");
        profile.authn_type = Some("ldap".to_string());
        profile.service_id = Some("corp".to_string());
        assert_eq!(
            client(profile).authn_segments(),
            vec!["authn-ldap", "corp", "myorg"]
        );

        let plain = client(Profile::new("myorg", "https://conjur.example.com"));
        assert_eq!(plain.authn_segments(), vec!["authn", "myorg"]);
    }

    #[test]
    fn qualify_keeps_full_ids() {
        let client = client(Profile::new("myorg", "https://conjur.example.com"));
        assert_eq!(client.qualify("host", "app"), "myorg:host:app");
        assert_eq!(client.qualify("host", "other:host:app"), "other:host:app");
    }

    #[test]
    fn resource_ids_with_and_without_account() {
        assert_eq!(
            split_resource_id("acct:variable:db:pass", "myorg").unwrap(),
            ("acct", "variable", "db:pass")
        );
        assert_eq!(
            split_resource_id("variable:secret", "myorg").unwrap(),
            ("myorg", "variable", "secret")
        );
        assert!(split_resource_id("secret", "myorg").is_err());
    }

    #[tokio::test]
    async fn unauthenticated_client_reports_not_logged_in() {
        let client = client(Profile::new("myorg", "https://conjur.example.com"));
        let err = client.retrieve_secret("db/password").await.unwrap_err();
        assert!(matches!(err, Error::NotLoggedIn));
    }
}
