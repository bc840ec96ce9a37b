//! Access tokens for the remote store.
//!
//! Credentials are supplied by the caller; nothing here stores or prompts
//! for secrets.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::Future;
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse,
    TokenResponse, TokenUrl,
};
pub use oauth2::AccessToken;
use tokio::sync::RwLock;

use crate::{auth_error, Result};

/// Default Azure AD authority
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Resource the data lake tokens are issued for
pub const DATALAKE_RESOURCE: &str = "https://datalake.azure.net/";

pub trait GetToken: Send + Sync + 'static {
    fn get_token(&self) -> impl Future<Output = Result<AccessToken>> + Send;
}

/// A token obtained out of band
#[derive(Debug, Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(AccessToken::new(token.into()))
    }
}

impl GetToken for StaticToken {
    async fn get_token(&self) -> Result<AccessToken> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug)]
struct CachedToken {
    access_token: AccessToken,
    expiration: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        // a minute of margin, tokens are short lived anyway
        match self.expiration {
            Some(exp) => Utc::now() + chrono::Duration::seconds(60) < exp,
            None => true,
        }
    }
}

#[derive(Debug)]
struct Inner {
    cache: RwLock<Option<CachedToken>>,
    http: reqwest::Client,
    oauth2: BasicClient,
}

/// Service principal authentication (client credentials grant)
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    inner: Arc<Inner>,
}

impl ClientCredentials {
    pub fn new(
        credentials: Credentials,
        authority_host: Option<&str>,
        http: Option<reqwest::Client>,
    ) -> Result<Self> {
        let host = authority_host.unwrap_or(AUTHORITY_HOST).trim_end_matches('/');
        let tenant = &credentials.tenant_id;
        let auth_url = AuthUrl::new(format!("{host}/{tenant}/oauth2/authorize"))
            .map_err(|err| auth_error!("invalid authority: {err}"))?;
        let token_url = TokenUrl::new(format!("{host}/{tenant}/oauth2/token"))
            .map_err(|err| auth_error!("invalid authority: {err}"))?;

        let oauth2 = BasicClient::new(
            ClientId::new(credentials.client_id),
            Some(ClientSecret::new(credentials.client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody);
        let http = http.unwrap_or_default();

        Ok(Self {
            inner: Arc::new(Inner {
                cache: RwLock::new(None),
                http,
                oauth2,
            }),
        })
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        log::info!("requesting data lake access token");
        let token_response = self
            .inner
            .oauth2
            .exchange_client_credentials()
            .add_extra_param("resource", DATALAKE_RESOURCE)
            .request_async(|req| self.http(req))
            .await
            .map_err(|err| auth_error!("token request failed: {err}"))?;

        let expiration = token_response
            .expires_in()
            .and_then(|exp| chrono::Duration::from_std(exp).ok())
            .map(|exp| Utc::now() + exp);
        Ok(CachedToken {
            access_token: token_response.access_token().to_owned(),
            expiration,
        })
    }

    async fn http(&self, req: HttpRequest) -> reqwest::Result<HttpResponse> {
        let method = req.method.clone();
        let url = req.url.clone();

        let resp = self
            .inner
            .http
            .request(req.method, req.url)
            .headers(req.headers)
            .body(req.body)
            .send()
            .await?;

        let status_code = resp.status();
        let headers = resp.headers().to_owned();
        let body = resp.bytes().await?.to_vec();

        if !status_code.is_success() {
            log::error!("{method} {url} received error {status_code}");
            if let Ok(body) = std::str::from_utf8(&body) {
                log::debug!("{body}");
            }
        }

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}

impl GetToken for ClientCredentials {
    async fn get_token(&self) -> Result<AccessToken> {
        {
            let cache = self.inner.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.access_token.clone());
            }
        }
        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *self.inner.cache.write().await = Some(fresh);
        Ok(access_token)
    }
}
