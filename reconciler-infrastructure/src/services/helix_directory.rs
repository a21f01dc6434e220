use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use reconciler_domain::{DirectoryUser, IdentityConfig, IdentityDirectory};

use crate::utils::parse_rfc3339_millis;

/// Tokens are refreshed this long before the provider says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    login: String,
    #[serde(default)]
    display_name: String,
    #[serde(default, rename = "type")]
    user_type: String,
    #[serde(default)]
    broadcaster_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    created_at: String,
}

impl TryFrom<HelixUser> for DirectoryUser {
    type Error = anyhow::Error;

    fn try_from(user: HelixUser) -> Result<Self> {
        let id = user
            .id
            .parse::<i64>()
            .map_err(|err| anyhow!("non-numeric user id '{}': {}", user.id, err))?;
        let created_at_epoch_millis = if user.created_at.is_empty() {
            0
        } else {
            parse_rfc3339_millis(&user.created_at)?
        };
        Ok(DirectoryUser {
            id,
            login: user.login,
            display_name: user.display_name,
            user_type: user.user_type,
            broadcaster_type: user.broadcaster_type,
            description: user.description,
            created_at_epoch_millis,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

pub struct HelixDirectory {
    client: Client,
    config: IdentityConfig,
    token: RwLock<Option<CachedToken>>,
}

impl HelixDirectory {
    pub fn new(config: IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
            .build()?;
        let token = config.access_token.clone().map(|value| CachedToken {
            value,
            expires_at: None,
        });
        Ok(Self {
            client,
            config,
            token: RwLock::new(token),
        })
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }
        let fresh = self.request_app_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn request_app_token(&self) -> Result<CachedToken> {
        let secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or_else(|| anyhow!("identity directory client secret not configured"))?;
        let response: TokenResponse = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(expires_in = response.expires_in, "obtained app access token");

        let expires_at = (response.expires_in > 0).then(|| {
            Instant::now() + Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN)
        });
        Ok(CachedToken {
            value: response.access_token,
            expires_at,
        })
    }

    async fn invalidate_token(&self) {
        if self.config.client_secret.is_some() {
            *self.token.write().await = None;
        }
    }

    async fn fetch_users(&self, logins: &[String], token: &str) -> Result<reqwest::Response> {
        let query: Vec<(&str, &str)> = logins.iter().map(|login| ("login", login.as_str())).collect();
        let response = self
            .client
            .get(format!("{}/users", self.config.helix_base_url))
            .header("Client-Id", &self.config.client_id)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl IdentityDirectory for HelixDirectory {
    async fn lookup_users(&self, logins: &[String]) -> Result<Vec<DirectoryUser>> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.access_token().await?;
        let mut response = self.fetch_users(logins, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.config.client_secret.is_some() {
            warn!("identity directory rejected access token, refreshing");
            self.invalidate_token().await;
            let token = self.access_token().await?;
            response = self.fetch_users(logins, &token).await?;
        }

        let body: UsersResponse = response.error_for_status()?.json().await?;
        parse_users(body)
    }
}

fn parse_users(body: UsersResponse) -> Result<Vec<DirectoryUser>> {
    body.data.into_iter().map(DirectoryUser::try_from).collect()
}
