//! HTTP implementation of [`RemoteResources`].

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::remote::RemoteResources;
use async_trait::async_trait;
use focuspond_types::{
    AccountId, CreatureId, CreatureImages, Currency, OwnedCreatures, PondCreatures,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct AmountBody {
    amount: i64,
}

#[derive(Serialize)]
struct CreatureBody {
    fish_id: CreatureId,
}

#[derive(Serialize)]
struct MinutesBody {
    minutes: u32,
}

/// Talks to the backend's JSON API.
pub struct HttpResourceClient {
    config: ClientConfig,
    client: Client,
}

impl HttpResourceClient {
    /// Creates a client; fails only if the TLS backend cannot initialise.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str, account: Option<AccountId>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match account {
            Some(id) => builder.header(self.config.account_header.as_str(), id.to_string()),
            None => builder,
        }
    }

    /// Sends a request and turns transport errors and non-2xx answers into
    /// `ClientError`s.
    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.config.timeout())
            } else {
                ClientError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        account: Option<AccountId>,
    ) -> ClientResult<T> {
        let response = self.send(self.request(Method::GET, path, account)).await?;
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.config.timeout())
            } else {
                ClientError::Http(e)
            }
        })?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        account: Option<AccountId>,
        body: &B,
    ) -> ClientResult<()> {
        debug!("{} {}", method, path);
        self.send(self.request(method, path, account).json(body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteResources for HttpResourceClient {
    async fn get_currency(&self, account: Option<AccountId>) -> ClientResult<Currency> {
        self.get_json("/currency", account).await
    }

    async fn set_currency(&self, account: Option<AccountId>, amount: i64) -> ClientResult<()> {
        self.send_json(Method::PUT, "/currency", account, &AmountBody { amount })
            .await
    }

    async fn get_owned_creatures(&self, account: Option<AccountId>) -> ClientResult<OwnedCreatures> {
        self.get_json("/owned-fish", account).await
    }

    async fn add_owned_creature(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()> {
        self.send_json(
            Method::POST,
            "/owned-fish",
            account,
            &CreatureBody {
                fish_id: creature_id,
            },
        )
        .await
    }

    async fn add_study_minutes(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
        minutes: u32,
    ) -> ClientResult<()> {
        let path = format!("/owned-fish/{creature_id}/study-time");
        self.send_json(Method::PUT, &path, account, &MinutesBody { minutes })
            .await
    }

    async fn reset_progress(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()> {
        let path = format!("/owned-fish/{creature_id}");
        debug!("DELETE {}", path);
        self.send(self.request(Method::DELETE, &path, account))
            .await?;
        Ok(())
    }

    async fn get_pond_creatures(&self, account: Option<AccountId>) -> ClientResult<PondCreatures> {
        self.get_json("/pond-fish", account).await
    }

    async fn add_to_pond(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()> {
        self.send_json(
            Method::POST,
            "/pond-fish",
            account,
            &CreatureBody {
                fish_id: creature_id,
            },
        )
        .await
    }

    async fn get_creature_images(&self, account: Option<AccountId>) -> ClientResult<CreatureImages> {
        self.get_json("/fish-images", account).await
    }

    async fn check_health(&self) -> ClientResult<()> {
        let response = self
            .send(self.request(Method::GET, "/health", None))
            .await?;
        // Any other 2xx (e.g. 204 from a proxy) does not prove the API is up.
        if response.status().as_u16() != 200 {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }
        Ok(())
    }
}
