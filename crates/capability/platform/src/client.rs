//! 平台 HTTP 客户端。

use crate::error::PlatformError;
use crate::models::{AssetData, AssetDraft, AssetResponse, NotificationRequest, Translation, UserResponse};
use crate::{AssetRegistry, DataSink, Notifier};
use async_trait::async_trait;
use domain::AssetId;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

const API_KEY_HEADER: &str = "X-API-Key";

/// 基于 reqwest 的平台 API 客户端。
#[derive(Clone)]
pub struct HttpPlatform {
    http: reqwest::Client,
    base_url: Url,
    api_token: String,
}

impl HttpPlatform {
    pub fn new(base_url: &str, api_token: impl Into<String>) -> Result<Self, PlatformError> {
        Self::with_client(base_url, api_token, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: &str,
        api_token: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, PlatformError> {
        Ok(Self {
            http,
            base_url: normalize_base(base_url)?,
            api_token: api_token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        debug!(target: "mystrom.platform", "{} {}", method, url);
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_token)
    }

    async fn expect_success(
        url: &Url,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, PlatformError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(PlatformError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, PlatformError> {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|err| PlatformError::Deserialization {
            message: err.to_string(),
            body,
        })
    }
}

/// 基地址统一补尾部斜杠，保证 `join` 追加而非替换末段。
pub(crate) fn normalize_base(base_url: &str) -> Result<Url, PlatformError> {
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{base_url}/"))?)
    }
}

#[async_trait]
impl AssetRegistry for HttpPlatform {
    async fn upsert_asset(&self, draft: &AssetDraft) -> Result<Option<AssetId>, PlatformError> {
        let url = self.base_url.join("assets")?;
        let resp = self
            .request(reqwest::Method::PUT, url.clone())
            .json(draft)
            .send()
            .await?;
        let resp = Self::expect_success(&url, resp).await?;
        let asset: AssetResponse = Self::decode(resp).await?;
        Ok(asset.id)
    }
}

#[async_trait]
impl DataSink for HttpPlatform {
    async fn upsert_data(&self, data: &AssetData) -> Result<bool, PlatformError> {
        let url = self.base_url.join("data")?;
        let resp = self
            .request(reqwest::Method::PUT, url.clone())
            .json(data)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::expect_success(&url, resp).await?;
        Ok(true)
    }
}

#[async_trait]
impl Notifier for HttpPlatform {
    async fn notify_users(
        &self,
        project_id: &str,
        message: &Translation,
    ) -> Result<usize, PlatformError> {
        let users_url = self.base_url.join("users")?;
        let resp = self
            .request(reqwest::Method::GET, users_url.clone())
            .send()
            .await?;
        let resp = Self::expect_success(&users_url, resp).await?;
        let users: Vec<UserResponse> = Self::decode(resp).await?;

        let url = self.base_url.join("notifications")?;
        let mut sent = 0;
        for user in users.iter().filter(|user| !user.email.is_empty()) {
            let body = NotificationRequest {
                user: &user.email,
                project_id,
                message,
            };
            let resp = self
                .request(reqwest::Method::POST, url.clone())
                .json(&body)
                .send()
                .await?;
            Self::expect_success(&url, resp).await?;
            sent += 1;
        }
        Ok(sent)
    }
}
