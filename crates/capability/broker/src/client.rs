//! myStrom 云 API HTTP 客户端。

use crate::error::BrokerError;
use crate::models::{DevicesV1Response, DevicesV2Response};
use crate::tree::{build_tree, switches_from_v2};
use crate::{DeviceBroker, relay_action};
use async_trait::async_trait;
use domain::{Configuration, DeviceTree, SwitchNode};
use mystrom_filter::CompiledFilter;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

const AUTH_HEADER: &str = "Auth-Token";

/// 基于 reqwest 的厂商 API 客户端，跨配置共享连接池。
#[derive(Clone)]
pub struct HttpBroker {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBroker {
    pub fn new(base_url: &str) -> Result<Self, BrokerError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, BrokerError> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        config: &Configuration,
        path: &str,
    ) -> Result<T, BrokerError> {
        let url = self.base_url.join(path)?;
        debug!(target: "mystrom.broker", config_id = config.id, "GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .header(AUTH_HEADER, &config.api_key)
            .timeout(config.request_timeout())
            .send()
            .await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(BrokerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|err| BrokerError::Deserialization {
            message: err.to_string(),
            body,
        })
    }
}

#[async_trait]
impl DeviceBroker for HttpBroker {
    async fn fetch_devices(&self, config: &Configuration) -> Result<DeviceTree, BrokerError> {
        let filter = CompiledFilter::compile(&config.asset_filter)?;
        let response: DevicesV1Response = self.get_json(config, "api/devices").await?;
        if response.status != "ok" {
            return Err(BrokerError::Api(response.status));
        }
        build_tree(response.devices, &filter)
    }

    async fn fetch_data(&self, config: &Configuration) -> Result<Vec<SwitchNode>, BrokerError> {
        let response: DevicesV2Response = self.get_json(config, "api/v2/devices").await?;
        Ok(switches_from_v2(response.devices))
    }

    async fn set_relay(
        &self,
        config: &Configuration,
        device_id: &str,
        value: i64,
    ) -> Result<(), BrokerError> {
        let mut url = self.base_url.join("api/v2/device/")?;
        url.path_segments_mut()
            .map_err(|_| BrokerError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(device_id);
        let action = relay_action(value);
        debug!(
            target: "mystrom.broker",
            config_id = config.id,
            device_id,
            action,
            "POST {}",
            url
        );

        let resp = self
            .http
            .post(url.clone())
            .query(&[("action", action)])
            .header(AUTH_HEADER, &config.api_key)
            .timeout(config.request_timeout())
            .send()
            .await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(BrokerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }
}
