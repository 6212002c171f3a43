//! Downstream middleware client
//!
//! The narrow surface the lifecycle engine needs from the IPTV middleware:
//! list/create/update/delete channels and list candidate streams. Kept as a
//! trait so reconciliation and the engine test against a mock, with the
//! HTTP implementation speaking the middleware's JSON API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::LifecycleError;
use crate::models::Stream;

/// A channel as the middleware reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareChannel {
    pub id: i64,
    pub tvg_id: Option<String>,
    pub name: String,
    pub logo_url: Option<String>,
    pub group_id: Option<i64>,
    pub stream_ids: Vec<i64>,
}

/// What we ask the middleware to create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub tvg_id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub group_id: Option<i64>,
    pub stream_ids: Vec<i64>,
}

/// Partial update; None fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelPatch {
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub stream_ids: Option<Vec<i64>>,
}

#[async_trait]
pub trait ChannelMiddleware: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<MiddlewareChannel>, LifecycleError>;

    async fn create_channel(
        &self,
        spec: ChannelSpec,
    ) -> Result<MiddlewareChannel, LifecycleError>;

    async fn update_channel(
        &self,
        id: i64,
        patch: ChannelPatch,
    ) -> Result<MiddlewareChannel, LifecycleError>;

    async fn delete_channel(&self, id: i64) -> Result<(), LifecycleError>;

    async fn list_streams(&self, filter: Option<&str>) -> Result<Vec<Stream>, LifecycleError>;
}

/// HTTP implementation against the middleware's REST API
pub struct HttpMiddleware {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpMiddleware {
    pub fn new(base_url: String, api_token: Option<String>, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        // Normalize through Url so "host:port/path/" and "host:port/path"
        // configure the same endpoint
        let base_url = url::Url::parse(&base_url)
            .map(|parsed| parsed.to_string())
            .unwrap_or(base_url);
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn map_error(operation: &str, err: impl std::fmt::Display) -> LifecycleError {
        LifecycleError::Middleware {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    fn parse_channel(value: &serde_json::Value) -> Option<MiddlewareChannel> {
        Some(MiddlewareChannel {
            id: value.get("id")?.as_i64()?,
            tvg_id: value
                .get("tvg_id")
                .and_then(|v| v.as_str())
                .map(String::from),
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            logo_url: value
                .get("logo_url")
                .and_then(|v| v.as_str())
                .map(String::from),
            group_id: value.get("channel_group_id").and_then(|v| v.as_i64()),
            stream_ids: value
                .get("streams")
                .and_then(|v| v.as_array())
                .map(|streams| {
                    streams
                        .iter()
                        .filter_map(|s| s.as_i64().or_else(|| s.get("id")?.as_i64()))
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ChannelMiddleware for HttpMiddleware {
    async fn list_channels(&self) -> Result<Vec<MiddlewareChannel>, LifecycleError> {
        let response = self
            .request(reqwest::Method::GET, "/api/channels/")
            .send()
            .await
            .map_err(|err| Self::map_error("list_channels", err))?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|err| Self::map_error("list_channels", err))?;

        let list = value
            .as_array()
            .or_else(|| value.get("results").and_then(|v| v.as_array()))
            .cloned()
            .unwrap_or_default();
        Ok(list.iter().filter_map(Self::parse_channel).collect())
    }

    async fn create_channel(
        &self,
        spec: ChannelSpec,
    ) -> Result<MiddlewareChannel, LifecycleError> {
        let body = json!({
            "name": spec.name,
            "tvg_id": spec.tvg_id,
            "logo_url": spec.logo_url,
            "channel_group_id": spec.group_id,
            "streams": spec.stream_ids,
        });
        let response = self
            .request(reqwest::Method::POST, "/api/channels/")
            .json(&body)
            .send()
            .await
            .map_err(|err| Self::map_error("create_channel", err))?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|err| Self::map_error("create_channel", err))?;
        Self::parse_channel(&value).ok_or_else(|| {
            Self::map_error("create_channel", "response missing channel id")
        })
    }

    async fn update_channel(
        &self,
        id: i64,
        patch: ChannelPatch,
    ) -> Result<MiddlewareChannel, LifecycleError> {
        let mut body = serde_json::Map::new();
        if let Some(name) = patch.name {
            body.insert("name".to_string(), json!(name));
        }
        if let Some(logo_url) = patch.logo_url {
            body.insert("logo_url".to_string(), json!(logo_url));
        }
        if let Some(stream_ids) = patch.stream_ids {
            body.insert("streams".to_string(), json!(stream_ids));
        }
        let response = self
            .request(reqwest::Method::PATCH, &format!("/api/channels/{id}/"))
            .json(&serde_json::Value::Object(body))
            .send()
            .await
            .map_err(|err| Self::map_error("update_channel", err))?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|err| Self::map_error("update_channel", err))?;
        Self::parse_channel(&value)
            .ok_or_else(|| Self::map_error("update_channel", "response missing channel id"))
    }

    async fn delete_channel(&self, id: i64) -> Result<(), LifecycleError> {
        self.request(reqwest::Method::DELETE, &format!("/api/channels/{id}/"))
            .send()
            .await
            .map_err(|err| Self::map_error("delete_channel", err))?;
        Ok(())
    }

    async fn list_streams(&self, filter: Option<&str>) -> Result<Vec<Stream>, LifecycleError> {
        let path = match filter {
            Some(filter) => format!("/api/streams/?search={}", urlencoding::encode(filter)),
            None => "/api/streams/".to_string(),
        };
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|err| Self::map_error("list_streams", err))?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|err| Self::map_error("list_streams", err))?;

        let list = value
            .as_array()
            .or_else(|| value.get("results").and_then(|v| v.as_array()))
            .cloned()
            .unwrap_or_default();
        Ok(list
            .iter()
            .filter_map(|raw| {
                Some(Stream {
                    id: raw.get("id")?.as_i64()?,
                    name: raw
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    m3u_account: raw
                        .get("m3u_account")
                        .and_then(|v| v.get("name"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                })
            })
            .collect())
    }
}

/// Middleware stub used when no downstream is configured
///
/// Listing succeeds empty so maintenance tasks keep running; mutations fail
/// so misconfiguration is visible in sync status instead of silent.
pub struct NoopMiddleware;

#[async_trait]
impl ChannelMiddleware for NoopMiddleware {
    async fn list_channels(&self) -> Result<Vec<MiddlewareChannel>, LifecycleError> {
        Ok(Vec::new())
    }

    async fn create_channel(
        &self,
        _spec: ChannelSpec,
    ) -> Result<MiddlewareChannel, LifecycleError> {
        Err(LifecycleError::Middleware {
            operation: "create_channel".to_string(),
            message: "no middleware configured".to_string(),
        })
    }

    async fn update_channel(
        &self,
        _id: i64,
        _patch: ChannelPatch,
    ) -> Result<MiddlewareChannel, LifecycleError> {
        Err(LifecycleError::Middleware {
            operation: "update_channel".to_string(),
            message: "no middleware configured".to_string(),
        })
    }

    async fn delete_channel(&self, _id: i64) -> Result<(), LifecycleError> {
        Ok(())
    }

    async fn list_streams(&self, _filter: Option<&str>) -> Result<Vec<Stream>, LifecycleError> {
        Ok(Vec::new())
    }
}

/// In-memory middleware for tests and dry runs
#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockMiddleware {
        next_id: AtomicI64,
        pub channels: Mutex<HashMap<i64, MiddlewareChannel>>,
        pub streams: Mutex<Vec<Stream>>,
    }

    impl MockMiddleware {
        pub fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ChannelMiddleware for MockMiddleware {
        async fn list_channels(&self) -> Result<Vec<MiddlewareChannel>, LifecycleError> {
            Ok(self
                .channels
                .lock()
                .expect("mock lock poisoned")
                .values()
                .cloned()
                .collect())
        }

        async fn create_channel(
            &self,
            spec: ChannelSpec,
        ) -> Result<MiddlewareChannel, LifecycleError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let channel = MiddlewareChannel {
                id,
                tvg_id: Some(spec.tvg_id),
                name: spec.name,
                logo_url: spec.logo_url,
                group_id: spec.group_id,
                stream_ids: spec.stream_ids,
            };
            self.channels
                .lock()
                .expect("mock lock poisoned")
                .insert(id, channel.clone());
            Ok(channel)
        }

        async fn update_channel(
            &self,
            id: i64,
            patch: ChannelPatch,
        ) -> Result<MiddlewareChannel, LifecycleError> {
            let mut channels = self.channels.lock().expect("mock lock poisoned");
            let channel = channels.get_mut(&id).ok_or(LifecycleError::Middleware {
                operation: "update_channel".to_string(),
                message: format!("channel {id} not found"),
            })?;
            if let Some(name) = patch.name {
                channel.name = name;
            }
            if let Some(logo_url) = patch.logo_url {
                channel.logo_url = Some(logo_url);
            }
            if let Some(stream_ids) = patch.stream_ids {
                channel.stream_ids = stream_ids;
            }
            Ok(channel.clone())
        }

        async fn delete_channel(&self, id: i64) -> Result<(), LifecycleError> {
            self.channels
                .lock()
                .expect("mock lock poisoned")
                .remove(&id);
            Ok(())
        }

        async fn list_streams(
            &self,
            _filter: Option<&str>,
        ) -> Result<Vec<Stream>, LifecycleError> {
            Ok(self.streams.lock().expect("mock lock poisoned").clone())
        }
    }
}
