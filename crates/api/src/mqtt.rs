//! `/mqtt` endpoints: broker credentials for devices.

use binwatch_core::auth::MessageResponse;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{parse_response, ApiClient};
use crate::error::ApiError;

/// QoS used by `publish` when none is given.
pub const DEFAULT_QOS: u8 = 1;

/// Body of `POST /mqtt/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttCredentialsRequest {
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub broker_url: String,
}

/// Partial update for `PATCH /mqtt/{id}`. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttCredentialsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A registered device. The password is never returned.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttCredentials {
    pub id: String,
    pub mqtt_username: String,
    pub broker_url: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl MqttCredentials {
    /// Topic on which this device publishes sensor data.
    pub fn sensor_topic(&self) -> String {
        sensor_topic(&self.mqtt_username)
    }
}

/// `data/{device}/sensors`
pub fn sensor_topic(device: &str) -> String {
    format!("data/{device}/sensors")
}

pub struct MqttApi<'a> {
    client: &'a ApiClient,
}

impl<'a> MqttApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn register(&self, request: &MqttCredentialsRequest) -> Result<MqttCredentials, ApiError> {
        self.client.send_json(Method::POST, "/mqtt/register", request).await
    }

    pub async fn get(&self, id: &str) -> Result<MqttCredentials, ApiError> {
        self.client.get_json(&format!("/mqtt/{id}")).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<MqttCredentials, ApiError> {
        self.client.get_json(&format!("/mqtt/username/{username}")).await
    }

    pub async fn list_active(&self) -> Result<Vec<MqttCredentials>, ApiError> {
        self.client.get_json("/mqtt/active").await
    }

    pub async fn update(&self, id: &str, update: &MqttCredentialsUpdate) -> Result<MqttCredentials, ApiError> {
        self.client
            .send_json(Method::PATCH, &format!("/mqtt/{id}"), update)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.client.delete_json(&format!("/mqtt/{id}")).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.client
            .send_json(Method::POST, &format!("/mqtt/{id}/deactivate"), &serde_json::json!({}))
            .await
    }

    /// Publish `message` on `topic` through the backend's broker bridge.
    ///
    /// Parameters travel in the query string; `qos` defaults to
    /// [`DEFAULT_QOS`].
    pub async fn publish(&self, topic: &str, message: &str, qos: Option<u8>) -> Result<MessageResponse, ApiError> {
        let qos = qos.unwrap_or(DEFAULT_QOS).to_string();
        let response = self
            .client
            .request(Method::POST, "/mqtt/publish")
            .query(&[("topic", topic), ("message", message), ("qos", qos.as_str())])
            .send()
            .await?;
        parse_response(response).await
    }

    /// Free-form broker status document.
    pub async fn broker_status(&self) -> Result<Value, ApiError> {
        self.client.get_json("/mqtt/broker-status").await
    }
}
