//! MQTT device credentials.

use binwatch_api::mqtt::{MqttCredentials, MqttCredentialsRequest, MqttCredentialsUpdate};
use binwatch_api::{ApiClient, ApiError};
use binwatch_core::validation::{validate_mqtt_credentials, MqttCredentialsForm};
use serde_json::Value;

use crate::error::ViewError;

/// Lists active devices and the broker status, and runs the device CRUD
/// actions. Every action leaves its outcome in `notice` or `error`.
pub struct DeviceManager {
    api: ApiClient,
    devices: Vec<MqttCredentials>,
    broker_connected: Option<bool>,
    notice: Option<String>,
    error: Option<ViewError>,
}

impl DeviceManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            devices: Vec::new(),
            broker_connected: None,
            notice: None,
            error: None,
        }
    }

    /// Fetch the device list and broker status together.
    pub async fn load(&mut self) -> Result<(), ViewError> {
        let mqtt = self.api.mqtt();
        let (devices, status) = tokio::join!(mqtt.list_active(), mqtt.broker_status());
        let devices = self.check(devices, "Failed to load devices")?;
        self.devices = devices;

        // The status endpoint is informational; a failure there only hides
        // the indicator.
        self.broker_connected = match status {
            Ok(doc) => doc.get("isConnected").and_then(Value::as_bool),
            Err(e) if e.is_unauthorized() => return Err(self.fail(&e, "")),
            Err(e) => {
                tracing::warn!(error = %e, "Broker status unavailable");
                None
            }
        };
        self.error = None;
        Ok(())
    }

    /// Validate and register a device, then add it to the list.
    pub async fn register(&mut self, form: &MqttCredentialsForm) -> Result<(), ViewError> {
        if let Err(e) = validate_mqtt_credentials(form) {
            let err = ViewError::from(e);
            self.error = Some(err.clone());
            return Err(err);
        }
        let request = MqttCredentialsRequest {
            mqtt_username: form.mqtt_username.trim().to_string(),
            mqtt_password: form.mqtt_password.clone(),
            broker_url: form.broker_url.trim().to_string(),
        };
        let result = self.api.mqtt().register(&request).await;
        let device = self.check(result, "Failed to register device")?;
        tracing::info!(device = %device.mqtt_username, "Device registered");
        self.notice = Some(format!("Device {} registered", device.mqtt_username));
        self.devices.push(device);
        Ok(())
    }

    pub async fn change_password(&mut self, id: &str, password: &str) -> Result<(), ViewError> {
        if password.is_empty() {
            let err = ViewError::Validation("MQTT password is required".into());
            self.error = Some(err.clone());
            return Err(err);
        }
        let update = MqttCredentialsUpdate {
            mqtt_password: Some(password.to_string()),
            ..Default::default()
        };
        let result = self.api.mqtt().update(id, &update).await;
        let updated = self.check(result, "Failed to update device")?;
        self.notice = Some(format!("Password changed for {}", updated.mqtt_username));
        self.replace(updated);
        Ok(())
    }

    /// Deactivated devices drop out of the active list.
    pub async fn deactivate(&mut self, id: &str) -> Result<(), ViewError> {
        let result = self.api.mqtt().deactivate(id).await;
        let ack = self.check(result, "Failed to deactivate device")?;
        self.devices.retain(|d| d.id != id);
        self.notice = Some(ack.message);
        Ok(())
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ViewError> {
        let result = self.api.mqtt().delete(id).await;
        let ack = self.check(result, "Failed to delete device")?;
        self.devices.retain(|d| d.id != id);
        self.notice = Some(ack.message);
        Ok(())
    }

    /// Send a command through the backend's broker bridge.
    pub async fn publish(&mut self, topic: &str, message: &str) -> Result<(), ViewError> {
        if topic.trim().is_empty() {
            let err = ViewError::Validation("Topic is required".into());
            self.error = Some(err.clone());
            return Err(err);
        }
        let result = self.api.mqtt().publish(topic, message, None).await;
        let ack = self.check(result, "Failed to publish message")?;
        self.notice = Some(ack.message);
        Ok(())
    }

    pub fn devices(&self) -> &[MqttCredentials] {
        &self.devices
    }

    /// First active device, used as the default live feed.
    pub fn first_active(&self) -> Option<&MqttCredentials> {
        self.devices.iter().find(|d| d.is_active)
    }

    pub fn broker_connected(&self) -> Option<bool> {
        self.broker_connected
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn error(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.notice = None;
        self.error = None;
    }

    fn replace(&mut self, device: MqttCredentials) {
        match self.devices.iter_mut().find(|d| d.id == device.id) {
            Some(slot) => *slot = device,
            None => self.devices.push(device),
        }
    }

    fn check<T>(&mut self, result: Result<T, ApiError>, fallback: &str) -> Result<T, ViewError> {
        result.map_err(|e| self.fail(&e, fallback))
    }

    fn fail(&mut self, err: &ApiError, fallback: &str) -> ViewError {
        let view_err = ViewError::from_api(err, fallback);
        tracing::warn!(error = %err, "Device action failed");
        self.notice = None;
        self.error = Some(view_err.clone());
        view_err
    }
}
