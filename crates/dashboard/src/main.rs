use std::sync::Arc;

use anyhow::Context;
use binwatch_api::{AiClient, ApiClient};
use binwatch_core::sensor::{format_value, SensorReading};
use binwatch_dashboard::views::{BinMap, DeviceManager, NodeStatus, PredictionBoard, SensorFeed, SensorHistory};
use binwatch_dashboard::{AuthFlow, ChannelSettings, ChannelSupervisor, DashboardConfig, Navigator, Screen};
use binwatch_session::{FileStore, SessionStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Measurements printed for each live reading, in display order.
const PRINTED_KEYS: [&str; 5] = ["distance", "gas", "temperature", "humidity", "is_detected_human"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "binwatch_dashboard=info,binwatch_live=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = DashboardConfig::from_env()?;
    tracing::info!(api = %config.api_base_url, ws = %config.ws_url, "Loaded dashboard configuration");

    // --- Session ---
    let storage = FileStore::open(&config.storage_path)
        .with_context(|| format!("Failed to open session file {}", config.storage_path.display()))?;
    let session = SessionStore::new(Arc::new(storage));
    session.load_from_storage();

    let api = ApiClient::with_timeout(
        config.api_base_url.clone(),
        config.request_timeout,
        Arc::new(session.clone()),
    )?;
    let auth = AuthFlow::new(Arc::new(api.clone()), session.clone());
    let mut nav = Navigator::new(session.clone());

    if nav.current() == Screen::Login {
        let username = std::env::var("BINWATCH_USERNAME")
            .context("Not logged in and BINWATCH_USERNAME is not set")?;
        let password = std::env::var("BINWATCH_PASSWORD")
            .context("Not logged in and BINWATCH_PASSWORD is not set")?;
        auth.login(&username, &password).await?;
        nav.go(Screen::Dashboard);
    }

    // --- Live channel ---
    let supervisor = ChannelSupervisor::spawn(&session, ChannelSettings::from_config(&config));

    // --- Devices ---
    let mut devices = DeviceManager::new(api.clone());
    if let Err(e) = devices.load().await {
        nav.handle_error(&e);
        supervisor.shutdown().await;
        return Err(e.into());
    }
    if let Some(connected) = devices.broker_connected() {
        tracing::info!(connected, "Broker status");
    }
    let Some(device) = devices.first_active().map(|d| d.mqtt_username.clone()) else {
        supervisor.shutdown().await;
        anyhow::bail!("No active MQTT devices are registered");
    };

    // --- Bin map and predictions ---
    let map = BinMap::new(api.clone(), config.map_center);
    if let Err(e) = map.refresh().await {
        tracing::warn!(error = %e, "Initial bin map load failed");
    }
    let ai = AiClient::with_timeout(config.ai_base_url.clone(), config.request_timeout)?;
    let mut predictions = PredictionBoard::new(ai);
    predictions.set_nodes(map.bins().iter().map(NodeStatus::from_record).collect());
    let predicted = predictions.refresh().await;
    let urgency = predictions.counts();
    tracing::info!(
        predicted,
        critical = urgency.critical,
        high = urgency.high,
        medium = urgency.medium,
        low = urgency.low,
        pending = urgency.pending,
        "Fill predictions loaded",
    );

    // --- Polling ---
    let poller = map.start_polling(config.latest_poll_interval);
    let mut poll_errors = poller.watch_errors();
    let history = SensorHistory::new(api.clone());
    let history_poller = history.start_polling(config.history_poll_interval);
    let mut history_errors = history_poller.watch_errors();

    // --- Live feed ---
    let mut feed = SensorFeed::new(device);
    let mut channels = supervisor.watch();
    let initial = channels.borrow_and_update().clone();
    if let Some(channel) = initial {
        feed.attach(&channel);
    }
    let mut updates = feed.updates();
    tracing::info!(topic = %feed.topic(), "Watching live readings; press Ctrl-C to stop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
            changed = channels.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = channels.borrow_and_update().clone();
                match current {
                    Some(channel) => feed.attach(&channel),
                    None => feed.detach(),
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(reading) = feed.latest() {
                    map.apply_reading(&reading);
                    print_reading(&reading);
                    let counts = map.counts();
                    println!(
                        "  bins: {} total, {} full, {} almost full, {} empty",
                        counts.total, counts.full, counts.almost_full, counts.empty
                    );
                }
            }
            changed = poll_errors.changed() => {
                if changed.is_err() {
                    break;
                }
                let error = poll_errors.borrow_and_update().clone();
                if let Some(error) = error {
                    if nav.handle_error(&error) == Screen::Login {
                        tracing::warn!("Session expired; log in again to continue");
                        break;
                    }
                    tracing::warn!(error = %error, "Bin map refresh failed");
                }
            }
            changed = history_errors.changed() => {
                if changed.is_err() {
                    break;
                }
                let error = history_errors.borrow_and_update().clone();
                match error {
                    Some(error) => {
                        if nav.handle_error(&error) == Screen::Login {
                            tracing::warn!("Session expired; log in again to continue");
                            break;
                        }
                        tracing::warn!(error = %error, "Sensor history refresh failed");
                    }
                    None => {
                        let summary = history.summary();
                        tracing::debug!(
                            records = summary.records,
                            average_fill = summary.average_fill,
                            "Sensor history recovered",
                        );
                    }
                }
            }
        }
    }

    feed.detach();
    poller.shutdown().await;
    history_poller.shutdown().await;
    supervisor.shutdown().await;
    Ok(())
}

fn print_reading(reading: &SensorReading) {
    let node = reading.values.node.as_deref().unwrap_or("?");
    let fill = reading
        .fill_level()
        .map(|pct| format!("{pct}%"))
        .unwrap_or_else(|| "-".into());
    let values: Vec<String> = PRINTED_KEYS
        .iter()
        .filter_map(|key| reading.value(key).map(|v| format!("{key}={}", format_value(key, &v))))
        .collect();
    println!(
        "[{}] {node} fill={fill} {}",
        reading.received_at.format("%H:%M:%S"),
        values.join(" ")
    );
}
