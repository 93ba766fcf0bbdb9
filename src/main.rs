// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Locker Companion demo.
//!
//! Scripted walk through the full session: permissions, radio, scan,
//! connect, device info, encryption, lock open, and log export.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use locker_companion::locker::SimConfig;
use locker_companion::{
    BluezGate, Config, ConnectionStatus, DeviceListPresenter, FixedGate, LockerService,
    LogJournal, PlatformGate, SessionController, SimulatedLocker, ValidationType,
};

/// How long the demo waits for a connectable locker to show up.
const SCAN_WINDOW: Duration = Duration::from_secs(10);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locker_companion=info".parse().unwrap()),
        )
        .init();

    info!(
        "Starting Locker Companion v{}...",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    // Session journal, shared with the locker service
    let journal = Arc::new(LogJournal::new());

    // Platform gate: real BlueZ adapter when reachable
    let gate: Arc<dyn PlatformGate> = match BluezGate::new().await {
        Ok(gate) => Arc::new(gate),
        Err(e) => {
            warn!("BlueZ unavailable ({e:#}), using built-in gate");
            Arc::new(FixedGate::new())
        }
    };

    // The locker service; the simulator stands in for the vendor SDK
    let locker: Arc<dyn LockerService> = Arc::new(SimulatedLocker::new(
        config.locker.clone(),
        SimConfig::default(),
        journal.clone(),
    ));

    let controller =
        SessionController::start(locker, gate, journal.clone(), config.operation_timeout());

    tokio::select! {
        result = run_demo(&controller, &config) => {
            if let Err(e) = result {
                error!("Demo flow failed: {e:#}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    controller.disconnect();
    controller.stop_scan();
    controller.shutdown();

    share_logs(&journal)?;
    info!("Locker Companion stopped");
    Ok(())
}

/// The demo sequence, mirroring the buttons of the vendor demo app.
async fn run_demo(controller: &SessionController, config: &Config) -> Result<()> {
    if !controller.request_permissions().await {
        warn!("Permissions not granted");
        return Ok(());
    }
    info!("Permissions: granted");

    if !controller.radio_enabled().await {
        info!("Bluetooth is off, requesting enable");
        controller.request_radio_enable().await?;
    }
    info!("Bluetooth: on");

    controller.start_scan().await?;
    info!("Scanning for lockers...");

    let mut nearby = controller.nearby_devices();
    let mut presenter = DeviceListPresenter::new();

    let deadline = tokio::time::Instant::now() + SCAN_WINDOW;
    let device = loop {
        match tokio::time::timeout_at(deadline, nearby.changed()).await {
            Ok(Ok(())) => {}
            // Service gone, or nothing connectable inside the window.
            Ok(Err(_)) | Err(_) => break None,
        }
        let snapshot = nearby.borrow_and_update().clone();
        let edits = presenter.apply(&snapshot);
        if !edits.is_empty() {
            render_device_list(&presenter);
        }
        if let Some(found) = presenter.devices().iter().find(|d| d.is_connectable) {
            break Some(found.clone());
        }
    };

    let Some(device) = device else {
        warn!("No connectable locker found");
        controller.stop_scan();
        return Ok(());
    };

    info!("Connecting to {}...", device.device_id);
    if let Err(e) = controller.connect(&device).await {
        warn!("Connect failed: {e}");
        controller.stop_scan();
        return Ok(());
    }
    info!(
        "Connected device: {} ({})",
        device.device_id,
        controller.connection_status().as_str()
    );

    let key = config.device_key()?;
    match controller
        .get_device_info(ValidationType::DeviceKey, &key)
        .await
    {
        Ok(device_info) => info!("Device info:\n{}", device_info),
        Err(e) => warn!("Device info: {e}"),
    }

    match controller.enable_encryption().await {
        Ok(()) => info!(
            "An encrypted connection has been established; \
             all subsequent data during transmission will be encrypted"
        ),
        Err(e) => warn!("Encryption: {e}"),
    }

    match controller.open_lock(config.demo.credential).await {
        Ok(()) => info!("Open lock: success"),
        Err(e) => warn!("Open lock: {e}"),
    }

    controller.disconnect();
    // The disconnected event lands asynchronously; let it settle before
    // tearing the session down.
    let settle = tokio::time::Instant::now() + Duration::from_millis(500);
    while controller.connection_status() != ConnectionStatus::Disconnected
        && tokio::time::Instant::now() < settle
    {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    controller.stop_scan();
    Ok(())
}

fn render_device_list(presenter: &DeviceListPresenter) {
    if !presenter.visible() {
        info!("Nearby lockers: none");
        return;
    }
    info!("Nearby lockers:");
    for device in presenter.devices() {
        info!("  {}", device);
    }
}

/// Export the session journal for sharing, like the demo app's share
/// button.
fn share_logs(journal: &LogJournal) -> Result<()> {
    if journal.is_empty() {
        return Ok(());
    }
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("locker-companion");
    std::fs::create_dir_all(&data_dir)?;

    let path = data_dir.join("session.log");
    std::fs::write(&path, journal.export())?;
    info!("Session log exported to {}", path.display());
    Ok(())
}
