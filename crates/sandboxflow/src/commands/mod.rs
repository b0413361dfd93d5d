pub mod check;
pub mod deploy;
pub mod details;
pub mod infra;

use crate::GlobalArgs;
use anyhow::Context;
use sandboxflow_cloud::{CloudProviderService, PollConfig, ProvisionerSettings, ServiceOptions};
use sandboxflow_cloud_gcp::GceClient;
use sandboxflow_config::SettingsOverrides;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Load settings, build the API client and wire Ctrl-C to cancellation
pub async fn connect(global: &GlobalArgs) -> anyhow::Result<CloudProviderService> {
    let settings = sandboxflow_config::load_settings(
        global.config.as_deref(),
        SettingsOverrides {
            project: global.project.clone(),
            credentials_path: global.credentials.clone(),
            region: global.region.clone(),
            zone: global.zone.clone(),
        },
    )?;
    tracing::debug!("Settings: {:?}", settings);

    let credentials = settings
        .credentials_path
        .as_deref()
        .context("credentials_path is not set")?;
    let mut client = GceClient::from_credentials_file(credentials, settings.project.clone())
        .await
        .with_context(|| format!("Failed to load credentials from {}", credentials.display()))?;
    if let Some(base) = &settings.api_base {
        client = client.with_api_base(base.clone());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, aborting outstanding operation waits");
            on_signal.cancel();
        }
    });

    let options = ServiceOptions {
        settings: ProvisionerSettings {
            region: settings.region.clone(),
            zone: settings.zone.clone(),
            routing_mode: settings.routing_mode.clone(),
        },
        poll: PollConfig {
            interval: settings.poll_interval(),
            max_wait: settings.max_wait(),
        },
        access_key_path: settings.access_key_path.clone(),
    };

    Ok(CloudProviderService::with_cancellation(
        Arc::new(client),
        options,
        cancel,
    ))
}

/// Request body from `input`, or stdin when absent
pub async fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read request from stdin")?;
            Ok(buf)
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
