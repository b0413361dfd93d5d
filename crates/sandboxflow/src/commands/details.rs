use super::{print_json, read_input};
use crate::session::ConsoleSession;
use sandboxflow_cloud::{CloudProviderService, RecordedAddresses, VmDetails};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `{"items": [{"deployedAppJson": {"name": ...}}]}`
#[derive(Debug, Deserialize)]
struct VmDetailsRequest {
    #[serde(default)]
    items: Vec<VmDetailsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VmDetailsItem {
    deployed_app_json: DeployedApp,
}

#[derive(Debug, Deserialize)]
struct DeployedApp {
    name: String,
}

#[derive(Debug, Serialize)]
struct VmDetailsResponse {
    items: Vec<VmDetails>,
}

pub async fn vm_details(service: &CloudProviderService, input: Option<&Path>) -> anyhow::Result<()> {
    let request: VmDetailsRequest = serde_json::from_str(&read_input(input).await?)?;
    let names: Vec<String> = request
        .items
        .into_iter()
        .map(|item| item.deployed_app_json.name)
        .collect();

    let items = service.vm_details(&names).await?;
    print_json(&VmDetailsResponse { items })
}

pub async fn refresh_ip(
    service: &CloudProviderService,
    name: &str,
    private_ip: String,
    public_ip: String,
    ip_regex: Option<&str>,
) -> anyhow::Result<()> {
    let recorded = RecordedAddresses {
        private_ip,
        public_ip,
    };
    let outcome = service
        .refresh_ip(&ConsoleSession, name, &recorded, ip_regex)
        .await?;

    if !outcome.private_updated && !outcome.public_updated {
        tracing::info!("Addresses of {} are up to date", name);
    }
    Ok(())
}
