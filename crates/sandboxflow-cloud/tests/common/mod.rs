use sandboxflow_cloud::testing::FakeCompute;
use sandboxflow_cloud::{CloudProviderService, DriverRequest, PollConfig, ServiceOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(1),
        max_wait: Some(Duration::from_secs(10)),
    }
}

pub fn service(fake: &Arc<FakeCompute>) -> CloudProviderService {
    service_with_key(fake, None)
}

pub fn service_with_key(fake: &Arc<FakeCompute>, key: Option<PathBuf>) -> CloudProviderService {
    CloudProviderService::new(
        fake.clone(),
        ServiceOptions {
            poll: fast_poll(),
            access_key_path: key,
            ..Default::default()
        },
    )
}

pub fn request(actions: serde_json::Value) -> DriverRequest {
    serde_json::from_value(serde_json::json!({
        "driverRequest": { "actions": actions }
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn custom_vm_action(app_name: &str, source: &str) -> serde_json::Value {
    let path = "Google Cloud Provider.Google Cloud Custom VM";
    serde_json::json!({
        "type": "deployApp",
        "actionId": "deploy-1",
        "actionParams": {
            "appName": app_name,
            "deployment": {
                "deploymentPath": path,
                "attributes": {
                    format!("{}.Image Project", path): "debian-cloud",
                    format!("{}.Image Id", path): "debian-12",
                    format!("{}.Image Source", path): source,
                    format!("{}.Machine Type", path): "e2-medium",
                    format!("{}.Disk Type", path): "Standard",
                    format!("{}.Disk Size", path): "10GB"
                }
            }
        }
    })
}

#[allow(dead_code)]
pub fn connect_action(id: &str, subnet: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "connectSubnet",
        "actionId": id,
        "actionParams": { "subnetId": subnet }
    })
}
