use super::{print_json, read_input};
use sandboxflow_cloud::{CloudProviderService, DriverRequest};
use std::path::Path;

pub async fn deploy(service: &CloudProviderService, input: Option<&Path>) -> anyhow::Result<()> {
    let request = DriverRequest::parse(&read_input(input).await?)?;
    let response = service.deploy(request).await?;
    print_json(&response)
}

pub async fn delete_instance(service: &CloudProviderService, name: &str) -> anyhow::Result<()> {
    service.delete_instance(name).await?;
    tracing::info!("Deleted instance {}", name);
    Ok(())
}
