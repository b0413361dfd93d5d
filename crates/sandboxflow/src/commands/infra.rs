use super::{print_json, read_input};
use sandboxflow_cloud::{CloudProviderService, DriverRequest};
use std::path::Path;

pub async fn prepare(
    service: &CloudProviderService,
    reservation: &str,
    input: Option<&Path>,
) -> anyhow::Result<()> {
    let request = DriverRequest::parse(&read_input(input).await?)?;
    let response = service.prepare_infra(reservation, request).await?;

    let failed = response
        .driver_response
        .action_results
        .iter()
        .filter(|r| !r.success)
        .count();
    if failed > 0 {
        tracing::warn!("{} action(s) failed for reservation {}", failed, reservation);
    }

    print_json(&response)
}

pub async fn cleanup(
    service: &CloudProviderService,
    reservation: &str,
    input: Option<&Path>,
) -> anyhow::Result<()> {
    let request = DriverRequest::parse(&read_input(input).await?)?;
    let response = service.cleanup_infra(reservation, request).await?;
    print_json(&response)
}
