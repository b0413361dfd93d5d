use colored::Colorize;
use sandboxflow_cloud::CloudProviderService;

pub async fn handle(service: &CloudProviderService) -> anyhow::Result<()> {
    let settings = service.settings();
    println!("{}", "Checking Compute Engine access...".blue());
    println!("  region: {}", settings.region.cyan());
    println!("  zone:   {}", settings.zone.cyan());

    let status = service.check_connection().await?;
    if !status.authenticated {
        if let Some(error) = &status.error {
            tracing::debug!("check_auth: {}", error);
        }
        println!("{}", "✗ Not connected".red().bold());
        anyhow::bail!("Could not connect: Check credentials");
    }

    println!("{}", "✓ Connected".green().bold());
    if let Some(account) = &status.account_info {
        println!("  account: {}", account);
    }
    Ok(())
}
