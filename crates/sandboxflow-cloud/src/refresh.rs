//! Address reconciliation for deployed instances

use crate::error::Result;
use crate::provisioner::ResourceProvisioner;
use async_trait::async_trait;
use regex::Regex;

/// Platform attribute holding a resource's public address
pub const PUBLIC_IP_ATTRIBUTE: &str = "Public IP";

/// Filter applied when the caller supplies none
pub const DEFAULT_IP_REGEX: &str = ".*";

const IPV4_PATTERN: &str = r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$";

/// Sink for updates to the orchestration platform's resource model
#[async_trait]
pub trait PlatformSession: Send + Sync {
    async fn update_resource_address(&self, resource: &str, address: &str) -> Result<()>;

    async fn set_attribute_value(&self, resource: &str, attribute: &str, value: &str)
    -> Result<()>;
}

/// Addresses the platform currently has on record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedAddresses {
    pub private_ip: String,
    pub public_ip: String,
}

/// Which recorded values were replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub private_updated: bool,
    pub public_updated: bool,
}

/// Dotted-quad shape plus the caller's filter
struct AddressFilter {
    ipv4: Regex,
    user: Regex,
}

impl AddressFilter {
    /// `ip_regex` is matched from the first character of the address
    fn new(ip_regex: Option<&str>) -> Result<Self> {
        let pattern = ip_regex.filter(|r| !r.is_empty()).unwrap_or(DEFAULT_IP_REGEX);
        Ok(Self {
            ipv4: Regex::new(IPV4_PATTERN)?,
            user: Regex::new(&format!("^(?:{})", pattern))?,
        })
    }

    /// Whether `candidate` should replace `recorded`
    fn accept(&self, candidate: &str, recorded: &str) -> bool {
        !candidate.is_empty()
            && self.ipv4.is_match(candidate)
            && self.user.is_match(candidate)
            && candidate != recorded
    }
}

/// Re-describe `name` and push changed addresses to the platform
///
/// Only the instance's first network interface is considered. Private and
/// public addresses are checked and updated independently.
pub async fn refresh_ip(
    provisioner: &ResourceProvisioner,
    session: &dyn PlatformSession,
    name: &str,
    recorded: &RecordedAddresses,
    ip_regex: Option<&str>,
) -> Result<RefreshOutcome> {
    let filter = AddressFilter::new(ip_regex)?;
    let details = provisioner
        .describe_instance(name, &provisioner.settings().zone)
        .await?;

    let mut outcome = RefreshOutcome::default();
    let Some(nic) = details.primary_interface() else {
        tracing::warn!("Instance {} has no network interfaces", name);
        return Ok(outcome);
    };

    if filter.accept(&nic.private_ip_address, &recorded.private_ip) {
        tracing::info!(
            "Private IP of {} changed: {} -> {}",
            name,
            recorded.private_ip,
            nic.private_ip_address
        );
        session
            .update_resource_address(name, &nic.private_ip_address)
            .await?;
        outcome.private_updated = true;
    }

    if filter.accept(&nic.public_ip_address, &recorded.public_ip) {
        tracing::info!(
            "Public IP of {} changed: {} -> {}",
            name,
            recorded.public_ip,
            nic.public_ip_address
        );
        session
            .set_attribute_value(name, PUBLIC_IP_ATTRIBUTE, &nic.public_ip_address)
            .await?;
        outcome.public_updated = true;
    }

    Ok(outcome)
}
