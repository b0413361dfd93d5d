//! Sandbox infrastructure batches
//!
//! Preparing a sandbox bundles one infra action, one key action and any
//! number of subnet actions. Each action gets its own failure boundary and
//! its own result; a failure never removes another action's result.
//! Cleanup is singular and propagates its errors.

use crate::action::{
    ActionResult, CleanupNetworkAction, CreateKeysAction, PrepareInfraAction, PrepareSubnetAction,
    ProvisioningAction,
};
use crate::error::{CloudError, Result};
use crate::naming;
use crate::provisioner::ResourceProvisioner;
use std::path::PathBuf;

/// Runs the prepare and cleanup flows of a reservation's network
#[derive(Clone)]
pub struct SandboxInfra {
    provisioner: ResourceProvisioner,
    access_key_path: Option<PathBuf>,
}

impl SandboxInfra {
    pub fn new(provisioner: ResourceProvisioner) -> Self {
        Self {
            provisioner,
            access_key_path: None,
        }
    }

    /// File holding the access key returned by `createKeys`
    pub fn with_access_key_path(mut self, path: Option<PathBuf>) -> Self {
        self.access_key_path = path;
        self
    }

    /// Create the reservation network, read the access key, create subnets
    ///
    /// Always returns `2 + subnets.len()` results: infra, keys, then one per
    /// subnet action in input order. Subnets are not attempted when the
    /// network could not be created.
    pub async fn prepare_sandbox_infra(
        &self,
        reservation_id: &str,
        infra: &PrepareInfraAction,
        keys: &CreateKeysAction,
        subnets: &[PrepareSubnetAction],
    ) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(subnets.len() + 2);
        let network_name = naming::network_name(reservation_id);
        let settings = self.provisioner.settings();

        tracing::info!(
            "Preparing sandbox infra for reservation {} ({} subnets)",
            reservation_id,
            subnets.len()
        );

        let network_ref = match self
            .provisioner
            .create_network(&network_name, &settings.routing_mode, false)
            .await
        {
            Ok(link) => {
                results.push(ActionResult::prepare_infra(&infra.action_id));
                Some(link)
            }
            Err(e) => {
                tracing::error!("Failed to create network {}: {}", network_name, e);
                results.push(ProvisioningAction::PrepareInfra(infra.clone()).failed(&e));
                None
            }
        };

        match self.read_access_key().await {
            Ok(key) => results.push(ActionResult::create_keys(&keys.action_id, key)),
            Err(e) => {
                tracing::error!("Failed to create keys: {}", e);
                results.push(ProvisioningAction::CreateKeys(keys.clone()).failed(&e));
            }
        }

        for subnet in subnets {
            let result = match &network_ref {
                Some(network_ref) => self.prepare_subnet(subnet, network_ref).await,
                None => {
                    let e = CloudError::DependencyFailed(format!(
                        "network {} was not created",
                        network_name
                    ));
                    tracing::warn!("Skipping subnet {}: {}", subnet.action_params.alias, e);
                    ProvisioningAction::PrepareSubnet(subnet.clone()).failed(&e)
                }
            };
            results.push(result);
        }

        results
    }

    async fn prepare_subnet(&self, action: &PrepareSubnetAction, network_ref: &str) -> ActionResult {
        let params = &action.action_params;
        match self
            .provisioner
            .create_subnet(
                &params.alias,
                &params.cidr,
                network_ref,
                &self.provisioner.settings().region,
            )
            .await
        {
            Ok(subnet_name) => {
                tracing::info!("Subnet {} ready for alias {}", subnet_name, params.alias);
                ActionResult::prepare_subnet(&action.action_id, subnet_name)
            }
            Err(e) => {
                tracing::error!("Failed to create subnet {}: {}", params.alias, e);
                ProvisioningAction::PrepareSubnet(action.clone()).failed(&e)
            }
        }
    }

    async fn read_access_key(&self) -> Result<String> {
        let path = self
            .access_key_path
            .as_ref()
            .ok_or_else(|| CloudError::KeyUnavailable("no access key file configured".to_string()))?;

        let key = tokio::fs::read_to_string(path).await.map_err(|e| {
            CloudError::KeyUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(key.trim().to_string())
    }

    /// Delete the reservation network and all of its subnets
    pub async fn cleanup_sandbox_infra(
        &self,
        reservation_id: &str,
        action: &CleanupNetworkAction,
    ) -> Result<ActionResult> {
        let network_name = naming::network_name(reservation_id);
        tracing::info!("Cleaning up network {}", network_name);

        self.provisioner
            .delete_network(&network_name, &self.provisioner.settings().region)
            .await
            .inspect_err(|e| tracing::error!("Cleanup of {} failed: {}", network_name, e))?;

        Ok(ActionResult::cleanup_network(&action.action_id))
    }
}
