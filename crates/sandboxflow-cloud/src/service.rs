//! Driver-level entry points
//!
//! [`CloudProviderService`] owns one injected API client and exposes every
//! driver command over parsed requests.

use crate::action::{ActionResult, DriverRequest, DriverResponse, single};
use crate::compute::{AuthStatus, ComputeApi};
use crate::deployer::InstanceDeployer;
use crate::error::Result;
use crate::infra::SandboxInfra;
use crate::operation::{OperationPoller, PollConfig};
use crate::provisioner::{ProvisionerSettings, ResourceProvisioner};
use crate::refresh::{PlatformSession, RecordedAddresses, RefreshOutcome, refresh_ip};
use crate::vm_details::VmDetails;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Construction options
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub settings: ProvisionerSettings,
    pub poll: PollConfig,
    pub access_key_path: Option<PathBuf>,
}

pub struct CloudProviderService {
    api: Arc<dyn ComputeApi>,
    provisioner: ResourceProvisioner,
    infra: SandboxInfra,
    deployer: InstanceDeployer,
}

impl CloudProviderService {
    pub fn new(api: Arc<dyn ComputeApi>, options: ServiceOptions) -> Self {
        Self::with_cancellation(api, options, CancellationToken::new())
    }

    /// Every operation wait aborts once `cancel` fires
    pub fn with_cancellation(
        api: Arc<dyn ComputeApi>,
        options: ServiceOptions,
        cancel: CancellationToken,
    ) -> Self {
        let poller = OperationPoller::new(api.clone(), options.poll).with_cancellation(cancel);
        let provisioner = ResourceProvisioner::new(api.clone(), poller, options.settings);
        let infra =
            SandboxInfra::new(provisioner.clone()).with_access_key_path(options.access_key_path);
        let deployer = InstanceDeployer::new(provisioner.clone());

        Self {
            api,
            provisioner,
            infra,
            deployer,
        }
    }

    pub fn settings(&self) -> &ProvisionerSettings {
        self.provisioner.settings()
    }

    pub async fn check_connection(&self) -> Result<AuthStatus> {
        self.api.check_auth().await
    }

    /// Run the prepare batch of `request`
    ///
    /// The request must hold exactly one infra and one keys action.
    pub async fn prepare_infra(
        &self,
        reservation_id: &str,
        request: DriverRequest,
    ) -> Result<DriverResponse> {
        let batch = request.into_batch();
        let infra = single(batch.prepare_infra, "prepareCloudInfra")?;
        let keys = single(batch.create_keys, "createKeys")?;

        let results = self
            .infra
            .prepare_sandbox_infra(reservation_id, &infra, &keys, &batch.prepare_subnets)
            .await;
        Ok(DriverResponse::new(results))
    }

    pub async fn cleanup_infra(
        &self,
        reservation_id: &str,
        request: DriverRequest,
    ) -> Result<DriverResponse> {
        let batch = request.into_batch();
        let action = single(batch.cleanup_networks, "cleanupNetwork")?;

        let result = self.infra.cleanup_sandbox_infra(reservation_id, &action).await?;
        Ok(DriverResponse::new(vec![result]))
    }

    pub async fn deploy(&self, request: DriverRequest) -> Result<DriverResponse> {
        let batch = request.into_batch();
        let action = single(batch.deploy_apps, "deployApp")?;

        let results: Vec<ActionResult> =
            self.deployer.deploy(&action, &batch.connect_subnets).await?;
        Ok(DriverResponse::new(results))
    }

    pub async fn delete_instance(&self, name: &str) -> Result<()> {
        self.provisioner
            .delete_instance(name, &self.settings().zone)
            .await
    }

    /// Describe each named instance, in order
    pub async fn vm_details(&self, names: &[String]) -> Result<Vec<VmDetails>> {
        let mut details = Vec::with_capacity(names.len());
        for name in names {
            let mut vm = self
                .provisioner
                .describe_instance(name, &self.settings().zone)
                .await?;
            vm.app_name = Some(name.clone());
            details.push(vm);
        }
        Ok(details)
    }

    pub async fn refresh_ip(
        &self,
        session: &dyn PlatformSession,
        name: &str,
        recorded: &RecordedAddresses,
        ip_regex: Option<&str>,
    ) -> Result<RefreshOutcome> {
        refresh_ip(&self.provisioner, session, name, recorded, ip_regex).await
    }
}
