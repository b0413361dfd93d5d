//! Sandboxflow provisioning engine
//!
//! Provisions and tears down sandbox networks, subnets and instances on
//! Google Compute Engine for an orchestration platform, and reports the
//! resulting instance details back to it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  sandbox CLI                     │
//! │     (prepare-infra / deploy / refresh-ip)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               sandboxflow-cloud                  │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │ SandboxInfra │  │   Deployer   │             │
//! │  └──────┬───────┘  └──────┬───────┘             │
//! │  ┌──────▼─────────────────▼───────┐             │
//! │  │      ResourceProvisioner       │             │
//! │  └──────┬─────────────────────────┘             │
//! │  ┌──────▼───────┐                               │
//! │  │   Poller     │  trait ComputeApi { ... }     │
//! │  └──────────────┘                               │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ cloud-gcp     │
//!           │ (REST client) │
//!           └───────────────┘
//! ```

pub mod action;
pub mod compute;
pub mod deployer;
pub mod error;
pub mod infra;
pub mod naming;
pub mod network;
pub mod operation;
pub mod provisioner;
pub mod refresh;
pub mod service;
pub mod vm_details;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use action::{
    ActionBatch, ActionResult, DriverRequest, DriverResponse, ProvisioningAction, ResultPayload,
    single,
};
pub use compute::{AuthStatus, ComputeApi, Operation, OperationStatus};
pub use deployer::{CUSTOM_VM_DEPLOYMENT, InstanceDeployer, TEMPLATE_VM_DEPLOYMENT};
pub use error::{CloudError, Result};
pub use infra::SandboxInfra;
pub use network::NetworkAssignment;
pub use operation::{OperationPoller, OperationScope, PollConfig};
pub use provisioner::{DeployedVm, ImageInstanceSpec, ProvisionerSettings, ResourceProvisioner};
pub use refresh::{PlatformSession, RecordedAddresses, RefreshOutcome};
pub use service::{CloudProviderService, ServiceOptions};
pub use vm_details::{VmDetails, extract_vm_details};
