//! Provisioning actions and their results
//!
//! Actions arrive from the orchestration platform as one batch. Every action
//! carries an opaque `actionId` which is echoed back on its result, so the
//! platform can correlate the two lists.

use crate::error::{CloudError, Result};
use crate::provisioner::DeployedVm;
use crate::vm_details::VmDetails;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single unit of requested provisioning work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProvisioningAction {
    #[serde(rename = "prepareCloudInfra", alias = "prepareNetwork")]
    PrepareInfra(PrepareInfraAction),
    CreateKeys(CreateKeysAction),
    PrepareSubnet(PrepareSubnetAction),
    #[serde(alias = "connectToSubnet")]
    ConnectSubnet(ConnectSubnetAction),
    CleanupNetwork(CleanupNetworkAction),
    DeployApp(DeployAppAction),
}

impl ProvisioningAction {
    pub fn action_id(&self) -> &str {
        match self {
            ProvisioningAction::PrepareInfra(a) => &a.action_id,
            ProvisioningAction::CreateKeys(a) => &a.action_id,
            ProvisioningAction::PrepareSubnet(a) => &a.action_id,
            ProvisioningAction::ConnectSubnet(a) => &a.action_id,
            ProvisioningAction::CleanupNetwork(a) => &a.action_id,
            ProvisioningAction::DeployApp(a) => &a.action_id,
        }
    }

    /// Build the failed result matching this action's kind
    pub fn failed(&self, error: impl ToString) -> ActionResult {
        let payload = match self {
            ProvisioningAction::PrepareInfra(_) => ResultPayload::PrepareInfra,
            ProvisioningAction::CreateKeys(_) => ResultPayload::CreateKeys { access_key: None },
            ProvisioningAction::PrepareSubnet(_) => ResultPayload::PrepareSubnet { subnet_id: None },
            ProvisioningAction::ConnectSubnet(_) => ResultPayload::ConnectSubnet { interface: None },
            ProvisioningAction::CleanupNetwork(_) => ResultPayload::CleanupNetwork,
            ProvisioningAction::DeployApp(_) => ResultPayload::DeployApp {
                vm_name: None,
                vm_uuid: None,
                deployed_app_address: None,
                vm_details_data: None,
            },
        };
        ActionResult::failure(self.action_id(), payload, error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareInfraAction {
    pub action_id: String,
    pub action_params: PrepareInfraParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareInfraParams {
    /// Sandbox address range requested by the platform
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeysAction {
    pub action_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareSubnetAction {
    pub action_id: String,
    pub action_params: PrepareSubnetParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareSubnetParams {
    pub cidr: String,
    pub alias: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSubnetAction {
    pub action_id: String,
    pub action_params: ConnectSubnetParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSubnetParams {
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_name: Option<String>,
    /// Marks the subnet the instance's network interface is bound to
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupNetworkAction {
    pub action_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployAppAction {
    pub action_id: String,
    pub action_params: DeployAppParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployAppParams {
    pub app_name: String,
    pub deployment: Deployment,
}

/// Deployment option selected for an app, with its attribute bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub deployment_path: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Deployment {
    /// Look up `<deploymentPath>.<name>`
    pub fn attribute(&self, name: &str) -> Result<&str> {
        let key = format!("{}.{}", self.deployment_path, name);
        self.attributes
            .get(&key)
            .map(String::as_str)
            .ok_or(CloudError::MissingAttribute(key))
    }
}

/// Outcome of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub info_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub payload: ResultPayload,
}

/// Kind-specific part of an [`ActionResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ResultPayload {
    #[serde(rename = "prepareCloudInfra")]
    PrepareInfra,
    CreateKeys {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key: Option<String>,
    },
    PrepareSubnet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subnet_id: Option<String>,
    },
    #[serde(rename = "connectToSubnet")]
    ConnectSubnet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interface: Option<usize>,
    },
    CleanupNetwork,
    DeployApp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vm_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vm_uuid: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deployed_app_address: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vm_details_data: Option<VmDetails>,
    },
}

impl ActionResult {
    pub fn success(action_id: impl Into<String>, payload: ResultPayload) -> Self {
        Self {
            action_id: action_id.into(),
            success: true,
            info_message: String::new(),
            error_message: None,
            payload,
        }
    }

    pub fn failure(
        action_id: impl Into<String>,
        payload: ResultPayload,
        error: impl ToString,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            success: false,
            info_message: String::new(),
            error_message: Some(error.to_string()),
            payload,
        }
    }

    pub fn prepare_infra(action_id: impl Into<String>) -> Self {
        Self::success(action_id, ResultPayload::PrepareInfra)
    }

    pub fn create_keys(action_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self::success(
            action_id,
            ResultPayload::CreateKeys {
                access_key: Some(access_key.into()),
            },
        )
    }

    pub fn prepare_subnet(action_id: impl Into<String>, subnet_id: impl Into<String>) -> Self {
        Self::success(
            action_id,
            ResultPayload::PrepareSubnet {
                subnet_id: Some(subnet_id.into()),
            },
        )
    }

    pub fn connect_subnet(action_id: impl Into<String>, interface: usize) -> Self {
        Self::success(
            action_id,
            ResultPayload::ConnectSubnet {
                interface: Some(interface),
            },
        )
    }

    pub fn cleanup_network(action_id: impl Into<String>) -> Self {
        Self::success(action_id, ResultPayload::CleanupNetwork)
    }

    pub fn deploy_app(action_id: impl Into<String>, vm: DeployedVm) -> Self {
        Self::success(
            action_id,
            ResultPayload::DeployApp {
                vm_name: Some(vm.name),
                vm_uuid: Some(vm.uuid),
                deployed_app_address: Some(vm.address),
                vm_details_data: Some(vm.details),
            },
        )
    }
}

/// `{"driverRequest": {"actions": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRequest {
    pub driver_request: ActionList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionList {
    #[serde(default)]
    pub actions: Vec<ProvisioningAction>,
}

impl DriverRequest {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_batch(self) -> ActionBatch {
        ActionBatch::from_actions(self.driver_request.actions)
    }
}

/// `{"driverResponse": {"actionResults": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverResponse {
    pub driver_response: ResultList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultList {
    pub action_results: Vec<ActionResult>,
}

impl DriverResponse {
    pub fn new(action_results: Vec<ActionResult>) -> Self {
        Self {
            driver_response: ResultList { action_results },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Actions of one request, split by kind with input order kept per kind
#[derive(Debug, Clone, Default)]
pub struct ActionBatch {
    pub prepare_infra: Vec<PrepareInfraAction>,
    pub create_keys: Vec<CreateKeysAction>,
    pub prepare_subnets: Vec<PrepareSubnetAction>,
    pub connect_subnets: Vec<ConnectSubnetAction>,
    pub cleanup_networks: Vec<CleanupNetworkAction>,
    pub deploy_apps: Vec<DeployAppAction>,
}

impl ActionBatch {
    pub fn from_actions(actions: Vec<ProvisioningAction>) -> Self {
        let mut batch = Self::default();
        for action in actions {
            match action {
                ProvisioningAction::PrepareInfra(a) => batch.prepare_infra.push(a),
                ProvisioningAction::CreateKeys(a) => batch.create_keys.push(a),
                ProvisioningAction::PrepareSubnet(a) => batch.prepare_subnets.push(a),
                ProvisioningAction::ConnectSubnet(a) => batch.connect_subnets.push(a),
                ProvisioningAction::CleanupNetwork(a) => batch.cleanup_networks.push(a),
                ProvisioningAction::DeployApp(a) => batch.deploy_apps.push(a),
            }
        }
        batch
    }
}

/// Take the one and only element of `items`
pub fn single<T>(items: Vec<T>, kind: &str) -> Result<T> {
    let count = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), count) {
        (Some(item), 1) => Ok(item),
        _ => Err(CloudError::InvalidRequest(format!(
            "expected exactly one {} action, found {}",
            kind, count
        ))),
    }
}
