//! In-memory [`ComputeApi`] for tests
//!
//! Enabled with the `test-utils` feature. Resources are materialized as soon
//! as the insert call returns; the matching operation reports `RUNNING` for
//! a configurable number of polls before turning `DONE`.

use crate::compute::{
    AuthStatus, ComputeApi, Instance, InstanceInsert, InstanceTemplate, Network, NetworkInsert,
    NetworkInterface, Operation, OperationStatus, SubnetworkInsert, TemplateInstanceInsert,
    resource_name,
};
use crate::error::{CloudError, Result};
use crate::operation::OperationScope;
use crate::refresh::PlatformSession;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

const LINK_BASE: &str = "https://www.googleapis.com/compute/v1";

/// One recorded call against the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CheckAuth,
    InsertNetwork(String),
    GetNetwork(String),
    DeleteNetwork(String),
    InsertSubnetwork { region: String, name: String },
    DeleteSubnetwork { region: String, name: String },
    GetInstanceTemplate(String),
    InsertInstance { zone: String, name: String },
    InsertInstanceFromTemplate { zone: String, name: String, template: String },
    GetInstance { zone: String, name: String },
    DeleteInstance { zone: String, name: String },
    GetOperation { scope: OperationScope, name: String },
}

impl Call {
    /// Method name, as used by [`FakeCompute::fail_call`]
    pub fn kind(&self) -> &'static str {
        match self {
            Call::CheckAuth => "check_auth",
            Call::InsertNetwork(_) => "insert_network",
            Call::GetNetwork(_) => "get_network",
            Call::DeleteNetwork(_) => "delete_network",
            Call::InsertSubnetwork { .. } => "insert_subnetwork",
            Call::DeleteSubnetwork { .. } => "delete_subnetwork",
            Call::GetInstanceTemplate(_) => "get_instance_template",
            Call::InsertInstance { .. } => "insert_instance",
            Call::InsertInstanceFromTemplate { .. } => "insert_instance_from_template",
            Call::GetInstance { .. } => "get_instance",
            Call::DeleteInstance { .. } => "delete_instance",
            Call::GetOperation { .. } => "get_operation",
        }
    }

    /// Resource the call targets
    pub fn target(&self) -> &str {
        match self {
            Call::CheckAuth => "",
            Call::InsertNetwork(name)
            | Call::GetNetwork(name)
            | Call::DeleteNetwork(name)
            | Call::GetInstanceTemplate(name) => name,
            Call::InsertSubnetwork { name, .. }
            | Call::DeleteSubnetwork { name, .. }
            | Call::InsertInstance { name, .. }
            | Call::InsertInstanceFromTemplate { name, .. }
            | Call::GetInstance { name, .. }
            | Call::DeleteInstance { name, .. }
            | Call::GetOperation { name, .. } => name,
        }
    }
}

struct FakeOperation {
    remaining_polls: u32,
    error: Option<serde_json::Value>,
}

struct Failure<T> {
    method: String,
    prefix: String,
    value: T,
}

impl<T> Failure<T> {
    fn matches(&self, call: &Call) -> bool {
        self.method == call.kind() && call.target().starts_with(&self.prefix)
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    networks: BTreeMap<String, Network>,
    templates: HashMap<String, InstanceTemplate>,
    instances: BTreeMap<String, Instance>,
    operations: HashMap<String, FakeOperation>,
    pending_polls: u32,
    counter: u32,
    call_failures: Vec<Failure<String>>,
    operation_failures: Vec<Failure<serde_json::Value>>,
    last_instance_body: Option<InstanceInsert>,
}

impl State {
    fn next(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Record `call` and apply any injected call failure
    fn record(&mut self, call: Call) -> Result<()> {
        let failure = self
            .call_failures
            .iter()
            .find(|f| f.matches(&call))
            .map(|f| f.value.clone());
        self.calls.push(call);
        match failure {
            Some(message) => Err(CloudError::Api(message)),
            None => Ok(()),
        }
    }

    /// Start an operation for the last recorded call
    fn operation_for_last_call(&mut self) -> Operation {
        let error = self.calls.last().and_then(|call| {
            self.operation_failures
                .iter()
                .find(|f| f.matches(call))
                .map(|f| f.value.clone())
        });
        self.start(error)
    }

    fn start(&mut self, error: Option<serde_json::Value>) -> Operation {
        let name = format!("operation-{}", self.next());
        self.operations.insert(
            name.clone(),
            FakeOperation {
                remaining_polls: self.pending_polls,
                error,
            },
        );
        Operation::new(name, OperationStatus::Pending)
    }

    fn materialize(&mut self, zone: &str, name: &str, interfaces: &[NetworkInterface]) {
        let n = self.next();
        let network_interfaces = interfaces
            .iter()
            .enumerate()
            .map(|(index, nic)| NetworkInterface {
                kind: nic.kind.clone(),
                name: format!("nic{}", index),
                subnetwork: nic.subnetwork.clone(),
                network_ip: format!("10.{}.{}.{}", index, n / 250, n % 250 + 2),
                access_configs: nic
                    .access_configs
                    .iter()
                    .map(|ac| {
                        let mut ac = ac.clone();
                        ac.nat_ip = Some(format!("34.{}.{}.{}", index + 100, n / 250, n % 250 + 2));
                        ac
                    })
                    .collect(),
                alias_ip_ranges: nic.alias_ip_ranges.clone(),
            })
            .collect();

        let instance = Instance {
            id: format!("{}", 7_000_000_000u64 + n as u64),
            name: name.to_string(),
            network_interfaces,
        };
        self.instances.insert(instance_key(zone, name), instance);
    }
}

fn instance_key(zone: &str, name: &str) -> String {
    format!("{}/{}", zone, name)
}

/// In-memory Compute API
pub struct FakeCompute {
    project: String,
    state: Mutex<State>,
}

impl FakeCompute {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of `RUNNING` polls every new operation reports before `DONE`
    pub fn set_pending_polls(&self, polls: u32) {
        self.state().pending_polls = polls;
    }

    /// Register a bare operation and return its name
    pub fn start_operation(&self, _scope: OperationScope, error: Option<serde_json::Value>) -> String {
        self.state().start(error).name
    }

    /// Make `method` fail with `message` for resources whose name starts with `prefix`
    pub fn fail_call(&self, method: &str, prefix: &str, message: &str) {
        self.state().call_failures.push(Failure {
            method: method.to_string(),
            prefix: prefix.to_string(),
            value: message.to_string(),
        });
    }

    /// Make the operation started by `method` finish with `error`
    pub fn fail_operation(&self, method: &str, prefix: &str, error: serde_json::Value) {
        self.state().operation_failures.push(Failure {
            method: method.to_string(),
            prefix: prefix.to_string(),
            value: error,
        });
    }

    pub fn add_template(&self, name: &str) {
        let template = InstanceTemplate {
            name: name.to_string(),
            self_link: format!(
                "{}/projects/{}/global/instanceTemplates/{}",
                LINK_BASE, self.project, name
            ),
        };
        self.state().templates.insert(name.to_string(), template);
    }

    /// Seed or replace an instance
    pub fn set_instance(&self, zone: &str, instance: Instance) {
        self.state()
            .instances
            .insert(instance_key(zone, &instance.name), instance);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn network(&self, name: &str) -> Option<Network> {
        self.state().networks.get(name).cloned()
    }

    pub fn network_names(&self) -> Vec<String> {
        self.state().networks.keys().cloned().collect()
    }

    pub fn instance(&self, zone: &str, name: &str) -> Option<Instance> {
        self.state().instances.get(&instance_key(zone, name)).cloned()
    }

    pub fn last_instance_body(&self) -> Option<InstanceInsert> {
        self.state().last_instance_body.clone()
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    fn project(&self) -> &str {
        &self.project
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        self.state().record(Call::CheckAuth)?;
        Ok(AuthStatus::ok(format!("Project: {}", self.project)))
    }

    async fn insert_network(&self, network: &NetworkInsert) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::InsertNetwork(network.name.clone()))?;
        if state.networks.contains_key(&network.name) {
            return Err(CloudError::Api(format!(
                "network {} already exists",
                network.name
            )));
        }
        state.networks.insert(
            network.name.clone(),
            Network {
                name: network.name.clone(),
                self_link: format!(
                    "{}/projects/{}/global/networks/{}",
                    LINK_BASE, self.project, network.name
                ),
                subnetworks: Vec::new(),
            },
        );
        Ok(state.operation_for_last_call())
    }

    async fn get_network(&self, name: &str) -> Result<Network> {
        let mut state = self.state();
        state.record(Call::GetNetwork(name.to_string()))?;
        state
            .networks
            .get(name)
            .cloned()
            .ok_or_else(|| CloudError::Api(format!("network {} not found", name)))
    }

    async fn delete_network(&self, name: &str) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::DeleteNetwork(name.to_string()))?;
        match state.networks.get(name) {
            None => return Err(CloudError::Api(format!("network {} not found", name))),
            Some(network) if !network.subnetworks.is_empty() => {
                return Err(CloudError::Api(format!(
                    "network {} is still in use by subnetworks",
                    name
                )));
            }
            Some(_) => {}
        }
        state.networks.remove(name);
        Ok(state.operation_for_last_call())
    }

    async fn insert_subnetwork(
        &self,
        region: &str,
        subnetwork: &SubnetworkInsert,
    ) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::InsertSubnetwork {
            region: region.to_string(),
            name: subnetwork.name.clone(),
        })?;
        let link = format!(
            "{}/projects/{}/regions/{}/subnetworks/{}",
            LINK_BASE, self.project, region, subnetwork.name
        );
        let network_name = resource_name(&subnetwork.network).to_string();
        let network = state
            .networks
            .get_mut(&network_name)
            .ok_or_else(|| CloudError::Api(format!("network {} not found", network_name)))?;
        network.subnetworks.push(link);
        Ok(state.operation_for_last_call())
    }

    async fn delete_subnetwork(&self, region: &str, name: &str) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::DeleteSubnetwork {
            region: region.to_string(),
            name: name.to_string(),
        })?;
        for network in state.networks.values_mut() {
            network.subnetworks.retain(|link| resource_name(link) != name);
        }
        Ok(state.operation_for_last_call())
    }

    async fn get_instance_template(&self, name: &str) -> Result<InstanceTemplate> {
        let mut state = self.state();
        state.record(Call::GetInstanceTemplate(name.to_string()))?;
        state
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| CloudError::Api(format!("instance template {} not found", name)))
    }

    async fn insert_instance(&self, zone: &str, instance: &InstanceInsert) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::InsertInstance {
            zone: zone.to_string(),
            name: instance.name.clone(),
        })?;
        state.last_instance_body = Some(instance.clone());
        state.materialize(zone, &instance.name, &instance.network_interfaces);
        Ok(state.operation_for_last_call())
    }

    async fn insert_instance_from_template(
        &self,
        zone: &str,
        instance: &TemplateInstanceInsert,
        source_template: &str,
    ) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::InsertInstanceFromTemplate {
            zone: zone.to_string(),
            name: instance.name.clone(),
            template: source_template.to_string(),
        })?;
        state.materialize(zone, &instance.name, &instance.network_interfaces);
        Ok(state.operation_for_last_call())
    }

    async fn get_instance(&self, zone: &str, name: &str) -> Result<Instance> {
        let mut state = self.state();
        state.record(Call::GetInstance {
            zone: zone.to_string(),
            name: name.to_string(),
        })?;
        state
            .instances
            .get(&instance_key(zone, name))
            .cloned()
            .ok_or_else(|| CloudError::Api(format!("instance {} not found in {}", name, zone)))
    }

    async fn delete_instance(&self, zone: &str, name: &str) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::DeleteInstance {
            zone: zone.to_string(),
            name: name.to_string(),
        })?;
        if state.instances.remove(&instance_key(zone, name)).is_none() {
            return Err(CloudError::Api(format!(
                "instance {} not found in {}",
                name, zone
            )));
        }
        Ok(state.operation_for_last_call())
    }

    async fn get_operation(&self, scope: &OperationScope, name: &str) -> Result<Operation> {
        let mut state = self.state();
        state.record(Call::GetOperation {
            scope: scope.clone(),
            name: name.to_string(),
        })?;
        let operation = state
            .operations
            .get_mut(name)
            .ok_or_else(|| CloudError::Api(format!("operation {} not found", name)))?;

        if operation.remaining_polls > 0 {
            operation.remaining_polls -= 1;
            return Ok(Operation::new(name, OperationStatus::Running));
        }

        let mut done = Operation::new(name, OperationStatus::Done);
        done.error = operation.error.clone();
        Ok(done)
    }
}

/// One update pushed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformUpdate {
    ResourceAddress { resource: String, address: String },
    Attribute { resource: String, attribute: String, value: String },
}

/// [`PlatformSession`] that records every update
#[derive(Default)]
pub struct RecordingSession {
    updates: Mutex<Vec<PlatformUpdate>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<PlatformUpdate> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, update: PlatformUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(update);
    }
}

#[async_trait]
impl PlatformSession for RecordingSession {
    async fn update_resource_address(&self, resource: &str, address: &str) -> Result<()> {
        self.push(PlatformUpdate::ResourceAddress {
            resource: resource.to_string(),
            address: address.to_string(),
        });
        Ok(())
    }

    async fn set_attribute_value(&self, resource: &str, attribute: &str, value: &str) -> Result<()> {
        self.push(PlatformUpdate::Attribute {
            resource: resource.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}
