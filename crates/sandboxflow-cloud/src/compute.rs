//! Compute API client contract
//!
//! The engine never talks HTTP itself. Everything it needs from the cloud is
//! expressed by [`ComputeApi`]; `sandboxflow-cloud-gcp` provides the REST
//! implementation and the `test-utils` feature provides an in-memory one.

use crate::error::Result;
use crate::operation::OperationScope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resource-scoped CRUD plus operation status lookup
///
/// Every mutating call returns the in-flight [`Operation`]; callers hand it
/// to the poller when they need to wait for completion.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Project every call is scoped to
    fn project(&self) -> &str;

    /// Check that the credentials can reach the API
    async fn check_auth(&self) -> Result<AuthStatus>;

    async fn insert_network(&self, network: &NetworkInsert) -> Result<Operation>;

    async fn get_network(&self, name: &str) -> Result<Network>;

    async fn delete_network(&self, name: &str) -> Result<Operation>;

    async fn insert_subnetwork(
        &self,
        region: &str,
        subnetwork: &SubnetworkInsert,
    ) -> Result<Operation>;

    async fn delete_subnetwork(&self, region: &str, name: &str) -> Result<Operation>;

    async fn get_instance_template(&self, name: &str) -> Result<InstanceTemplate>;

    async fn insert_instance(&self, zone: &str, instance: &InstanceInsert) -> Result<Operation>;

    /// Instantiate `source_template` (a template self-link), overlaying `instance`
    async fn insert_instance_from_template(
        &self,
        zone: &str,
        instance: &TemplateInstanceInsert,
        source_template: &str,
    ) -> Result<Operation>;

    async fn get_instance(&self, zone: &str, name: &str) -> Result<Instance>;

    async fn delete_instance(&self, zone: &str, name: &str) -> Result<Operation>;

    /// Current status of an operation at the given scope
    async fn get_operation(&self, scope: &OperationScope, name: &str) -> Result<Operation>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/project information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Trailing path segment of a resource link
///
/// `https://.../regions/us-west1/subnetworks/web-a1b2c3` -> `web-a1b2c3`
pub fn resource_name(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

// ============ Operations ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

/// An in-flight asynchronous mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    /// Set by the cloud when a finished operation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl Operation {
    pub fn new(name: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            name: name.into(),
            status,
            target_link: None,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }
}

// ============ Resources ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    pub self_link: String,
    /// Links of the subnetworks attached to this network
    #[serde(default)]
    pub subnetworks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplate {
    pub name: String,
    pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub subnetwork: String,
    #[serde(rename = "networkIP", default, skip_serializing_if = "String::is_empty")]
    pub network_ip: String,
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_ip_ranges: Option<Vec<serde_json::Value>>,
}

impl NetworkInterface {
    /// Interface bound to `subnetwork` with one-to-one NAT external access
    pub fn with_external_nat(subnetwork: impl Into<String>) -> Self {
        Self {
            kind: "compute#networkInterface".to_string(),
            subnetwork: subnetwork.into(),
            access_configs: vec![AccessConfig::external_nat()],
            alias_ip_ranges: Some(Vec::new()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub access_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_tier: String,
    #[serde(rename = "natIP", default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
}

impl AccessConfig {
    pub fn external_nat() -> Self {
        Self {
            kind: "compute#accessConfig".to_string(),
            name: "External NAT".to_string(),
            access_type: "ONE_TO_ONE_NAT".to_string(),
            network_tier: "STANDARD".to_string(),
            nat_ip: None,
        }
    }
}

// ============ Request bodies ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInsert {
    pub name: String,
    pub routing_config: RoutingConfig,
    pub auto_create_subnetworks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub routing_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetworkInsert {
    pub name: String,
    pub ip_cidr_range: String,
    /// Self-link of the owning network
    pub network: String,
    pub private_ip_google_access: bool,
    pub enable_flow_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInsert {
    pub kind: String,
    pub name: String,
    pub zone: String,
    pub machine_type: String,
    pub display_device: DisplayDevice,
    pub metadata: Metadata,
    pub tags: Tags,
    pub disks: Vec<AttachedDisk>,
    pub can_ip_forward: bool,
    pub network_interfaces: Vec<NetworkInterface>,
    pub description: String,
    pub labels: HashMap<String, String>,
    pub scheduling: Scheduling,
    pub deletion_protection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDevice {
    pub enable_display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub kind: String,
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tags {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    pub kind: String,
    #[serde(rename = "type")]
    pub disk_kind: String,
    pub boot: bool,
    pub mode: String,
    pub auto_delete: bool,
    pub device_name: String,
    pub initialize_params: DiskInitializeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInitializeParams {
    pub source_image: String,
    pub disk_type: String,
    /// int64 fields travel as strings in the Compute API
    pub disk_size_gb: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    pub preemptible: bool,
    pub on_host_maintenance: String,
    pub automatic_restart: bool,
    pub node_affinities: Vec<serde_json::Value>,
}

impl Scheduling {
    /// Non-preemptible, live-migrated on maintenance, restarted on failure
    pub fn standard() -> Self {
        Self {
            preemptible: false,
            on_host_maintenance: "MIGRATE".to_string(),
            automatic_restart: true,
            node_affinities: Vec::new(),
        }
    }
}

/// Overlay applied on top of an instance template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInstanceInsert {
    pub name: String,
    pub network_interfaces: Vec<NetworkInterface>,
}
