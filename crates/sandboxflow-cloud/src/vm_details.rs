//! Instance detail extraction

use crate::compute::{Instance, resource_name};
use serde::{Deserialize, Serialize};

/// Normalized instance and network details reported to the platform
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub vm_instance_data: Vec<VmDetailsProperty>,
    pub vm_network_data: Vec<VmDetailsNetworkInterface>,
}

impl VmDetails {
    /// Opaque instance id (first instance-level property)
    pub fn instance_id(&self) -> Option<&str> {
        self.vm_instance_data.first().map(|p| p.value.as_str())
    }

    pub fn primary_interface(&self) -> Option<&VmDetailsNetworkInterface> {
        self.vm_network_data.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmDetailsProperty {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub hidden: bool,
}

impl VmDetailsProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmDetailsNetworkInterface {
    pub interface_id: usize,
    /// Trailing segment of the interface's subnetwork link
    pub network_id: String,
    pub is_primary: bool,
    pub is_predefined: bool,
    pub network_data: Vec<VmDetailsProperty>,
    pub private_ip_address: String,
    /// Empty when the interface has no external access config
    pub public_ip_address: String,
}

/// Convert a raw instance description into [`VmDetails`]
///
/// Interface indices follow the order of `instance.network_interfaces`.
pub fn extract_vm_details(instance: &Instance) -> VmDetails {
    let vm_instance_data = vec![VmDetailsProperty::new("Instance Id", instance.id.clone())];

    let vm_network_data = instance
        .network_interfaces
        .iter()
        .enumerate()
        .map(|(index, nic)| {
            let public_ip = nic
                .access_configs
                .first()
                .and_then(|ac| ac.nat_ip.clone())
                .unwrap_or_default();

            VmDetailsNetworkInterface {
                interface_id: index,
                network_id: resource_name(&nic.subnetwork).to_string(),
                is_primary: index == 0,
                is_predefined: true,
                network_data: vec![VmDetailsProperty::new("Name", nic.name.clone())],
                private_ip_address: nic.network_ip.clone(),
                public_ip_address: public_ip,
            }
        })
        .collect();

    VmDetails {
        app_name: None,
        vm_instance_data,
        vm_network_data,
    }
}
