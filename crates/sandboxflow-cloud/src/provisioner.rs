//! Network, subnet and instance provisioning
//!
//! Each call issues one mutating request and then waits on the returned
//! operation through the [`OperationPoller`]. The only exception is the
//! final network delete of a teardown, which is fire-and-forget.

use crate::compute::{
    AttachedDisk, ComputeApi, DiskInitializeParams, DisplayDevice, InstanceInsert, Metadata,
    NetworkInsert, NetworkInterface, RoutingConfig, Scheduling, SubnetworkInsert, Tags,
    TemplateInstanceInsert, resource_name,
};
use crate::error::{CloudError, Result};
use crate::naming;
use crate::operation::{OperationPoller, OperationScope};
use crate::vm_details::{VmDetails, extract_vm_details};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Placement and network defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerSettings {
    pub region: String,
    pub zone: String,
    pub routing_mode: String,
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            region: "us-west1".to_string(),
            zone: "us-west1-b".to_string(),
            routing_mode: "REGIONAL".to_string(),
        }
    }
}

/// Where a boot image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Image published by another project
    Public,
    /// Image owned by the deployment project
    Private,
}

impl FromStr for ImageSource {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(ImageSource::Public),
            "private" => Ok(ImageSource::Private),
            other => Err(CloudError::UnsupportedImageSource(other.to_string())),
        }
    }
}

/// Resolve the boot disk source image reference
pub fn source_image_uri(image_id: &str, image_project: &str, image_source: &str) -> Result<String> {
    Ok(match image_source.parse::<ImageSource>()? {
        ImageSource::Public => format!("projects/{}/global/images/{}", image_project, image_id),
        ImageSource::Private => format!("global/images/{}", image_id),
    })
}

/// Everything needed to boot an instance from an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInstanceSpec {
    pub name: String,
    pub image_project: String,
    pub image_id: String,
    /// `public` or `private`
    pub image_source: String,
    pub machine_type: String,
    /// e.g. `standard`, `ssd`; mapped to `pd-<type>`
    pub disk_type: String,
    /// Size in GB; a trailing `GB` is tolerated
    pub disk_size: String,
    /// Subnet the single network interface is bound to
    pub subnet: String,
}

/// A created instance together with its extracted details
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedVm {
    pub name: String,
    /// Cloud-assigned instance id
    pub uuid: String,
    /// Private IP of the first interface
    pub address: String,
    pub details: VmDetails,
}

impl DeployedVm {
    fn from_details(name: &str, details: VmDetails) -> Self {
        Self {
            name: name.to_string(),
            uuid: details.instance_id().unwrap_or_default().to_string(),
            address: details
                .primary_interface()
                .map(|nic| nic.private_ip_address.clone())
                .unwrap_or_default(),
            details,
        }
    }
}

fn parse_disk_size(raw: &str) -> Result<String> {
    let trimmed = raw.trim().to_lowercase();
    let digits = trimmed.trim_end_matches("gb").trim();
    digits
        .parse::<u64>()
        .map(|size| size.to_string())
        .map_err(|_| CloudError::InvalidAttribute {
            name: "Disk Size".to_string(),
            value: raw.to_string(),
        })
}

/// Issues create/delete calls and waits for them to finish
#[derive(Clone)]
pub struct ResourceProvisioner {
    api: Arc<dyn ComputeApi>,
    poller: OperationPoller,
    settings: ProvisionerSettings,
}

impl ResourceProvisioner {
    pub fn new(api: Arc<dyn ComputeApi>, poller: OperationPoller, settings: ProvisionerSettings) -> Self {
        Self {
            api,
            poller,
            settings,
        }
    }

    pub fn settings(&self) -> &ProvisionerSettings {
        &self.settings
    }

    pub fn api(&self) -> &Arc<dyn ComputeApi> {
        &self.api
    }

    fn project(&self) -> &str {
        self.api.project()
    }

    fn subnetwork_path(&self, region: &str, subnet: &str) -> String {
        format!("projects/{}/regions/{}/subnetworks/{}", self.project(), region, subnet)
    }

    /// Create a custom-mode network and return its self-link
    pub async fn create_network(
        &self,
        name: &str,
        routing_mode: &str,
        auto_create_subnets: bool,
    ) -> Result<String> {
        tracing::info!("Creating network {} (routing mode {})", name, routing_mode);

        let body = NetworkInsert {
            name: name.to_string(),
            routing_config: RoutingConfig {
                routing_mode: routing_mode.to_string(),
            },
            auto_create_subnetworks: auto_create_subnets,
        };
        let operation = self.api.insert_network(&body).await?;
        self.poller
            .await_operation(&OperationScope::Global, &operation.name)
            .await?;

        let network = self.api.get_network(name).await?;
        tracing::info!("Network {} ready: {}", name, network.self_link);
        Ok(network.self_link)
    }

    /// Create a subnet named after `alias` and return the generated name
    pub async fn create_subnet(
        &self,
        alias: &str,
        cidr: &str,
        network_ref: &str,
        region: &str,
    ) -> Result<String> {
        let name = naming::subnet_name(alias);
        tracing::info!("Creating subnet {} ({}) in {}", name, cidr, region);

        let body = SubnetworkInsert {
            name: name.clone(),
            ip_cidr_range: cidr.to_string(),
            network: network_ref.to_string(),
            private_ip_google_access: false,
            enable_flow_logs: false,
        };
        let operation = self.api.insert_subnetwork(region, &body).await?;
        self.poller
            .await_operation(&OperationScope::Region(region.to_string()), &operation.name)
            .await?;

        Ok(name)
    }

    /// Boot an instance from an image and describe it
    pub async fn create_instance(&self, spec: &ImageInstanceSpec) -> Result<DeployedVm> {
        let source_image = source_image_uri(&spec.image_id, &spec.image_project, &spec.image_source)?;
        let disk_size_gb = parse_disk_size(&spec.disk_size)?;

        let project = self.project();
        let zone = &self.settings.zone;
        let body = InstanceInsert {
            kind: "compute#instance".to_string(),
            name: spec.name.clone(),
            zone: format!("projects/{}/zones/{}", project, zone),
            machine_type: format!(
                "projects/{}/zones/{}/machineTypes/{}",
                project, zone, spec.machine_type
            ),
            display_device: DisplayDevice {
                enable_display: false,
            },
            metadata: Metadata {
                kind: "compute#metadata".to_string(),
                items: Vec::new(),
            },
            tags: Tags::default(),
            disks: vec![AttachedDisk {
                kind: "compute#attachedDisk".to_string(),
                disk_kind: "PERSISTENT".to_string(),
                boot: true,
                mode: "READ_WRITE".to_string(),
                auto_delete: true,
                device_name: "instance-1".to_string(),
                initialize_params: DiskInitializeParams {
                    source_image,
                    disk_type: format!(
                        "projects/{}/zones/{}/diskTypes/pd-{}",
                        project,
                        zone,
                        spec.disk_type.to_lowercase()
                    ),
                    disk_size_gb,
                },
            }],
            can_ip_forward: false,
            network_interfaces: vec![NetworkInterface::with_external_nat(
                self.subnetwork_path(&self.settings.region, &spec.subnet),
            )],
            description: String::new(),
            labels: HashMap::new(),
            scheduling: Scheduling::standard(),
            deletion_protection: false,
        };

        tracing::info!("Creating instance {} in {}", spec.name, zone);
        tracing::debug!(
            "Instance body: {}",
            serde_json::to_string(&body).unwrap_or_default()
        );

        let operation = self.api.insert_instance(zone, &body).await?;
        self.poller
            .await_operation(&OperationScope::Zone(zone.clone()), &operation.name)
            .await?;

        let details = self.describe_instance(&spec.name, zone).await?;
        Ok(DeployedVm::from_details(&spec.name, details))
    }

    /// Instantiate a named template, overriding only name and network interface
    pub async fn create_instance_from_template(
        &self,
        name: &str,
        template_name: &str,
        subnet: &str,
    ) -> Result<DeployedVm> {
        let template = self.api.get_instance_template(template_name).await?;
        let zone = &self.settings.zone;

        let body = TemplateInstanceInsert {
            name: name.to_string(),
            network_interfaces: vec![NetworkInterface::with_external_nat(
                self.subnetwork_path(&self.settings.region, subnet),
            )],
        };

        tracing::info!(
            "Creating instance {} from template {} in {}",
            name,
            template_name,
            zone
        );

        let operation = self
            .api
            .insert_instance_from_template(zone, &body, &template.self_link)
            .await?;
        self.poller
            .await_operation(&OperationScope::Zone(zone.clone()), &operation.name)
            .await?;

        let details = self.describe_instance(name, zone).await?;
        Ok(DeployedVm::from_details(name, details))
    }

    /// Delete every subnet of `name`, one at a time, then the network itself
    ///
    /// The network delete is issued but not waited on.
    pub async fn delete_network(&self, name: &str, region: &str) -> Result<()> {
        let network = self.api.get_network(name).await?;
        let scope = OperationScope::Region(region.to_string());

        for link in &network.subnetworks {
            let subnet = resource_name(link);
            tracing::info!("Deleting subnet {} of network {}", subnet, name);
            let operation = self.api.delete_subnetwork(region, subnet).await?;
            self.poller.await_operation(&scope, &operation.name).await?;
        }

        let operation = self.api.delete_network(name).await?;
        tracing::info!(
            "Network {} delete issued (operation {}), not waiting",
            name,
            operation.name
        );
        Ok(())
    }

    pub async fn delete_instance(&self, name: &str, zone: &str) -> Result<()> {
        tracing::info!("Deleting instance {} in {}", name, zone);
        let operation = self.api.delete_instance(zone, name).await?;
        self.poller
            .await_operation(&OperationScope::Zone(zone.to_string()), &operation.name)
            .await?;
        Ok(())
    }

    /// Fetch an instance and extract its details
    pub async fn describe_instance(&self, name: &str, zone: &str) -> Result<VmDetails> {
        let instance = self.api.get_instance(zone, name).await?;
        Ok(extract_vm_details(&instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::PollConfig;
    use crate::testing::{Call, FakeCompute};
    use std::time::Duration;

    fn provisioner(fake: &Arc<FakeCompute>) -> ResourceProvisioner {
        let config = PollConfig {
            interval: Duration::from_millis(1),
            max_wait: None,
        };
        ResourceProvisioner::new(
            fake.clone(),
            OperationPoller::new(fake.clone(), config),
            ProvisionerSettings::default(),
        )
    }

    fn image_spec(source: &str) -> ImageInstanceSpec {
        ImageInstanceSpec {
            name: "web--abc123".to_string(),
            image_project: "debian-cloud".to_string(),
            image_id: "debian-12".to_string(),
            image_source: source.to_string(),
            machine_type: "e2-small".to_string(),
            disk_type: "Standard".to_string(),
            disk_size: "10GB".to_string(),
            subnet: "web-aaaaaa".to_string(),
        }
    }

    #[test]
    fn test_source_image_uri() {
        let public = source_image_uri("img1", "proj1", "public").unwrap();
        assert_eq!(public, "projects/proj1/global/images/img1");

        let private = source_image_uri("img1", "proj1", "private").unwrap();
        assert_eq!(private, "global/images/img1");
        assert!(!private.contains("proj1"));

        assert!(matches!(
            source_image_uri("img1", "proj1", "shared"),
            Err(CloudError::UnsupportedImageSource(s)) if s == "shared"
        ));
    }

    #[test]
    fn test_parse_disk_size() {
        assert_eq!(parse_disk_size("10GB").unwrap(), "10");
        assert_eq!(parse_disk_size(" 20 gb").unwrap(), "20");
        assert_eq!(parse_disk_size("30").unwrap(), "30");
        assert!(parse_disk_size("big").is_err());
    }

    #[tokio::test]
    async fn test_unsupported_image_source_makes_no_calls() {
        let fake = Arc::new(FakeCompute::new("proj1"));

        let err = provisioner(&fake)
            .create_instance(&image_spec("marketplace"))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::UnsupportedImageSource(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_network_returns_self_link() {
        let fake = Arc::new(FakeCompute::new("proj1"));

        let link = provisioner(&fake)
            .create_network("netvpc-r1", "REGIONAL", false)
            .await
            .unwrap();

        assert!(link.ends_with("/projects/proj1/global/networks/netvpc-r1"));
        let calls = fake.calls();
        assert_eq!(calls[0], Call::InsertNetwork("netvpc-r1".to_string()));
        assert!(matches!(
            &calls[1],
            Call::GetOperation { scope: OperationScope::Global, .. }
        ));
        assert_eq!(calls[2], Call::GetNetwork("netvpc-r1".to_string()));
    }

    #[tokio::test]
    async fn test_create_subnet_names_from_alias() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        let p = provisioner(&fake);
        let link = p.create_network("netvpc-r1", "REGIONAL", false).await.unwrap();

        let name = p
            .create_subnet("Web Tier", "10.0.1.0/24", &link, "us-west1")
            .await
            .unwrap();

        assert!(name.starts_with("web-tier-"));
        assert_eq!(name.len(), "web-tier-".len() + 6);
        assert_eq!(fake.network("netvpc-r1").unwrap().subnetworks.len(), 1);
    }

    #[tokio::test]
    async fn test_create_instance_body_and_result() {
        let fake = Arc::new(FakeCompute::new("proj1"));

        let vm = provisioner(&fake)
            .create_instance(&image_spec("public"))
            .await
            .unwrap();

        let body = fake.last_instance_body().unwrap();
        assert_eq!(body.machine_type, "projects/proj1/zones/us-west1-b/machineTypes/e2-small");
        assert_eq!(
            body.disks[0].initialize_params.source_image,
            "projects/debian-cloud/global/images/debian-12"
        );
        assert_eq!(
            body.disks[0].initialize_params.disk_type,
            "projects/proj1/zones/us-west1-b/diskTypes/pd-standard"
        );
        assert_eq!(body.disks[0].initialize_params.disk_size_gb, "10");
        assert_eq!(
            body.network_interfaces[0].subnetwork,
            "projects/proj1/regions/us-west1/subnetworks/web-aaaaaa"
        );
        assert!(!body.scheduling.preemptible);
        assert_eq!(body.scheduling.on_host_maintenance, "MIGRATE");
        assert!(body.scheduling.automatic_restart);

        assert_eq!(vm.name, "web--abc123");
        assert!(!vm.uuid.is_empty());
        assert_eq!(vm.address, vm.details.vm_network_data[0].private_ip_address);
        assert_eq!(vm.details.vm_network_data[0].network_id, "web-aaaaaa");
    }

    #[tokio::test]
    async fn test_create_instance_operation_error() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        fake.fail_operation("insert_instance", "web", serde_json::json!({"code": "ZONE_RESOURCE_POOL_EXHAUSTED"}));

        let err = provisioner(&fake)
            .create_instance(&image_spec("private"))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::OperationFailed { .. }));
    }

    #[tokio::test]
    async fn test_create_from_template_overlays_name_and_nic() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        fake.add_template("gpu-template");

        let vm = provisioner(&fake)
            .create_instance_from_template("gpu--a1a1a1", "gpu-template", "default")
            .await
            .unwrap();

        assert_eq!(vm.name, "gpu--a1a1a1");
        let calls = fake.calls();
        assert_eq!(calls[0], Call::GetInstanceTemplate("gpu-template".to_string()));
        match &calls[1] {
            Call::InsertInstanceFromTemplate { name, template, .. } => {
                assert_eq!(name, "gpu--a1a1a1");
                assert!(template.ends_with("/global/instanceTemplates/gpu-template"));
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_network_sequential_and_unawaited() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        let p = provisioner(&fake);
        let link = p.create_network("netvpc-r1", "REGIONAL", false).await.unwrap();
        p.create_subnet("a", "10.0.1.0/24", &link, "us-west1").await.unwrap();
        p.create_subnet("b", "10.0.2.0/24", &link, "us-west1").await.unwrap();
        fake.clear_calls();

        p.delete_network("netvpc-r1", "us-west1").await.unwrap();

        let calls = fake.calls();
        let kinds: Vec<&str> = calls.iter().map(Call::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "get_network",
                "delete_subnetwork",
                "get_operation",
                "delete_subnetwork",
                "get_operation",
                "delete_network",
            ]
        );
        assert!(fake.network("netvpc-r1").is_none());
    }

    #[tokio::test]
    async fn test_delete_instance_waits_in_zone() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        let p = provisioner(&fake);
        p.create_instance(&image_spec("public")).await.unwrap();
        fake.clear_calls();

        p.delete_instance("web--abc123", "us-west1-b").await.unwrap();

        let calls = fake.calls();
        assert!(matches!(&calls[0], Call::DeleteInstance { name, .. } if name == "web--abc123"));
        assert!(matches!(
            &calls[1],
            Call::GetOperation { scope: OperationScope::Zone(z), .. } if z == "us-west1-b"
        ));
    }
}
