//! Instance deployment
//!
//! Deploying an app creates one instance and answers with one deploy result
//! followed by one connect result per requested subnet. Provisioning
//! failures become a failed deploy result; anything that goes wrong before
//! provisioning starts is returned as an error.

use crate::action::{
    ActionResult, ConnectSubnetAction, DeployAppAction, Deployment, ProvisioningAction,
};
use crate::error::{CloudError, Result};
use crate::naming;
use crate::network::NetworkAssignment;
use crate::provisioner::{DeployedVm, ImageInstanceSpec, ResourceProvisioner};

/// Deployment path of an image-based instance
pub const CUSTOM_VM_DEPLOYMENT: &str = "Google Cloud Provider.Google Cloud Custom VM";

/// Deployment path of a template-based instance
pub const TEMPLATE_VM_DEPLOYMENT: &str = "Google Cloud Provider.Google Cloud VM from Template";

/// Composes naming, subnet assignment, provisioning and detail extraction
#[derive(Clone)]
pub struct InstanceDeployer {
    provisioner: ResourceProvisioner,
}

impl InstanceDeployer {
    pub fn new(provisioner: ResourceProvisioner) -> Self {
        Self { provisioner }
    }

    /// Pick the provisioning path from the deployment path
    pub async fn deploy(
        &self,
        action: &DeployAppAction,
        connects: &[ConnectSubnetAction],
    ) -> Result<Vec<ActionResult>> {
        match action.action_params.deployment.deployment_path.as_str() {
            CUSTOM_VM_DEPLOYMENT => self.deploy_from_image(action, connects).await,
            TEMPLATE_VM_DEPLOYMENT => self.deploy_from_template(action, connects).await,
            other => {
                let e = CloudError::UnsupportedDeployment(other.to_string());
                tracing::error!("Deploy of {} rejected: {}", action.action_params.app_name, e);
                Err(e)
            }
        }
    }

    pub async fn deploy_from_image(
        &self,
        action: &DeployAppAction,
        connects: &[ConnectSubnetAction],
    ) -> Result<Vec<ActionResult>> {
        let app_name = &action.action_params.app_name;
        let name = naming::instance_name(app_name);
        let assignment = NetworkAssignment::from_connect_actions(connects)
            .inspect_err(|e| tracing::error!("Deploy of {} rejected: {}", app_name, e))?;
        let spec = image_spec(&name, &action.action_params.deployment, assignment.primary_subnet())
            .inspect_err(|e| tracing::error!("Deploy of {} rejected: {}", app_name, e))?;

        tracing::info!("Deploying {} as {} from image {}", app_name, name, spec.image_id);
        let outcome = self.provisioner.create_instance(&spec).await;
        Ok(assemble_results(action, connects, &assignment, outcome))
    }

    pub async fn deploy_from_template(
        &self,
        action: &DeployAppAction,
        connects: &[ConnectSubnetAction],
    ) -> Result<Vec<ActionResult>> {
        let app_name = &action.action_params.app_name;
        let name = naming::instance_name(app_name);
        let assignment = NetworkAssignment::from_connect_actions(connects)
            .inspect_err(|e| tracing::error!("Deploy of {} rejected: {}", app_name, e))?;
        let template_name = action
            .action_params
            .deployment
            .attribute("Template Name")
            .inspect_err(|e| tracing::error!("Deploy of {} rejected: {}", app_name, e))?;

        tracing::info!("Deploying {} as {} from template {}", app_name, name, template_name);
        let outcome = self
            .provisioner
            .create_instance_from_template(&name, template_name, assignment.primary_subnet())
            .await;
        Ok(assemble_results(action, connects, &assignment, outcome))
    }
}

fn image_spec(name: &str, deployment: &Deployment, subnet: &str) -> Result<ImageInstanceSpec> {
    Ok(ImageInstanceSpec {
        name: name.to_string(),
        image_project: deployment.attribute("Image Project")?.to_string(),
        image_id: deployment.attribute("Image Id")?.to_string(),
        image_source: deployment.attribute("Image Source")?.to_string(),
        machine_type: deployment.attribute("Machine Type")?.to_string(),
        disk_type: deployment.attribute("Disk Type")?.to_string(),
        disk_size: deployment.attribute("Disk Size")?.to_string(),
        subnet: subnet.to_string(),
    })
}

fn assemble_results(
    action: &DeployAppAction,
    connects: &[ConnectSubnetAction],
    assignment: &NetworkAssignment,
    outcome: Result<DeployedVm>,
) -> Vec<ActionResult> {
    let mut vm = match outcome {
        Ok(vm) => vm,
        Err(e) => {
            tracing::error!("Failed to deploy {}: {}", action.action_params.app_name, e);
            return vec![ProvisioningAction::DeployApp(action.clone()).failed(&e)];
        }
    };

    tracing::info!("Deployed {} ({}) at {}", vm.name, vm.uuid, vm.address);
    vm.details.app_name = Some(vm.name.clone());

    let mut results = Vec::with_capacity(connects.len() + 1);
    results.push(ActionResult::deploy_app(&action.action_id, vm));
    // Empty `connects` still gets the implicit default interface, but no result.
    results.extend(connects.iter().map(|connect| {
        match assignment.interface_index(&connect.action_params.subnet_id) {
            Some(index) => ActionResult::connect_subnet(&connect.action_id, index),
            None => ProvisioningAction::ConnectSubnet(connect.clone()).failed(format!(
                "subnet {} has no interface",
                connect.action_params.subnet_id
            )),
        }
    }));
    results
}
