//! Compute Engine REST client

use crate::auth::{ServiceAccountKey, TokenProvider};
use crate::error::{GcpError, Result};
use async_trait::async_trait;
use sandboxflow_cloud::compute::{
    AuthStatus, ComputeApi, Instance, InstanceInsert, InstanceTemplate, Network, NetworkInsert,
    Operation, SubnetworkInsert, TemplateInstanceInsert,
};
use sandboxflow_cloud::{CloudError, OperationScope};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Compute Engine v1 endpoint
pub const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// [`ComputeApi`] over the Compute Engine REST API
pub struct GceClient {
    client: reqwest::Client,
    tokens: TokenProvider,
    project: String,
    base: String,
}

impl GceClient {
    pub fn new(key: ServiceAccountKey, project: impl Into<String>) -> Self {
        let client = reqwest::Client::new();
        Self {
            tokens: TokenProvider::new(key, client.clone()),
            client,
            project: project.into(),
            base: COMPUTE_API_BASE.to_string(),
        }
    }

    /// Load a key file; `project` defaults to the key's `project_id`
    pub async fn from_credentials_file(path: &Path, project: Option<String>) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path).await?;
        let project = project
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| {
                GcpError::InvalidCredentials(format!(
                    "{}: no project_id and no project configured",
                    path.display()
                ))
            })?;
        Ok(Self::new(key, project))
    }

    /// Point the client at another endpoint
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn project_url(&self, path: &str) -> String {
        format!("{}/projects/{}/{}", self.base, self.project, path)
    }

    fn operation_url(&self, scope: &OperationScope, name: &str) -> String {
        match scope {
            OperationScope::Zone(zone) => {
                self.project_url(&format!("zones/{}/operations/{}", zone, name))
            }
            OperationScope::Region(region) => {
                self.project_url(&format!("regions/{}/operations/{}", region, name))
            }
            OperationScope::Global => self.project_url(&format!("global/operations/{}", name)),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(GcpError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        self.send(self.client.get(url)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        tracing::debug!("POST {} {}", url, serde_json::to_string(body).unwrap_or_default());
        self.send(self.client.post(url).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(url)).await
    }
}

#[async_trait]
impl ComputeApi for GceClient {
    fn project(&self) -> &str {
        &self.project
    }

    async fn check_auth(&self) -> sandboxflow_cloud::Result<AuthStatus> {
        let url = self.project_url("global/healthChecks");
        match self.get::<serde_json::Value>(&url).await {
            Ok(_) => Ok(AuthStatus::ok(format!(
                "{} (project {})",
                self.tokens.client_email(),
                self.project
            ))),
            Err(e) => {
                tracing::warn!("Connectivity check failed: {}", e);
                Ok(AuthStatus::failed(e.to_string()))
            }
        }
    }

    async fn insert_network(&self, network: &NetworkInsert) -> sandboxflow_cloud::Result<Operation> {
        Ok(self.post(&self.project_url("global/networks"), network).await?)
    }

    async fn get_network(&self, name: &str) -> sandboxflow_cloud::Result<Network> {
        Ok(self.get(&self.project_url(&format!("global/networks/{}", name))).await?)
    }

    async fn delete_network(&self, name: &str) -> sandboxflow_cloud::Result<Operation> {
        Ok(self
            .delete(&self.project_url(&format!("global/networks/{}", name)))
            .await?)
    }

    async fn insert_subnetwork(
        &self,
        region: &str,
        subnetwork: &SubnetworkInsert,
    ) -> sandboxflow_cloud::Result<Operation> {
        let url = self.project_url(&format!("regions/{}/subnetworks", region));
        Ok(self.post(&url, subnetwork).await?)
    }

    async fn delete_subnetwork(&self, region: &str, name: &str) -> sandboxflow_cloud::Result<Operation> {
        let url = self.project_url(&format!("regions/{}/subnetworks/{}", region, name));
        Ok(self.delete(&url).await?)
    }

    async fn get_instance_template(&self, name: &str) -> sandboxflow_cloud::Result<InstanceTemplate> {
        let url = self.project_url(&format!("global/instanceTemplates/{}", name));
        Ok(self.get(&url).await?)
    }

    async fn insert_instance(
        &self,
        zone: &str,
        instance: &InstanceInsert,
    ) -> sandboxflow_cloud::Result<Operation> {
        let url = self.project_url(&format!("zones/{}/instances", zone));
        Ok(self.post(&url, instance).await?)
    }

    async fn insert_instance_from_template(
        &self,
        zone: &str,
        instance: &TemplateInstanceInsert,
        source_template: &str,
    ) -> sandboxflow_cloud::Result<Operation> {
        let url = self.project_url(&format!("zones/{}/instances", zone));
        tracing::debug!("POST {} from template {}", url, source_template);
        let request = self
            .client
            .post(&url)
            .query(&[("sourceInstanceTemplate", source_template)])
            .json(instance);
        Ok(self.send(request).await?)
    }

    async fn get_instance(&self, zone: &str, name: &str) -> sandboxflow_cloud::Result<Instance> {
        let url = self.project_url(&format!("zones/{}/instances/{}", zone, name));
        Ok(self.get(&url).await?)
    }

    async fn delete_instance(&self, zone: &str, name: &str) -> sandboxflow_cloud::Result<Operation> {
        let url = self.project_url(&format!("zones/{}/instances/{}", zone, name));
        Ok(self.delete(&url).await?)
    }

    async fn get_operation(
        &self,
        scope: &OperationScope,
        name: &str,
    ) -> sandboxflow_cloud::Result<Operation> {
        self.get(&self.operation_url(scope, name))
            .await
            .map_err(CloudError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GceClient {
        let key = ServiceAccountKey {
            key_type: "service_account".to_string(),
            project_id: None,
            private_key_id: None,
            private_key: String::new(),
            client_email: "sa@proj1.iam.gserviceaccount.com".to_string(),
            token_uri: "http://localhost/token".to_string(),
        };
        GceClient::new(key, "proj1").with_api_base("http://localhost:9999/compute/v1/")
    }

    #[test]
    fn test_operation_urls() {
        let c = client();
        assert_eq!(
            c.operation_url(&OperationScope::Zone("us-west1-b".into()), "op-1"),
            "http://localhost:9999/compute/v1/projects/proj1/zones/us-west1-b/operations/op-1"
        );
        assert_eq!(
            c.operation_url(&OperationScope::Region("us-west1".into()), "op-2"),
            "http://localhost:9999/compute/v1/projects/proj1/regions/us-west1/operations/op-2"
        );
        assert_eq!(
            c.operation_url(&OperationScope::Global, "op-3"),
            "http://localhost:9999/compute/v1/projects/proj1/global/operations/op-3"
        );
    }

    #[tokio::test]
    async fn test_project_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(
            &path,
            r#"{"type": "service_account", "private_key": "x", "client_email": "sa@x"}"#,
        )
        .unwrap();

        assert!(GceClient::from_credentials_file(&path, None).await.is_err());
        let c = GceClient::from_credentials_file(&path, Some("proj9".to_string()))
            .await
            .unwrap();
        assert_eq!(c.project(), "proj9");
    }
}
