//! Instance lifecycle endpoints

use async_trait::async_trait;
use serde::Deserialize;

use ignis_core::spec::{CreatedInstance, Instance, InstanceSpec};

use crate::error::Result;
use crate::{BackendClient, HttpBackendClient};

#[derive(Debug, Deserialize)]
struct ListResponse {
    instances: Vec<Instance>,
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    /// POST /v1/instances
    async fn create(&self, spec: &InstanceSpec) -> Result<CreatedInstance> {
        let url = format!("{}/v1/instances", self.base_url());
        let response = self.client.post(&url).json(spec).send().await?;

        self.handle_response(response).await
    }

    /// GET /v1/instances?name=..&namespace=..
    async fn list(&self, name: &str, namespace: &str) -> Result<Vec<Instance>> {
        let url = format!("{}/v1/instances", self.base_url());
        let response = self
            .client
            .get(&url)
            .query(&[("name", name), ("namespace", namespace)])
            .send()
            .await?;

        let list: ListResponse = self.handle_response(response).await?;
        Ok(list.instances)
    }

    /// DELETE /v1/instances/{uid}
    async fn delete(&self, uid: &str) -> Result<()> {
        let url = format!("{}/v1/instances/{}", self.base_url(), uid);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    /// The HTTP transport has no session to tear down; dropping the client
    /// releases its pooled connections. Kept so callers exercise the same
    /// release discipline a stateful transport would require.
    async fn close(&self) -> Result<()> {
        tracing::trace!(host = %self.base_url(), "closing backend client");
        Ok(())
    }
}
