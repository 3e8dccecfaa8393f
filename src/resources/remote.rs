//! Resources read from the Keptn resource service

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{ResourceError, ResourceScope, ResourceStore};

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "resourceContent", default)]
    resource_content: String,
}

/// Client of the Keptn resource service
pub struct HttpResourceStore {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpResourceStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.api_token = (!token.is_empty()).then_some(token);
        self
    }

    fn resource_url(&self, scope: &ResourceScope, name: &str) -> String {
        let mut url = format!("{}/v1/project/{}", self.base_url, scope.project);
        if let Some(stage) = &scope.stage {
            url.push_str("/stage/");
            url.push_str(stage);
            if let Some(service) = &scope.service {
                url.push_str("/service/");
                url.push_str(service);
            }
        }
        url.push_str("/resource/");
        url.push_str(&name.replace('/', "%2F"));
        url
    }
}

#[async_trait]
impl ResourceStore for HttpResourceStore {
    async fn get_resource(
        &self,
        scope: &ResourceScope,
        name: &str,
    ) -> Result<Option<String>, ResourceError> {
        let url = self.resource_url(scope, name);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.header("x-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(scope = %scope, resource = name, "Resource not found");
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ResourceError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let resource: Resource = response
            .json()
            .await
            .map_err(|e| ResourceError::Decode(e.to_string()))?;
        let bytes = base64::decode(resource.resource_content.trim())
            .map_err(|e| ResourceError::Decode(e.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|e| ResourceError::Decode(e.to_string()))?;

        Ok(Some(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::{Json, Router};

    async fn resource_service(headers: HeaderMap, uri: Uri) -> axum::response::Response {
        if headers.get("x-token").and_then(|v| v.to_str().ok()) != Some("secret") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        match uri.path() {
            "/v1/project/proj/stage/qa/service/svc/resource/splunk%2Fsli.yaml" => Json(
                serde_json::json!({
                    "resourceURI": "splunk/sli.yaml",
                    "resourceContent": base64::encode("indicators:\n  count: x | stats count\n"),
                }),
            )
            .into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn spawn_service() -> String {
        let router = Router::new().fallback(resource_service);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_resource_url() {
        let store = HttpResourceStore::new("http://resource-service:8080/");
        assert_eq!(
            store.resource_url(&ResourceScope::project("proj"), "shipyard.yaml"),
            "http://resource-service:8080/v1/project/proj/resource/shipyard.yaml"
        );
        assert_eq!(
            store.resource_url(&ResourceScope::service("proj", "qa", "svc"), "splunk/sli.yaml"),
            "http://resource-service:8080/v1/project/proj/stage/qa/service/svc/resource/splunk%2Fsli.yaml"
        );
    }

    #[tokio::test]
    async fn test_fetch_and_decode() {
        let store = HttpResourceStore::new(spawn_service().await).with_api_token("secret");
        let scope = ResourceScope::service("proj", "qa", "svc");

        let content = store.get_resource(&scope, "splunk/sli.yaml").await.unwrap();
        assert_eq!(content.unwrap(), "indicators:\n  count: x | stats count\n");

        let missing = store.get_resource(&scope, "remediation.yaml").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let store = HttpResourceStore::new(spawn_service().await);
        let result = store
            .get_resource(&ResourceScope::project("proj"), "shipyard.yaml")
            .await;

        assert!(matches!(result, Err(ResourceError::Http { status: 401, .. })));
    }
}
