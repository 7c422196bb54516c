//! HTTP client for the facade API.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use orchestrator_shared_types::validate_name;

use crate::error::{CliError, Result};

pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Build a path from validated name segments, so a stray `/` or `?` in a
    /// name cannot address another route.
    pub fn path(&self, template: &[PathPart<'_>]) -> Result<String> {
        let mut path = String::new();
        for part in template {
            path.push('/');
            match part {
                PathPart::Fixed(s) => path.push_str(s),
                PathPart::Name(field, value) => {
                    validate_name(field, value)
                        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
                    path.push_str(value);
                }
            }
        }
        Ok(path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::PUT, path)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::DELETE, path)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let url = self.base_url.clone();
        let response = builder
            .send()
            .await
            .map_err(|source| CliError::Request { url, source })?;
        decode(response).await
    }
}

/// One segment of a request path.
#[derive(Debug, Clone, Copy)]
pub enum PathPart<'a> {
    Fixed(&'static str),
    /// A user-supplied name and the field it names, for error messages.
    Name(&'static str, &'a str),
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CliError::Decode(e.to_string()))?;

    if !status.is_success() {
        return Err(CliError::Api {
            status,
            body: body.trim_end().to_string(),
        });
    }
    serde_json::from_str(&body).map_err(|e| CliError::Decode(format!("{e}: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_shared_types::{MessageResponse, ResizeVmRequest};
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_put_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/teams/teamA/vm/vm1/resize"))
            .and(body_json(json!({ "flavorId": "f2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Flavor for VM 'vm1' updated successfully."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let response: MessageResponse = client
            .put(
                "/teams/teamA/vm/vm1/resize",
                &ResizeVmRequest {
                    flavor_id: "f2".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(response.message, "Flavor for VM 'vm1' updated successfully.");
    }

    #[tokio::test]
    async fn test_error_status_keeps_plain_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/teams/teamA/vm/vm1/start"))
            .respond_with(ResponseTemplate::new(409).set_body_string(
                "VM 'vm1' is currently busy (task_state: powering-on). Try again later.\n",
            ))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let err = client
            .put_empty::<MessageResponse>("/teams/teamA/vm/vm1/start")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert_eq!(
            err.to_string(),
            "server returned 409 Conflict: VM 'vm1' is currently busy (task_state: powering-on). Try again later."
        );
    }

    #[test]
    fn test_path_rejects_unsafe_names() {
        let client = ApiClient::new("http://localhost:8080/");
        let ok = client
            .path(&[
                PathPart::Fixed("teams"),
                PathPart::Name("team", "teamA"),
                PathPart::Fixed("vm"),
                PathPart::Name("vm", "vm1"),
            ])
            .unwrap();
        assert_eq!(ok, "/teams/teamA/vm/vm1");

        let err = client
            .path(&[PathPart::Fixed("teams"), PathPart::Name("team", "../admin")])
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
