//! HTTP implementation of the property store client.
//!
//! Talks to the CMS property endpoints with the host session's bearer token:
//! `GET {base}/{scope}/properties/{namespace}.*` reads the namespace,
//! `PUT`/`DELETE {base}/{scope}/properties/{namespace}.{key}` write and
//! remove a single key.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{NAMESPACE, PropertiesApi, PropertiesError, PropertyMap, Scope};

/// Namespace read response from the property endpoint.
#[derive(Debug, Deserialize)]
struct NamespaceResponse {
    #[serde(default)]
    properties: PropertyMap,
}

/// Property store client over authenticated HTTP.
pub struct HttpPropertiesClient {
    http: reqwest::Client,
    base_url: String,
    auth: HeaderValue,
}

impl HttpPropertiesClient {
    /// Create a client for the given endpoint base, authenticated with the
    /// host page's session token.
    pub fn new(base_url: &str, session_token: &str) -> Result<Self, PropertiesError> {
        // Validate the base once so per-request URL building is just string
        // formatting.
        Url::parse(base_url)?;
        let bearer = format!("Bearer {session_token}");
        let auth =
            HeaderValue::from_str(&bearer).map_err(|_| PropertiesError::InvalidToken)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth.clone());
        headers
    }

    fn namespace_url(&self, scope: Scope) -> String {
        format!("{}/{}/properties/{NAMESPACE}.*", self.base_url, scope.as_path())
    }

    fn key_url(&self, scope: Scope, key: &str) -> String {
        format!("{}/{}/properties/{NAMESPACE}.{key}", self.base_url, scope.as_path())
    }
}

fn status_error(status: StatusCode, body: String) -> PropertiesError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return PropertiesError::Unauthorized {
            status: status.as_u16(),
        };
    }
    PropertiesError::Unavailable {
        reason: format!("status {}: {body}", status.as_u16()),
    }
}

#[async_trait]
impl PropertiesApi for HttpPropertiesClient {
    async fn read_namespace(&self, scope: Scope) -> Result<PropertyMap, PropertiesError> {
        let url = self.namespace_url(scope);
        let resp = self.http.get(&url).headers(self.auth_headers()).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(status_error(status, body));
        }

        let parsed: NamespaceResponse = serde_json::from_str(&body)?;
        let prefix = format!("{NAMESPACE}.");
        let mut map = PropertyMap::new();
        for (full_key, value) in parsed.properties {
            match full_key.strip_prefix(&prefix) {
                Some(leaf) => {
                    map.insert(leaf.to_string(), value);
                }
                None => {
                    tracing::debug!("Skipping property outside namespace: {full_key}");
                }
            }
        }
        Ok(map)
    }

    async fn write_key(
        &self,
        scope: Scope,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PropertiesError> {
        let url = self.key_url(scope, key);
        let resp = self
            .http
            .put(&url)
            .headers(self.auth_headers())
            .json(&json!({ "value": value }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(status_error(status, body));
        }
        Ok(())
    }

    async fn delete_key(&self, scope: Scope, key: &str) -> Result<(), PropertiesError> {
        let url = self.key_url(scope, key);
        let resp = self
            .http
            .delete(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status();
        // Deleting a key that was never written is a success.
        if status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(status_error(status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> HttpPropertiesClient {
        HttpPropertiesClient::new(base, "session-token").unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(HttpPropertiesClient::new("not a url", "tok").is_err());
    }

    #[test]
    fn test_key_urls() {
        let c = client("https://cms.example/api/");
        assert_eq!(
            c.namespace_url(Scope::User),
            "https://cms.example/api/user/properties/snipstudio.*"
        );
        assert_eq!(
            c.key_url(Scope::Site, "editor.theme"),
            "https://cms.example/api/site/properties/snipstudio.editor.theme"
        );
    }

    #[tokio::test]
    async fn test_read_namespace_strips_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/properties/snipstudio.*"))
            .and(header("authorization", "Bearer session-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "properties": {
                    "snipstudio.editor.theme": "hc-black",
                    "snipstudio.editor.fontSize": 16,
                    "othertool.flag": true,
                }
            })))
            .mount(&server)
            .await;

        let map = client(&server.uri())
            .read_namespace(Scope::User)
            .await
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["editor.theme"], serde_json::json!("hc-black"));
        assert_eq!(map["editor.fontSize"], serde_json::json!(16));
    }

    #[tokio::test]
    async fn test_read_namespace_empty_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site/properties/snipstudio.*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "properties": {}
            })))
            .mount(&server)
            .await;

        let map = client(&server.uri())
            .read_namespace(Scope::Site)
            .await
            .unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_read_namespace_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/properties/snipstudio.*"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .read_namespace(Scope::User)
            .await
            .unwrap_err();
        assert!(matches!(err, PropertiesError::Unavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_read_namespace_connection_refused_is_unavailable() {
        // Nothing listens here.
        let err = client("http://127.0.0.1:9")
            .read_namespace(Scope::User)
            .await
            .unwrap_err();
        assert!(matches!(err, PropertiesError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_write_key_puts_value() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/user/properties/snipstudio.editor.fontSize"))
            .and(body_json(serde_json::json!({ "value": 18 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri())
            .write_key(Scope::User, "editor.fontSize", &serde_json::json!(18))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_site_write_without_privilege_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/site/properties/snipstudio.editor.theme"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .write_key(Scope::Site, "editor.theme", &serde_json::json!("vs"))
            .await
            .unwrap_err();
        assert!(matches!(err, PropertiesError::Unauthorized { status: 403 }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_delete_key_tolerates_missing() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/user/properties/snipstudio.editor.theme"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        client(&server.uri())
            .delete_key(Scope::User, "editor.theme")
            .await
            .unwrap();
    }
}
