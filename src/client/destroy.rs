use super::uploader::signed_form;
use super::{provider_error_message, transport_failure, SignatureSource};
use crate::models::{ClientConfig, ParamSet, SignatureKind};
use crate::{Error, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Nothing to delete; no request was made.
    Skipped(&'static str),
    /// The destroy request was sent for this identifier.
    Requested(String),
}

/// Ask the provider to delete `public_id`.
///
/// Fire-and-forget: once the signed destroy request completes, the
/// identifier is returned whatever status the provider answered with.
pub async fn destroy(
    http: &Client,
    config: &ClientConfig,
    signer: &dyn SignatureSource,
    public_id: &str,
) -> Result<DestroyOutcome> {
    if public_id.is_empty() {
        debug!("Destroy called without a public_id; skipping");
        return Ok(DestroyOutcome::Skipped("No public_id provided"));
    }

    let api_key = config
        .provider
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Configuration("public API key is not configured".to_string()))?;

    let intent = ParamSet::new().with("public_id", public_id);
    let signed = signer
        .request_signature(SignatureKind::Destroy, &intent)
        .await?;

    let response = http
        .post(config.provider.destroy_url())
        .multipart(signed_form(signed, api_key))
        .send()
        .await
        .map_err(transport_failure)?;

    let status = response.status();
    if status.is_success() {
        info!("Requested destroy of {}", public_id);
    } else {
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Destroy of {} returned status {}: {}",
            public_id,
            status,
            provider_error_message(&body)
        );
    }

    Ok(DestroyOutcome::Requested(public_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockSignatureSource;
    use crate::models::{ParamValue, ProviderConfig};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ClientConfig {
        ClientConfig::new(
            ProviderConfig::new("demo", Some("public-key".to_string()))
                .with_api_base(server.uri()),
        )
    }

    #[tokio::test]
    async fn test_empty_public_id_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let signer = MockSignatureSource::new();
        let outcome = destroy(&Client::new(), &config(&server), &signer, "")
            .await
            .unwrap();

        assert_eq!(outcome, DestroyOutcome::Skipped("No public_id provided"));
        assert_eq!(signer.get_request_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_posts_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/destroy"))
            .and(body_string_contains("name=\"public_id\"\r\n\r\nsa/abc123\r\n"))
            .and(body_string_contains("name=\"timestamp\"\r\n\r\n1700000000\r\n"))
            .and(body_string_contains("name=\"api_key\"\r\n\r\npublic-key\r\n"))
            .and(body_string_contains("name=\"signature\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let signer = MockSignatureSource::new();
        let outcome = destroy(&Client::new(), &config(&server), &signer, "sa/abc123")
            .await
            .unwrap();

        assert_eq!(outcome, DestroyOutcome::Requested("sa/abc123".to_string()));

        let requests = signer.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, SignatureKind::Destroy);
        assert_eq!(
            requests[0].1.get("public_id"),
            Some(&ParamValue::from("sa/abc123"))
        );
    }

    #[tokio::test]
    async fn test_provider_failure_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/destroy"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"message": "Resource not found"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = destroy(
            &Client::new(),
            &config(&server),
            &MockSignatureSource::new(),
            "sa/missing",
        )
        .await
        .unwrap();

        assert_eq!(outcome, DestroyOutcome::Requested("sa/missing".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_provider_propagates_status_zero() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::new(
            ProviderConfig::new("demo", Some("public-key".to_string()))
                .with_api_base(format!("http://{}", addr)),
        );

        let err = destroy(&Client::new(), &config, &MockSignatureSource::new(), "sa/abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport { status: 0, .. }));
    }

    #[tokio::test]
    async fn test_signing_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = destroy(
            &Client::new(),
            &config(&server),
            &MockSignatureSource::new().failing_with(503),
            "sa/abc123",
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), Some(503));
    }
}
