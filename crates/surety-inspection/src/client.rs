//! HTTP client for the inspection-provider API.
//!
//! Handles request construction, bearer-token authentication, response
//! decoding, and error categorization for every provider operation the
//! workflows use: creating goods and people inspections, attaching goods,
//! issuing image-upload tokens, finishing an inspection, and retrieving a
//! verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info_span, Instrument};

use crate::error::{InspectionError, Result};

/// Configuration for the inspection-provider client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the provider API.
    pub base_url: String,
    /// API key sent as a bearer token on every call.
    pub api_key: String,
    /// Default timeout for HTTP requests.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.inspection-provider.example".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: "Surety/1.0".to_string(),
        }
    }
}

/// Identity fields the provider addresses the inspection to.
///
/// Mirrors the customer/user record the workflow created locally; the
/// provider uses the email to host the inspection session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumer {
    /// Contact email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// National identification number.
    pub identification: String,
}

/// Parameters for creating a goods inspection.
#[derive(Debug, Clone)]
pub struct GoodsInspectionParams {
    /// Local policy ID, carried as opaque metadata and echoed back by the
    /// completion webhook.
    pub policy_id: String,
    /// Producer-side internal ID (the local customer ID).
    pub producer_internal_id: String,
    /// Person the inspection is addressed to.
    pub consumer: Consumer,
    /// Inspection template to instantiate.
    pub template_id: String,
}

/// Parameters for creating a people inspection.
#[derive(Debug, Clone)]
pub struct PeopleInspectionParams {
    /// Local user ID, carried as opaque metadata.
    pub user_id: String,
    /// Locale for the hosted inspection flow.
    pub locale: String,
    /// URL the hosted flow redirects back to when the person finishes.
    pub callback_url: String,
    /// Person the inspection is addressed to.
    pub consumer: Consumer,
    /// Inspection template to instantiate.
    pub template_id: String,
}

/// A good submitted to an existing inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionGood {
    /// Catalog category (e.g. "electronics").
    pub category: String,
    /// Catalog kind within the category (e.g. "mobile").
    pub kind: String,
    /// Manufacturer, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    /// Model, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Declared value in minor currency units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

/// Parameters for an image-upload token request.
#[derive(Debug, Clone, Serialize)]
pub struct ImageTokenParams {
    /// Provider-assigned product inspection ID the upload is scoped to.
    pub product_id: String,
    /// Capture side (e.g. "front", "back").
    pub side: String,
    /// Crop coordinates, passed through to the provider untouched.
    pub coordinates: Value,
}

/// A newly created inspection.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedInspection {
    /// Provider-assigned inspection ID.
    pub inspection_id: String,
}

/// A newly created people inspection with its hosted flow link.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPeopleInspection {
    /// Provider-assigned inspection ID.
    pub inspection_id: String,
    /// URL of the provider-hosted inspection flow.
    pub magic_link: String,
}

/// Current state of an inspection, as retrieved from the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Inspection {
    /// Provider-assigned inspection ID.
    pub inspection_id: String,
    /// Provider-side status string.
    pub status: String,
    /// Pass/fail determination, present once the inspection completed.
    pub verdict: Option<String>,
    /// Metadata echoed back from inspection creation.
    #[serde(default)]
    pub metadata: Value,
}

impl Inspection {
    /// Whether the provider approved this inspection.
    pub fn is_approved(&self) -> bool {
        self.verdict.as_deref() == Some("approved")
    }
}

#[derive(Debug, Deserialize)]
struct AddGoodsResponse {
    product_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImageTokenResponse {
    token: String,
}

/// HTTP client for the inspection provider.
///
/// Cheap to clone; the underlying connection pool is shared. Every call
/// authenticates with the configured API key and runs under a tracing span
/// naming the operation.
#[derive(Debug, Clone)]
pub struct InspectionClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl InspectionClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `InspectionError::Configuration` if the HTTP client cannot be
    /// built from the settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                InspectionError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a goods inspection and returns its provider-assigned ID.
    ///
    /// The inspection starts in `started` status with provider notifications
    /// disabled; communication with the customer stays under local control.
    /// The policy ID travels as metadata so the completion webhook can be
    /// correlated back.
    ///
    /// # Errors
    ///
    /// Returns categorized errors for network failures, timeouts, non-2xx
    /// responses, and undecodable bodies.
    pub async fn create_goods_inspection(
        &self,
        params: GoodsInspectionParams,
    ) -> Result<CreatedInspection> {
        let span = info_span!("create_goods_inspection", policy_id = %params.policy_id);

        let body = serde_json::json!({
            "initial_status": "started",
            "delivery": { "disabled": true },
            "metadata": { "policy_id": params.policy_id },
            "producer": { "internal_id": params.producer_internal_id },
            "consumer": params.consumer,
            "template_id": params.template_id,
        });

        async move {
            tracing::debug!("Creating goods inspection");
            self.post_json("/v1/inspections/goods", &body).await
        }
        .instrument(span)
        .await
    }

    /// Submits goods to an existing inspection.
    ///
    /// Returns one provider-assigned product ID per submitted good, in
    /// submission order (the provider's documented response contract).
    ///
    /// # Errors
    ///
    /// Returns `InspectionError::Decode` when the provider answers with a
    /// different number of product IDs than goods submitted.
    pub async fn add_goods(
        &self,
        inspection_id: &str,
        goods: &[InspectionGood],
    ) -> Result<Vec<String>> {
        let span = info_span!("add_goods", inspection_id, count = goods.len());

        let body = serde_json::json!({ "goods": goods });
        let path = format!("/v1/inspections/{inspection_id}/goods");

        async move {
            tracing::debug!("Adding goods to inspection");
            let response: AddGoodsResponse = self.post_json(&path, &body).await?;

            if response.product_ids.len() != goods.len() {
                return Err(InspectionError::decode(format!(
                    "expected {} product ids, provider returned {}",
                    goods.len(),
                    response.product_ids.len()
                )));
            }

            Ok(response.product_ids)
        }
        .instrument(span)
        .await
    }

    /// Requests a single-use image-upload token scoped to one product.
    pub async fn generate_image_token(&self, params: ImageTokenParams) -> Result<String> {
        let span = info_span!("generate_image_token", product_id = %params.product_id);

        async move {
            tracing::debug!("Requesting image upload token");
            let response: ImageTokenResponse = self.post_json("/v1/images/token", &params).await?;
            Ok(response.token)
        }
        .instrument(span)
        .await
    }

    /// Signals to the provider that image capture for an inspection is done.
    ///
    /// No local state changes at this step; the verdict arrives later via
    /// webhook.
    pub async fn finish_inspection(&self, inspection_id: &str) -> Result<()> {
        let span = info_span!("finish_inspection", inspection_id);
        let path = format!("/v1/inspections/{inspection_id}/finish");

        async move {
            tracing::debug!("Finishing inspection");
            let response = self
                .client
                .post(self.url(&path))
                .bearer_auth(&self.config.api_key)
                .json(&serde_json::json!({}))
                .send()
                .await
                .map_err(|e| self.categorize_send_error(&e))?;

            Self::ensure_success(response).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Creates a people inspection and returns its hosted magic link.
    ///
    /// The callback URL points back at this service; the provider redirects
    /// the person there once they complete the hosted flow.
    pub async fn create_people_inspection(
        &self,
        params: PeopleInspectionParams,
    ) -> Result<CreatedPeopleInspection> {
        let span = info_span!("create_people_inspection", user_id = %params.user_id);

        let body = serde_json::json!({
            "locale": params.locale,
            "callback_url": params.callback_url,
            "initial_status": "started",
            "delivery": { "disabled": true },
            "metadata": { "user_id": params.user_id },
            "producer": { "internal_id": params.user_id },
            "consumer": params.consumer,
            "template_id": params.template_id,
        });

        async move {
            tracing::debug!("Creating people inspection");
            self.post_json("/v1/inspections/people", &body).await
        }
        .instrument(span)
        .await
    }

    /// Retrieves the current state of an inspection, including its verdict.
    pub async fn retrieve_inspection(&self, inspection_id: &str) -> Result<Inspection> {
        let span = info_span!("retrieve_inspection", inspection_id);
        let path = format!("/v1/inspections/{inspection_id}");

        async move {
            tracing::debug!("Retrieving inspection");
            let response = self
                .client
                .get(self.url(&path))
                .bearer_auth(&self.config.api_key)
                .send()
                .await
                .map_err(|e| self.categorize_send_error(&e))?;

            let response = Self::ensure_success(response).await?;
            response
                .json()
                .await
                .map_err(|e| InspectionError::decode(e.to_string()))
        }
        .instrument(span)
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.categorize_send_error(&e))?;

        let response = Self::ensure_success(response).await?;
        response.json().await.map_err(|e| InspectionError::decode(e.to_string()))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Bound the body we keep; it only feeds logs. Truncation happens on
        // the raw bytes, so a multi-byte character split at the cut is
        // rendered lossily rather than panicking on a char boundary.
        const MAX_ERROR_BODY: usize = 1024;
        let bytes = response.bytes().await.unwrap_or_default();
        let body = if bytes.len() > MAX_ERROR_BODY {
            format!("{}... (truncated)", String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY]))
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        tracing::warn!(status = status.as_u16(), "Provider returned error response");
        Err(InspectionError::http_status(status.as_u16(), body))
    }

    fn categorize_send_error(&self, error: &reqwest::Error) -> InspectionError {
        if error.is_timeout() {
            return InspectionError::timeout(self.config.timeout.as_secs());
        }
        if error.is_connect() {
            return InspectionError::network(format!("connection failed: {error}"));
        }
        InspectionError::network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(base_url: String) -> InspectionClient {
        InspectionClient::new(ClientConfig {
            base_url,
            api_key: "sk_test_123".to_string(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    fn test_consumer() -> Consumer {
        Consumer {
            email: "a@x.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: None,
            identification: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn create_goods_inspection_sends_metadata_and_auth() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/inspections/goods"))
            .and(matchers::header("authorization", "Bearer sk_test_123"))
            .and(matchers::body_json_string(
                serde_json::json!({
                    "initial_status": "started",
                    "delivery": { "disabled": true },
                    "metadata": { "policy_id": "pol_1" },
                    "producer": { "internal_id": "cus_1" },
                    "consumer": {
                        "email": "a@x.com",
                        "first_name": "Ana",
                        "identification": "123"
                    },
                    "template_id": "tpl_goods",
                })
                .to_string(),
            ))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "inspection_id": "ins_1" })),
            )
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let created = client
            .create_goods_inspection(GoodsInspectionParams {
                policy_id: "pol_1".to_string(),
                producer_internal_id: "cus_1".to_string(),
                consumer: test_consumer(),
                template_id: "tpl_goods".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.inspection_id, "ins_1");
    }

    #[tokio::test]
    async fn add_goods_returns_product_ids_in_order() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/inspections/ins_1/goods"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "product_ids": ["prd_1", "prd_2"]
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let goods = vec![
            InspectionGood {
                category: "electronics".to_string(),
                kind: "mobile".to_string(),
                make: Some("Apple".to_string()),
                model: None,
                price: Some(100),
            },
            InspectionGood {
                category: "home".to_string(),
                kind: "tv".to_string(),
                make: None,
                model: None,
                price: None,
            },
        ];

        let ids = client.add_goods("ins_1", &goods).await.unwrap();
        assert_eq!(ids, ["prd_1", "prd_2"]);
    }

    #[tokio::test]
    async fn add_goods_rejects_mismatched_product_count() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "product_ids": ["prd_1"]
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let goods = vec![
            InspectionGood {
                category: "home".to_string(),
                kind: "tv".to_string(),
                make: None,
                model: None,
                price: None,
            };
            2
        ];

        let result = client.add_goods("ins_1", &goods).await;
        assert!(matches!(result, Err(InspectionError::Decode { .. })));
    }

    #[tokio::test]
    async fn non_success_status_becomes_http_status_error() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/inspections/ins_404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such inspection"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let result = client.retrieve_inspection("ins_404").await;

        match result {
            Err(InspectionError::HttpStatus { status_code, body }) => {
                assert_eq!(status_code, 404);
                assert_eq!(body, "no such inspection");
            },
            other => panic!("expected HttpStatus error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_error_body_is_truncated_without_panicking() {
        let server = MockServer::start().await;

        // Two-byte character straddling the truncation point
        let body = format!("{}é", "x".repeat(1023));
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/inspections/ins_500"))
            .respond_with(ResponseTemplate::new(500).set_body_string(body))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let result = client.retrieve_inspection("ins_500").await;

        match result {
            Err(InspectionError::HttpStatus { status_code, body }) => {
                assert_eq!(status_code, 500);
                assert!(body.ends_with("... (truncated)"));
            },
            other => panic!("expected HttpStatus error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retrieve_inspection_decodes_verdict_and_metadata() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/inspections/ins_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "inspection_id": "ins_1",
                "status": "completed",
                "verdict": "approved",
                "metadata": { "user_id": "usr_1" }
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let inspection = client.retrieve_inspection("ins_1").await.unwrap();

        assert!(inspection.is_approved());
        assert_eq!(inspection.metadata["user_id"], "usr_1");
    }

    #[tokio::test]
    async fn finish_inspection_posts_to_finish_path() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/inspections/ins_1/finish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        client.finish_inspection("ins_1").await.unwrap();
    }
}
