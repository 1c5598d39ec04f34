use crate::config::GatewaySettings;
use crate::domain::ports::{CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use crate::error::{MarketplaceError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Hosted checkout through the Stripe REST API.
#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    r#type: Option<String>,
}

impl StripeGateway {
    pub fn new(settings: &GatewaySettings, secret_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_millis(settings.gateway_timeout_ms))
            .build()
            .map_err(|e| MarketplaceError::Gateway(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: settings.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
pub(crate) fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.unit_amount.to_minor_units().to_string(),
        ),
        (
            "line_items[0][quantity]".to_string(),
            request.quantity.to_string(),
        ),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "client_reference_id".to_string(),
            request.client_reference_id.clone(),
        ),
    ];

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| MarketplaceError::Gateway(format!("checkout request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => format!(
                    "{}: {}",
                    envelope.error.r#type.unwrap_or_else(|| "api_error".to_string()),
                    envelope.error.message.unwrap_or_default()
                ),
                Err(_) => "unreadable error body".to_string(),
            };
            return Err(MarketplaceError::Gateway(format!(
                "checkout session rejected with {status}: {detail}"
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| MarketplaceError::Gateway(format!("decoding checkout session: {e}")))?;
        let url = session.url.ok_or_else(|| {
            MarketplaceError::Gateway(format!("checkout session {} has no URL", session.id))
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}
