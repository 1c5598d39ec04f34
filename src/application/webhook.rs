//! Parses gateway payment events and hands the classified outcome to the
//! settlement engine.
//!
//! Verifying that an event really came from the gateway happens before it
//! reaches this processor.

use super::checkout::metadata as keys;
use super::settlement::{
    ClassifiedPayment, PaymentOutcome, SettlementEngine, SettlementPurpose, SettlementReceipt,
};
use crate::domain::ids::{EventId, ServiceId, UserId};
use crate::domain::money::Amount;
use crate::error::{MarketplaceError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, error, info};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const PAYMENT_METHOD_ATTACHED: &str = "payment_method.attached";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentEvent {
    pub event_type: String,
    pub raw_payload: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}

#[derive(Deserialize)]
struct EventEnvelope<T> {
    data: EventData<T>,
}

#[derive(Deserialize)]
struct EventData<T> {
    object: T,
}

#[derive(Deserialize)]
struct SessionObject {
    client_reference_id: Option<String>,
    payment_intent: Option<IntentRef>,
    amount_total: Option<i64>,
    metadata: Option<HashMap<String, String>>,
}

/// `payment_intent` arrives as a bare id unless the event was expanded.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntentRef {
    Id(String),
    Expanded { id: String },
}

impl IntentRef {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

#[derive(Deserialize)]
struct IntentObject {
    id: String,
    amount: Option<i64>,
    metadata: Option<HashMap<String, String>>,
    last_payment_error: Option<PaymentError>,
}

#[derive(Deserialize)]
struct PaymentError {
    message: Option<String>,
}

/// Purpose precedence: `event_id`, then `service_id` with `vendor_id`, else a role upgrade.
pub fn classify_purpose(metadata: &HashMap<String, String>) -> Result<SettlementPurpose> {
    if let Some(event_id) = present(metadata, keys::EVENT_ID) {
        return Ok(SettlementPurpose::EventBooking {
            event_id: parse_id::<EventId>(keys::EVENT_ID, event_id)?,
        });
    }
    if let Some(service_id) = present(metadata, keys::SERVICE_ID) {
        let vendor_id = present(metadata, keys::VENDOR_ID).ok_or_else(|| {
            MarketplaceError::Internal("vendor booking payment without vendor_id".to_string())
        })?;
        let quoted_price = present(metadata, keys::QUOTED_PRICE)
            .map(|minor| {
                minor
                    .parse::<i64>()
                    .ok()
                    .and_then(|minor| Amount::from_minor_units(minor).ok())
                    .ok_or_else(|| {
                        MarketplaceError::Internal(format!(
                            "malformed {} in payment metadata: {minor}",
                            keys::QUOTED_PRICE
                        ))
                    })
            })
            .transpose()?;
        return Ok(SettlementPurpose::VendorBooking {
            vendor_id: parse_id::<UserId>(keys::VENDOR_ID, vendor_id)?,
            service_id: parse_id::<ServiceId>(keys::SERVICE_ID, service_id)?,
            quoted_price,
        });
    }
    Ok(SettlementPurpose::RoleUpgrade)
}

fn present<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_id<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| {
            MarketplaceError::Internal(format!("malformed {key} in payment metadata: {value}"))
        })
}

fn parse_payload<T: DeserializeOwned>(event_type: &str, raw: &str) -> Result<T> {
    serde_json::from_str::<EventEnvelope<T>>(raw)
        .map(|envelope| envelope.data.object)
        .map_err(|e| MarketplaceError::Internal(format!("unreadable {event_type} payload: {e}")))
}

fn minor_amount(value: Option<i64>, field: &str) -> Result<Amount> {
    let minor = value
        .ok_or_else(|| MarketplaceError::Internal(format!("payment event without {field}")))?;
    Amount::from_minor_units(minor)
        .map_err(|e| MarketplaceError::Internal(format!("payment event {field}: {e}")))
}

/// Entry point for gateway notifications.
pub struct PaymentEventProcessor {
    engine: SettlementEngine,
    role_upgrade_price: Amount,
}

impl PaymentEventProcessor {
    pub fn new(engine: SettlementEngine, role_upgrade_price: Amount) -> Self {
        Self {
            engine,
            role_upgrade_price,
        }
    }

    pub async fn handle(&self, event: &PaymentEvent) -> Result<WebhookAck> {
        let outcome = match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => self.completed_session(&event.raw_payload)?,
            PAYMENT_INTENT_FAILED => self.failed_intent(&event.raw_payload)?,
            PAYMENT_METHOD_ATTACHED => {
                debug!("payment method attached");
                return Ok(WebhookAck::success());
            }
            other => {
                debug!(event_type = other, "ignoring unhandled payment event");
                return Ok(WebhookAck::success());
            }
        };

        match self.engine.settle(outcome).await {
            Ok(SettlementReceipt::Settled { transaction_id }) => {
                info!(event_type = %event.event_type, %transaction_id, "payment event processed");
            }
            Ok(SettlementReceipt::AlreadySettled) => {
                info!(event_type = %event.event_type, "duplicate payment event acknowledged");
            }
            Err(e) => {
                error!(event_type = %event.event_type, error = %e, "payment event processing failed");
                return Err(e);
            }
        }
        Ok(WebhookAck::success())
    }

    fn completed_session(&self, raw: &str) -> Result<PaymentOutcome> {
        let session: SessionObject = parse_payload(CHECKOUT_SESSION_COMPLETED, raw)?;

        let user_id = session
            .client_reference_id
            .as_deref()
            .ok_or_else(|| {
                MarketplaceError::Internal("checkout session without client_reference_id".to_string())
            })
            .and_then(|id| parse_id::<UserId>("client_reference_id", id))?;
        let payment_intent_id = session
            .payment_intent
            .map(IntentRef::into_id)
            .ok_or_else(|| {
                MarketplaceError::Internal("checkout session without payment_intent".to_string())
            })?;
        let amount = minor_amount(session.amount_total, "amount_total")?;
        let purpose = classify_purpose(&session.metadata.unwrap_or_default())?;

        Ok(PaymentOutcome::Succeeded(ClassifiedPayment {
            user_id,
            payment_intent_id,
            amount,
            purpose,
        }))
    }

    fn failed_intent(&self, raw: &str) -> Result<PaymentOutcome> {
        let intent: IntentObject = parse_payload(PAYMENT_INTENT_FAILED, raw)?;
        let metadata = intent.metadata.unwrap_or_default();

        let user_id = present(&metadata, keys::USER_ID)
            .ok_or_else(|| {
                MarketplaceError::Internal(format!("payment intent {} without user_id", intent.id))
            })
            .and_then(|id| parse_id::<UserId>(keys::USER_ID, id))?;
        let purpose = classify_purpose(&metadata)?;
        let amount = match purpose {
            SettlementPurpose::RoleUpgrade => self.role_upgrade_price,
            _ => minor_amount(intent.amount, "amount")?,
        };

        let reason = intent
            .last_payment_error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "unknown".to_string());
        info!(payment_intent_id = %intent.id, %user_id, %reason, "payment failed");

        Ok(PaymentOutcome::Failed(ClassifiedPayment {
            user_id,
            payment_intent_id: intent.id,
            amount,
            purpose,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use rust_decimal_macros::dec;

    fn meta(pairs: &[(&str, String)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_event_id_takes_precedence() {
        let event_id = EventId::new();
        let metadata = meta(&[
            ("event_id", event_id.to_string()),
            ("service_id", ServiceId::new().to_string()),
            ("vendor_id", UserId::new().to_string()),
        ]);
        assert_eq!(
            classify_purpose(&metadata).unwrap(),
            SettlementPurpose::EventBooking { event_id }
        );
    }

    #[test]
    fn test_service_requires_vendor() {
        let service_id = ServiceId::new();
        let vendor_id = UserId::new();

        let metadata = meta(&[("service_id", service_id.to_string())]);
        assert_eq!(
            classify_purpose(&metadata).unwrap_err().code(),
            ErrorCode::Internal
        );

        let metadata = meta(&[
            ("service_id", service_id.to_string()),
            ("vendor_id", vendor_id.to_string()),
        ]);
        assert_eq!(
            classify_purpose(&metadata).unwrap(),
            SettlementPurpose::VendorBooking {
                vendor_id,
                service_id,
                quoted_price: None,
            }
        );
    }

    #[test]
    fn test_quoted_price_is_read_in_minor_units() {
        let service_id = ServiceId::new();
        let vendor_id = UserId::new();
        let mut metadata = meta(&[
            ("service_id", service_id.to_string()),
            ("vendor_id", vendor_id.to_string()),
            ("quoted_price", "50000".to_string()),
        ]);
        assert_eq!(
            classify_purpose(&metadata).unwrap(),
            SettlementPurpose::VendorBooking {
                vendor_id,
                service_id,
                quoted_price: Some(Amount::new(dec!(500)).unwrap()),
            }
        );

        for bad in ["500.00", "0", "-1"] {
            metadata.insert("quoted_price".to_string(), bad.to_string());
            assert_eq!(
                classify_purpose(&metadata).unwrap_err().code(),
                ErrorCode::Internal,
                "{bad}"
            );
        }
    }

    #[test]
    fn test_bare_metadata_is_role_upgrade() {
        let metadata = meta(&[
            ("user_id", UserId::new().to_string()),
            ("event_id", " ".to_string()),
        ]);
        assert_eq!(
            classify_purpose(&metadata).unwrap(),
            SettlementPurpose::RoleUpgrade
        );
    }

    #[test]
    fn test_intent_ref_accepts_both_shapes() {
        let bare: IntentRef = serde_json::from_str(r#""pi_1""#).unwrap();
        let expanded: IntentRef = serde_json::from_str(r#"{"id":"pi_2","amount":100}"#).unwrap();
        assert_eq!(bare.into_id(), "pi_1");
        assert_eq!(expanded.into_id(), "pi_2");
    }

    #[test]
    fn test_minor_amount() {
        assert_eq!(minor_amount(Some(250_000), "amount").unwrap().value(), dec!(2500));
        assert_eq!(
            minor_amount(None, "amount").unwrap_err().code(),
            ErrorCode::Internal
        );
        assert_eq!(
            minor_amount(Some(0), "amount").unwrap_err().code(),
            ErrorCode::Internal
        );
    }
}
