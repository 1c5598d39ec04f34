#![allow(dead_code)]

use chrono::{NaiveTime, Utc};
use eventpay::application::checkout::{CheckoutRequest, CheckoutResponse, ProductType};
use eventpay::application::marketplace::Marketplace;
use eventpay::application::webhook::{PaymentEvent, WebhookAck};
use eventpay::config::Settings;
use eventpay::domain::catalog::{EventListing, UserProfile, UserRole, VendorService};
use eventpay::domain::ids::{BookingId, EventId, ServiceId, UserId};
use eventpay::domain::money::Amount;
use eventpay::domain::ports::{CatalogRegistry, LedgerQueries};
use eventpay::domain::wallet::WalletOwner;
use eventpay::error::{MarketplaceError, Result};
use eventpay::infrastructure::in_memory::InMemoryStore;
use eventpay::infrastructure::simulated::SimulatedGateway;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// A marketplace on the in-memory store and the simulated gateway.
pub struct Harness {
    pub market: Marketplace,
    pub store: Arc<InMemoryStore>,
    pub gateway: SimulatedGateway,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = SimulatedGateway::new();
        let market = Marketplace::new(store.clone(), Arc::new(gateway.clone()), &settings)
            .expect("valid settings");
        Self {
            market,
            store,
            gateway,
        }
    }

    pub async fn user(&self, role: UserRole) -> UserId {
        let user_id = UserId::new();
        self.store
            .register_user(UserProfile {
                user_id,
                name: format!("{role:?} {user_id}"),
                role,
                is_master_of_ceremony: false,
            })
            .await
            .unwrap();
        user_id
    }

    pub async fn service(&self, vendor_id: UserId, price: Decimal) -> ServiceId {
        let service_id = ServiceId::new();
        self.store
            .register_service(VendorService {
                service_id,
                vendor_id,
                title: "Wedding photography".to_string(),
                available_date: Utc::now().date_naive(),
                price: Amount::new(price).unwrap(),
            })
            .await
            .unwrap();
        service_id
    }

    pub async fn event(&self, host: UserId, price: Decimal, ticket_limit: u32) -> EventId {
        let event_id = EventId::new();
        self.store
            .register_event(EventListing {
                event_id,
                title: "Rooftop concert".to_string(),
                hosted_by: host,
                date: Utc::now().date_naive(),
                location: Default::default(),
                description: String::new(),
                start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                price_per_ticket: Amount::new(price).unwrap(),
                ticket_limit,
                tickets_sold: 0,
            })
            .await
            .unwrap();
        event_id
    }

    pub async fn checkout(
        &self,
        user_id: UserId,
        product_type: ProductType,
        metadata: &[(&str, String)],
    ) -> Result<CheckoutResponse> {
        let metadata: HashMap<String, String> = metadata
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        self.market
            .checkout()
            .create_session(CheckoutRequest {
                user_id,
                product_type,
                metadata,
            })
            .await
    }

    /// Delivers `checkout.session.completed` for the most recent session.
    pub async fn pay_last_session(&self, payment_intent_id: &str) -> Result<WebhookAck> {
        let event = self.last_session_completed(payment_intent_id).await?;
        self.market.payments().handle(&event).await
    }

    pub async fn last_session_completed(&self, payment_intent_id: &str) -> Result<PaymentEvent> {
        let request = self
            .gateway
            .requests()
            .await
            .pop()
            .ok_or_else(|| MarketplaceError::Internal("no checkout session".to_string()))?;
        Ok(session_completed(
            &request.client_reference_id,
            payment_intent_id,
            request.unit_amount.to_minor_units(),
            json!(request.metadata),
        ))
    }

    /// Checks out and pays one vendor booking, returning its id.
    pub async fn book_service(
        &self,
        client_id: UserId,
        vendor_id: UserId,
        service_id: ServiceId,
        payment_intent_id: &str,
    ) -> BookingId {
        self.checkout(
            client_id,
            ProductType::VendorBooking,
            &[
                ("vendor_id", vendor_id.to_string()),
                ("service_id", service_id.to_string()),
            ],
        )
        .await
        .unwrap();
        self.pay_last_session(payment_intent_id).await.unwrap();
        BookingId::for_payment_intent(payment_intent_id)
    }

    pub async fn balance(&self, owner: WalletOwner) -> Decimal {
        self.store
            .wallet(owner)
            .await
            .unwrap()
            .map(|wallet| wallet.balance.0)
            .unwrap_or_default()
    }

    pub async fn total_balance(&self) -> Decimal {
        self.store
            .wallets()
            .await
            .unwrap()
            .iter()
            .map(|wallet| wallet.balance.0)
            .sum()
    }
}

pub fn session_completed(
    client_reference_id: &str,
    payment_intent_id: &str,
    amount_total: i64,
    metadata: serde_json::Value,
) -> PaymentEvent {
    let payload = json!({
        "id": format!("evt_{payment_intent_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": format!("cs_{payment_intent_id}"),
                "object": "checkout.session",
                "client_reference_id": client_reference_id,
                "payment_intent": payment_intent_id,
                "amount_total": amount_total,
                "currency": "inr",
                "metadata": metadata,
            }
        }
    });
    PaymentEvent {
        event_type: "checkout.session.completed".to_string(),
        raw_payload: payload.to_string(),
    }
}

pub fn payment_failed(
    payment_intent_id: &str,
    amount: i64,
    metadata: serde_json::Value,
) -> PaymentEvent {
    let payload = json!({
        "id": format!("evt_fail_{payment_intent_id}"),
        "type": "payment_intent.payment_failed",
        "data": {
            "object": {
                "id": payment_intent_id,
                "object": "payment_intent",
                "amount": amount,
                "metadata": metadata,
                "last_payment_error": { "message": "Your card was declined." }
            }
        }
    });
    PaymentEvent {
        event_type: "payment_intent.payment_failed".to_string(),
        raw_payload: payload.to_string(),
    }
}
