use crate::config::Settings;
use crate::domain::catalog::{UserProfile, UserRole};
use crate::domain::ids::{EventId, ServiceId, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::{Catalog, CheckoutSessionRequest, SharedGateway};
use crate::domain::transaction::Purpose;
use crate::error::{MarketplaceError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Metadata keys shared between checkout sessions and payment events.
pub mod metadata {
    pub const USER_ID: &str = "user_id";
    pub const PURPOSE: &str = "purpose";
    pub const VENDOR_ID: &str = "vendor_id";
    pub const SERVICE_ID: &str = "service_id";
    pub const EVENT_ID: &str = "event_id";
    /// Catalog price at checkout, in minor units.
    pub const QUOTED_PRICE: &str = "quoted_price";
}

pub const ROLE_UPGRADE_PRODUCT: &str = "Master of Ceremony Service";

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    RoleUpgrade,
    VendorBooking,
    EventBooking,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub product_type: ProductType,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum CheckoutResponse {
    Redirect { redirect_url: String },
    /// No session was created, e.g. the role is already held.
    Message { message: String },
}

/// Prices and limits applied when opening checkout sessions.
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    pub currency: String,
    pub role_upgrade_price: Amount,
    pub daily_booking_limit: u32,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutPolicy {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            currency: settings.currency.to_lowercase(),
            role_upgrade_price: Amount::new(settings.role_upgrade_price)?,
            daily_booking_limit: settings.daily_booking_limit,
            success_url: settings.success_url.clone(),
            cancel_url: settings.cancel_url.clone(),
        })
    }
}

/// Opens priced checkout sessions for the three purchasable products.
///
/// Only reads the catalog; nothing is written locally until the gateway
/// reports the payment.
pub struct CheckoutInitiator<S: ?Sized> {
    catalog: Arc<S>,
    gateway: SharedGateway,
    policy: CheckoutPolicy,
}

impl<S: Catalog + ?Sized> CheckoutInitiator<S> {
    pub fn new(catalog: Arc<S>, gateway: SharedGateway, policy: CheckoutPolicy) -> Self {
        Self {
            catalog,
            gateway,
            policy,
        }
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    pub async fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutResponse> {
        let user = self
            .catalog
            .user(request.user_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound(format!("user {}", request.user_id)))?;

        let session_request = match request.product_type {
            ProductType::RoleUpgrade => {
                if user.is_master_of_ceremony {
                    debug!(user_id = %user.user_id, "role upgrade requested by a master of ceremony");
                    return Ok(CheckoutResponse::Message {
                        message: "user is already upgraded to master of ceremony".to_string(),
                    });
                }
                self.role_upgrade(&user)
            }
            ProductType::VendorBooking => self.vendor_booking(&user, &request.metadata).await?,
            ProductType::EventBooking => self.event_booking(&user, &request.metadata).await?,
        };

        let session = self
            .gateway
            .create_checkout_session(&session_request)
            .await?;
        info!(
            user_id = %user.user_id,
            product = ?request.product_type,
            session_id = %session.id,
            amount = %session_request.unit_amount,
            "checkout session created"
        );

        Ok(CheckoutResponse::Redirect {
            redirect_url: session.url,
        })
    }

    fn role_upgrade(&self, user: &UserProfile) -> CheckoutSessionRequest {
        let metadata = self.base_metadata(user.user_id, Purpose::RoleUpgrade);
        self.session_request(
            ROLE_UPGRADE_PRODUCT.to_string(),
            self.policy.role_upgrade_price,
            user.user_id,
            metadata,
        )
    }

    async fn vendor_booking(
        &self,
        user: &UserProfile,
        raw: &HashMap<String, String>,
    ) -> Result<CheckoutSessionRequest> {
        let vendor_id: UserId = required_id(raw, metadata::VENDOR_ID)?;
        let service_id: ServiceId = required_id(raw, metadata::SERVICE_ID)?;

        let today = Utc::now().date_naive();
        let booked_today = self
            .catalog
            .bookings_created_on(user.user_id, today)
            .await?;
        if booked_today >= self.policy.daily_booking_limit {
            return Err(MarketplaceError::PermissionDenied(format!(
                "daily booking limit of {} reached",
                self.policy.daily_booking_limit
            )));
        }

        self.catalog
            .user(vendor_id)
            .await?
            .filter(|vendor| vendor.role == UserRole::Vendor)
            .ok_or_else(|| MarketplaceError::NotFound(format!("vendor {vendor_id}")))?;
        let service = self
            .catalog
            .service(service_id)
            .await?
            .filter(|service| service.vendor_id == vendor_id)
            .ok_or_else(|| {
                MarketplaceError::NotFound(format!("service {service_id} of vendor {vendor_id}"))
            })?;

        let mut metadata = self.base_metadata(user.user_id, Purpose::VendorBooking);
        metadata.insert(metadata::VENDOR_ID.to_string(), vendor_id.to_string());
        metadata.insert(metadata::SERVICE_ID.to_string(), service_id.to_string());
        metadata.insert(
            metadata::QUOTED_PRICE.to_string(),
            service.price.to_minor_units().to_string(),
        );

        Ok(self.session_request(service.title, service.price, user.user_id, metadata))
    }

    async fn event_booking(
        &self,
        user: &UserProfile,
        raw: &HashMap<String, String>,
    ) -> Result<CheckoutSessionRequest> {
        let event_id: EventId = required_id(raw, metadata::EVENT_ID)?;

        let event = self
            .catalog
            .event(event_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound(format!("event {event_id}")))?;
        if event.is_sold_out() {
            return Err(MarketplaceError::FailedPrecondition(format!(
                "event {event_id} is sold out"
            )));
        }

        let mut metadata = self.base_metadata(user.user_id, Purpose::EventBooking);
        metadata.insert(metadata::EVENT_ID.to_string(), event_id.to_string());

        Ok(self.session_request(
            format!("{} ticket", event.title),
            event.price_per_ticket,
            user.user_id,
            metadata,
        ))
    }

    fn base_metadata(&self, user_id: UserId, purpose: Purpose) -> BTreeMap<String, String> {
        BTreeMap::from([
            (metadata::USER_ID.to_string(), user_id.to_string()),
            (metadata::PURPOSE.to_string(), purpose.to_string()),
        ])
    }

    fn session_request(
        &self,
        product_name: String,
        unit_amount: Amount,
        user_id: UserId,
        metadata: BTreeMap<String, String>,
    ) -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            product_name,
            unit_amount,
            currency: self.policy.currency.clone(),
            quantity: 1,
            client_reference_id: user_id.to_string(),
            metadata,
            success_url: self.policy.success_url.clone(),
            cancel_url: self.policy.cancel_url.clone(),
        }
    }
}

fn required_id<T: FromStr>(raw: &HashMap<String, String>, key: &str) -> Result<T> {
    let value = raw
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MarketplaceError::InvalidArgument(format!("{key} is required")))?;
    value
        .parse()
        .map_err(|_| MarketplaceError::InvalidArgument(format!("{key} is not a valid id: {value}")))
}
