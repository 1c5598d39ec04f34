use crate::domain::ports::{CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use crate::error::{MarketplaceError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process gateway for local runs and tests.
///
/// Hands out `https://checkout.local/pay/<session id>` URLs and keeps every
/// request it accepted, so callers can assert on what would have been charged.
#[derive(Default, Clone)]
pub struct SimulatedGateway {
    requests: Arc<Mutex<Vec<CheckoutSessionRequest>>>,
    unavailable: Arc<AtomicBool>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent session requests fail, as during a gateway outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MarketplaceError::Gateway(
                "simulated gateway unavailable".to_string(),
            ));
        }

        let id = format!("cs_sim_{}", Uuid::new_v4().simple());
        self.requests.lock().await.push(request.clone());
        Ok(CheckoutSession {
            url: format!("https://checkout.local/pay/{id}"),
            id,
        })
    }
}
