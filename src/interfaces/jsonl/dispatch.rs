use super::command_reader::Command;
use crate::application::marketplace::Marketplace;
use crate::application::webhook::PaymentEvent;
use crate::error::Result;
use serde_json::{Value, json};

/// Runs one command against the marketplace and returns its reply as JSON.
pub async fn execute(market: &Marketplace, command: Command) -> Result<Value> {
    let reply = match command {
        Command::RegisterUser(user) => {
            let user_id = user.user_id;
            market.store().register_user(user).await?;
            json!({ "registered": "user", "id": user_id })
        }
        Command::RegisterService(service) => {
            let service_id = service.service_id;
            market.store().register_service(service).await?;
            json!({ "registered": "service", "id": service_id })
        }
        Command::RegisterEvent(event) => {
            let event_id = event.event_id;
            market.store().register_event(event).await?;
            json!({ "registered": "event", "id": event_id })
        }
        Command::HostEvent { host_id, event } => {
            let event = market.hosting().host_event(host_id, event).await?;
            json!({ "hosted": event.event_id })
        }
        Command::Checkout(request) => {
            serde_json::to_value(market.checkout().create_session(request).await?)?
        }
        Command::PaymentEvent {
            event_type,
            payload,
        } => {
            let event = PaymentEvent {
                event_type,
                raw_payload: payload.to_string(),
            };
            serde_json::to_value(market.payments().handle(&event).await?)?
        }
        Command::CompleteBooking {
            booking_id,
            client_id,
            status,
        } => serde_json::to_value(
            market
                .approvals()
                .complete_service_booking(booking_id, client_id, status)
                .await?,
        )?,
        Command::ApproveBooking {
            booking_id,
            vendor_id,
        } => serde_json::to_value(
            market
                .approvals()
                .approve_service_booking(booking_id, vendor_id)
                .await?,
        )?,
        Command::CancelBooking {
            booking_id,
            client_id,
        } => serde_json::to_value(
            market
                .approvals()
                .cancel_vendor_booking(booking_id, client_id)
                .await?,
        )?,
        Command::RejectBooking {
            booking_id,
            vendor_id,
        } => serde_json::to_value(
            market
                .approvals()
                .reject_vendor_booking(booking_id, vendor_id)
                .await?,
        )?,
    };
    Ok(reply)
}
