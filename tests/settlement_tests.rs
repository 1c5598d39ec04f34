mod common;

use common::{Harness, payment_failed, session_completed};
use eventpay::application::approval::BookingOutcome;
use eventpay::application::checkout::ProductType;
use eventpay::application::webhook::PaymentEvent;
use eventpay::domain::catalog::UserRole;
use eventpay::domain::ids::BookingId;
use eventpay::domain::money::Amount;
use eventpay::domain::ports::{Catalog, CatalogRegistry, LedgerQueries};
use eventpay::domain::transaction::{PaymentStatus, Purpose};
use eventpay::domain::wallet::WalletOwner;
use eventpay::error::ErrorCode;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn test_role_upgrade_end_to_end() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;

    h.checkout(client, ProductType::RoleUpgrade, &[]).await.unwrap();
    let ack = h.pay_last_session("pi_role_1").await.unwrap();
    assert_eq!(ack.status, "success");

    assert!(h.store.user(client).await.unwrap().unwrap().is_master_of_ceremony);
    assert_eq!(h.balance(WalletOwner::Admin).await, dec!(2500));

    let txs = h.store.transactions_for(client).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].purpose, Purpose::RoleUpgrade);
    assert_eq!(txs[0].payment_status, PaymentStatus::Paid);
    assert_eq!(txs[0].payment_intent_id.as_deref(), Some("pi_role_1"));

    let admin_entries = h.store.admin_entries().await.unwrap();
    assert_eq!(admin_entries.len(), 1);
    assert_eq!(admin_entries[0].amount.value(), dec!(2500));
}

#[tokio::test]
async fn test_redelivered_event_settles_at_most_once() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;
    let vendor = h.user(UserRole::Vendor).await;
    let service = h.service(vendor, dec!(800)).await;

    h.checkout(
        client,
        ProductType::VendorBooking,
        &[
            ("vendor_id", vendor.to_string()),
            ("service_id", service.to_string()),
        ],
    )
    .await
    .unwrap();
    let event = h.last_session_completed("pi_dup").await.unwrap();

    for _ in 0..3 {
        let ack = h.market.payments().handle(&event).await.unwrap();
        assert_eq!(ack.status, "success");
    }

    assert_eq!(h.balance(WalletOwner::Admin).await, dec!(800));
    assert_eq!(h.store.transactions_for(client).await.unwrap().len(), 1);
    assert_eq!(h.store.admin_entries().await.unwrap().len(), 1);
    assert_eq!(h.store.bookings_for_client(client).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_redelivery_settles_once() {
    let h = std::sync::Arc::new(Harness::new());
    let client = h.user(UserRole::Client).await;
    h.checkout(client, ProductType::RoleUpgrade, &[]).await.unwrap();
    let event = h.last_session_completed("pi_race").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        let event = event.clone();
        handles.push(tokio::spawn(async move {
            h.market.payments().handle(&event).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(h.balance(WalletOwner::Admin).await, dec!(2500));
    assert_eq!(h.store.transactions_for(client).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_event_metadata_wins_over_service_metadata() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;
    let vendor = h.user(UserRole::Vendor).await;
    let service = h.service(vendor, dec!(800)).await;
    let event = h.event(vendor, dec!(250), 50).await;

    let metadata = json!({
        "user_id": client.to_string(),
        "event_id": event.to_string(),
        "service_id": service.to_string(),
        "vendor_id": vendor.to_string(),
    });
    h.market
        .payments()
        .handle(&session_completed(
            &client.to_string(),
            "pi_mixed",
            25_000,
            metadata,
        ))
        .await
        .unwrap();

    assert_eq!(h.store.tickets_for(client).await.unwrap().len(), 1);
    assert!(h.store.bookings_for_client(client).await.unwrap().is_empty());
    let txs = h.store.transactions_for(client).await.unwrap();
    assert_eq!(txs[0].purpose, Purpose::EventBooking);
    assert_eq!(h.store.event(event).await.unwrap().unwrap().tickets_sold, 1);
}

#[tokio::test]
async fn test_vendor_booking_creates_pending_booking() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;
    let vendor = h.user(UserRole::Vendor).await;
    let service = h.service(vendor, dec!(1200.50)).await;

    let booking_id = h.book_service(client, vendor, service, "pi_book").await;

    let booking = h.store.booking(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.client_id, client);
    assert_eq!(booking.vendor_id, vendor);
    assert_eq!(booking.price.value(), dec!(1200.50));
    assert!(!booking.is_client_approved && !booking.is_vendor_approved && !booking.is_fund_released);
    assert_eq!(h.balance(WalletOwner::Admin).await, dec!(1200.50));
}

#[tokio::test]
async fn test_failed_role_upgrade_records_configured_price() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;

    let event = payment_failed("pi_declined", 99, json!({ "user_id": client.to_string() }));
    h.market.payments().handle(&event).await.unwrap();

    let txs = h.store.transactions_for(client).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].payment_status, PaymentStatus::Failed);
    assert_eq!(txs[0].amount.value(), dec!(2500));
    assert!(h.store.wallets().await.unwrap().is_empty());
    assert!(!h.store.user(client).await.unwrap().unwrap().is_master_of_ceremony);
}

#[tokio::test]
async fn test_failed_booking_uses_intent_amount() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;
    let vendor = h.user(UserRole::Vendor).await;
    let service = h.service(vendor, dec!(800)).await;

    let event = payment_failed(
        "pi_declined_booking",
        80_000,
        json!({
            "user_id": client.to_string(),
            "vendor_id": vendor.to_string(),
            "service_id": service.to_string(),
        }),
    );
    h.market.payments().handle(&event).await.unwrap();

    let txs = h.store.transactions_for(client).await.unwrap();
    assert_eq!(txs[0].purpose, Purpose::VendorBooking);
    assert_eq!(txs[0].amount.value(), dec!(800));
    assert!(h.store.booking(BookingId::for_payment_intent("pi_declined_booking")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_and_informational_events_are_acknowledged() {
    let h = Harness::new();
    for event_type in ["payment_method.attached", "charge.refunded", "invoice.paid"] {
        let ack = h
            .market
            .payments()
            .handle(&PaymentEvent {
                event_type: event_type.to_string(),
                raw_payload: "not even json".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ack.status, "success");
    }
    assert!(h.store.wallets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_payload_is_internal() {
    let h = Harness::new();
    let err = h
        .market
        .payments()
        .handle(&PaymentEvent {
            event_type: "checkout.session.completed".to_string(),
            raw_payload: "{\"data\":{}}".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
}

#[tokio::test]
async fn test_expanded_payment_intent_object() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;

    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "client_reference_id": client.to_string(),
            "payment_intent": { "id": "pi_expanded", "object": "payment_intent" },
            "amount_total": 250_000,
            "metadata": { "user_id": client.to_string() }
        }}
    });
    h.market
        .payments()
        .handle(&PaymentEvent {
            event_type: "checkout.session.completed".to_string(),
            raw_payload: payload.to_string(),
        })
        .await
        .unwrap();

    let txs = h.store.transactions_for(client).await.unwrap();
    assert_eq!(txs[0].payment_intent_id.as_deref(), Some("pi_expanded"));
}

#[tokio::test]
async fn test_repriced_service_books_the_quoted_amount() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;
    let other = h.user(UserRole::Client).await;
    let vendor = h.user(UserRole::Vendor).await;
    let service = h.service(vendor, dec!(500)).await;
    let vendor_metadata = [
        ("vendor_id", vendor.to_string()),
        ("service_id", service.to_string()),
    ];

    h.checkout(client, ProductType::VendorBooking, &vendor_metadata)
        .await
        .unwrap();
    let quoted = h.last_session_completed("pi_quoted").await.unwrap();

    // The vendor raises the price before the payment event arrives.
    let mut listing = h.store.service(service).await.unwrap().unwrap();
    listing.price = Amount::new(dec!(800)).unwrap();
    h.store.register_service(listing).await.unwrap();
    h.market.payments().handle(&quoted).await.unwrap();

    let booking_id = BookingId::for_payment_intent("pi_quoted");
    let booking = h.store.booking(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.price.value(), dec!(500));

    // Another client's booking at the new price sits in the same admin wallet.
    h.book_service(other, vendor, service, "pi_repriced").await;
    assert_eq!(h.balance(WalletOwner::Admin).await, dec!(1300));

    let reply = h
        .market
        .approvals()
        .cancel_vendor_booking(booking_id, client)
        .await
        .unwrap();
    assert_eq!(reply.outcome, BookingOutcome::Refunded);
    assert_eq!(h.balance(WalletOwner::Client(client)).await, dec!(500));
    assert_eq!(h.balance(WalletOwner::Admin).await, dec!(800));
}

#[tokio::test]
async fn test_payment_below_quote_is_refused() {
    let h = Harness::new();
    let client = h.user(UserRole::Client).await;
    let vendor = h.user(UserRole::Vendor).await;
    let service = h.service(vendor, dec!(800)).await;

    let event = session_completed(
        &client.to_string(),
        "pi_underpaid",
        50_000,
        json!({
            "user_id": client.to_string(),
            "vendor_id": vendor.to_string(),
            "service_id": service.to_string(),
            "quoted_price": "80000",
        }),
    );
    let err = h.market.payments().handle(&event).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(err.to_string().contains("match paid amount to quote"));

    assert!(h.store.wallets().await.unwrap().is_empty());
    assert!(h.store.transactions_for(client).await.unwrap().is_empty());
    assert!(
        h.store
            .booking(BookingId::for_payment_intent("pi_underpaid"))
            .await
            .unwrap()
            .is_none()
    );
}
