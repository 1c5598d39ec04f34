use super::ids::{EventId, RecordId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Ticket {
    pub id: RecordId,
    pub ticket_id: String,
    pub client_id: UserId,
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
}

/// Entry pass for a ticket. `code` is the payload rendered into the QR image.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct QrCode {
    pub id: RecordId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub code: String,
    pub generated_at: DateTime<Utc>,
    pub is_scanned: bool,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Issues a fresh ticket together with its unscanned entry pass.
    pub fn issue(client_id: UserId, event_id: EventId) -> (Ticket, QrCode) {
        let now = Utc::now();
        let ticket_id = format!("TKT-{}", Uuid::new_v4().simple()).to_uppercase();
        let qr = QrCode {
            id: RecordId::new(),
            user_id: client_id,
            event_id,
            code: ticket_id.clone(),
            generated_at: now,
            is_scanned: false,
            scanned_at: None,
        };
        let ticket = Ticket {
            id: RecordId::new(),
            ticket_id,
            client_id,
            event_id,
            created_at: now,
        };
        (ticket, qr)
    }
}
