use crate::application::checkout::CheckoutRequest;
use crate::application::hosting::EventDraft;
use crate::domain::booking::BookingStatus;
use crate::domain::catalog::{EventListing, UserProfile, VendorService};
use crate::domain::ids::{BookingId, UserId};
use crate::error::Result;
use serde::Deserialize;
use std::io::BufRead;

/// One line of a command file.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RegisterUser(UserProfile),
    RegisterService(VendorService),
    RegisterEvent(EventListing),
    HostEvent {
        host_id: UserId,
        event: EventDraft,
    },
    Checkout(CheckoutRequest),
    /// A gateway notification; `payload` is the event body as delivered.
    PaymentEvent {
        event_type: String,
        payload: serde_json::Value,
    },
    CompleteBooking {
        booking_id: BookingId,
        client_id: UserId,
        #[serde(default)]
        status: Option<BookingStatus>,
    },
    ApproveBooking {
        booking_id: BookingId,
        vendor_id: UserId,
    },
    CancelBooking {
        booking_id: BookingId,
        client_id: UserId,
    },
    RejectBooking {
        booking_id: BookingId,
        vendor_id: UserId,
    },
}

/// Reads commands from a JSON-lines source. Blank lines and `#` comments are skipped.
pub struct CommandReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Yields each command with its 1-based line number.
    pub fn commands(self) -> impl Iterator<Item = (usize, Result<Command>)> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let parsed = match line {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() || trimmed.starts_with('#') {
                            return None;
                        }
                        serde_json::from_str(trimmed).map_err(Into::into)
                    }
                    Err(e) => Err(e.into()),
                };
                Some((index + 1, parsed))
            })
    }
}
