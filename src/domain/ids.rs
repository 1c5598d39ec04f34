use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for booking ids derived from payment intent ids.
const BOOKING_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8b3d_4c70_9e15_d2a8_47b0_c361);

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifies any marketplace user: client, vendor or admin.
    UserId
);
uuid_id!(BookingId);
uuid_id!(ServiceId);
uuid_id!(EventId);
uuid_id!(RecordId);

impl BookingId {
    /// The booking created by settling `payment_intent_id`.
    ///
    /// Derived rather than random so a re-delivered payment event maps onto the
    /// booking it already produced.
    pub fn for_payment_intent(payment_intent_id: &str) -> Self {
        Self(Uuid::new_v5(&BOOKING_NAMESPACE, payment_intent_id.as_bytes()))
    }
}
