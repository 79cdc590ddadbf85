//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `*_kinds` database table, and its
//! wire name matches the lookup table's `name` column.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant = $val ),+
        }

        impl $name {
            /// Every variant in seed-data order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Wire / lookup-table name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse a wire name.
            pub fn parse(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Booking lifecycle status.
    BookingStatus {
        Active = 1 => "active",
        Completed = 2 => "completed",
        Cancelled = 3 => "cancelled",
    }
}

define_status_enum! {
    /// Overstay state of a booking (see [`crate::overstay::state_machine`]).
    OverstayState {
        OnTime = 1 => "on_time",
        Overstaying = 2 => "overstaying",
        ResolvedViaPenalty = 3 => "resolved_via_penalty",
        ResolvedViaReassignment = 4 => "resolved_via_reassignment",
        ResolvedViaCancellation = 5 => "resolved_via_cancellation",
        Completed = 6 => "completed",
    }
}

define_status_enum! {
    /// Security alert review status.
    AlertStatus {
        Pending = 1 => "pending",
        Reviewing = 2 => "reviewing",
        Resolved = 3 => "resolved",
    }
}

define_status_enum! {
    /// Kind of wallet ledger row.
    TransactionKind {
        TopUp = 1 => "top_up",
        CouponRedemption = 2 => "coupon_redemption",
        BookingDebit = 3 => "booking_debit",
        ExtensionDebit = 4 => "extension_debit",
        OverstayPenalty = 5 => "overstay_penalty",
        Refund = 6 => "refund",
        Compensation = 7 => "compensation",
    }
}

define_status_enum! {
    /// Kind of user notice written by the engine.
    NotificationKind {
        BookingReassigned = 1 => "booking_reassigned",
        BookingCancelled = 2 => "booking_cancelled",
        OverstayPenalty = 3 => "overstay_penalty",
        BookingCompleted = 4 => "booking_completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_ids_match_seed_data() {
        assert_eq!(BookingStatus::Active.id(), 1);
        assert_eq!(BookingStatus::Completed.id(), 2);
        assert_eq!(BookingStatus::Cancelled.id(), 3);
    }

    #[test]
    fn overstay_state_ids_match_seed_data() {
        assert_eq!(OverstayState::OnTime.id(), 1);
        assert_eq!(OverstayState::Overstaying.id(), 2);
        assert_eq!(OverstayState::ResolvedViaPenalty.id(), 3);
        assert_eq!(OverstayState::ResolvedViaReassignment.id(), 4);
        assert_eq!(OverstayState::ResolvedViaCancellation.id(), 5);
        assert_eq!(OverstayState::Completed.id(), 6);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = AlertStatus::Reviewing.into();
        assert_eq!(id, 2);
    }

    #[test]
    fn from_id_round_trips_every_variant() {
        for kind in TransactionKind::ALL {
            assert_eq!(TransactionKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(TransactionKind::from_id(99), None);
    }

    #[test]
    fn wire_names_match_serde() {
        let json = serde_json::to_string(&OverstayState::ResolvedViaPenalty).unwrap();
        assert_eq!(json, "\"resolved_via_penalty\"");
        assert_eq!(
            OverstayState::parse("resolved_via_penalty"),
            Some(OverstayState::ResolvedViaPenalty)
        );
        assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
    }
}
