//! Interface contracts for the escrow engine.
//!
//! The engine core is written against these traits rather than concrete implementations:
//!
//! * [`EscrowDatabase`] is the storage backend contract. The SQLite backend in
//!   [`crate::sqlite`] implements it; a Postgres backend could implement it without touching the
//!   APIs.
//! * [`PaymentProcessor`] is the contract this system requires of the external payment
//!   processor: create an authorization, issue a refund, fetch connected-account state. The
//!   processor is the source of truth for money movement.
//! * [`CarrierTracking`] is the carrier-tracking lookup (eventually consistent, rate limited).
//! * [`Notifier`] delivers user notifications. It is fire-and-forget: a delivery failure must
//!   never roll back a transaction-state change, so the trait cannot return an error.
mod collaborators;
mod data_objects;
mod escrow_database;

pub use collaborators::{CarrierTracking, Notifier, PaymentProcessor, ProcessorError, TrackingError};
pub use data_objects::{
    ConnectedAccountState,
    DeliveryRunReport,
    NewAuthorization,
    PaymentAuthorization,
    RefundReceipt,
    ReleaseRunReport,
    ShipmentState,
    TrackingStatus,
};
pub use escrow_database::{EscrowDatabase, EscrowDatabaseError, NewUserProfile};
