//! Marketplace Escrow Engine
//!
//! The escrow engine is the core logic for brokering second-hand device sales: it prices a sale,
//! authorizes the charge with the payment processor, holds the transaction in escrow while the
//! item ships, reconciles carrier deliveries, releases escrow after the hold window and settles
//! disputes. It is server-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@sqlite`]). SQLite is the bundled backend. You should never need to access the
//!    database directly; use the public APIs instead. The exception is the data types used in the
//!    database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@api`]). [`CheckoutApi`] validates and prices a purchase,
//!    [`TransactionFlowApi`] drives the transaction state machine and the scheduled jobs,
//!    [`DisputeApi`] settles disputes and [`AccountSyncApi`] mirrors connected-account state.
//!    Backends implement the traits in [`mod@traits`] to plug in.
//! 3. Pure fee calculation ([`mod@fees`]), which has no dependencies on storage or the network.
//!
//! The engine also emits events at the significant points of a transaction's life (payment
//! confirmed, delivered, escrow released, dispute resolved). A simple actor framework lets you
//! hook into these events and perform custom actions.
mod api;

pub mod db_types;
pub mod events;
pub mod fees;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{
    AccountEvent,
    AccountSyncApi,
    AccountSyncError,
    CheckoutApi,
    CheckoutError,
    CheckoutReceipt,
    CheckoutRequest,
    DisputeApi,
    DisputeError,
    FlowError,
    TransactionFlowApi,
};
