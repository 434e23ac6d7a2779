//! The public API surface of the escrow engine.
//!
//! Each API struct is generic over the storage backend (and the payment processor where one is
//! needed), so server code and tests can swap implementations freely.
mod account_sync_api;
mod checkout_api;
mod dispute_api;
mod errors;
mod flow_api;

pub use account_sync_api::{AccountEvent, AccountSyncApi};
pub use checkout_api::{CheckoutApi, CheckoutReceipt, CheckoutRequest};
pub use dispute_api::DisputeApi;
pub use errors::{AccountSyncError, CheckoutError, DisputeError, FlowError};
pub use flow_api::TransactionFlowApi;
