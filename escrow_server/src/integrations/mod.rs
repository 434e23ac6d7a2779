//! Concrete implementations of the engine's collaborator traits.
mod notify;
mod processor;
mod tracking;

pub use notify::NotifyClient;
pub use processor::StripeProcessor;
pub use tracking::TrackingClient;
