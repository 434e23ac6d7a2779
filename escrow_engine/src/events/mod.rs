mod event_types;
mod hooks;

pub use event_types::*;
pub use hooks::{EventHandler, EventHandlers, EventHooks, EventProducer, EventProducers, Handler};
