//! Event hooks for the escrow lifecycle.
//!
//! Each lifecycle event gets its own mpsc channel. Interested components register a handler
//! closure in [`EventHooks`]; the engine APIs publish through [`EventProducers`] and never see
//! subscriber state. Handlers run on their own tasks, so a slow notification cannot stall a
//! state transition.

use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{
    DisputeResolvedEvent, EscrowReleasedEvent, PaymentConfirmedEvent, TransactionDeliveredEvent,
    TransactionShippedEvent,
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// The consuming side of one event channel: owns the receiver and the handler closure.
pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Consumes events until every producer is dropped, then waits out the handler tasks that are
    /// still in flight.
    pub async fn start_handler(mut self) {
        debug!("📬️ Event handler running");
        // The internal sender must go first, or recv() would never return None.
        drop(self.sender);
        let mut inflight: Vec<JoinHandle<()>> = Vec::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Dispatching event");
            inflight.retain(|task| !task.is_finished());
            let handler = Arc::clone(&self.handler);
            inflight.push(tokio::spawn(async move { (handler)(ev).await }));
        }
        for task in inflight {
            if let Err(e) = task.await {
                warn!("📬️ An event handler task failed: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_confirmed_producer: Vec<EventProducer<PaymentConfirmedEvent>>,
    pub shipped_producer: Vec<EventProducer<TransactionShippedEvent>>,
    pub delivered_producer: Vec<EventProducer<TransactionDeliveredEvent>>,
    pub escrow_released_producer: Vec<EventProducer<EscrowReleasedEvent>>,
    pub dispute_resolved_producer: Vec<EventProducer<DisputeResolvedEvent>>,
}

pub struct EventHandlers {
    pub on_payment_confirmed: Option<EventHandler<PaymentConfirmedEvent>>,
    pub on_shipped: Option<EventHandler<TransactionShippedEvent>>,
    pub on_delivered: Option<EventHandler<TransactionDeliveredEvent>>,
    pub on_escrow_released: Option<EventHandler<EscrowReleasedEvent>>,
    pub on_dispute_resolved: Option<EventHandler<DisputeResolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_confirmed = hooks.on_payment_confirmed.map(|f| EventHandler::new(buffer_size, f));
        let on_shipped = hooks.on_shipped.map(|f| EventHandler::new(buffer_size, f));
        let on_delivered = hooks.on_delivered.map(|f| EventHandler::new(buffer_size, f));
        let on_escrow_released = hooks.on_escrow_released.map(|f| EventHandler::new(buffer_size, f));
        let on_dispute_resolved = hooks.on_dispute_resolved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_confirmed, on_shipped, on_delivered, on_escrow_released, on_dispute_resolved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_confirmed {
            result.payment_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_shipped {
            result.shipped_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_delivered {
            result.delivered_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_escrow_released {
            result.escrow_released_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_dispute_resolved {
            result.dispute_resolved_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_shipped {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_delivered {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_escrow_released {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_dispute_resolved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_confirmed: Option<Handler<PaymentConfirmedEvent>>,
    pub on_shipped: Option<Handler<TransactionShippedEvent>>,
    pub on_delivered: Option<Handler<TransactionDeliveredEvent>>,
    pub on_escrow_released: Option<Handler<EscrowReleasedEvent>>,
    pub on_dispute_resolved: Option<Handler<DisputeResolvedEvent>>,
}

impl EventHooks {
    pub fn on_payment_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_shipped<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionShippedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_shipped = Some(Arc::new(f));
        self
    }

    pub fn on_delivered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionDeliveredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_delivered = Some(Arc::new(f));
        self
    }

    pub fn on_escrow_released<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(EscrowReleasedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_escrow_released = Some(Arc::new(f));
        self
    }

    pub fn on_dispute_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DisputeResolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_dispute_resolved = Some(Arc::new(f));
        self
    }
}
