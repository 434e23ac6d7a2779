use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use escrow_engine::{
    events::{
        EscrowReleasedEvent,
        EventHandlers,
        EventHooks,
        EventProducers,
        PaymentConfirmedEvent,
        TransactionDeliveredEvent,
        TransactionShippedEvent,
    },
    fees::FeeCalculator,
    traits::Notifier,
    AccountSyncApi,
    CheckoutApi,
    DisputeApi,
    SqliteDatabase,
    TransactionFlowApi,
};
use log::*;
use stripe_tools::StripeApi;

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    integrations::{NotifyClient, StripeProcessor, TrackingClient},
    jobs::{trigger_delivery_checks, trigger_escrow_release},
    routes::{checkout, get_transaction, health, open_dispute, quote, resolve_dispute, ship},
    webhook_routes::{account_webhook, payment_webhook},
    worker::start_escrow_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifier = NotifyClient::new(config.notify_url.clone());
    let handlers = EventHandlers::new(16, notification_hooks(notifier));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let tracker = TrackingClient::new(&config.tracking_api_url);
    if config.enable_worker {
        start_escrow_worker(
            db.clone(),
            producers.clone(),
            tracker.clone(),
            config.escrow_hold,
            config.delivery_pace,
            config.worker_interval,
        );
    }
    info!("💻️ Escrow server listening on {}:{}", config.host, config.port);
    let srv = create_server_instance(config, db, producers, tracker)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    tracker: TrackingClient,
) -> Result<Server, ServerError> {
    let stripe_api =
        StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let processor = StripeProcessor::new(stripe_api);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), processor.clone(), FeeCalculator::default());
        let flow_api =
            TransactionFlowApi::new(db.clone(), producers.clone(), config.escrow_hold, config.delivery_pace);
        let dispute_api = DisputeApi::new(db.clone(), processor.clone(), producers.clone());
        let account_api = AccountSyncApi::new(db.clone(), processor.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("meg::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(dispute_api))
            .app_data(web::Data::new(account_api))
            .app_data(web::Data::new(tracker.clone()))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(config.clone()));
        app.service(health)
            .route("/checkout", web::post().to(checkout::<SqliteDatabase, StripeProcessor>))
            .route("/listings/{listing_id}/quote", web::get().to(quote::<SqliteDatabase, StripeProcessor>))
            .route("/transactions/{id}", web::get().to(get_transaction::<SqliteDatabase>))
            .route("/transactions/{id}/ship", web::post().to(ship::<SqliteDatabase>))
            .route("/transactions/{id}/dispute", web::post().to(open_dispute::<SqliteDatabase>))
            .route("/disputes/{id}/resolve", web::post().to(resolve_dispute::<SqliteDatabase, StripeProcessor>))
            .route("/webhook/payment", web::post().to(payment_webhook::<SqliteDatabase>))
            .route("/webhook/account", web::post().to(account_webhook::<SqliteDatabase, StripeProcessor>))
            .service(
                web::resource("/jobs/delivery-checks")
                    .route(web::get().to(trigger_delivery_checks::<SqliteDatabase, TrackingClient>))
                    .route(web::post().to(trigger_delivery_checks::<SqliteDatabase, TrackingClient>)),
            )
            .service(
                web::resource("/jobs/escrow-release")
                    .route(web::get().to(trigger_escrow_release::<SqliteDatabase>))
                    .route(web::post().to(trigger_escrow_release::<SqliteDatabase>)),
            )
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Wires the engine's event hooks to user notifications.
fn notification_hooks(notifier: NotifyClient) -> EventHooks {
    let mut hooks = EventHooks::default();
    let n = notifier.clone();
    hooks.on_payment_confirmed(move |ev: PaymentConfirmedEvent| {
        let n = n.clone();
        Box::pin(async move {
            let tx = &ev.transaction;
            n.notify(
                &tx.seller_id,
                "sale",
                "Your item sold!",
                &format!("Ship it within 3 business days to keep your seller rating. Sale price {}.", tx.sale_price),
                &format!("/transactions/{}", tx.id),
            )
            .await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let n = notifier.clone();
    hooks.on_shipped(move |ev: TransactionShippedEvent| {
        let n = n.clone();
        Box::pin(async move {
            let tx = &ev.transaction;
            let carrier = tx.carrier.map(|c| c.to_string()).unwrap_or_else(|| "the carrier".to_string());
            n.notify(
                &tx.buyer_id,
                "shipment",
                "Your order has shipped",
                &format!("Your item is on its way via {carrier}. Tracking: {}.", tx.tracking_number.as_deref().unwrap_or("n/a")),
                &format!("/transactions/{}", tx.id),
            )
            .await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let n = notifier.clone();
    hooks.on_delivered(move |ev: TransactionDeliveredEvent| {
        let n = n.clone();
        Box::pin(async move {
            let tx = &ev.transaction;
            let link = format!("/transactions/{}", tx.id);
            n.notify(
                &tx.buyer_id,
                "delivery",
                "Your order was delivered",
                "Check the item now. You can open a dispute until escrow releases.",
                &link,
            )
            .await;
            n.notify(
                &tx.seller_id,
                "delivery",
                "Item delivered",
                "The carrier confirmed delivery. Your payout releases when the escrow hold ends.",
                &link,
            )
            .await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let n = notifier.clone();
    hooks.on_escrow_released(move |ev: EscrowReleasedEvent| {
        let n = n.clone();
        Box::pin(async move {
            let tx = &ev.transaction;
            n.notify(
                &tx.seller_id,
                "payout",
                "Funds released",
                &format!("Escrow for transaction {} has been released. Your payout is {}.", tx.id, ev.payout),
                &format!("/transactions/{}", tx.id),
            )
            .await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let n = notifier;
    hooks.on_dispute_resolved(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            let tx = &ev.transaction;
            let message = match ev.refunded {
                Some(amount) => format!("The dispute on transaction {} closed with a {amount} refund.", tx.id),
                None => format!("The dispute on transaction {} closed with no refund.", tx.id),
            };
            for user in [&tx.buyer_id, &tx.seller_id] {
                n.notify(user, "dispute", "Dispute resolved", &message, &format!("/transactions/{}", tx.id)).await;
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
