use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use cashfree_tools::CashfreeApi;
use log::*;
use topup_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    DeductionApi,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::{
    config::{AdminToken, ServerConfig, ServerOptions, WebhookSecret},
    errors::ServerError,
    integrations::cashfree::CashfreeGateway,
    routes::{
        health,
        AccountRoute,
        CashfreeWebhookRoute,
        CreateOrderRoute,
        OrdersForReviewRoute,
        ReleaseOrderRoute,
        TriggerDeductionRoute,
        TriggerPollingRoute,
        VerifyRoute,
        WebhookRoute,
    },
    workers::{start_deduction_worker, start_payment_checker},
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let api = CashfreeApi::new(config.cashfree.clone()).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let gateway = CashfreeGateway::new(api);
    let handlers = EventHandlers::new(128, create_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    if config.disable_workers {
        warn!("🚀️ Background workers are disabled. Payments are only checked via webhooks and client verification.");
    } else {
        let checker_api = OrderFlowApi::new(
            db.clone(),
            gateway.clone(),
            config.reconcile.clone(),
            config.poll.clone(),
            producers.clone(),
        );
        let _checker = start_payment_checker(checker_api, config.poll_interval);
        let _deductions = start_deduction_worker(DeductionApi::new(db.clone(), config.deduction.clone()));
    }
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

/// The hooks that every server runs with. A payment that was confirmed by the gateway but could not be credited is
/// the one event an operator must not miss, so it is logged at error level.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_reconciled(|ev| {
            Box::pin(async move {
                let entry = ev.entry;
                info!(
                    "🪝️ Order {} credited {} (+{} bonus) to account {}",
                    entry.order_id, entry.amount, entry.bonus, entry.account_id
                );
            }) as HookFuture
        })
        .on_review_required(|ev| {
            Box::pin(async move {
                error!(
                    "🚨️ ALERT: Order {} for account {} needs manual review ({}). {}",
                    ev.order_id, ev.account_id, ev.status, ev.reason
                );
            }) as HookFuture
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: CashfreeGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let webhook_secret = WebhookSecret(config.webhook_secret.clone());
    let admin_token = AdminToken(config.admin_token.clone());
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(
            db.clone(),
            gateway.clone(),
            config.reconcile.clone(),
            config.poll.clone(),
            producers.clone(),
        );
        let deduction_api = DeductionApi::new(db.clone(), config.deduction.clone());
        let accounts_api = AccountApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("topup::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(deduction_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(options.clone()))
            .app_data(web::Data::new(webhook_secret.clone()))
            .app_data(web::Data::new(admin_token.clone()))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase, CashfreeGateway>::new())
            .service(VerifyRoute::<SqliteDatabase, CashfreeGateway>::new())
            .service(WebhookRoute::<SqliteDatabase, CashfreeGateway>::new())
            .service(CashfreeWebhookRoute::<SqliteDatabase, CashfreeGateway>::new())
            .service(AccountRoute::<SqliteDatabase>::new())
            .service(TriggerDeductionRoute::<SqliteDatabase>::new())
            .service(TriggerPollingRoute::<SqliteDatabase, CashfreeGateway>::new())
            .service(OrdersForReviewRoute::<SqliteDatabase>::new())
            .service(ReleaseOrderRoute::<SqliteDatabase, CashfreeGateway>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
