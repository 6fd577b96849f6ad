use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use solupi_engine::{
    traits::ChainPayout,
    ExchangeRateApiSource,
    IngestionApi,
    OrderFlowApi,
    PriceOracle,
    ReconciliationApi,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{events::create_notification_handlers, maildir::MaildirMailbox, solana::SolanaChain},
    mail_watcher::start_mail_watcher,
    middleware::{HmacMiddlewareFactory, WEBHOOK_SIGNATURE_HEADER},
    reconciliation_worker::start_reconciliation_worker,
    routes::{
        health,
        AttachReferenceRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        EmailNotificationRoute,
        OrderByIdRoute,
        PricesRoute,
        UserOrdersRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let chain = SolanaChain::new(config.solana.clone());
    // Orders can still be created without a working payout wallet, so this is not fatal.
    if let Err(e) = chain.initialize().await {
        warn!("⛓️ The payout wallet could not be initialized. Payouts will fail until this is fixed. {e}");
    }
    let handlers = create_notification_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let settlement = SettlementApi::new(db.clone(), chain.clone(), config.settlement_config(), producers.clone());
    let reconciliation = ReconciliationApi::new(db.clone(), chain.clone(), producers);
    start_reconciliation_worker(reconciliation, config.reconcile_after);
    if let Some(path) = &config.mail.maildir {
        let mailbox = MaildirMailbox::open(path).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let ingestion = IngestionApi::new(settlement.clone()).with_sender_filter(config.mail.sender_filter.clone());
        start_mail_watcher(mailbox, ingestion, config.mail.clone());
    }
    let srv = create_server_instance(config, settlement)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    settlement: SettlementApi<SqliteDatabase, SolanaChain>,
) -> Result<Server, ServerError> {
    let rates = ExchangeRateApiSource::new(config.exchange_rate_api_key.clone())
        .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let markup = config.markup_percent;
    let sender_filter = config.mail.sender_filter.clone();
    let webhook_secret = config.webhook_secret.clone();
    let hmac_checks = config.webhook_hmac_checks;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(settlement.clone());
        let ingestion_api = IngestionApi::new(settlement.clone()).with_sender_filter(sender_filter.clone());
        let oracle = PriceOracle::new(rates.clone()).with_markup(markup);
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase, SolanaChain>::new())
            .service(UserOrdersRoute::<SqliteDatabase, SolanaChain>::new())
            .service(OrderByIdRoute::<SqliteDatabase, SolanaChain>::new())
            .service(CancelOrderRoute::<SqliteDatabase, SolanaChain>::new())
            .service(AttachReferenceRoute::<SqliteDatabase, SolanaChain>::new())
            .service(
                web::scope("/webhooks")
                    .wrap(HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, webhook_secret.clone(), hmac_checks))
                    .service(EmailNotificationRoute::<SqliteDatabase, SolanaChain>::new()),
            )
            .service(PricesRoute::<ExchangeRateApiSource>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("solupi::access_log"))
            .configure(configure_extractors)
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ingestion_api))
            .app_data(web::Data::new(oracle))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Makes malformed request bodies, paths and queries produce the same JSON error envelope as every other failure.
pub fn configure_extractors(cfg: &mut ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    );
}
