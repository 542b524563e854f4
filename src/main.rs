use rusty_circulation::{
    adapters::amqp::AmqpMessageChannel,
    adapters::jwt::JwtTokenService,
    adapters::memory::{
        InventoryStore as MemoryInventoryStore, MessageChannel as MemoryMessageChannel,
        UserStore as MemoryUserStore,
    },
    adapters::mock::Mailer as MockMailer,
    adapters::postgres::{PostgresInventoryStore, PostgresUserStore},
    api::{handlers::AppState, router::create_router},
    application::auth::AuthDependencies,
    application::catalog::CatalogDependencies,
    application::circulation::{
        CirculationDependencies, ExchangeKind, PendingExchanges, PollBudget,
        run_availability_consumer, run_response_consumer,
    },
    application::inventory::{
        InventoryDependencies, run_borrow_request_worker, run_return_request_worker,
    },
    config::Config,
    ports::inventory_store::InventoryStore,
    ports::message_channel::MessageChannel,
    ports::user_store::UserStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_circulation=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // Initialize storage adapters
    let (inventory_store, user_store): (Arc<dyn InventoryStore>, Arc<dyn UserStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(5)
                    .connect(url)
                    .await
                    .expect("Failed to connect to database");
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .expect("Failed to run migrations");
                tracing::info!("Using PostgreSQL storage");
                (
                    Arc::new(PostgresInventoryStore::new(pool.clone())),
                    Arc::new(PostgresUserStore::new(pool)),
                )
            }
            None => {
                tracing::info!("DATABASE_URL not set, using in-memory storage");
                (
                    Arc::new(MemoryInventoryStore::new()),
                    Arc::new(MemoryUserStore::new()),
                )
            }
        };

    // Initialize the message channel
    let channel: Arc<dyn MessageChannel> = match &config.amqp_url {
        Some(url) => Arc::new(
            AmqpMessageChannel::connect(url)
                .await
                .expect("Failed to connect to AMQP broker"),
        ),
        None => {
            tracing::info!("AMQP_URL not set, using in-memory message channel");
            Arc::new(MemoryMessageChannel::new())
        }
    };

    let token_service = Arc::new(JwtTokenService::new(&config.jwt_secret));
    let mailer = Arc::new(MockMailer::new());

    // Start inventory-side workers
    let inventory_deps = InventoryDependencies {
        store: inventory_store.clone(),
        channel: channel.clone(),
    };
    tokio::spawn(run_borrow_request_worker(inventory_deps.clone()));
    tokio::spawn(run_return_request_worker(inventory_deps));

    // Start response and availability consumers
    let pending = Arc::new(PendingExchanges::new());
    tokio::spawn(run_response_consumer(
        channel.clone(),
        pending.clone(),
        ExchangeKind::Borrow,
    ));
    tokio::spawn(run_response_consumer(
        channel.clone(),
        pending.clone(),
        ExchangeKind::Return,
    ));
    tokio::spawn(run_availability_consumer(channel.clone(), mailer));

    // Create application state
    let app_state = Arc::new(AppState {
        auth: AuthDependencies {
            users: user_store,
            tokens: token_service,
        },
        catalog: CatalogDependencies {
            store: inventory_store,
        },
        circulation: CirculationDependencies {
            channel,
            pending,
            poll_budget: PollBudget::default(),
        },
    });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
