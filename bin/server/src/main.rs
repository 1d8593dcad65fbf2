use fairway_scheduler::Scheduler;
use fairway_server::config::ServerConfig;
use fairway_server::routes;
use fairway_server::state::AppState;
use fairway_store::{MemoryStore, RedisStore, SharedStore};
use fairway_workflow::JobRegistry;
use fairway_workflow::handlers::register_builtin;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Connect the state store
    let store: SharedStore = match &config.redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis store...");
            Arc::new(
                RedisStore::connect(url)
                    .await
                    .expect("failed to connect to redis"),
            )
        }
        None => {
            tracing::info!("No REDIS_URL configured; using the in-process store");
            Arc::new(MemoryStore::new())
        }
    };

    fairway_store::schema::initialize(store.as_ref())
        .await
        .expect("failed to initialize store schema");

    // The registry is assembled once and immutable afterwards.
    let registry = Arc::new(register_builtin(JobRegistry::builder()).build());

    let state = Arc::new(AppState::new(
        store.clone(),
        registry,
        config.scheduler.clone(),
    ));

    // Exactly one scheduler loop per process.
    tokio::spawn(Scheduler::new(store, config.scheduler.clone()).run());

    // One worker per already-registered user; registrations made over HTTP
    // spawn their worker lazily.
    state
        .pool
        .spawn_registered()
        .await
        .expect("failed to start worker pool");

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .await
        .expect("server error");
}
