use std::{
    env::{self},
    fs::OpenOptions,
    net::SocketAddr,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use payfeed::{
    AppState, FeedConfig, PaginationConfig, build_router, graceful_shutdown, logging_middleware,
};

/// The REST API server for payfeed.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The number of transactions in each page of a feed.
    #[arg(long, default_value_t = 10)]
    page_size: u64,

    /// List public transactions in plain date order instead of showing
    /// transactions involving the viewer's contacts first.
    #[arg(long)]
    no_public_contacts_first: bool,

    /// Let auth cookies be sent over plain HTTP.
    ///
    /// Only for local development, the server itself does not terminate TLS.
    #[arg(long)]
    insecure_cookies: bool,

    /// Add the route that resets the database to the test fixture.
    ///
    /// Never enable this for a database with real data.
    #[arg(long)]
    enable_test_data_routes: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let conn = Connection::open(&args.db_path).expect("Could not open the database.");
    let pagination_config = PaginationConfig {
        page_size: args.page_size,
        ..Default::default()
    };
    let feed_config = FeedConfig {
        public_contacts_first: !args.no_public_contacts_first,
    };
    let mut app_state = AppState::new(conn, &secret, pagination_config, feed_config)
        .expect("Could not initialize the application state.");
    if args.insecure_cookies {
        tracing::warn!("Auth cookies will be sent over plain HTTP");
        app_state.cookie_secure = false;
    }

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(app_state, args.enable_test_data_routes)
        .layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
