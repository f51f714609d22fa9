use std::{
    env::{self},
    fs::OpenOptions,
    net::SocketAddr,
    process::exit,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use time::Duration;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finance_tracker::{AppState, BackendConfig, build_router, graceful_shutdown, logging_middleware};

/// The web server for the personal finance tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to a local SQLite database to store users and transactions in.
    #[arg(long, conflicts_with = "remote_url")]
    db_path: Option<String>,

    /// Base URL of a Supabase compatible service to store users and transactions in.
    /// The service's public API key is read from the environment variable `REMOTE_ANON_KEY`.
    #[arg(long)]
    remote_url: Option<String>,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// File path to write the debug log to.
    #[arg(long, default_value = "debug.log")]
    log_path: String,

    /// How many minutes a session lasts with the SQLite database.
    #[arg(long)]
    session_minutes: Option<i64>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(&args.log_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    if time_tz::timezones::get_by_name(&args.timezone).is_none() {
        tracing::error!("\"{}\" is not a valid timezone name", args.timezone);
        exit(1);
    }

    let backend = BackendConfig::from_parts(
        args.db_path,
        args.remote_url,
        env::var("REMOTE_ANON_KEY").ok(),
        args.session_minutes.map(Duration::minutes),
    )
    .and_then(BackendConfig::connect);

    let backend = match backend {
        Ok(backend) => backend,
        Err(error) => {
            tracing::error!("Could not set up the remote service: {error}");
            exit(1);
        }
    };

    let state = AppState::new(backend, &secret, &args.timezone);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Could not start the server");
}

fn setup_logging(log_path: &str) {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
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
