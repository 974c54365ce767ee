use std::process::ExitCode;
use stockroom::{http, AppConfig, CatalogService, PgPool, PgProductStore};

#[cfg(feature = "tracing")]
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Warning: failed to install log subscriber: {e}");
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging() {}

// Without a subscriber `log` records are dropped, so startup failures go to stderr.
#[cfg(feature = "tracing")]
fn report_startup_failure(message: &str) {
    log::error!("{message}");
}

#[cfg(not(feature = "tracing"))]
fn report_startup_failure(message: &str) {
    eprintln!("stockroom failed to start: {message}");
}

fn run() -> Result<(), String> {
    let cfg = AppConfig::load().map_err(|e| format!("configuration: {e}"))?;

    may::config()
        .set_workers(cfg.server.workers)
        .set_stack_size(cfg.server.stack_size);

    let pool = PgPool::connect(&cfg.database.url, cfg.database.max_connections)
        .map_err(|e| format!("database: {e}"))?;
    let catalog = CatalogService::new(PgProductStore::new(pool));

    let server = http::serve(catalog, cfg.server.listen_addr.as_str())
        .map_err(|e| format!("failed to start server on {}: {e}", cfg.server.listen_addr))?;
    log::info!("stockroom listening on {}", cfg.server.listen_addr);

    server
        .join()
        .map_err(|e| format!("server stopped abnormally: {e:?}"))?;
    log::info!("stockroom stopped; connection pool released");
    Ok(())
}

fn main() -> ExitCode {
    // Logging first: `AppConfig::load` warns when it falls back to env-only.
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_startup_failure(&e);
            ExitCode::FAILURE
        }
    }
}
