use std::sync::{Arc, Mutex};

use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::config::AppConfig;
use crate::interfaces::http::{add_log, start_server, HttpState, LogEntry};

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Build shared state and serve the HTTP API until shutdown
pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = HttpState::new(
        config.conversion.clone(),
        clock,
        config.sessions.clone(),
        logs.clone(),
    );
    let server = start_server(state, &config.host, config.port).map_err(|err| {
        error!(error = %err, host = %config.host, port = config.port, "Failed to bind HTTP server");
        err
    })?;

    add_log(
        &logs,
        "INFO",
        "System",
        &format!(
            "HTTP server started on {}:{}",
            config.host, config.port
        ),
    );

    server.await
}
