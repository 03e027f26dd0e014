pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

use tracing::{error, info};

use crate::domain::error::Result;
use crate::infrastructure::bootstrap::{init_tracing, serve};
use crate::infrastructure::config::ConfigService;

pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = ConfigService::new().load()?;
    init_tracing(&config.log_filter);
    info!(host = %config.host, port = config.port, "Starting csv-sections");

    actix_web::rt::System::new()
        .block_on(serve(config))
        .map_err(|err| {
            error!(error = %err, "HTTP server stopped with an error");
            err
        })?;

    Ok(())
}
