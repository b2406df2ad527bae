use tracing::{error, info};

use murmur::{BroadcastCoordinator, Config, WebServer};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = murmur::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        murmur::logging::init_console_only(&config.logging.level);
    }
    murmur::logging::install_panic_hook();

    if let Err(e) = config.validate() {
        error!("{e}");
        std::process::exit(1);
    }

    info!("Murmur - real-time group chat relay");

    let coordinator = BroadcastCoordinator::new(&config.chat);
    let server = match WebServer::new(&config.server, coordinator) {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {e}");
        std::process::exit(1);
    }
}
