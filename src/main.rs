//! SetuIO - Serial-to-middleware odometry bridge daemon

use setu_io::app::App;
use setu_io::config::AppConfig;
use setu_io::Result;
use std::env;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `setu-io <path>` (positional)
/// - `setu-io --config <path>` (flag-based)
/// - `setu-io -c <path>` (short flag)
///
/// Defaults to `/etc/setuio.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/setuio.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let (config, load_error) = match AppConfig::from_file(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("SetuIO v{} starting...", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => log::info!("Using config: {}", config_path),
        Some(e) => log::warn!(
            "Could not load config {} ({}), using built-in defaults",
            config_path,
            e
        ),
    }

    App::new(config)?.run()
}
