//! call-audio binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use call_audio::api::{serve_with_state, AppState};
use call_audio::cli::{self, parse_args};
use call_audio::config::Config;
use call_audio::{logging, SimulatedPlatform};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_with_level(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let session_config = match config.to_session_config() {
        Ok(session_config) => session_config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let capabilities = config.capabilities();
    info!("call-audio v{}", env!("CARGO_PKG_VERSION"));
    info!(
        api_level = capabilities.api_level,
        structured_focus = capabilities.structured_focus(),
        "Simulated platform ready"
    );

    let platform = Arc::new(SimulatedPlatform::new(capabilities));
    let state = AppState::simulated(platform, session_config);

    match serve_with_state(server_config, state).await {
        Ok(()) => {
            info!("call-audio stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
