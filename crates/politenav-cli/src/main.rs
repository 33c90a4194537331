//! `politenav` – polite navigation interceptor
//!
//! Runs the reactive safety override next to a `rosbridge_server`:
//!
//! 1. Loads `~/.politenav/config.toml`, writing defaults on first run.
//! 2. Resolves the active controller and arms the interceptor (or leaves it
//!    in pass-through when the lookup fails).
//! 3. Serves rosbridge traffic until **Ctrl-C** or the connection drops.

mod config;
mod telemetry;

use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use politenav_kernel::{ControllerBinding, ParameterSink, PlanOverrideEngine};
use politenav_middleware::{InterceptorBridge, RosbridgeParameterSink};
use politenav_types::NavError;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let guard = telemetry::init_tracing("politenav");
    if guard.is_exporting() {
        info!("exporting spans over OTLP");
    }

    print_banner();
    let cfg = load_or_init_config();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        let _ = shutdown_tx.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(cfg, shutdown_rx)) {
        Ok(()) => {
            println!("{}", "  ✓ Exiting politenav.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "interceptor stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cfg: config::Config, shutdown: watch::Receiver<bool>) -> Result<(), NavError> {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    let sink_tx = outbound_tx.clone();
    let engine = Arc::new(PlanOverrideEngine::initialize(
        cfg.interceptor.clone(),
        &cfg.parameters.to_source(),
        &cfg.node_namespace,
        move |binding: &ControllerBinding| -> Arc<dyn ParameterSink> {
            Arc::new(RosbridgeParameterSink::new(
                binding.set_parameters_service(),
                sink_tx,
            ))
        },
    ));

    if engine.is_armed() {
        println!("  Interceptor {}", "armed".green().bold());
    } else {
        println!(
            "  Interceptor {} – base plans pass through unchanged",
            "disarmed".yellow().bold()
        );
    }

    let plan_rate = NonZeroU32::new(cfg.plan_rate_hz).unwrap_or_else(|| {
        warn!(
            default = config::DEFAULT_PLAN_RATE_HZ,
            "plan_rate_hz must be positive; using the default"
        );
        NonZeroU32::new(config::DEFAULT_PLAN_RATE_HZ).unwrap_or(NonZeroU32::MIN)
    });

    let bridge = InterceptorBridge::new(engine, cfg.topics.clone(), outbound_tx, plan_rate);
    println!("  Connecting to {} …", cfg.rosbridge_url.bold());
    info!(url = %cfg.rosbridge_url, plan_rate_hz = plan_rate.get(), "starting bridge");
    bridge.run(&cfg.rosbridge_url, outbound_rx, shutdown).await
}

fn load_or_init_config() -> config::Config {
    let path = config::config_path();
    match config::load() {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "politenav".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Reactive safety override for local planners");
    println!();
}
