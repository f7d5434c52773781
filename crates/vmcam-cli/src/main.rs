//! `vmcam-cli` – vmcam Command Line Interface
//!
//! Receives head poses from a tracking application over UDP and drives a
//! camera object with them.  This binary:
//!
//! 1. Checks for `~/.vmcam/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Drops the user into an **interactive REPL** with slash-commands
//!    (`/start`, `/stop`, `/status`, `/camera`, `/send`, `/settings`, `/help`).
//! 3. Intercepts **Ctrl-C** to stop the receiver, release the port, and exit.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

fn main() {
    // Console output of the shell stays on println!; `tracing` carries the
    // runtime's structured logs (RUST_LOG, VMCAM_LOG_FORMAT=json).
    let telemetry = vmcam_runtime::init_tracing("vmcam");

    print_banner();
    if telemetry.is_exporting() {
        println!("  {} Exporting traces over OTLP\n", "●".green());
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // Setting the flag ends the host scheduler loop, which drops the applier
    // and with it the receiver, so the port is released.
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping receiver …".yellow().bold());
        println!("{}", "  ✓ Press Enter to leave the shell.".green());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── First-Run Wizard ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    println!(
        "  Listening port {} · camera {}",
        cfg.port.to_string().yellow(),
        cfg.camera_name.yellow()
    );
    println!();
    println!("  Type {} to begin, {} for a list of commands.\n", "/start".bold().cyan(), "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(cfg, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        vmcam First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up vmcam.\n");

    let mut cfg = config::Config::default();

    let port_str = repl::prompt_str(
        &format!("  UDP port the tracker sends to [{}]: ", cfg.port),
        &cfg.port.to_string(),
    );
    if let Ok(p) = port_str.trim().parse::<u16>() {
        cfg.port = p;
    }

    cfg.camera_name = repl::prompt_str(
        &format!("  Camera object name [{}]: ", cfg.camera_name),
        &cfg.camera_name,
    );

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"  _   ____  ___________ ___ _  __"#.bold().cyan());
    println!("{}", r#" | | / /  |/  / ___/ _ `/  ' \/ /"#.bold().cyan());
    println!("{}", r#" | |/ / /|_/ / /__/ _,_/_/_/_/_/ "#.bold().cyan());
    println!("{}", r#" |___/_/  /_/\___/                "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "vmcam".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Virtual Motion Camera receiver");
    println!();
}
