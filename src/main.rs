//! ClassicModels REST API (v1)
//!
//! CRUD over the classicmodels sample schema, behind JWT authentication
//! and per-scope sliding-window throttling.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, trace, timeout, body limit, metrics)
//!                         │
//!                         ├──▶ auth (login, signup, refresh, logout, me)
//!                         │
//!                         ├──▶ auth::require_auth ──▶ security::rate_limit
//!                         │        ──▶ resources (generic CRUD + related lists)
//!                         │                 ──▶ models (field rules) ──▶ db (SQLite)
//!                         │
//!                         └──▶ admin (status, debug delay)
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use classicmodels_api::config::load_config;
use classicmodels_api::lifecycle::startup::{self, DemoUser};
use classicmodels_api::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "classicmodels-api")]
#[command(about = "REST API for the classicmodels database", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Create the demo account if it does not exist
    CreateDemoUser {
        #[arg(long, default_value = "demo")]
        username: String,
        #[arg(long, default_value = "demo123")]
        password: String,
        #[arg(long, default_value = "demo@classicmodels.com")]
        email: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.observability);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!("classicmodels-api v{} starting", env!("CARGO_PKG_VERSION"));
            if let Err(e) = startup::serve(config).await {
                tracing::error!(error = %e, "Server failed");
                return ExitCode::FAILURE;
            }
        }
        Commands::CreateDemoUser {
            username,
            password,
            email,
        } => match startup::create_demo_user(&config, &username, &password, &email).await {
            Ok(DemoUser::Created) => {
                println!("Demo user created successfully!");
                println!("Username: {}", username);
                println!("Password: {}", password);
                println!("Email: {}", email);
            }
            Ok(DemoUser::AlreadyExists) => println!("User '{}' already exists", username),
            Err(e) => {
                eprintln!("Failed to create demo user: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}
