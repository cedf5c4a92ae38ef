//! CLI definitions for RouteKit.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// RouteKit CLI.
#[derive(Parser)]
#[command(name = "routekit")]
#[command(about = "Capability-indexed service router")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ROUTEKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive, overrides the configuration
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Register the demo routers, seal the registry and print the consistency report
    Check,

    /// Print the binding table
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Perform a route to a demo service
    Perform {
        /// Service to route to
        #[arg(value_enum)]
        service: DemoService,

        /// User passed to the login service
        #[arg(long, default_value = "demo")]
        user: String,

        /// Remove the destination after a successful route
        #[arg(long)]
        remove: bool,
    },
}

/// Demo services reachable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DemoService {
    /// Synchronous login router
    Login,
    /// Asynchronous token router
    Token,
    /// Protocol with no router
    Payment,
}
