//! CLI module - Command-line interface for Scholarr
//!
//! This module provides a structured CLI using clap for argument parsing.

use clap::{Parser, Subcommand};

/// Scholarr - Learning Management Backend
/// Accounts, course catalog, enrollments, and dashboard over REST
#[derive(Parser)]
#[command(name = "scholarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Create default config file
    Init,

    /// Provision an admin account
    CreateAdmin {
        /// Username for the new admin
        username: String,

        /// Email for the new admin
        email: String,

        /// Password for the new admin
        password: String,
    },
}
