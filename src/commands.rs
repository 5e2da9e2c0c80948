//! CLI command definitions
//!
//! Defines the clap commands for the apicase CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::Overrides;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every case and write the verdict workbook and run report
    Run {
        /// Only run cases whose ID contains this substring
        #[arg(long, short)]
        filter: Option<String>,

        /// Skip the fixture reset before the run
        #[arg(long)]
        no_reset: bool,

        #[command(flatten)]
        settings: Settings,
    },

    /// List the cases of the artifact and their writeback rows
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        settings: Settings,
    },

    /// Reset the target service's fixtures
    Reset {
        #[command(flatten)]
        settings: Settings,
    },
}

impl Commands {
    pub fn settings(&self) -> &Settings {
        match self {
            Commands::Run { settings, .. }
            | Commands::List { settings }
            | Commands::Reset { settings } => settings,
        }
    }
}

/// Settings shared by every command; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct Settings {
    /// Replace scheme and authority of every case URL
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Path of the fixture reset endpoint
    #[arg(long, env = "RESET_PATH")]
    pub reset_path: Option<String>,

    /// Host substituted for loopback hosts inside a container
    #[arg(long, env = "CONTAINER_HOST")]
    pub container_host: Option<String>,

    /// Template workbook holding the cases
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Verdict workbook (default: <report dir>/excelReport/<template name>)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Sheet holding the cases
    #[arg(long)]
    pub sheet: Option<String>,

    /// Output directory for the report, log and verdict workbook
    #[arg(long, env = "REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Report title
    #[arg(long, env = "REPORT_TITLE")]
    pub title: Option<String>,

    /// Report description
    #[arg(long, env = "REPORT_DESCRIPTION")]
    pub description: Option<String>,

    /// Tester name for the report and the tester column
    #[arg(long, env = "TESTER")]
    pub tester: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl From<Settings> for Overrides {
    fn from(settings: Settings) -> Self {
        Overrides {
            base_url: settings.base_url,
            reset_path: settings.reset_path,
            container_host: settings.container_host,
            source: settings.source,
            target: settings.target,
            sheet: settings.sheet,
            report_dir: settings.report_dir,
            title: settings.title,
            description: settings.description,
            tester: settings.tester,
            timeout_secs: settings.timeout,
        }
    }
}
