use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "rs-waybill-proxy")]
#[command(about = "JSON to SOAP proxy and waybill bookkeeping for the RS.ge waybill service")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP proxy
    Serve {
        #[arg(long, help = "Override server.bind")]
        bind: Option<String>,
    },
    /// Build a bookkeeping report and write CSV/JSON files
    Report(ReportArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Inventory,
    Debts,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ReportArgs {
    #[arg(value_enum)]
    pub kind: ReportKind,

    #[arg(long, help = "Document store user id")]
    pub user: String,

    #[arg(long, help = "Period start, e.g. 2024-01-01 or 01.01.2024")]
    pub start: String,

    #[arg(long, help = "Period end, inclusive")]
    pub end: String,

    #[arg(long, help = "Override storage.report_dir")]
    pub output: Option<String>,

    #[arg(long, help = "Log CPU and memory usage per report phase")]
    pub monitor: bool,
}
