pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{FileDocumentStore, LocalStorage, MemoryDocumentStore};
pub use app::pipelines::{DebtPipeline, InventoryPipeline};
pub use app::{app, serve, AppState};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ProxyConfig;
pub use core::soap_client::{SoapClient, SoapSettings};
pub use core::ReportEngine;
pub use utils::error::{ProxyError, Result};
