pub mod chunking;
pub mod debts;
pub mod engine;
pub mod envelope;
pub mod fetcher;
pub mod inventory;
pub mod operations;
pub mod parsing;
pub mod response;
pub mod soap_client;
pub mod waybill;

pub use crate::domain::model::{ReportData, ReportOutput, Waybill};
pub use crate::domain::ports::{DocumentStore, ReportPipeline, RsService, Storage};
pub use crate::utils::error::Result;
pub use engine::ReportEngine;
