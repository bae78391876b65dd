// Application layer: HTTP surface and report pipelines.

pub mod error;
pub mod pipelines;
pub mod server;

pub use server::{app, serve, AppState};
