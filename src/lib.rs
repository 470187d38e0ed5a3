pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;
pub mod types;

pub use app::transfer_use_case::{TransferSettings, TransferUseCase};
pub use config::Config;
pub use error::{Result, TransferError};
pub use types::{Issue, TransferOutcome, TransferReport, TriggerEvent};
