pub mod metrics_handler;
pub mod static_capability;
