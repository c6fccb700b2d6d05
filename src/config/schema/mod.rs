mod capture;
mod core;
mod gateway;
mod provider;

pub use capture::CaptureConfig;
pub use core::Config;
pub use gateway::GatewayConfig;
pub use provider::{ProviderConfig, ReliabilityConfig};
