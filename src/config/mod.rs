pub mod schema;

pub use schema::{CaptureConfig, Config, GatewayConfig, ProviderConfig, ReliabilityConfig};
