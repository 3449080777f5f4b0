mod adapter;
mod session;

pub use adapter::Adapter;
pub use session::{DatasetConfig, DiscoveryConfig, LocalConfig, SessionConfig};
