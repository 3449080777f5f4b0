pub mod arch;
pub mod dataset;
pub mod error;
pub mod optimization;
pub mod params;
pub mod placement;

pub use error::{MlErr, Result};
pub use params::ParameterSet;
