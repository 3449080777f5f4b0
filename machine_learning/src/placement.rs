//! Where a model's parameters live while the orchestrator holds them.
//!
//! Parameters must be staged to host memory before they are serialized for transmission,
//! since not every worker can read tensors resident on some other device.

use std::ops::Deref;

use crate::ParameterSet;

/// A parameter set known to be resident in host-addressable memory, ready to be serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct HostParams(ParameterSet);

impl Deref for HostParams {
    type Target = ParameterSet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Moves parameter sets between the model's compute device and host memory.
pub trait Placement {
    /// Returns a human readable name of the device, used for logging.
    fn device(&self) -> &'static str;

    /// Stages `params` into host memory, leaving the device resident copy untouched.
    fn to_host(&self, params: &ParameterSet) -> HostParams;

    /// Moves host resident `params` onto the compute device.
    fn to_device(&self, params: ParameterSet) -> ParameterSet;
}

/// The placement of models that are computed on the host itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cpu;

impl Placement for Cpu {
    fn device(&self) -> &'static str {
        "cpu"
    }

    fn to_host(&self, params: &ParameterSet) -> HostParams {
        HostParams(params.clone())
    }

    fn to_device(&self, params: ParameterSet) -> ParameterSet {
        params
    }
}

impl From<ParameterSet> for HostParams {
    /// Wraps a set that was produced in host memory, such as one deserialized from the network.
    fn from(params: ParameterSet) -> Self {
        Self(params)
    }
}
