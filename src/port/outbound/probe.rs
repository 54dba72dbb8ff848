//! Hardware probe port.

use crate::domain::hardware::HardwareFacts;

/// Reads host capabilities once.
///
/// Implementations never fail: a capability that cannot be read is recorded
/// as absent (no GPU) or unknown (free disk), never raised as an error.
pub trait HardwareProbe: Send + Sync {
    /// Take a snapshot of the host.
    fn detect(&self) -> HardwareFacts;
}

/// Probe that returns a fixed snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub HardwareFacts);

impl HardwareProbe for FixedProbe {
    fn detect(&self) -> HardwareFacts {
        self.0
    }
}
