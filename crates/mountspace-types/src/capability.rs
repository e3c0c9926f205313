//! Mount access levels.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a mount allows callers to do.
///
/// A read-write mount is also visible through the read-only view at the same
/// virtual root. Access is only ever widened that way, never narrowed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    ReadOnly,
    ReadWrite,
}

impl Capability {
    /// Returns true if mutations may be routed to a mount with this access.
    pub fn allows_write(&self) -> bool {
        matches!(self, Capability::ReadWrite)
    }

    /// Returns true if a mount with this access satisfies a request for `wanted`.
    pub fn satisfies(&self, wanted: Capability) -> bool {
        match wanted {
            Capability::ReadOnly => true,
            Capability::ReadWrite => self.allows_write(),
        }
    }
}
