//! Registry keys for transactional resources.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a resource factory in the registry.
///
/// Each resource factory (session factory, connection factory) carries
/// exactly one key, and the registry holds at most one binding per key per
/// execution context. Keys are compared by value, so a factory shared
/// across coordinators yields the same binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey(Uuid);

impl ResourceKey {
    /// Create a new unique key using UUID v4.
    pub fn new() -> Self {
        ResourceKey(Uuid::new_v4())
    }

    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        ResourceKey(Uuid::from_bytes(bytes))
    }

    /// Raw bytes representation.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ResourceKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
