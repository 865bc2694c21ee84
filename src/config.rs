#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Fsync the metadata stamp on every commit.
    Full,
    /// Leave flushing to the OS; fastest, loses the stamp on power failure.
    OsBuffered,
}

/// Runtime configuration for a chatstore instance.
#[derive(Debug, Clone)]
pub struct ChatstoreConfig {
    pub durability_mode: DurabilityMode,
    /// Ceiling on decoded entities held across transactions; the commit path
    /// drops the decode caches after crossing it.
    pub max_cached_entities: usize,
}

impl Default for ChatstoreConfig {
    fn default() -> Self {
        Self {
            durability_mode: DurabilityMode::Full,
            max_cached_entities: 100_000,
        }
    }
}

impl ChatstoreConfig {
    pub fn development() -> Self {
        Self {
            durability_mode: DurabilityMode::OsBuffered,
            ..Self::default()
        }
    }
}
