//! Runtime configuration of a [`HandleManager`](crate::HandleManager).

/// Largest number of objects alive at the same time in one table.
pub const MAX_OBJECTS: usize = 0xffff;

/// Buffer size used for private data when a caller supplies no buffer.
pub const DEFAULT_PRIVATE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of live objects in the handle table.
    pub max_objects: usize,
    /// Private data capacity used by opens that carry no caller buffer.
    pub default_private_capacity: usize,
    /// Whether opening an adapter looks up its physical device.
    pub gpu_lookup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_objects: MAX_OBJECTS,
            default_private_capacity: DEFAULT_PRIVATE_CAPACITY,
            gpu_lookup: true,
        }
    }
}
