use {crate::object::*, alloc::sync::Arc};

/// Keyed mutex synchronizing access to a shared resource
pub struct KeyedMutex {
    base: KObjectBase,
}

impl_kobject!(KeyedMutex);

impl KeyedMutex {
    pub fn new(base: KObjectBase) -> Arc<Self> {
        Arc::new(KeyedMutex { base })
    }
}
