use {crate::object::*, alloc::sync::Arc, core::convert::TryFrom, numeric_enum_macro::numeric_enum};

/// GPU synchronization object
pub struct SyncObject {
    base: KObjectBase,
}

impl_kobject!(SyncObject);

impl SyncObject {
    pub fn new(base: KObjectBase) -> Arc<Self> {
        Arc::new(SyncObject { base })
    }
}

numeric_enum! {
    #[repr(u32)]
    /// 同步对象类型
    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum SyncObjectType {
        MUTEX = 1,
        SEMAPHORE = 2,
        FENCE = 3,
        CPU_NOTIFICATION = 4,
        MONITORED_FENCE = 5,
        PERIODIC_MONITORED_FENCE = 6,
    }
}

impl SyncObjectType {
    /// Parse a raw type accepted by sync object creation.
    ///
    /// Periodic monitored fences are outside the supported range.
    pub fn creatable(raw: u32) -> Option<Self> {
        match Self::try_from(raw) {
            Ok(SyncObjectType::PERIODIC_MONITORED_FENCE) | Err(_) => None,
            Ok(ty) => Some(ty),
        }
    }
}
