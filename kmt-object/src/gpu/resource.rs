use {
    crate::{error::*, object::*},
    alloc::sync::Arc,
    spin::Once,
};

/// 资源对象
///
/// A resource may be backed by one allocation, another object of kind
/// `Resource` in the same table. The link is a handle value, set at most once.
pub struct Resource {
    base: KObjectBase,
    allocation: Once<HandleValue>,
}

impl_kobject!(Resource);

impl Resource {
    pub fn new(base: KObjectBase) -> Arc<Self> {
        Arc::new(Resource {
            base,
            allocation: Once::new(),
        })
    }

    /// Link the allocation backing this resource.
    ///
    /// Fails with `INVALID_PARAMETER` if a link already exists.
    pub fn set_allocation(&self, allocation: HandleValue) -> KmtResult {
        let mut linked = false;
        self.allocation.call_once(|| {
            linked = true;
            allocation
        });
        if linked {
            Ok(())
        } else {
            Err(KmtError::INVALID_PARAMETER)
        }
    }

    /// Handle value of the linked allocation, if any.
    pub fn allocation(&self) -> Option<HandleValue> {
        self.allocation.get().copied()
    }
}

/// 资源背后的分配对象
pub struct Allocation {
    base: KObjectBase,
}

impl_kobject!(Allocation);

impl Allocation {
    pub fn new(base: KObjectBase) -> Arc<Self> {
        Arc::new(Allocation { base })
    }
}

/// Result of following a resource's allocation link.
#[derive(Debug)]
pub enum AllocationLink {
    /// The resource has no allocation.
    None,
    /// The allocation is alive.
    Live(Arc<Allocation>),
    /// The allocation was destroyed on its own; the value is dangling.
    Stale(HandleValue),
}
