//! Kernel graphics objects living in the handle table.

use {crate::object::*, alloc::sync::Arc};

mod keyed_mutex;
mod resource;
mod sync_object;

pub use self::{keyed_mutex::*, resource::*, sync_object::*};

/// Build the object of `init.kind` for the handle `local`.
pub fn new_object(local: HandleValue, init: ObjectInit) -> Arc<dyn KernelObject> {
    let base = KObjectBase::new(local, init);
    match base.kind {
        ObjectKind::Resource => Resource::new(base),
        ObjectKind::KeyedMutex => KeyedMutex::new(base),
        ObjectKind::SyncObject => SyncObject::new(base),
    }
}
