use {
    super::*,
    crate::error::*,
    alloc::{collections::BTreeMap, sync::Arc, vec::Vec},
};

/// 句柄表：按句柄值排序保存对象
///
/// Values come from a monotonic index and are never handed out twice, so a
/// new entry always lands after every live one.
pub struct HandleTable<T: ?Sized> {
    namespace: Namespace,
    objects: BTreeMap<HandleValue, Arc<T>>,
    next_index: u32,
    capacity: usize,
}

impl<T: ?Sized> HandleTable<T> {
    /// Create an empty table holding at most `capacity` live objects.
    pub fn new(namespace: Namespace, capacity: usize) -> Self {
        HandleTable {
            namespace,
            objects: BTreeMap::new(),
            next_index: 1,
            capacity,
        }
    }

    /// Allocate the next handle value and insert the object built for it.
    ///
    /// `build` is only called once a value is reserved. Fails with
    /// `NO_MEMORY` when the table is full or the index space is exhausted.
    pub fn insert_with(
        &mut self,
        build: impl FnOnce(HandleValue) -> Arc<T>,
    ) -> KmtResult<(HandleValue, Arc<T>)> {
        if self.objects.len() >= self.capacity || self.next_index > MAX_HANDLE_INDEX {
            return Err(KmtError::NO_MEMORY);
        }
        let value = self.namespace.encode(self.next_index);
        self.next_index += 1;
        let object = build(value);
        self.objects.insert(value, object.clone());
        Ok((value, object))
    }

    pub fn get(&self, value: HandleValue) -> Option<&Arc<T>> {
        self.objects.get(&value)
    }

    /// Remove the slot of `value`, which must hold exactly `object`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is empty or holds another object.
    pub fn remove(&mut self, value: HandleValue, object: &Arc<T>) {
        let slot = self.objects.get(&value);
        assert!(
            slot.map_or(false, |slot| same_object(slot, object)),
            "handle table slot {:#x} does not hold the object being removed",
            value
        );
        self.objects.remove(&value);
    }

    /// Empty the table, handing back every live object.
    pub fn drain(&mut self) -> Vec<Arc<T>> {
        core::mem::take(&mut self.objects).into_values().collect()
    }

    /// Live handle values in ascending order.
    pub fn values(&self) -> impl Iterator<Item = HandleValue> + '_ {
        self.objects.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl HandleTable<dyn KernelObject> {
    /// Find the object of `value`, optionally requiring its kind.
    pub fn lookup(
        &self,
        value: HandleValue,
        kind: Option<ObjectKind>,
    ) -> Option<&Arc<dyn KernelObject>> {
        self.get(value)
            .filter(|object| kind.map_or(true, |kind| object.kind() == kind))
    }
}

fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const u8 == Arc::as_ptr(b) as *const u8
}
