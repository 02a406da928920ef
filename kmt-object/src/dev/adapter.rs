use {
    super::*,
    crate::{manager::HandleManager, object::HandleValue},
    alloc::vec::Vec,
    kmt_hal::{find_physical_device, Luid, MemoryHeap, PhysicalDevice},
};

/// 打开的显示适配器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub handle: HandleValue,
    pub luid: Luid,
    /// Physical device found by the GPU lookup, if it succeeded.
    pub physical_device: Option<PhysicalDevice>,
}

impl Registered for Adapter {
    fn handle(&self) -> HandleValue {
        self.handle
    }
}

impl HandleManager {
    /// Open the adapter identified by `luid`.
    ///
    /// The physical device is looked up on a best-effort basis; the adapter
    /// is registered even when it cannot be found.
    pub fn open_adapter(&self, luid: Luid) -> KmtResult<HandleValue> {
        let physical_device = self.lookup_physical_device(luid);
        let handle = self.inner.lock().adapters.insert_with(|handle| Adapter {
            handle,
            luid,
            physical_device,
        })?;
        debug!("open adapter {:#x} luid={:?} device={:?}", handle, luid, physical_device);
        Ok(handle)
    }

    fn lookup_physical_device(&self, luid: Luid) -> Option<PhysicalDevice> {
        let gpu = match self.gpu() {
            Some(gpu) if self.config().gpu_lookup => gpu,
            _ => return None,
        };
        let uuid = match gpu.uuid_from_luid(luid) {
            Some(uuid) => uuid,
            None => {
                warn!(
                    "failed to find GPU for LUID {:08x}:{:08x}",
                    luid.high_part, luid.low_part
                );
                return None;
            }
        };
        let device = find_physical_device(gpu.as_ref(), &uuid);
        if device.is_none() {
            warn!("failed to find physical device with UUID {:02x?}", uuid.0);
        }
        device
    }

    pub fn close_adapter(&self, handle: HandleValue) -> KmtResult {
        self.inner
            .lock()
            .adapters
            .remove(handle)
            .map(|_| ())
            .ok_or(KmtError::INVALID_HANDLE)
    }

    pub fn adapter(&self, handle: HandleValue) -> KmtResult<Adapter> {
        self.inner
            .lock()
            .adapters
            .find(handle)
            .cloned()
            .ok_or(KmtError::INVALID_HANDLE)
    }

    /// Memory heaps of the adapter's physical device.
    ///
    /// Empty when the adapter has no physical device.
    pub fn adapter_memory_heaps(&self, handle: HandleValue) -> KmtResult<Vec<MemoryHeap>> {
        let adapter = self.adapter(handle)?;
        Ok(match (adapter.physical_device, self.gpu()) {
            (Some(device), Some(gpu)) => gpu.memory_heaps(device),
            _ => Vec::new(),
        })
    }
}
