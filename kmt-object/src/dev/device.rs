use {
    super::*,
    crate::{manager::HandleManager, object::HandleValue},
};

/// 在适配器上创建的设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub handle: HandleValue,
    pub adapter: HandleValue,
}

impl Registered for Device {
    fn handle(&self) -> HandleValue {
        self.handle
    }
}

impl HandleManager {
    /// Create a device on an open adapter.
    pub fn create_device(&self, adapter: HandleValue) -> KmtResult<HandleValue> {
        let mut inner = self.inner.lock();
        if inner.adapters.find(adapter).is_none() {
            return Err(KmtError::INVALID_HANDLE);
        }
        inner
            .devices
            .insert_with(|handle| Device { handle, adapter })
    }

    /// Destroy a device, releasing every display source it owned.
    pub fn destroy_device(&self, handle: HandleValue) -> KmtResult {
        let mut inner = self.inner.lock();
        inner
            .devices
            .remove(handle)
            .ok_or(KmtError::INVALID_HANDLE)?;
        inner.sources.clear(handle);
        Ok(())
    }

    pub fn device(&self, handle: HandleValue) -> KmtResult<Device> {
        self.inner
            .lock()
            .devices
            .find(handle)
            .copied()
            .ok_or(KmtError::INVALID_HANDLE)
    }

    /// Set the display source ownership of `device`.
    ///
    /// An empty batch releases every source owned by the device.
    pub fn set_vidpn_source_owner(
        &self,
        device: HandleValue,
        requests: &[(SourceId, OwnerType)],
    ) -> KmtResult {
        let mut inner = self.inner.lock();
        if inner.devices.find(device).is_none() {
            return Err(KmtError::INVALID_HANDLE);
        }
        inner.sources.set_owner(device, requests)
    }

    /// Whether any device owns `source` exclusively.
    pub fn check_vidpn_exclusive_ownership(&self, source: SourceId) -> bool {
        self.inner.lock().sources.check_exclusive(source)
    }

    pub fn vidpn_source_owner(&self, device: HandleValue, source: SourceId) -> Option<OwnerType> {
        self.inner.lock().sources.owner(device, source)
    }
}
