//! Per-process state of the D3DKMT layer.

use {
    crate::{config::Config, dev::*, error::*, ipc::*, object::*},
    alloc::{sync::Arc, vec::Vec},
    kmt_hal::{GpuEnumerator, HandleSpace},
    spin::Mutex,
};

mod lifecycle;
mod share;

/// 进程内的句柄管理器
///
/// One lock covers the object table, the adapter and device registries and
/// the display source owners. It is never held across a broker call.
pub struct HandleManager {
    config: Config,
    space: Arc<dyn HandleSpace>,
    gpu: Option<Arc<dyn GpuEnumerator>>,
    broker: BrokerClient,
    pub(crate) inner: Mutex<ManagerInner>,
}

pub(crate) struct ManagerInner {
    pub(crate) objects: HandleTable<dyn KernelObject>,
    pub(crate) adapters: Registry<Adapter>,
    pub(crate) devices: Registry<Device>,
    pub(crate) sources: VidPnSourceOwners,
}

impl HandleManager {
    /// Create the manager of one process.
    pub fn new(
        config: Config,
        space: Arc<dyn HandleSpace>,
        broker: Arc<dyn BrokerTransport>,
    ) -> Self {
        let objects = HandleTable::new(Namespace::Local, config.max_objects);
        HandleManager {
            config,
            space,
            gpu: None,
            broker: BrokerClient::new(broker),
            inner: Mutex::new(ManagerInner {
                objects,
                adapters: Registry::new(),
                devices: Registry::new(),
                sources: VidPnSourceOwners::default(),
            }),
        }
    }

    /// Use `gpu` to find the physical device of opened adapters.
    pub fn with_gpu(mut self, gpu: Arc<dyn GpuEnumerator>) -> Self {
        self.gpu = Some(gpu);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handle_space(&self) -> &Arc<dyn HandleSpace> {
        &self.space
    }

    pub fn gpu(&self) -> Option<&Arc<dyn GpuEnumerator>> {
        self.gpu.as_ref()
    }

    pub(crate) fn broker(&self) -> &BrokerClient {
        &self.broker
    }

    /// Find the object of `handle`, optionally requiring its kind.
    pub fn lookup(&self, handle: HandleValue, kind: Option<ObjectKind>) -> Option<Arc<dyn KernelObject>> {
        self.inner.lock().objects.lookup(handle, kind).cloned()
    }

    /// Get the object of `handle` as a `T`.
    pub fn get_object<T: KernelObject>(&self, handle: HandleValue) -> KmtResult<Arc<T>> {
        let object = self.lookup(handle, None).ok_or(KmtError::INVALID_HANDLE)?;
        object
            .downcast_arc::<T>()
            .map_err(|_| KmtError::INVALID_HANDLE)
    }

    /// Live object handles in ascending order.
    pub fn handles(&self) -> Vec<HandleValue> {
        self.inner.lock().objects.values().collect()
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Destroy every object, device and adapter still alive.
    pub fn shutdown(&self) {
        let (objects, devices, adapters) = {
            let mut inner = self.inner.lock();
            let devices = inner.devices.clear();
            for device in devices.iter() {
                inner.sources.clear(device.handle);
            }
            (inner.objects.drain(), devices, inner.adapters.clear())
        };
        if !(objects.is_empty() && devices.is_empty() && adapters.is_empty()) {
            info!(
                "shutdown: release {} objects, {} devices, {} adapters",
                objects.len(),
                devices.len(),
                adapters.len()
            );
        }
        for object in objects {
            self.release(object);
        }
    }
}

impl Drop for HandleManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Session;
    use super::*;
    use crate::gpu::*;

    #[test]
    fn lookup_with_kind_filter() {
        let session = Session::new();
        let manager = session.process();
        let handle = manager.create_local(ObjectKind::KeyedMutex, &[]).unwrap();
        assert!(is_local_handle(handle));
        assert!(manager.lookup(handle, Some(ObjectKind::Resource)).is_none());
        assert!(manager.lookup(handle, Some(ObjectKind::KeyedMutex)).is_some());
        assert_eq!(
            manager.lookup(handle, None).unwrap().kind(),
            ObjectKind::KeyedMutex
        );
        assert!(manager.get_object::<KeyedMutex>(handle).is_ok());
        assert_eq!(
            manager.get_object::<SyncObject>(handle).unwrap_err(),
            KmtError::INVALID_HANDLE
        );
    }

    #[test]
    fn shutdown_releases_os_handles() {
        let session = Session::new();
        let baseline = session.space.open_count();
        let manager = session.process();
        manager.create_shared(ObjectKind::Resource, &[1]).unwrap();
        manager.create_shared(ObjectKind::SyncObject, &[]).unwrap();
        manager.create_local(ObjectKind::KeyedMutex, &[]).unwrap();
        // the broker keeps one handle per object, the manager another
        assert_eq!(session.space.open_count(), baseline + 4);
        drop(manager);
        assert_eq!(session.space.open_count(), baseline + 2);
    }

    #[test]
    fn shutdown_ignores_outstanding_references() {
        let session = Session::new();
        let baseline = session.space.open_count();
        let manager = session.process();
        let (handle, _) = manager.create_shared(ObjectKind::KeyedMutex, &[]).unwrap();
        let held = manager.get_object::<KeyedMutex>(handle).unwrap();
        manager.shutdown();
        assert_eq!(manager.object_count(), 0);
        assert_eq!(session.space.open_count(), baseline + 1);
        assert_eq!(held.origin(), Origin::Shared);
    }
}
