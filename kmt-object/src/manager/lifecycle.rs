use {
    super::*,
    crate::gpu::*,
    alloc::vec,
    kmt_hal::OsHandle,
};

impl HandleManager {
    fn insert(&self, init: ObjectInit) -> KmtResult<Arc<dyn KernelObject>> {
        let (_, object) = self
            .inner
            .lock()
            .objects
            .insert_with(|local| new_object(local, init))?;
        Ok(object)
    }

    /// Create an object only this process can see.
    pub fn create_local(&self, kind: ObjectKind, private: &[u8]) -> KmtResult<HandleValue> {
        let private = PrivateData::new(private)?;
        let object = self.insert(ObjectInit::local(kind, private))?;
        debug!("create {:?}", object);
        Ok(object.local())
    }

    /// Create an object registered with the broker.
    ///
    /// Returns the local handle and the global id other processes open it by.
    pub fn create_shared(
        &self,
        kind: ObjectKind,
        private: &[u8],
    ) -> KmtResult<(HandleValue, HandleValue)> {
        let data = PrivateData::new(private)?;
        let created = self.broker().create_object(kind, private)?;
        let object = self.insert(ObjectInit {
            kind,
            global: created.global,
            provenance: Provenance::Shared(created.handle),
            private: data,
        })?;
        debug!("create shared {:?}", object);
        Ok((object.local(), object.global()))
    }

    /// Open the object registered under `global`.
    ///
    /// The stored private data is copied to `private`; `private_size`
    /// receives its size. If `private` is too small the call fails with
    /// `BUFFER_TOO_SMALL` and may be retried with a larger buffer.
    pub fn open_global(
        &self,
        kind: ObjectKind,
        global: HandleValue,
        private: &mut [u8],
        private_size: &mut usize,
    ) -> KmtResult<HandleValue> {
        let opened = self
            .broker()
            .open_by_global_id(kind, global, private.len(), private_size)?;
        let object = self.insert_opened(kind, opened, private, Provenance::OpenedGlobal)?;
        debug!("open {:?}", object);
        Ok(object.local())
    }

    /// Read the private data stored under `global` without opening an object.
    pub fn query_global(
        &self,
        kind: ObjectKind,
        global: HandleValue,
        private: &mut [u8],
        private_size: &mut usize,
    ) -> KmtResult {
        let opened = self
            .broker()
            .open_by_global_id(kind, global, private.len(), private_size)?;
        copy_private(&opened.private, private)
    }

    /// Open the object of `kind` from the bundle a peer shared as `peer`.
    ///
    /// Returns the local handle and the object's global id. Private data is
    /// returned as in [`open_global`](Self::open_global).
    pub fn open_peer(
        &self,
        kind: ObjectKind,
        peer: &OsHandle,
        private: &mut [u8],
        private_size: &mut usize,
    ) -> KmtResult<(HandleValue, HandleValue)> {
        let opened = self
            .broker()
            .resolve_peer_handle(kind, peer, private.len(), private_size)?;
        let object = self.insert_opened(kind, opened, private, Provenance::OpenedPeer)?;
        debug!("open from peer {:?}", object);
        Ok((object.local(), object.global()))
    }

    fn insert_opened(
        &self,
        kind: ObjectKind,
        opened: Opened,
        private: &mut [u8],
        provenance: fn(OsHandle) -> Provenance,
    ) -> KmtResult<Arc<dyn KernelObject>> {
        let data = PrivateData::new(&opened.private)?;
        copy_private(&opened.private, private)?;
        self.insert(ObjectInit {
            kind,
            global: opened.global,
            provenance: provenance(opened.handle),
            private: data,
        })
    }

    /// Create an allocation, optionally backing `resource`.
    pub fn create_allocation(&self, resource: Option<HandleValue>) -> KmtResult<HandleValue> {
        let mut inner = self.inner.lock();
        let resource = match resource {
            Some(handle) => {
                let object = inner
                    .objects
                    .lookup(handle, Some(ObjectKind::Resource))
                    .cloned()
                    .ok_or(KmtError::INVALID_HANDLE)?;
                let resource = object
                    .downcast_arc::<Resource>()
                    .map_err(|_| KmtError::INVALID_HANDLE)?;
                if resource.allocation().is_some() {
                    return Err(KmtError::INVALID_PARAMETER);
                }
                Some(resource)
            }
            None => None,
        };
        let (local, allocation) = inner.objects.insert_with(|local| {
            let init = ObjectInit::local(ObjectKind::Resource, PrivateData::default());
            let allocation: Arc<dyn KernelObject> = Allocation::new(KObjectBase::new(local, init));
            allocation
        })?;
        if let Some(resource) = resource {
            if let Err(err) = resource.set_allocation(local) {
                inner.objects.remove(local, &allocation);
                return Err(err);
            }
        }
        debug!("create allocation {:#x}", local);
        Ok(local)
    }

    /// Follow the allocation link of `resource`.
    pub fn resource_allocation(&self, resource: HandleValue) -> KmtResult<AllocationLink> {
        let inner = self.inner.lock();
        let resource = inner
            .objects
            .lookup(resource, Some(ObjectKind::Resource))
            .cloned()
            .and_then(downcast_object::<Resource>)
            .ok_or(KmtError::INVALID_HANDLE)?;
        let allocation = match resource.allocation() {
            Some(allocation) => allocation,
            None => return Ok(AllocationLink::None),
        };
        Ok(
            match inner
                .objects
                .get(allocation)
                .cloned()
                .and_then(downcast_object::<Allocation>)
            {
                Some(object) => AllocationLink::Live(object),
                None => AllocationLink::Stale(allocation),
            },
        )
    }

    /// Destroy the object of `handle`, which must be of `kind`.
    ///
    /// Destroying a resource also destroys its allocation. The broker is not
    /// involved; shared identities are released with the OS handle, which is
    /// closed before this returns even if the object is still referenced.
    pub fn destroy(&self, handle: HandleValue, kind: ObjectKind) -> KmtResult {
        let released = {
            let mut inner = self.inner.lock();
            let object = inner
                .objects
                .lookup(handle, Some(kind))
                .cloned()
                .ok_or(KmtError::INVALID_HANDLE)?;
            inner.objects.remove(handle, &object);
            let linked = object
                .downcast_ref::<Resource>()
                .and_then(|resource| resource.allocation())
                .and_then(|allocation| inner.objects.get(allocation).cloned());
            let mut released = vec![object];
            if let Some(allocation) = linked {
                inner.objects.remove(allocation.local(), &allocation);
                released.push(allocation);
            }
            released
        };
        for object in released {
            self.release(object);
        }
        Ok(())
    }

    pub(super) fn release(&self, object: Arc<dyn KernelObject>) {
        match object.take_provenance() {
            Some(Provenance::Local) => debug!("destroy {:?}", object),
            Some(Provenance::Shared(handle)) => {
                debug!("destroy shared {:?}, close {:?}", object, handle);
                drop(handle);
            }
            Some(Provenance::OpenedGlobal(handle)) | Some(Provenance::OpenedPeer(handle)) => {
                debug!("destroy opened {:?}, close {:?}", object, handle);
                drop(handle);
            }
            None => warn!("{:?} released twice", object),
        }
    }
}

fn copy_private(data: &[u8], buffer: &mut [u8]) -> KmtResult {
    buffer
        .get_mut(..data.len())
        .ok_or(KmtError::BUFFER_TOO_SMALL)?
        .copy_from_slice(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::Session;
    use super::*;
    use crate::config::Config;
    use std::collections::HashSet;

    #[test]
    fn create_and_destroy_local() {
        let session = Session::new();
        let manager = session.process();
        let handle = manager.create_local(ObjectKind::Resource, &[4, 5]).unwrap();
        let object = manager.lookup(handle, None).unwrap();
        assert_eq!(object.private_data(), &[4, 5]);
        assert_eq!(object.global(), 0);
        assert_eq!(session.broker.object_count(), 0);
        drop(object);

        manager.destroy(handle, ObjectKind::Resource).unwrap();
        assert!(manager.lookup(handle, None).is_none());
        assert_eq!(
            manager.destroy(handle, ObjectKind::Resource),
            Err(KmtError::INVALID_HANDLE)
        );
    }

    #[test]
    fn destroy_checks_kind() {
        let session = Session::new();
        let manager = session.process();
        let handle = manager.create_local(ObjectKind::SyncObject, &[]).unwrap();
        assert_eq!(
            manager.destroy(handle, ObjectKind::KeyedMutex),
            Err(KmtError::INVALID_HANDLE)
        );
        assert!(manager.lookup(handle, None).is_some());
        assert_eq!(manager.destroy(0, ObjectKind::SyncObject), Err(KmtError::INVALID_HANDLE));
    }

    #[test]
    fn oversized_private_data() {
        let session = Session::new();
        let manager = session.process();
        assert_eq!(
            manager.create_shared(ObjectKind::Resource, &[0; PRIVATE_DATA_MAX + 1]),
            Err(KmtError::INVALID_PARAMETER)
        );
        assert_eq!(session.broker.object_count(), 0);
    }

    #[test]
    fn handles_unique_across_paths() {
        let session = Session::new();
        let a = session.process();
        let b = session.process();
        let (_, global) = a.create_shared(ObjectKind::Resource, &[1]).unwrap();
        let mut seen = HashSet::new();
        let mut buffer = [0; 16];
        let mut size = 0;
        for i in 0..20 {
            let handle = match i % 3 {
                0 => b.create_local(ObjectKind::KeyedMutex, &[]).unwrap(),
                1 => b.create_shared(ObjectKind::SyncObject, &[]).unwrap().0,
                _ => b
                    .open_global(ObjectKind::Resource, global, &mut buffer, &mut size)
                    .unwrap(),
            };
            assert!(seen.insert(handle));
            if i % 4 == 0 {
                let object = b.lookup(handle, None).unwrap();
                b.destroy(handle, object.kind()).unwrap();
            }
        }
        let handles = b.handles();
        assert!(handles.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn open_from_another_process() {
        let session = Session::new();
        let a = session.process();
        let b = session.process();
        let (local_a, global) = a.create_shared(ObjectKind::Resource, &[1, 2, 3]).unwrap();
        assert!(is_global_handle(global));

        let mut buffer = [0; 16];
        let mut size = 0;
        let local_b = b
            .open_global(ObjectKind::Resource, global, &mut buffer, &mut size)
            .unwrap();
        assert_eq!(&buffer[..size], &[1, 2, 3]);
        let object = b.lookup(local_b, Some(ObjectKind::Resource)).unwrap();
        assert_eq!(object.global(), global);
        assert_eq!(object.private_data(), &[1, 2, 3]);
        assert_eq!(object.origin(), Origin::OpenedGlobal);
        assert_ne!(
            Arc::as_ptr(&object) as *const u8,
            Arc::as_ptr(&a.lookup(local_a, None).unwrap()) as *const u8
        );
    }

    #[test]
    fn buffer_too_small_then_retry() {
        let session = Session::new();
        let a = session.process();
        let b = session.process();
        let blob = [7u8; 40];
        let (_, global) = a.create_shared(ObjectKind::KeyedMutex, &blob).unwrap();

        let mut size = 0;
        assert_eq!(
            b.open_global(ObjectKind::KeyedMutex, global, &mut [], &mut size),
            Err(KmtError::BUFFER_TOO_SMALL)
        );
        assert_eq!(size, blob.len());
        assert_eq!(b.object_count(), 0);

        let mut buffer = vec![0; size];
        b.open_global(ObjectKind::KeyedMutex, global, &mut buffer, &mut size)
            .unwrap();
        assert_eq!(buffer, blob.to_vec());
    }

    #[test]
    fn open_unknown_global() {
        let session = Session::new();
        let manager = session.process();
        let mut size = 0;
        assert_eq!(
            manager.open_global(ObjectKind::Resource, 0x4000_1002, &mut [0; 8], &mut size),
            Err(KmtError::NOT_FOUND)
        );
        let (_, global) = manager.create_shared(ObjectKind::Resource, &[]).unwrap();
        assert_eq!(
            manager.open_global(ObjectKind::SyncObject, global, &mut [0; 8], &mut size),
            Err(KmtError::NOT_FOUND)
        );
    }

    #[test]
    fn destroy_closes_os_handle_while_referenced() {
        let session = Session::new();
        let manager = session.process();
        let baseline = session.space.open_count();
        let (handle, _) = manager.create_shared(ObjectKind::Resource, &[1]).unwrap();
        let created = session.space.open_count();
        assert_eq!(created, baseline + 2);

        let held = manager.lookup(handle, None).unwrap();
        manager.destroy(handle, ObjectKind::Resource).unwrap();
        assert_eq!(session.space.open_count(), created - 1);
        assert_eq!(held.origin(), Origin::Shared);
        assert!(held.take_provenance().is_none());
        drop(held);
        assert_eq!(session.space.open_count(), created - 1);
    }

    #[test]
    fn concurrent_create_and_destroy() {
        let session = Session::new();
        let manager = Arc::new(session.process());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    let mut handles = Vec::new();
                    for i in 0..200 {
                        let handle = manager.create_local(ObjectKind::SyncObject, &[]).unwrap();
                        if i % 2 == 0 {
                            manager.destroy(handle, ObjectKind::SyncObject).unwrap();
                        }
                        handles.push(handle);
                    }
                    handles
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for thread in threads {
            for handle in thread.join().unwrap() {
                assert!(is_local_handle(handle));
                assert!(seen.insert(handle));
            }
        }
        assert_eq!(seen.len(), 8 * 200);
        assert_eq!(manager.object_count(), 8 * 100);
        let handles = manager.handles();
        assert!(handles.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn query_global_keeps_nothing() {
        let session = Session::new();
        let a = session.process();
        let b = session.process();
        let (_, global) = a.create_shared(ObjectKind::Resource, &[5; 10]).unwrap();
        let baseline = session.space.open_count();
        let mut buffer = [0; 32];
        let mut size = 0;
        b.query_global(ObjectKind::Resource, global, &mut buffer, &mut size)
            .unwrap();
        assert_eq!(&buffer[..size], &[5; 10]);
        assert_eq!(b.object_count(), 0);
        assert_eq!(session.space.open_count(), baseline);
    }

    #[test]
    fn table_full() {
        let session = Session::new();
        let config = Config {
            max_objects: 2,
            ..Config::default()
        };
        let manager = session.process_with(config);
        manager.create_local(ObjectKind::Resource, &[]).unwrap();
        manager.create_shared(ObjectKind::Resource, &[]).unwrap();
        let baseline = session.space.open_count();
        assert_eq!(
            manager.create_shared(ObjectKind::Resource, &[]),
            Err(KmtError::NO_MEMORY)
        );
        // only the broker's own reference to the new object survives
        assert_eq!(session.space.open_count(), baseline + 1);
    }

    #[test]
    fn resource_allocation_link() {
        let session = Session::new();
        let manager = session.process();
        let resource = manager.create_local(ObjectKind::Resource, &[]).unwrap();
        assert!(matches!(
            manager.resource_allocation(resource),
            Ok(AllocationLink::None)
        ));

        let allocation = manager.create_allocation(Some(resource)).unwrap();
        match manager.resource_allocation(resource).unwrap() {
            AllocationLink::Live(object) => assert_eq!(object.local(), allocation),
            link => panic!("unexpected link {:?}", link),
        }
        assert_eq!(
            manager.create_allocation(Some(resource)),
            Err(KmtError::INVALID_PARAMETER)
        );

        manager.destroy(allocation, ObjectKind::Resource).unwrap();
        assert!(matches!(
            manager.resource_allocation(resource),
            Ok(AllocationLink::Stale(value)) if value == allocation
        ));
        manager.destroy(resource, ObjectKind::Resource).unwrap();
    }

    #[test]
    fn destroying_resource_destroys_allocation() {
        let session = Session::new();
        let manager = session.process();
        let resource = manager.create_local(ObjectKind::Resource, &[]).unwrap();
        let allocation = manager.create_allocation(Some(resource)).unwrap();
        let standalone = manager.create_allocation(None).unwrap();
        manager.destroy(resource, ObjectKind::Resource).unwrap();
        assert!(manager.lookup(allocation, None).is_none());
        assert!(manager.lookup(standalone, None).is_some());
        assert_eq!(
            manager.create_allocation(Some(standalone)),
            Err(KmtError::INVALID_HANDLE)
        );
    }
}
