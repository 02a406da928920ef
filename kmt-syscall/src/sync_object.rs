use {
    super::*,
    kmt_hal::OsHandle,
    kmt_object::gpu::SyncObjectType,
};

#[derive(Debug, Default)]
pub struct SyncObjectInfo2 {
    pub sync_type: u32,
    pub flags: u32,
    /// Event signaled by CPU notification objects, 0 if none.
    pub cpu_notification_event: u64,
    /// out
    pub shared_handle: HandleValue,
}

#[derive(Debug, Default)]
pub struct CreateSynchronizationObject2 {
    pub device: HandleValue,
    pub info: SyncObjectInfo2,
    /// out
    pub sync_object: HandleValue,
}

#[derive(Debug, Default)]
pub struct CreateSynchronizationObject {
    pub device: HandleValue,
    pub sync_type: u32,
    /// out
    pub sync_object: HandleValue,
}

#[derive(Debug, Default)]
pub struct OpenSynchronizationObject {
    pub shared_handle: HandleValue,
    /// out
    pub sync_object: HandleValue,
}

#[derive(Debug, Default)]
pub struct OpenSyncObjectFromNtHandle {
    pub nt_handle: Option<OsHandle>,
    /// out
    pub sync_object: HandleValue,
}

#[derive(Debug, Default)]
pub struct DestroySynchronizationObject {
    pub sync_object: HandleValue,
}

impl Syscall<'_> {
    pub fn sys_create_synchronization_object2(
        &self,
        params: &mut CreateSynchronizationObject2,
    ) -> KmtResult {
        info!(
            "sync_object.create2: device={:#x}, type={}, flags={:#x}",
            params.device, params.info.sync_type, params.info.flags
        );
        if params.device == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let sync_type = match SyncObjectType::creatable(params.info.sync_type) {
            Some(sync_type) => sync_type,
            None => {
                warn!("sync object type {} not implemented", params.info.sync_type);
                return Err(KmtError::INVALID_PARAMETER);
            }
        };
        if sync_type == SyncObjectType::CPU_NOTIFICATION && params.info.cpu_notification_event == 0 {
            return Err(KmtError::INVALID_HANDLE);
        }
        let flags = SyncObjectFlags::from_bits_truncate(params.info.flags);
        let nt_shared = flags.contains(SyncObjectFlags::NT_SECURITY_SHARING);
        if nt_shared && !flags.contains(SyncObjectFlags::SHARED) {
            return Err(KmtError::INVALID_PARAMETER);
        }
        if flags.contains(SyncObjectFlags::SHARED) {
            let (local, global) = self.manager.create_shared(ObjectKind::SyncObject, &[])?;
            if !nt_shared {
                params.info.shared_handle = global;
            }
            params.sync_object = local;
        } else {
            params.sync_object = self.manager.create_local(ObjectKind::SyncObject, &[])?;
        }
        Ok(())
    }

    /// Create a shared mutex or semaphore.
    pub fn sys_create_synchronization_object(
        &self,
        params: &mut CreateSynchronizationObject,
    ) -> KmtResult {
        info!(
            "sync_object.create: device={:#x}, type={}",
            params.device, params.sync_type
        );
        match SyncObjectType::try_from(params.sync_type) {
            Ok(SyncObjectType::MUTEX) | Ok(SyncObjectType::SEMAPHORE) => {}
            _ => return Err(KmtError::INVALID_PARAMETER),
        }
        let mut params2 = CreateSynchronizationObject2 {
            device: params.device,
            info: SyncObjectInfo2 {
                sync_type: params.sync_type,
                flags: SyncObjectFlags::SHARED.bits(),
                ..Default::default()
            },
            ..Default::default()
        };
        self.sys_create_synchronization_object2(&mut params2)?;
        params.sync_object = params2.sync_object;
        Ok(())
    }

    pub fn sys_open_synchronization_object(
        &self,
        params: &mut OpenSynchronizationObject,
    ) -> KmtResult {
        info!("sync_object.open: global={:#x}", params.shared_handle);
        let global = params.shared_handle;
        params.sync_object = self.with_private_buffer(&mut None, &mut 0, |buffer, size| {
            self.manager
                .open_global(ObjectKind::SyncObject, global, buffer, size)
        })?;
        Ok(())
    }

    pub fn sys_open_sync_object_from_nt_handle(
        &self,
        params: &mut OpenSyncObjectFromNtHandle,
    ) -> KmtResult {
        info!("sync_object.open_from_nt_handle: handle={:?}", params.nt_handle);
        let shared = params.nt_handle.as_ref().ok_or(KmtError::INVALID_HANDLE)?;
        let (local, _) = self.with_private_buffer(&mut None, &mut 0, |buffer, size| {
            self.manager
                .open_peer(ObjectKind::SyncObject, shared, buffer, size)
        })?;
        params.sync_object = local;
        Ok(())
    }

    pub fn sys_destroy_synchronization_object(
        &self,
        params: &mut DestroySynchronizationObject,
    ) -> KmtResult {
        info!("sync_object.destroy: handle={:#x}", params.sync_object);
        self.destroy_object(params.sync_object, ObjectKind::SyncObject)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Session;
    use super::*;

    fn create2(
        sys: &Syscall,
        sync_type: SyncObjectType,
        flags: SyncObjectFlags,
    ) -> CreateSynchronizationObject2 {
        let mut params = CreateSynchronizationObject2 {
            device: 0x4000_0040,
            info: SyncObjectInfo2 {
                sync_type: sync_type as u32,
                flags: flags.bits(),
                cpu_notification_event: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        sys.sys_create_synchronization_object2(&mut params).unwrap();
        params
    }

    #[test]
    fn create_validation() {
        let session = Session::new();
        let manager = session.process();
        let sys = Syscall { manager: &manager };

        let mut params = CreateSynchronizationObject2 {
            info: SyncObjectInfo2 {
                sync_type: SyncObjectType::MUTEX as u32,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            sys.sys_create_synchronization_object2(&mut params),
            Err(KmtError::INVALID_PARAMETER)
        );
        params.device = 0x4000_0040;
        params.info.sync_type = SyncObjectType::PERIODIC_MONITORED_FENCE as u32;
        assert_eq!(
            sys.sys_create_synchronization_object2(&mut params),
            Err(KmtError::INVALID_PARAMETER)
        );
        params.info.sync_type = SyncObjectType::CPU_NOTIFICATION as u32;
        assert_eq!(
            sys.sys_create_synchronization_object2(&mut params),
            Err(KmtError::INVALID_HANDLE)
        );
        params.info.sync_type = SyncObjectType::MONITORED_FENCE as u32;
        params.info.flags = SyncObjectFlags::NT_SECURITY_SHARING.bits();
        assert_eq!(
            sys.sys_create_synchronization_object2(&mut params),
            Err(KmtError::INVALID_PARAMETER)
        );
        assert_eq!(manager.object_count(), 0);

        let mut legacy = CreateSynchronizationObject {
            device: 0x4000_0040,
            sync_type: SyncObjectType::FENCE as u32,
            ..Default::default()
        };
        assert_eq!(
            sys.sys_create_synchronization_object(&mut legacy),
            Err(KmtError::INVALID_PARAMETER)
        );
        legacy.sync_type = SyncObjectType::SEMAPHORE as u32;
        sys.sys_create_synchronization_object(&mut legacy).unwrap();
        assert_ne!(
            manager.lookup(legacy.sync_object, None).unwrap().global(),
            INVALID_HANDLE
        );
    }

    #[test]
    fn shared_handle_reporting() {
        let session = Session::new();
        let manager = session.process();
        let sys = Syscall { manager: &manager };

        let local = create2(&sys, SyncObjectType::FENCE, SyncObjectFlags::empty());
        assert_eq!(local.info.shared_handle, INVALID_HANDLE);
        assert_eq!(manager.lookup(local.sync_object, None).unwrap().global(), INVALID_HANDLE);

        let shared = create2(&sys, SyncObjectType::MUTEX, SyncObjectFlags::SHARED);
        assert!(is_global_handle(shared.info.shared_handle));

        let nt = create2(
            &sys,
            SyncObjectType::CPU_NOTIFICATION,
            SyncObjectFlags::SHARED | SyncObjectFlags::NT_SECURITY_SHARING,
        );
        assert_eq!(nt.info.shared_handle, INVALID_HANDLE);
    }

    #[test]
    fn open_and_destroy() {
        let session = Session::new();
        let a = session.process();
        let b = session.process();
        let sys_a = Syscall { manager: &a };
        let sys_b = Syscall { manager: &b };

        let shared = create2(&sys_a, SyncObjectType::SEMAPHORE, SyncObjectFlags::SHARED);
        let mut open = OpenSynchronizationObject {
            shared_handle: shared.info.shared_handle,
            ..Default::default()
        };
        sys_b.sys_open_synchronization_object(&mut open).unwrap();
        assert!(b.lookup(open.sync_object, Some(ObjectKind::SyncObject)).is_some());

        let nt = create2(
            &sys_a,
            SyncObjectType::FENCE,
            SyncObjectFlags::SHARED | SyncObjectFlags::NT_SECURITY_SHARING,
        );
        let mut share = ShareObjects {
            handles: vec![nt.sync_object],
            access: 0x1000_0000,
            ..Default::default()
        };
        sys_a.sys_share_objects(&mut share).unwrap();
        let mut from_nt = OpenSyncObjectFromNtHandle {
            nt_handle: share.shared.take(),
            ..Default::default()
        };
        sys_b.sys_open_sync_object_from_nt_handle(&mut from_nt).unwrap();
        assert_eq!(b.object_count(), 2);

        let mut destroy = DestroySynchronizationObject {
            sync_object: from_nt.sync_object,
        };
        sys_b.sys_destroy_synchronization_object(&mut destroy).unwrap();
        assert_eq!(
            sys_b.sys_destroy_synchronization_object(&mut destroy),
            Err(KmtError::INVALID_PARAMETER)
        );
        assert_eq!(
            sys_b.sys_open_synchronization_object(&mut OpenSynchronizationObject {
                shared_handle: 0xc000_0042,
                ..Default::default()
            }),
            Err(KmtError::NOT_FOUND)
        );
    }
}
