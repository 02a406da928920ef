use {
    super::*,
    kmt_hal::{OsHandle, RawFd},
};

impl HandleManager {
    /// Share objects with other processes through one transferable handle.
    ///
    /// `handles` holds either one resource or sync object, or one object of
    /// each kind. All of them must be registered with the broker.
    pub fn share_objects(
        &self,
        handles: &[HandleValue],
        access: ShareAccess,
        name: Option<&str>,
    ) -> KmtResult<OsHandle> {
        if handles.len() != 1 && handles.len() != 3 {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let mut set = ShareSet::default();
        {
            let inner = self.inner.lock();
            for &handle in handles {
                let object = inner
                    .objects
                    .lookup(handle, None)
                    .ok_or(KmtError::INVALID_PARAMETER)?;
                let slot = match object.kind() {
                    ObjectKind::Resource => &mut set.resource,
                    ObjectKind::KeyedMutex => &mut set.keyed_mutex,
                    ObjectKind::SyncObject => &mut set.sync_object,
                };
                if object.global() == INVALID_HANDLE || *slot != INVALID_HANDLE {
                    return Err(KmtError::INVALID_PARAMETER);
                }
                *slot = object.global();
            }
        }
        debug!("share {:x?} access={:?} name={:?}", set, access, name);
        self.broker().share_objects(set, access, name)
    }

    /// Attach the host descriptor `fd` to a shared object.
    ///
    /// `fd` stays owned by the caller. A descriptor can be attached once.
    pub fn set_object_fd(&self, handle: HandleValue, desc: &Descriptor, fd: RawFd) -> KmtResult {
        let (kind, global) = self.shared_identity(handle)?;
        let wrapper = OsHandle::from_fd(self.handle_space(), fd).map_err(|_| KmtError::INVALID_HANDLE)?;
        self.broker().set_descriptor(kind, global, *desc, wrapper)
    }

    /// Fetch the host descriptor attached to a shared object.
    ///
    /// The returned fd is a duplicate owned by the caller.
    pub fn get_object_fd(&self, handle: HandleValue) -> KmtResult<(Descriptor, RawFd)> {
        let (kind, global) = self.shared_identity(handle)?;
        let (desc, wrapper) = self.broker().get_descriptor(kind, global)?;
        let fd = wrapper.to_fd().map_err(|_| KmtError::INVALID_HANDLE)?;
        Ok((desc, fd))
    }

    fn shared_identity(&self, handle: HandleValue) -> KmtResult<(ObjectKind, HandleValue)> {
        let object = self.lookup(handle, None).ok_or(KmtError::INVALID_HANDLE)?;
        if object.global() == INVALID_HANDLE {
            return Err(KmtError::INVALID_HANDLE);
        }
        Ok((object.kind(), object.global()))
    }
}
