use {
    super::*,
    alloc::string::String,
    kmt_hal::{OsHandle, RawFd},
    kmt_object::ipc::{Descriptor, ShareAccess},
};

#[derive(Debug, Default)]
pub struct ShareObjects {
    pub handles: Vec<HandleValue>,
    pub access: u32,
    pub name: Option<String>,
    /// out
    pub shared: Option<OsHandle>,
}

#[derive(Debug, Default)]
pub struct SetObjectFd {
    pub handle: HandleValue,
    pub desc: Descriptor,
    /// Stays owned by the caller.
    pub fd: RawFd,
}

#[derive(Debug, Default)]
pub struct GetObjectFd {
    pub handle: HandleValue,
    /// out
    pub desc: Descriptor,
    /// out, owned by the caller
    pub fd: RawFd,
}

impl Syscall<'_> {
    /// Bundle shared objects behind one transferable handle.
    pub fn sys_share_objects(&self, params: &mut ShareObjects) -> KmtResult {
        info!(
            "share_objects: handles={:#x?}, access={:#x}, name={:?}",
            params.handles, params.access, params.name
        );
        let access = ShareAccess::from_bits_truncate(params.access);
        let shared =
            self.manager
                .share_objects(&params.handles, access, params.name.as_deref())?;
        params.shared = Some(shared);
        Ok(())
    }

    pub fn sys_set_object_fd(&self, params: &mut SetObjectFd) -> KmtResult {
        info!(
            "object.set_fd: handle={:#x}, desc={:?}, fd={}",
            params.handle, params.desc, params.fd
        );
        self.manager
            .set_object_fd(params.handle, &params.desc, params.fd)
            .map_err(|err| {
                error!("failed to attach fd to {:#x}: {:?}", params.handle, err);
                err
            })
    }

    pub fn sys_get_object_fd(&self, params: &mut GetObjectFd) -> KmtResult {
        info!("object.get_fd: handle={:#x}", params.handle);
        let (desc, fd) = self.manager.get_object_fd(params.handle).map_err(|err| {
            error!("failed to fetch fd of {:#x}: {:?}", params.handle, err);
            err
        })?;
        params.desc = desc;
        params.fd = fd;
        Ok(())
    }
}
