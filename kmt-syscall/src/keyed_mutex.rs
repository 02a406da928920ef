use {super::*, kmt_hal::OsHandle};

#[derive(Debug, Default)]
pub struct CreateKeyedMutex2 {
    pub initial_value: u64,
    pub flags: u32,
    pub private_runtime_data: Vec<u8>,
    /// out
    pub keyed_mutex: HandleValue,
    /// out
    pub shared_handle: HandleValue,
}

#[derive(Debug, Default)]
pub struct CreateKeyedMutex {
    pub initial_value: u64,
    /// out
    pub keyed_mutex: HandleValue,
    /// out
    pub shared_handle: HandleValue,
}

#[derive(Debug, Default)]
pub struct DestroyKeyedMutex {
    pub keyed_mutex: HandleValue,
}

#[derive(Debug, Default)]
pub struct OpenKeyedMutex2 {
    pub shared_handle: HandleValue,
    pub private_runtime_data: Option<Vec<u8>>,
    pub private_runtime_data_size: u32,
    /// out
    pub keyed_mutex: HandleValue,
}

#[derive(Debug, Default)]
pub struct OpenKeyedMutex {
    pub shared_handle: HandleValue,
    /// out
    pub keyed_mutex: HandleValue,
}

#[derive(Debug, Default)]
pub struct OpenKeyedMutexFromNtHandle {
    pub nt_handle: Option<OsHandle>,
    pub private_runtime_data: Option<Vec<u8>>,
    /// in/out
    pub private_runtime_data_size: u32,
    /// out
    pub keyed_mutex: HandleValue,
}

impl Syscall<'_> {
    pub fn sys_create_keyed_mutex2(&self, params: &mut CreateKeyedMutex2) -> KmtResult {
        info!(
            "keyed_mutex.create2: initial={:#x}, flags={:#x}, private={}",
            params.initial_value,
            params.flags,
            params.private_runtime_data.len()
        );
        let flags = KeyedMutexFlags::from_bits_truncate(params.flags);
        let (local, global) = self
            .manager
            .create_shared(ObjectKind::KeyedMutex, &params.private_runtime_data)?;
        params.keyed_mutex = local;
        params.shared_handle = if flags.contains(KeyedMutexFlags::NT_SECURITY_SHARING) {
            INVALID_HANDLE
        } else {
            global
        };
        Ok(())
    }

    pub fn sys_create_keyed_mutex(&self, params: &mut CreateKeyedMutex) -> KmtResult {
        info!("keyed_mutex.create: initial={:#x}", params.initial_value);
        let mut params2 = CreateKeyedMutex2 {
            initial_value: params.initial_value,
            ..Default::default()
        };
        self.sys_create_keyed_mutex2(&mut params2)?;
        params.keyed_mutex = params2.keyed_mutex;
        params.shared_handle = params2.shared_handle;
        Ok(())
    }

    pub fn sys_destroy_keyed_mutex(&self, params: &mut DestroyKeyedMutex) -> KmtResult {
        info!("keyed_mutex.destroy: handle={:#x}", params.keyed_mutex);
        self.destroy_object(params.keyed_mutex, ObjectKind::KeyedMutex)
    }

    /// Open a keyed mutex by its global id.
    ///
    /// The caller's size is only a capacity and is not written back.
    pub fn sys_open_keyed_mutex2(&self, params: &mut OpenKeyedMutex2) -> KmtResult {
        info!(
            "keyed_mutex.open2: global={:#x}, size={:#x}",
            params.shared_handle, params.private_runtime_data_size
        );
        if !is_global_handle(params.shared_handle) {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let global = params.shared_handle;
        let mut size = params.private_runtime_data_size;
        params.keyed_mutex = self.with_private_buffer(
            &mut params.private_runtime_data,
            &mut size,
            |buffer, size| {
                self.manager
                    .open_global(ObjectKind::KeyedMutex, global, buffer, size)
            },
        )?;
        Ok(())
    }

    pub fn sys_open_keyed_mutex(&self, params: &mut OpenKeyedMutex) -> KmtResult {
        info!("keyed_mutex.open: global={:#x}", params.shared_handle);
        let mut params2 = OpenKeyedMutex2 {
            shared_handle: params.shared_handle,
            ..Default::default()
        };
        self.sys_open_keyed_mutex2(&mut params2)?;
        params.keyed_mutex = params2.keyed_mutex;
        Ok(())
    }

    pub fn sys_open_keyed_mutex_from_nt_handle(
        &self,
        params: &mut OpenKeyedMutexFromNtHandle,
    ) -> KmtResult {
        info!("keyed_mutex.open_from_nt_handle: handle={:?}", params.nt_handle);
        let shared = params.nt_handle.take().ok_or(KmtError::INVALID_HANDLE)?;
        let ret = self.with_private_buffer(
            &mut params.private_runtime_data,
            &mut params.private_runtime_data_size,
            |buffer, size| {
                self.manager
                    .open_peer(ObjectKind::KeyedMutex, &shared, buffer, size)
            },
        );
        params.nt_handle = Some(shared);
        let (local, _) = ret?;
        params.keyed_mutex = local;
        Ok(())
    }
}
