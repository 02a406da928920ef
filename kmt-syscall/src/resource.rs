use {
    super::*,
    kmt_hal::OsHandle,
    kmt_object::gpu::AllocationLink,
};

/// Existing-heap description of a standard allocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardAllocation {
    pub alloc_type: u32,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct AllocationInfo {
    /// Address of the caller's system memory, 0 if none.
    pub system_mem: usize,
    /// out
    pub allocation: HandleValue,
}

#[derive(Debug, Default)]
pub struct CreateAllocation {
    pub device: HandleValue,
    /// in/out
    pub resource: HandleValue,
    /// out
    pub global_share: HandleValue,
    pub flags: u32,
    pub private_runtime_data: Vec<u8>,
    pub private_driver_data_size: u32,
    pub standard: Option<StandardAllocation>,
    pub allocations: Vec<AllocationInfo>,
}

#[derive(Debug, Default)]
pub struct DestroyAllocation {
    pub device: HandleValue,
    pub resource: HandleValue,
    pub allocations: Vec<HandleValue>,
}

#[derive(Debug, Default)]
pub struct OpenAllocationInfo {
    /// out
    pub allocation: HandleValue,
    /// out
    pub private_driver_data_size: u32,
}

#[derive(Debug, Default)]
pub struct OpenResource {
    pub device: HandleValue,
    pub global_share: HandleValue,
    pub allocations: Vec<OpenAllocationInfo>,
    pub private_runtime_data: Option<Vec<u8>>,
    /// in/out
    pub private_runtime_data_size: u32,
    /// out
    pub resource: HandleValue,
    /// out
    pub total_private_driver_data_buffer_size: u32,
}

#[derive(Debug, Default)]
pub struct OpenResourceFromNtHandle {
    pub device: HandleValue,
    pub nt_handle: Option<OsHandle>,
    pub private_runtime_data: Option<Vec<u8>>,
    /// in/out
    pub private_runtime_data_size: u32,
    pub keyed_mutex_private_runtime_data: Option<Vec<u8>>,
    /// in/out
    pub keyed_mutex_private_runtime_data_size: u32,
    /// out
    pub resource: HandleValue,
    /// out
    pub keyed_mutex: HandleValue,
    /// out
    pub sync_object: HandleValue,
    /// out
    pub total_private_driver_data_buffer_size: u32,
}

#[derive(Debug, Default)]
pub struct QueryResourceInfo {
    pub device: HandleValue,
    pub global_share: HandleValue,
    pub private_runtime_data: Option<Vec<u8>>,
    /// in/out
    pub private_runtime_data_size: u32,
    /// out
    pub total_private_driver_data_size: u32,
    /// out
    pub num_allocations: u32,
}

impl Syscall<'_> {
    /// Create one allocation over existing system memory, optionally with
    /// the resource it backs.
    pub fn sys_create_allocation(&self, params: &mut CreateAllocation) -> KmtResult {
        info!(
            "allocation.create: device={:#x}, resource={:#x}, flags={:#x}, count={}",
            params.device,
            params.resource,
            params.flags,
            params.allocations.len()
        );
        let flags = CreateAllocationFlags::from_bits_truncate(params.flags);
        if params.device == INVALID_HANDLE
            || !flags.contains(CreateAllocationFlags::STANDARD_ALLOCATION)
            || params.private_driver_data_size != 0
            || params.allocations.len() != 1
        {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let standard = params.standard.ok_or(KmtError::INVALID_PARAMETER)?;
        if StandardAllocationType::try_from(standard.alloc_type)
            != Ok(StandardAllocationType::EXISTINGHEAP)
            || standard.size & 0xfff != 0
            || !flags.contains(CreateAllocationFlags::EXISTING_SYSMEM)
            || params.allocations[0].system_mem == 0
        {
            return Err(KmtError::INVALID_PARAMETER);
        }

        let shared = flags.contains(CreateAllocationFlags::CREATE_SHARED);
        let resource = if flags.contains(CreateAllocationFlags::CREATE_RESOURCE) {
            if params.resource != INVALID_HANDLE {
                self.manager
                    .lookup(params.resource, Some(ObjectKind::Resource))
                    .ok_or(KmtError::INVALID_HANDLE)?;
                params.resource
            } else {
                let private = &params.private_runtime_data;
                let (local, global) = if shared {
                    self.manager.create_shared(ObjectKind::Resource, private)?
                } else {
                    (self.manager.create_local(ObjectKind::Resource, private)?, INVALID_HANDLE)
                };
                // NT handle sharing goes through share_objects only
                params.global_share = if flags.contains(CreateAllocationFlags::NT_SECURITY_SHARING) {
                    INVALID_HANDLE
                } else {
                    global
                };
                params.resource = local;
                local
            }
        } else {
            if shared {
                return Err(KmtError::INVALID_PARAMETER);
            }
            if params.resource != INVALID_HANDLE {
                return match self.manager.lookup(params.resource, Some(ObjectKind::Resource)) {
                    Some(_) => Err(KmtError::INVALID_PARAMETER),
                    None => Err(KmtError::INVALID_HANDLE),
                };
            }
            params.global_share = INVALID_HANDLE;
            INVALID_HANDLE
        };

        let backing = if resource == INVALID_HANDLE {
            None
        } else {
            Some(resource)
        };
        params.allocations[0].allocation = self.manager.create_allocation(backing)?;
        Ok(())
    }

    /// Destroy a resource together with its allocation, then every listed
    /// allocation.
    pub fn sys_destroy_allocation(&self, params: &mut DestroyAllocation) -> KmtResult {
        info!(
            "allocation.destroy: resource={:#x}, allocations={:#x?}",
            params.resource, params.allocations
        );
        let mut cascaded = None;
        if params.resource != INVALID_HANDLE {
            let link = self
                .manager
                .resource_allocation(params.resource)
                .map_err(|_| KmtError::INVALID_PARAMETER)?;
            if let AllocationLink::Live(allocation) = link {
                cascaded = Some(allocation.local());
            }
            self.destroy_object(params.resource, ObjectKind::Resource)?;
        }
        for &allocation in params.allocations.iter() {
            if cascaded == Some(allocation) {
                cascaded = None;
                continue;
            }
            self.destroy_object(allocation, ObjectKind::Resource)?;
        }
        Ok(())
    }

    /// Open a resource by its global id and create an allocation for it.
    pub fn sys_open_resource(&self, params: &mut OpenResource) -> KmtResult {
        info!(
            "resource.open: device={:#x}, global={:#x}, count={}",
            params.device,
            params.global_share,
            params.allocations.len()
        );
        if params.device == INVALID_HANDLE || params.allocations.is_empty() {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let global = params.global_share;
        let resource = self.with_private_buffer(
            &mut params.private_runtime_data,
            &mut params.private_runtime_data_size,
            |buffer, size| {
                self.manager
                    .open_global(ObjectKind::Resource, global, buffer, size)
            },
        )?;
        params.resource = resource;
        params.total_private_driver_data_buffer_size = 0;

        let info = &mut params.allocations[0];
        info.allocation = self.manager.create_allocation(Some(resource))?;
        info.private_driver_data_size = 0;
        Ok(())
    }

    /// Open the resource, keyed mutex and sync object shared as one bundle.
    ///
    /// Nothing stays open if any of them fails.
    pub fn sys_open_resource_from_nt_handle(
        &self,
        params: &mut OpenResourceFromNtHandle,
    ) -> KmtResult {
        info!(
            "resource.open_from_nt_handle: device={:#x}, handle={:?}",
            params.device, params.nt_handle
        );
        let shared = params.nt_handle.take().ok_or(KmtError::INVALID_HANDLE)?;
        let mut opened = Vec::new();
        let ret = self.open_bundle(params, &shared, &mut opened);
        params.nt_handle = Some(shared);
        match ret {
            Ok(()) => {
                params.total_private_driver_data_buffer_size = 0;
                Ok(())
            }
            Err(err) => {
                for &(handle, kind) in opened.iter().rev() {
                    // just opened, cannot be gone
                    let _ = self.manager.destroy(handle, kind);
                }
                Err(err)
            }
        }
    }

    fn open_bundle(
        &self,
        params: &mut OpenResourceFromNtHandle,
        shared: &OsHandle,
        opened: &mut Vec<(HandleValue, ObjectKind)>,
    ) -> KmtResult {
        let (resource, _) = self.with_private_buffer(
            &mut params.private_runtime_data,
            &mut params.private_runtime_data_size,
            |buffer, size| {
                self.manager
                    .open_peer(ObjectKind::Resource, shared, buffer, size)
            },
        )?;
        opened.push((resource, ObjectKind::Resource));
        let (keyed_mutex, _) = self.with_private_buffer(
            &mut params.keyed_mutex_private_runtime_data,
            &mut params.keyed_mutex_private_runtime_data_size,
            |buffer, size| {
                self.manager
                    .open_peer(ObjectKind::KeyedMutex, shared, buffer, size)
            },
        )?;
        opened.push((keyed_mutex, ObjectKind::KeyedMutex));
        let (sync_object, _) = self.with_private_buffer(&mut None, &mut 0, |buffer, size| {
            self.manager
                .open_peer(ObjectKind::SyncObject, shared, buffer, size)
        })?;
        opened.push((sync_object, ObjectKind::SyncObject));
        params.resource = resource;
        params.keyed_mutex = keyed_mutex;
        params.sync_object = sync_object;
        Ok(())
    }

    /// Read the private data of a shared resource without opening it.
    pub fn sys_query_resource_info(&self, params: &mut QueryResourceInfo) -> KmtResult {
        info!(
            "resource.query_info: device={:#x}, global={:#x}",
            params.device, params.global_share
        );
        if params.device == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let global = params.global_share;
        self.with_private_buffer(
            &mut params.private_runtime_data,
            &mut params.private_runtime_data_size,
            |buffer, size| {
                self.manager
                    .query_global(ObjectKind::Resource, global, buffer, size)
            },
        )?;
        params.total_private_driver_data_size = RESOURCE_PRIVATE_DRIVER_DATA_SIZE;
        params.num_allocations = 1;
        Ok(())
    }
}
