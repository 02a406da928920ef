//! D3DKMT thunk implementations

#![no_std]
#![deny(unsafe_code, unused_must_use, unreachable_patterns)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

#[macro_use]
extern crate log;

use {
    alloc::{vec, vec::Vec},
    core::convert::TryFrom,
    kmt_object::{object::*, HandleManager, KmtError, KmtResult},
};

mod adapter;
mod consts;
mod keyed_mutex;
mod resource;
mod share;
mod sync_object;

pub use self::{adapter::*, consts::*, keyed_mutex::*, resource::*, share::*, sync_object::*};

/// D3DKMT 调用的执行上下文
pub struct Syscall<'a> {
    pub manager: &'a HandleManager,
}

impl Syscall<'_> {
    /// Run an open with the caller's private data buffer.
    ///
    /// Without a buffer and with a zero size, a scratch buffer of the
    /// configured default capacity is used. `size` receives the size of the
    /// stored private data.
    fn with_private_buffer<R>(
        &self,
        data: &mut Option<Vec<u8>>,
        size: &mut u32,
        open: impl FnOnce(&mut [u8], &mut usize) -> KmtResult<R>,
    ) -> KmtResult<R> {
        let mut scratch;
        let buffer: &mut [u8] = match data {
            Some(buffer) => {
                let len = buffer.len().min(*size as usize);
                &mut buffer[..len]
            }
            None if *size == 0 => {
                scratch = vec![0; self.manager.config().default_private_capacity];
                &mut scratch[..]
            }
            None => return Err(KmtError::INVALID_PARAMETER),
        };
        let mut actual = 0;
        let ret = open(buffer, &mut actual);
        *size = u32::try_from(actual).unwrap_or(u32::MAX);
        ret
    }

    /// Destroy an object on behalf of a thunk, which reports unknown handles
    /// as invalid parameters.
    fn destroy_object(&self, handle: HandleValue, kind: ObjectKind) -> KmtResult {
        self.manager
            .destroy(handle, kind)
            .map_err(|_| KmtError::INVALID_PARAMETER)
    }
}

macro_rules! calls {
    ($($name:ident => $func:ident,)*) => {
        /// 一次 D3DKMT 调用及其参数
        #[derive(Debug)]
        pub enum Call<'a> {
            $($name(&'a mut $name),)*
        }

        impl Syscall<'_> {
            /// Dispatch `call`, returning its NTSTATUS.
            pub fn syscall(&self, call: Call<'_>) -> u32 {
                let (name, ret) = match call {
                    $(Call::$name(params) => (stringify!($name), self.$func(params)),)*
                };
                info!("{} <= {:?}", name, ret);
                kmt_object::status_of(&ret)
            }
        }
    };
}

calls! {
    OpenAdapterFromLuid => sys_open_adapter_from_luid,
    OpenAdapterFromDeviceName => sys_open_adapter_from_device_name,
    CloseAdapter => sys_close_adapter,
    QueryAdapterInfo => sys_query_adapter_info,
    QueryVideoMemoryInfo => sys_query_video_memory_info,
    CreateDevice => sys_create_device,
    DestroyDevice => sys_destroy_device,
    SetVidPnSourceOwner => sys_set_vidpn_source_owner,
    CheckVidPnExclusiveOwnership => sys_check_vidpn_exclusive_ownership,
    CreateAllocation => sys_create_allocation,
    DestroyAllocation => sys_destroy_allocation,
    OpenResource => sys_open_resource,
    OpenResourceFromNtHandle => sys_open_resource_from_nt_handle,
    QueryResourceInfo => sys_query_resource_info,
    CreateKeyedMutex => sys_create_keyed_mutex,
    CreateKeyedMutex2 => sys_create_keyed_mutex2,
    DestroyKeyedMutex => sys_destroy_keyed_mutex,
    OpenKeyedMutex => sys_open_keyed_mutex,
    OpenKeyedMutex2 => sys_open_keyed_mutex2,
    OpenKeyedMutexFromNtHandle => sys_open_keyed_mutex_from_nt_handle,
    CreateSynchronizationObject => sys_create_synchronization_object,
    CreateSynchronizationObject2 => sys_create_synchronization_object2,
    OpenSynchronizationObject => sys_open_synchronization_object,
    OpenSyncObjectFromNtHandle => sys_open_sync_object_from_nt_handle,
    DestroySynchronizationObject => sys_destroy_synchronization_object,
    ShareObjects => sys_share_objects,
    SetObjectFd => sys_set_object_fd,
    GetObjectFd => sys_get_object_fd,
}
