#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

mod gpu;
mod handle;

pub use self::gpu::*;
pub use self::handle::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalError;
/// The result type returned by HAL functions.
pub type Result<T> = core::result::Result<T, HalError>;

pub mod defs {
    use bitflags::bitflags;
    use numeric_enum_macro::numeric_enum;

    /// 句柄空间中的句柄值
    pub type RawHandle = u32;
    /// 宿主系统的文件描述符
    pub type RawFd = i32;

    /// 本地唯一标识（LUID），用于在进程内定位显示适配器
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Luid {
        pub low_part: u32,
        pub high_part: i32,
    }

    /// 物理设备的平台 UUID
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct GpuUuid(pub [u8; 16]);

    bitflags! {
        pub struct MemoryHeapFlags: u32 {
            #[allow(clippy::identity_op)]
            const DEVICE_LOCAL   = 1 << 0;
            const MULTI_INSTANCE = 1 << 1;
        }
    }

    numeric_enum! {
        #[repr(u32)]
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum PhysicalDeviceType {
            Other = 0,
            IntegratedGpu = 1,
            DiscreteGpu = 2,
            VirtualGpu = 3,
            Cpu = 4,
        }
    }

    impl Default for PhysicalDeviceType {
        fn default() -> Self {
            Self::Other
        }
    }
}

pub use self::defs::*;
