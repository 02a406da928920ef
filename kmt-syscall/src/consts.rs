use {bitflags::bitflags, numeric_enum_macro::numeric_enum};

numeric_enum! {
    #[repr(u32)]
    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum AdapterInfoType {
        DRIVERVERSION = 13,
        CHECKDRIVERUPDATESTATUS = 28,
    }
}

/// Driver model version reported for every adapter.
pub const KMT_DRIVERVERSION_WDDM_1_3: u32 = 1300;

numeric_enum! {
    #[repr(u32)]
    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum MemorySegmentGroup {
        LOCAL = 0,
        NON_LOCAL = 1,
    }
}

numeric_enum! {
    #[repr(u32)]
    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum StandardAllocationType {
        EXISTINGHEAP = 1,
        INTERNALBACKINGSTORE = 2,
    }
}

/// Private driver data reported by resource queries.
pub const RESOURCE_PRIVATE_DRIVER_DATA_SIZE: u32 = 96;

bitflags! {
    pub struct CreateDeviceFlags: u32 {
        #[allow(clippy::identity_op)]
        const LEGACY_MODE           = 1 << 0;
        const REQUEST_VSYNC         = 1 << 1;
        const DISABLE_GPU_TIMEOUT   = 1 << 2;
    }
}

bitflags! {
    pub struct CreateAllocationFlags: u32 {
        #[allow(clippy::identity_op)]
        const CREATE_RESOURCE           = 1 << 0;
        const CREATE_SHARED             = 1 << 1;
        const NON_SECURE                = 1 << 2;
        const CREATE_PROTECTED          = 1 << 3;
        const RESTRICT_SHARED_ACCESS    = 1 << 4;
        const EXISTING_SYSMEM           = 1 << 5;
        const NT_SECURITY_SHARING       = 1 << 6;
        const READ_ONLY                 = 1 << 7;
        const CREATE_WRITE_COMBINED     = 1 << 8;
        const CREATE_CACHED             = 1 << 9;
        const SWAP_CHAIN_BACK_BUFFER    = 1 << 10;
        const CROSS_ADAPTER             = 1 << 11;
        const OPEN_CROSS_ADAPTER        = 1 << 12;
        const PARTIAL_SHARED_CREATION   = 1 << 13;
        const ZEROED                    = 1 << 14;
        const WRITE_WATCH               = 1 << 15;
        const STANDARD_ALLOCATION       = 1 << 16;
        const EXISTING_SECTION          = 1 << 17;
    }
}

bitflags! {
    pub struct KeyedMutexFlags: u32 {
        #[allow(clippy::identity_op)]
        const NT_SECURITY_SHARING = 1 << 0;
    }
}

bitflags! {
    pub struct SyncObjectFlags: u32 {
        #[allow(clippy::identity_op)]
        const SHARED                        = 1 << 0;
        const NT_SECURITY_SHARING           = 1 << 1;
        const CROSS_ADAPTER                 = 1 << 2;
        const TOP_OF_PIPELINE               = 1 << 3;
        const NO_SIGNAL                     = 1 << 4;
        const NO_WAIT                       = 1 << 5;
        const NO_SIGNAL_MAX_VALUE_ON_TDR    = 1 << 6;
        const NO_GPU_ACCESS                 = 1 << 7;
    }
}
