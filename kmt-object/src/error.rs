use numeric_enum_macro::numeric_enum;

/// `STATUS_SUCCESS`
pub const STATUS_SUCCESS: u32 = 0;

numeric_enum! {
    #[repr(u32)]
    /// Status codes of the D3DKMT layer. The values are NTSTATUS codes so that
    /// thunks can hand them to the caller unchanged.
    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum KmtError {
        NOT_IMPLEMENTED = 0xC000_0002,
        INVALID_HANDLE = 0xC000_0008,
        INVALID_PARAMETER = 0xC000_000D,
        NO_MEMORY = 0xC000_0017,
        ACCESS_DENIED = 0xC000_0022,
        BUFFER_TOO_SMALL = 0xC000_0023,
        /// The broker transport is gone (`STATUS_PIPE_DISCONNECTED`).
        BROKER_UNAVAILABLE = 0xC000_00B0,
        NOT_FOUND = 0xC000_0225,
        PRESENT_OCCLUDED = 0xC01E_0006,
        /// The display source is owned in a way that excludes the request.
        VIDPN_SOURCE_IN_USE = 0xC01E_0328,
    }
}

impl KmtError {
    /// The raw NTSTATUS value.
    pub fn status(self) -> u32 {
        self as u32
    }
}

pub type KmtResult<T = ()> = Result<T, KmtError>;

/// Convert a result into the raw status handed back to thunk callers.
pub fn status_of<T>(result: &KmtResult<T>) -> u32 {
    match result {
        Ok(_) => STATUS_SUCCESS,
        Err(err) => err.status(),
    }
}
