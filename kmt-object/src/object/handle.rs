//! Encoding of handle values.
//!
//! Local handles and global ids share one layout: the allocation index sits
//! in bits 6..30, bit 30 is always set and the low six bits tag the namespace.

/// 句柄值
pub type HandleValue = u32;

/// 无效句柄
pub const INVALID_HANDLE: HandleValue = 0;

const INDEX_SHIFT: u32 = 6;
const RESERVED_MASK: u32 = 0xc000_003f;
const LOCAL_TAG: u32 = 0x4000_0000;
const GLOBAL_TAG: u32 = 0x4000_0002;

/// Largest allocation index that still fits the encoding.
pub const MAX_HANDLE_INDEX: u32 = !RESERVED_MASK >> INDEX_SHIFT;

/// 句柄值所属的命名空间
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Namespace {
    /// Per-process object handles.
    Local,
    /// Ids minted by the broker, valid in every process.
    Global,
}

impl Namespace {
    /// Encode the allocation `index` as a handle value.
    pub fn encode(self, index: u32) -> HandleValue {
        let tag = match self {
            Namespace::Local => LOCAL_TAG,
            Namespace::Global => GLOBAL_TAG,
        };
        ((index << INDEX_SHIFT) & !RESERVED_MASK) | tag
    }

    /// Whether `value` carries this namespace's tag.
    pub fn contains(self, value: HandleValue) -> bool {
        match self {
            Namespace::Local => is_local_handle(value),
            Namespace::Global => is_global_handle(value),
        }
    }
}

pub fn is_local_handle(value: HandleValue) -> bool {
    value & 0xc000_0000 == LOCAL_TAG && value & 0x3f == 0
}

pub fn is_global_handle(value: HandleValue) -> bool {
    value & 0xc000_0000 != 0 && value & 0x3f == 2
}

/// Recover the allocation index of an encoded value.
pub fn handle_index(value: HandleValue) -> u32 {
    (value & !RESERVED_MASK) >> INDEX_SHIFT
}
