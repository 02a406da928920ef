use {
    crate::error::*,
    core::fmt::{Debug, Formatter, Result},
};

/// Largest private blob an object carries.
pub const PRIVATE_DATA_MAX: usize = 256;

/// 对象创建时附带的私有数据，按值内联保存
#[derive(Clone)]
pub struct PrivateData {
    len: usize,
    bytes: [u8; PRIVATE_DATA_MAX],
}

impl PrivateData {
    /// Copy `data` into a new blob.
    ///
    /// Fails with `INVALID_PARAMETER` if it exceeds [`PRIVATE_DATA_MAX`].
    pub fn new(data: &[u8]) -> KmtResult<Self> {
        if data.len() > PRIVATE_DATA_MAX {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let mut bytes = [0; PRIVATE_DATA_MAX];
        bytes[..data.len()].copy_from_slice(data);
        Ok(PrivateData {
            len: data.len(),
            bytes,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for PrivateData {
    fn default() -> Self {
        PrivateData {
            len: 0,
            bytes: [0; PRIVATE_DATA_MAX],
        }
    }
}

impl PartialEq for PrivateData {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for PrivateData {}

impl Debug for PrivateData {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "PrivateData({:x?})", self.as_slice())
    }
}
