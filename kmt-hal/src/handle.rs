use {
    crate::{defs::*, Result},
    alloc::sync::Arc,
    core::fmt,
};

/// OS 句柄空间
///
/// 句柄值只在所属的句柄空间内有意义。复制出的句柄与原句柄指向同一个底层对象，
/// 两者的 [`identity`](HandleSpace::identity) 相同。
pub trait HandleSpace: Send + Sync {
    /// 创建一个不带文件描述符的匿名对象，返回指向它的句柄
    fn alloc_raw(&self) -> Result<RawHandle>;

    /// 复制句柄
    fn duplicate_raw(&self, raw: RawHandle) -> Result<RawHandle>;

    /// 关闭句柄
    fn close_raw(&self, raw: RawHandle);

    /// 句柄所指底层对象的标识
    fn identity(&self, raw: RawHandle) -> Result<u64>;

    /// 包装一个文件描述符。`fd` 仍归调用者所有。
    fn fd_to_raw(&self, fd: RawFd) -> Result<RawHandle>;

    /// 取出句柄关联的文件描述符，返回的 fd 由调用者关闭
    fn raw_to_fd(&self, raw: RawHandle) -> Result<RawFd>;
}

/// 独占所有权的 OS 句柄，drop 时关闭
pub struct OsHandle {
    raw: RawHandle,
    space: Arc<dyn HandleSpace>,
}

impl OsHandle {
    /// 在 `space` 中创建一个匿名对象
    pub fn alloc(space: &Arc<dyn HandleSpace>) -> Result<Self> {
        let raw = space.alloc_raw()?;
        Ok(OsHandle {
            raw,
            space: space.clone(),
        })
    }

    /// 把文件描述符包装成可传递的句柄
    pub fn from_fd(space: &Arc<dyn HandleSpace>, fd: RawFd) -> Result<Self> {
        let raw = space.fd_to_raw(fd)?;
        Ok(OsHandle {
            raw,
            space: space.clone(),
        })
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn identity(&self) -> Result<u64> {
        self.space.identity(self.raw)
    }

    /// 复制出一个指向同一对象的新句柄
    pub fn try_clone(&self) -> Result<Self> {
        let raw = self.space.duplicate_raw(self.raw)?;
        Ok(OsHandle {
            raw,
            space: self.space.clone(),
        })
    }

    pub fn to_fd(&self) -> Result<RawFd> {
        self.space.raw_to_fd(self.raw)
    }

    pub fn space(&self) -> &Arc<dyn HandleSpace> {
        &self.space
    }
}

impl Drop for OsHandle {
    fn drop(&mut self) {
        self.space.close_raw(self.raw);
    }
}

impl fmt::Debug for OsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OsHandle")
            .field(&format_args!("{:#x}", self.raw))
            .finish()
    }
}
