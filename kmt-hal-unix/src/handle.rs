use {
    kmt_hal::{HalError, HandleSpace, RawFd, RawHandle, Result},
    std::collections::HashMap,
    std::sync::{Mutex, MutexGuard, PoisonError},
};

/// fd-backed handle space.
///
/// Handle values are multiples of 4 starting from 4. Each handle points to an
/// object identity; duplicates share the identity and own a `dup` of the fd.
pub struct UnixHandleSpace {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_handle: RawHandle,
    next_identity: u64,
    entries: HashMap<RawHandle, Entry>,
}

struct Entry {
    identity: u64,
    fd: Option<RawFd>,
}

impl Default for UnixHandleSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl UnixHandleSpace {
    pub fn new() -> Self {
        UnixHandleSpace {
            inner: Mutex::new(Inner {
                next_handle: 4,
                next_identity: 1,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner 的每次修改都是原子的，poison 后仍可继续使用
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of handles currently open.
    pub fn open_count(&self) -> usize {
        self.lock().entries.len()
    }
}

impl Inner {
    fn insert(&mut self, identity: u64, fd: Option<RawFd>) -> RawHandle {
        let raw = self.next_handle;
        self.next_handle += 4;
        self.entries.insert(raw, Entry { identity, fd });
        raw
    }

    fn new_identity(&mut self) -> u64 {
        let identity = self.next_identity;
        self.next_identity += 1;
        identity
    }
}

fn dup(fd: RawFd) -> Result<RawFd> {
    #[allow(unsafe_code)]
    let new_fd = unsafe { libc::dup(fd) };
    if new_fd < 0 {
        warn!("dup({}) failed", fd);
        return Err(HalError);
    }
    Ok(new_fd)
}

fn close(fd: RawFd) {
    #[allow(unsafe_code)]
    unsafe {
        libc::close(fd);
    }
}

impl HandleSpace for UnixHandleSpace {
    fn alloc_raw(&self) -> Result<RawHandle> {
        let mut inner = self.lock();
        let identity = inner.new_identity();
        Ok(inner.insert(identity, None))
    }

    fn duplicate_raw(&self, raw: RawHandle) -> Result<RawHandle> {
        let mut inner = self.lock();
        let entry = inner.entries.get(&raw).ok_or(HalError)?;
        let identity = entry.identity;
        let fd = entry.fd.map(dup).transpose()?;
        Ok(inner.insert(identity, fd))
    }

    fn close_raw(&self, raw: RawHandle) {
        let entry = self.lock().entries.remove(&raw);
        match entry {
            Some(Entry { fd: Some(fd), .. }) => close(fd),
            Some(_) => {}
            None => warn!("closing invalid handle {:#x}", raw),
        }
    }

    fn identity(&self, raw: RawHandle) -> Result<u64> {
        let inner = self.lock();
        inner.entries.get(&raw).map(|e| e.identity).ok_or(HalError)
    }

    fn fd_to_raw(&self, fd: RawFd) -> Result<RawHandle> {
        let fd = dup(fd)?;
        let mut inner = self.lock();
        let identity = inner.new_identity();
        Ok(inner.insert(identity, Some(fd)))
    }

    fn raw_to_fd(&self, raw: RawHandle) -> Result<RawFd> {
        let inner = self.lock();
        let fd = inner.entries.get(&raw).ok_or(HalError)?.fd.ok_or(HalError)?;
        dup(fd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmt_hal::OsHandle;
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::os::unix::io::{AsRawFd, FromRawFd};
    use std::sync::Arc;

    #[test]
    fn alloc_and_close() {
        let space = UnixHandleSpace::new();
        let h0 = space.alloc_raw().unwrap();
        let h1 = space.alloc_raw().unwrap();
        assert_ne!(h0, h1);
        assert_eq!(h0 % 4, 0);
        assert_ne!(space.identity(h0).unwrap(), space.identity(h1).unwrap());
        assert_eq!(space.open_count(), 2);
        space.close_raw(h0);
        assert_eq!(space.open_count(), 1);
        assert_eq!(space.identity(h0), Err(HalError));
    }

    #[test]
    fn duplicate_shares_identity() {
        let space: Arc<dyn HandleSpace> = Arc::new(UnixHandleSpace::new());
        let handle = OsHandle::alloc(&space).unwrap();
        let dup = handle.try_clone().unwrap();
        assert_ne!(handle.raw(), dup.raw());
        assert_eq!(handle.identity().unwrap(), dup.identity().unwrap());
        drop(handle);
        assert!(dup.identity().is_ok());
    }

    #[test]
    fn fd_round_trip() {
        let space: Arc<dyn HandleSpace> = Arc::new(UnixHandleSpace::new());
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"kmt").unwrap();

        let handle = OsHandle::from_fd(&space, file.as_raw_fd()).unwrap();
        drop(file);

        let fd = handle.to_fd().unwrap();
        #[allow(unsafe_code)]
        let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = String::new();
        file.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "kmt");
    }

    #[test]
    fn anonymous_handle_has_no_fd() {
        let space: Arc<dyn HandleSpace> = Arc::new(UnixHandleSpace::new());
        let handle = OsHandle::alloc(&space).unwrap();
        assert_eq!(handle.to_fd(), Err(HalError));
    }
}
