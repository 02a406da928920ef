//! Adapters, devices and display source ownership.

use {
    crate::{error::*, object::HandleValue},
    alloc::vec::Vec,
};

mod adapter;
mod device;
mod vidpn;

pub use self::{adapter::*, device::*, vidpn::*};

/// An entry of a [`Registry`].
pub trait Registered {
    fn handle(&self) -> HandleValue;
}

/// 平铺的注册表，句柄来自独立递增的计数器
pub struct Registry<T> {
    entries: Vec<T>,
    last_handle: HandleValue,
}

impl<T: Registered> Registry<T> {
    pub fn new() -> Self {
        Registry {
            entries: Vec::new(),
            last_handle: 0,
        }
    }

    /// Register the entry built for the next handle.
    pub fn insert_with(&mut self, build: impl FnOnce(HandleValue) -> T) -> KmtResult<HandleValue> {
        let handle = self
            .last_handle
            .checked_add(1)
            .ok_or(KmtError::NO_MEMORY)?;
        self.last_handle = handle;
        self.entries.push(build(handle));
        Ok(handle)
    }

    pub fn find(&self, handle: HandleValue) -> Option<&T> {
        self.entries.iter().find(|entry| entry.handle() == handle)
    }

    pub fn remove(&mut self, handle: HandleValue) -> Option<T> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.handle() == handle)?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> Vec<T> {
        core::mem::take(&mut self.entries)
    }
}

impl<T: Registered> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
