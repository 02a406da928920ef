//! Handle table and object model of the kernel graphics thunk layer.

#![no_std]
#![deny(unused_imports)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

#[macro_use]
extern crate log;

#[macro_use]
pub mod object;

pub mod config;
pub mod dev;
pub mod error;
pub mod gpu;
pub mod ipc;
pub mod manager;

pub use self::config::Config;
pub use self::error::*;
pub use self::manager::HandleManager;
