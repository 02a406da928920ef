//! Kernel graphics HAL implementation on Linux and macOS.

#[macro_use]
extern crate log;

mod gpu;
mod handle;
pub mod logging;

pub use self::gpu::*;
pub use self::handle::*;

use {
    kmt_hal::HandleSpace,
    std::sync::Arc,
};

/// Create the handle space shared by every simulated process of a session.
pub fn handle_space() -> Arc<dyn HandleSpace> {
    Arc::new(UnixHandleSpace::new())
}
