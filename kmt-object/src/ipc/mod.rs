//! Protocol spoken with the broker that owns cross-process objects.

mod broker;
mod loopback;
mod packet;

pub use self::{broker::*, loopback::*, packet::*};
