use {
    super::*,
    crate::{error::*, object::*},
    alloc::{string::String, sync::Arc, vec, vec::Vec},
    bitflags::bitflags,
    core::{
        convert::TryFrom,
        sync::atomic::{AtomicU32, Ordering},
    },
    kmt_hal::OsHandle,
    serde::{Deserialize, Serialize},
};

/// 与 broker 之间的传输通道
pub trait BrokerTransport: Send + Sync {
    /// Send a request and block until its reply arrives.
    ///
    /// Fails with `BROKER_UNAVAILABLE` if the broker is gone.
    fn call(&self, request: MessagePacket) -> KmtResult<MessagePacket>;
}

bitflags! {
    /// Access granted to holders of a shared bundle.
    pub struct ShareAccess: u32 {
        const WRITE   = 0x0000_0001;
        const ALL     = 0x1000_0000;
        const READ    = 0x8000_0000;
    }
}

/// Kind of host descriptor attached to a shared object.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum DescriptorType {
    None,
    UnixFd,
    DmaBuf,
}

impl Default for DescriptorType {
    fn default() -> Self {
        DescriptorType::None
    }
}

/// Layout of the memory behind a host descriptor.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub fd_type: DescriptorType,
    pub size: u64,
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub flags: u64,
}

/// Requests understood by the broker.
#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    CreateObject {
        kind: ObjectKind,
        private: Vec<u8>,
    },
    OpenByGlobalId {
        kind: ObjectKind,
        global: HandleValue,
        capacity: u32,
    },
    /// The peer's transferable handle travels in the packet.
    ResolvePeerHandle { kind: ObjectKind, capacity: u32 },
    ShareObjects {
        resource: HandleValue,
        keyed_mutex: HandleValue,
        sync_object: HandleValue,
        access: u32,
        name: Option<String>,
    },
    GetDescriptor {
        kind: ObjectKind,
        global: HandleValue,
    },
    /// The descriptor handle travels in the packet.
    SetDescriptor {
        kind: ObjectKind,
        global: HandleValue,
        desc: Descriptor,
    },
}

/// Replies sent by the broker.
#[derive(Debug, Serialize, Deserialize)]
pub enum Reply {
    Created { global: HandleValue },
    Opened { global: HandleValue, private: Vec<u8> },
    Shared,
    Descriptor { desc: Descriptor },
    Done,
    Failed { status: u32, required_size: u32 },
}

impl Reply {
    pub fn failed(err: KmtError) -> Self {
        Reply::Failed {
            status: err.status(),
            required_size: 0,
        }
    }
}

/// Object registered with the broker.
#[derive(Debug)]
pub struct Created {
    pub handle: OsHandle,
    pub global: HandleValue,
}

/// Object opened through the broker.
#[derive(Debug)]
pub struct Opened {
    pub handle: OsHandle,
    pub global: HandleValue,
    pub private: Vec<u8>,
}

/// The global ids of a bundle to share, zero for absent members.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct ShareSet {
    pub resource: HandleValue,
    pub keyed_mutex: HandleValue,
    pub sync_object: HandleValue,
}

impl ShareSet {
    /// Either a single resource or sync object, or one object of each kind.
    pub fn is_valid(&self) -> bool {
        let present = |value: HandleValue| value != INVALID_HANDLE;
        match (
            present(self.resource),
            present(self.keyed_mutex),
            present(self.sync_object),
        ) {
            (true, false, false) | (false, false, true) | (true, true, true) => true,
            _ => false,
        }
    }
}

/// 同步调用 broker 的客户端
pub struct BrokerClient {
    transport: Arc<dyn BrokerTransport>,
    next_txid: AtomicU32,
}

impl BrokerClient {
    pub fn new(transport: Arc<dyn BrokerTransport>) -> Self {
        BrokerClient {
            transport,
            next_txid: AtomicU32::new(0x8000_0000),
        }
    }

    fn call(
        &self,
        request: &Request,
        handles: Vec<OsHandle>,
        required_size: Option<&mut usize>,
    ) -> KmtResult<(Reply, Vec<OsHandle>)> {
        let txid = self.next_txid.fetch_add(1, Ordering::SeqCst);
        let packet = MessagePacket::encode(txid, request, handles)?;
        let reply = self.transport.call(packet)?;
        if reply.get_txid() != txid {
            error!("broker replied to {:#x} instead of {:#x}", reply.get_txid(), txid);
            return Err(KmtError::BROKER_UNAVAILABLE);
        }
        let body: Reply = reply.decode().map_err(|_| {
            error!("malformed broker reply to {:#x}", txid);
            KmtError::BROKER_UNAVAILABLE
        })?;
        trace!("broker {:x?} => {:x?}", request, body);
        match body {
            Reply::Failed {
                status,
                required_size: size,
            } => {
                if let Some(required_size) = required_size {
                    *required_size = size as usize;
                }
                Err(KmtError::try_from(status).unwrap_or(KmtError::BROKER_UNAVAILABLE))
            }
            body => Ok((body, reply.handles)),
        }
    }

    /// Register a new object and mint its global id.
    pub fn create_object(&self, kind: ObjectKind, private: &[u8]) -> KmtResult<Created> {
        let request = Request::CreateObject {
            kind,
            private: private.to_vec(),
        };
        match self.call(&request, Vec::new(), None)? {
            (Reply::Created { global }, handles) => Ok(Created {
                handle: first_handle(handles)?,
                global,
            }),
            _ => Err(unexpected()),
        }
    }

    /// Open the object registered under `global`.
    ///
    /// `required_size` receives the size of the stored private data, also
    /// when the call fails with `BUFFER_TOO_SMALL`.
    pub fn open_by_global_id(
        &self,
        kind: ObjectKind,
        global: HandleValue,
        capacity: usize,
        required_size: &mut usize,
    ) -> KmtResult<Opened> {
        let request = Request::OpenByGlobalId {
            kind,
            global,
            capacity: clamp_capacity(capacity),
        };
        let reply = self.call(&request, Vec::new(), Some(&mut *required_size))?;
        opened(reply, required_size)
    }

    /// Open the object of `kind` in the bundle a peer shared as `peer`.
    pub fn resolve_peer_handle(
        &self,
        kind: ObjectKind,
        peer: &OsHandle,
        capacity: usize,
        required_size: &mut usize,
    ) -> KmtResult<Opened> {
        let peer = peer.try_clone().map_err(|_| KmtError::INVALID_HANDLE)?;
        let request = Request::ResolvePeerHandle {
            kind,
            capacity: clamp_capacity(capacity),
        };
        let reply = self.call(&request, vec![peer], Some(&mut *required_size))?;
        opened(reply, required_size)
    }

    /// Bundle shared objects behind one transferable handle.
    pub fn share_objects(
        &self,
        set: ShareSet,
        access: ShareAccess,
        name: Option<&str>,
    ) -> KmtResult<OsHandle> {
        if !set.is_valid() {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let request = Request::ShareObjects {
            resource: set.resource,
            keyed_mutex: set.keyed_mutex,
            sync_object: set.sync_object,
            access: access.bits(),
            name: name.map(String::from),
        };
        match self.call(&request, Vec::new(), None)? {
            (Reply::Shared, handles) => first_handle(handles),
            _ => Err(unexpected()),
        }
    }

    /// Attach a host descriptor to a shared object.
    ///
    /// `handle` wraps the descriptor; the broker keeps its own reference.
    pub fn set_descriptor(
        &self,
        kind: ObjectKind,
        global: HandleValue,
        desc: Descriptor,
        handle: OsHandle,
    ) -> KmtResult {
        let request = Request::SetDescriptor { kind, global, desc };
        match self.call(&request, vec![handle], None)? {
            (Reply::Done, _) => Ok(()),
            _ => Err(unexpected()),
        }
    }

    /// Fetch the host descriptor attached to a shared object.
    pub fn get_descriptor(
        &self,
        kind: ObjectKind,
        global: HandleValue,
    ) -> KmtResult<(Descriptor, OsHandle)> {
        let request = Request::GetDescriptor { kind, global };
        match self.call(&request, Vec::new(), None)? {
            (Reply::Descriptor { desc }, handles) => Ok((desc, first_handle(handles)?)),
            _ => Err(unexpected()),
        }
    }
}

fn clamp_capacity(capacity: usize) -> u32 {
    u32::try_from(capacity).unwrap_or(u32::MAX)
}

fn opened(reply: (Reply, Vec<OsHandle>), required_size: &mut usize) -> KmtResult<Opened> {
    match reply {
        (Reply::Opened { global, private }, handles) => {
            *required_size = private.len();
            Ok(Opened {
                handle: first_handle(handles)?,
                global,
                private,
            })
        }
        _ => Err(unexpected()),
    }
}

fn first_handle(handles: Vec<OsHandle>) -> KmtResult<OsHandle> {
    handles.into_iter().next().ok_or_else(|| {
        error!("broker reply carries no handle");
        KmtError::BROKER_UNAVAILABLE
    })
}

fn unexpected() -> KmtError {
    error!("unexpected broker reply");
    KmtError::BROKER_UNAVAILABLE
}
