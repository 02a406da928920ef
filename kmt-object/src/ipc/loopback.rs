use {
    super::*,
    crate::{config::MAX_OBJECTS, error::*, object::*},
    alloc::{string::String, sync::Arc, vec, vec::Vec},
    core::convert::TryFrom,
    hashbrown::HashMap,
    kmt_hal::{HandleSpace, OsHandle},
    spin::{Mutex, Once},
};

/// 进程内的 broker 服务端
///
/// Mints global ids, keeps private data and descriptors of shared objects,
/// and resolves bundles handed around as transferable handles. Objects live
/// as long as the broker.
pub struct LoopbackBroker {
    space: Arc<dyn HandleSpace>,
    inner: Mutex<BrokerInner>,
}

struct BrokerInner {
    objects: HandleTable<BrokerObject>,
    /// Bundles keyed by the identity of their transferable handle.
    ///
    /// Never pruned, even after every copy of the handle is closed; see
    /// decision 10 in DESIGN.md. A broker owned by the host would drop a
    /// bundle with its last handle.
    bundles: HashMap<u64, SharedBundle>,
}

struct BrokerObject {
    kind: ObjectKind,
    global: HandleValue,
    private: Vec<u8>,
    handle: OsHandle,
    descriptor: Once<(Descriptor, OsHandle)>,
}

struct SharedBundle {
    _handle: OsHandle,
    objects: Vec<Arc<BrokerObject>>,
    access: ShareAccess,
    name: Option<String>,
}

type Outcome = KmtResult<(Reply, Vec<OsHandle>)>;

impl LoopbackBroker {
    pub fn new(space: Arc<dyn HandleSpace>) -> Arc<Self> {
        Arc::new(LoopbackBroker {
            space,
            inner: Mutex::new(BrokerInner {
                objects: HandleTable::new(Namespace::Global, MAX_OBJECTS),
                bundles: HashMap::new(),
            }),
        })
    }

    /// Serve one request packet.
    pub fn serve(&self, packet: MessagePacket) -> KmtResult<MessagePacket> {
        let txid = packet.get_txid();
        let outcome = match packet.decode::<Request>() {
            Ok(request) => {
                debug!("broker <= {:x?}", request);
                self.dispatch(request, packet.handles)
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok((reply, handles)) => MessagePacket::encode(txid, &reply, handles),
            Err(err) => {
                debug!("broker => {:?}", err);
                MessagePacket::encode(txid, &Reply::failed(err), Vec::new())
            }
        }
    }

    fn dispatch(&self, request: Request, handles: Vec<OsHandle>) -> Outcome {
        match request {
            Request::CreateObject { kind, private } => self.create_object(kind, private),
            Request::OpenByGlobalId {
                kind,
                global,
                capacity,
            } => {
                let inner = self.inner.lock();
                let object = inner.find(kind, global).ok_or(KmtError::NOT_FOUND)?;
                open_reply(object, capacity)
            }
            Request::ResolvePeerHandle { kind, capacity } => {
                let peer = handles.first().ok_or(KmtError::INVALID_HANDLE)?;
                let identity = peer.identity().map_err(|_| KmtError::INVALID_HANDLE)?;
                let inner = self.inner.lock();
                let object = inner
                    .bundles
                    .get(&identity)
                    .and_then(|bundle| bundle.objects.iter().find(|o| o.kind == kind))
                    .ok_or(KmtError::NOT_FOUND)?;
                open_reply(object, capacity)
            }
            Request::ShareObjects {
                resource,
                keyed_mutex,
                sync_object,
                access,
                name,
            } => self.share_objects(
                ShareSet {
                    resource,
                    keyed_mutex,
                    sync_object,
                },
                ShareAccess::from_bits_truncate(access),
                name,
            ),
            Request::GetDescriptor { kind, global } => {
                let inner = self.inner.lock();
                let object = inner.find(kind, global).ok_or(KmtError::INVALID_HANDLE)?;
                let (desc, handle) = object.descriptor.get().ok_or(KmtError::INVALID_PARAMETER)?;
                Ok((Reply::Descriptor { desc: *desc }, vec![duplicate(handle)?]))
            }
            Request::SetDescriptor { kind, global, desc } => {
                if desc.fd_type == DescriptorType::None {
                    return Err(KmtError::INVALID_PARAMETER);
                }
                let handle = handles.into_iter().next().ok_or(KmtError::INVALID_HANDLE)?;
                let inner = self.inner.lock();
                let object = inner.find(kind, global).ok_or(KmtError::INVALID_HANDLE)?;
                let mut stored = false;
                object.descriptor.call_once(|| {
                    stored = true;
                    (desc, handle)
                });
                if !stored {
                    return Err(KmtError::INVALID_HANDLE);
                }
                Ok((Reply::Done, Vec::new()))
            }
        }
    }

    fn create_object(&self, kind: ObjectKind, private: Vec<u8>) -> Outcome {
        let handle = OsHandle::alloc(&self.space).map_err(|_| KmtError::NO_MEMORY)?;
        let reply_handle = duplicate(&handle)?;
        let (global, _) = self.inner.lock().objects.insert_with(|global| {
            Arc::new(BrokerObject {
                kind,
                global,
                private,
                handle,
                descriptor: Once::new(),
            })
        })?;
        Ok((Reply::Created { global }, vec![reply_handle]))
    }

    fn share_objects(&self, set: ShareSet, access: ShareAccess, name: Option<String>) -> Outcome {
        if !set.is_valid() {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let handle = OsHandle::alloc(&self.space).map_err(|_| KmtError::NO_MEMORY)?;
        let identity = handle.identity().map_err(|_| KmtError::NO_MEMORY)?;
        let reply_handle = duplicate(&handle)?;
        let mut inner = self.inner.lock();
        let objects = [
            (ObjectKind::Resource, set.resource),
            (ObjectKind::KeyedMutex, set.keyed_mutex),
            (ObjectKind::SyncObject, set.sync_object),
        ]
        .iter()
        .filter(|(_, global)| *global != INVALID_HANDLE)
        .map(|&(kind, global)| inner.find(kind, global).cloned())
        .collect::<Option<Vec<_>>>()
        .ok_or(KmtError::INVALID_PARAMETER)?;
        inner.bundles.insert(
            identity,
            SharedBundle {
                _handle: handle,
                objects,
                access,
                name,
            },
        );
        Ok((Reply::Shared, vec![reply_handle]))
    }

    /// Number of objects registered with the broker.
    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Access and name a bundle was shared with.
    pub fn bundle_info(&self, handle: &OsHandle) -> Option<(ShareAccess, Option<String>)> {
        let identity = handle.identity().ok()?;
        let inner = self.inner.lock();
        let bundle = inner.bundles.get(&identity)?;
        Some((bundle.access, bundle.name.clone()))
    }
}

impl BrokerInner {
    fn find(&self, kind: ObjectKind, global: HandleValue) -> Option<&Arc<BrokerObject>> {
        self.objects.get(global).filter(|object| object.kind == kind)
    }
}

impl BrokerTransport for LoopbackBroker {
    fn call(&self, request: MessagePacket) -> KmtResult<MessagePacket> {
        self.serve(request)
    }
}

fn open_reply(object: &BrokerObject, capacity: u32) -> Outcome {
    let required_size = u32::try_from(object.private.len()).map_err(|_| KmtError::NO_MEMORY)?;
    if required_size > capacity {
        return Ok((
            Reply::Failed {
                status: KmtError::BUFFER_TOO_SMALL.status(),
                required_size,
            },
            Vec::new(),
        ));
    }
    Ok((
        Reply::Opened {
            global: object.global,
            private: object.private.clone(),
        },
        vec![duplicate(&object.handle)?],
    ))
}

fn duplicate(handle: &OsHandle) -> KmtResult<OsHandle> {
    handle.try_clone().map_err(|_| KmtError::NO_MEMORY)
}
