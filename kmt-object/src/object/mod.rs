use {
    alloc::sync::Arc,
    core::fmt::Debug,
    downcast_rs::{impl_downcast, DowncastSync},
    kmt_hal::OsHandle,
    numeric_enum_macro::numeric_enum,
    serde::{Deserialize, Serialize},
    spin::Mutex,
};

mod handle;
mod private;
mod table;

pub use self::{handle::*, private::*, table::*};

numeric_enum! {
    #[repr(u32)]
    /// 内核图形对象的种类
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub enum ObjectKind {
        Resource = 1,
        KeyedMutex = 2,
        SyncObject = 3,
    }
}

/// 对象的来源，决定销毁时需要释放什么
#[derive(Debug)]
pub enum Provenance {
    /// Created in this process, never visible to the broker.
    Local,
    /// Created in this process and registered with the broker.
    Shared(OsHandle),
    /// Opened from a global id minted by the broker.
    OpenedGlobal(OsHandle),
    /// Opened from a transferable handle handed over by a peer.
    OpenedPeer(OsHandle),
}

impl Provenance {
    pub fn origin(&self) -> Origin {
        match self {
            Provenance::Local => Origin::Local,
            Provenance::Shared(_) => Origin::Shared,
            Provenance::OpenedGlobal(_) => Origin::OpenedGlobal,
            Provenance::OpenedPeer(_) => Origin::OpenedPeer,
        }
    }
}

/// [`Provenance`] without the OS reference
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Origin {
    Local,
    Shared,
    OpenedGlobal,
    OpenedPeer,
}

// ANCHOR: trait
/// 内核对象公共接口
pub trait KernelObject: DowncastSync + Debug {
    /// 获取进程内句柄值
    fn local(&self) -> HandleValue;
    /// 获取全局 ID，未共享时为 0
    fn global(&self) -> HandleValue;
    /// 获取对象种类
    fn kind(&self) -> ObjectKind;
    /// 获取对象类型名
    fn type_name(&self) -> &str;
    /// 获取创建时的私有数据
    fn private_data(&self) -> &[u8];
    /// 获取对象来源
    fn origin(&self) -> Origin;
    /// 取走对象来源及其 OS 句柄，只有第一次调用返回 `Some`
    fn take_provenance(&self) -> Option<Provenance>;
}
// ANCHOR_END: trait

impl_downcast!(sync KernelObject);

/// 尚未分配句柄的对象描述
#[derive(Debug)]
pub struct ObjectInit {
    pub kind: ObjectKind,
    pub global: HandleValue,
    pub provenance: Provenance,
    pub private: PrivateData,
}

impl ObjectInit {
    /// Describe an object that only lives in this process.
    pub fn local(kind: ObjectKind, private: PrivateData) -> Self {
        ObjectInit {
            kind,
            global: INVALID_HANDLE,
            provenance: Provenance::Local,
            private,
        }
    }
}

/// 内核对象核心结构
pub struct KObjectBase {
    /// 进程内句柄值
    pub local: HandleValue,
    /// 全局 ID
    pub global: HandleValue,
    /// 对象种类
    pub kind: ObjectKind,
    origin: Origin,
    provenance: Mutex<Option<Provenance>>,
    private: PrivateData,
}

impl KObjectBase {
    /// 用分配到的句柄值创建 `KObjectBase`
    pub fn new(local: HandleValue, init: ObjectInit) -> Self {
        KObjectBase {
            local,
            global: init.global,
            kind: init.kind,
            origin: init.provenance.origin(),
            provenance: Mutex::new(Some(init.provenance)),
            private: init.private,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// 对象销毁时取走来源，之后仍持有 `Arc` 的调用者看不到 OS 句柄
    pub fn take_provenance(&self) -> Option<Provenance> {
        self.provenance.lock().take()
    }

    pub fn private_data(&self) -> &[u8] {
        self.private.as_slice()
    }
}

/// 为内核对象 struct 自动实现 `KernelObject` trait 的宏。
#[macro_export]
macro_rules! impl_kobject {
    ($class:ident $( $fn:tt )*) => {
        impl $crate::object::KernelObject for $class {
            fn local(&self) -> $crate::object::HandleValue {
                self.base.local
            }
            fn global(&self) -> $crate::object::HandleValue {
                self.base.global
            }
            fn kind(&self) -> $crate::object::ObjectKind {
                self.base.kind
            }
            fn type_name(&self) -> &str {
                stringify!($class)
            }
            fn private_data(&self) -> &[u8] {
                self.base.private_data()
            }
            fn origin(&self) -> $crate::object::Origin {
                self.base.origin()
            }
            fn take_provenance(&self) -> Option<$crate::object::Provenance> {
                self.base.take_provenance()
            }
            $( $fn )*
        }
        impl core::fmt::Debug for $class {
            fn fmt(
                &self,
                f: &mut core::fmt::Formatter<'_>,
            ) -> core::result::Result<(), core::fmt::Error> {
                f.debug_tuple(&stringify!($class))
                    .field(&format_args!("{:#x}", self.base.local))
                    .field(&format_args!("{:#x}", self.base.global))
                    .finish()
            }
        }
    };
}

/// Downcast a kernel object to its concrete type.
pub fn downcast_object<T: KernelObject>(object: Arc<dyn KernelObject>) -> Option<Arc<T>> {
    object.downcast_arc::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    struct DummyObject {
        base: KObjectBase,
    }

    impl_kobject!(DummyObject);

    #[test]
    fn impl_kobject() {
        let init = ObjectInit::local(ObjectKind::KeyedMutex, PrivateData::new(&[7]).unwrap());
        let object: Arc<dyn KernelObject> = Arc::new(DummyObject {
            base: KObjectBase::new(0x4000_0040, init),
        });
        assert_eq!(object.type_name(), "DummyObject");
        assert_eq!(object.kind(), ObjectKind::KeyedMutex);
        assert_eq!(object.global(), 0);
        assert_eq!(object.private_data(), &[7]);
        assert_eq!(object.origin(), Origin::Local);
        assert!(matches!(object.take_provenance(), Some(Provenance::Local)));
        assert!(object.take_provenance().is_none());
        assert_eq!(object.origin(), Origin::Local);
        assert_eq!(format!("{:?}", object), "DummyObject(0x40000040, 0x0)");
        assert!(downcast_object::<DummyObject>(object).is_some());
    }
}
