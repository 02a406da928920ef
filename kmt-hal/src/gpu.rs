use {
    crate::{defs::*, Result},
    alloc::{string::String, vec::Vec},
};

/// GPU 枚举层中物理设备的不透明引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalDevice(pub usize);

/// 物理设备属性
#[derive(Debug, Clone, Default)]
pub struct GpuProperties {
    pub uuid: GpuUuid,
    pub name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_type: PhysicalDeviceType,
}

/// 一个显存堆的容量和预算
#[derive(Debug, Clone, Copy)]
pub struct MemoryHeap {
    pub size: u64,
    pub budget: u64,
    pub usage: u64,
    pub flags: MemoryHeapFlags,
}

/// GPU 枚举层接口
pub trait GpuEnumerator: Send + Sync {
    /// 根据适配器 LUID 查找对应物理设备的 UUID
    fn uuid_from_luid(&self, luid: Luid) -> Option<GpuUuid>;

    /// 枚举所有物理设备
    fn physical_devices(&self) -> Result<Vec<PhysicalDevice>>;

    fn properties(&self, device: PhysicalDevice) -> GpuProperties;

    fn memory_heaps(&self, device: PhysicalDevice) -> Vec<MemoryHeap>;
}

/// Find the physical device whose UUID is `uuid`.
pub fn find_physical_device(gpu: &dyn GpuEnumerator, uuid: &GpuUuid) -> Option<PhysicalDevice> {
    gpu.physical_devices()
        .ok()?
        .into_iter()
        .find(|&device| gpu.properties(device).uuid == *uuid)
}

/// Summary of a GPU as exposed to the display configuration code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub uuid: GpuUuid,
    pub name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    /// Total size of device-local heaps.
    pub memory: u64,
}

fn device_type_rank(device_type: PhysicalDeviceType) -> u32 {
    match device_type {
        PhysicalDeviceType::DiscreteGpu => 0,
        PhysicalDeviceType::IntegratedGpu => 1,
        PhysicalDeviceType::VirtualGpu => 2,
        PhysicalDeviceType::Cpu => 3,
        PhysicalDeviceType::Other => 100,
    }
}

/// List all GPUs, discrete ones first, ties broken by UUID.
pub fn enumerate_gpus(gpu: &dyn GpuEnumerator) -> Result<Vec<GpuInfo>> {
    let mut devices: Vec<(GpuProperties, u64)> = gpu
        .physical_devices()?
        .into_iter()
        .map(|device| {
            let memory = gpu
                .memory_heaps(device)
                .iter()
                .filter(|heap| heap.flags.contains(MemoryHeapFlags::DEVICE_LOCAL))
                .map(|heap| heap.size)
                .sum();
            (gpu.properties(device), memory)
        })
        .collect();
    devices.sort_by(|(a, _), (b, _)| {
        device_type_rank(a.device_type)
            .cmp(&device_type_rank(b.device_type))
            .then_with(|| a.uuid.cmp(&b.uuid))
    });
    Ok(devices
        .into_iter()
        .map(|(props, memory)| GpuInfo {
            uuid: props.uuid,
            name: props.name,
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            memory,
        })
        .collect())
}
