use kmt_hal::{
    GpuEnumerator, GpuProperties, GpuUuid, Luid, MemoryHeap, PhysicalDevice, Result,
};

/// A GPU known to [`StaticGpus`].
#[derive(Debug, Clone)]
pub struct StaticGpu {
    pub luid: Luid,
    pub properties: GpuProperties,
    pub heaps: Vec<MemoryHeap>,
}

/// GPU enumeration backed by a fixed table.
///
/// Used on hosts without a Vulkan loader and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGpus {
    gpus: Vec<StaticGpu>,
}

impl StaticGpus {
    pub fn new(gpus: Vec<StaticGpu>) -> Self {
        StaticGpus { gpus }
    }

    fn get(&self, device: PhysicalDevice) -> Option<&StaticGpu> {
        self.gpus.get(device.0)
    }
}

impl GpuEnumerator for StaticGpus {
    fn uuid_from_luid(&self, luid: Luid) -> Option<GpuUuid> {
        self.gpus
            .iter()
            .find(|gpu| gpu.luid == luid)
            .map(|gpu| gpu.properties.uuid)
    }

    fn physical_devices(&self) -> Result<Vec<PhysicalDevice>> {
        Ok((0..self.gpus.len()).map(PhysicalDevice).collect())
    }

    fn properties(&self, device: PhysicalDevice) -> GpuProperties {
        self.get(device)
            .map(|gpu| gpu.properties.clone())
            .unwrap_or_default()
    }

    fn memory_heaps(&self, device: PhysicalDevice) -> Vec<MemoryHeap> {
        self.get(device)
            .map(|gpu| gpu.heaps.clone())
            .unwrap_or_default()
    }
}
