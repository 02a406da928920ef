use {
    super::*,
    alloc::string::String,
    kmt_hal::{Luid, MemoryHeapFlags},
    kmt_object::dev::{OwnerType, SourceId},
};

#[derive(Debug, Default)]
pub struct OpenAdapterFromLuid {
    pub luid: Luid,
    /// out
    pub adapter: HandleValue,
}

#[derive(Debug, Default)]
pub struct OpenAdapterFromDeviceName {
    pub device_name: Option<String>,
    /// out
    pub adapter: HandleValue,
    /// out
    pub luid: Luid,
}

#[derive(Debug, Default)]
pub struct CloseAdapter {
    pub adapter: HandleValue,
}

#[derive(Debug, Default)]
pub struct QueryAdapterInfo {
    pub adapter: HandleValue,
    pub info_type: u32,
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct QueryVideoMemoryInfo {
    pub adapter: HandleValue,
    pub segment_group: u32,
    pub physical_adapter_index: u32,
    /// out
    pub budget: u64,
    /// out
    pub current_usage: u64,
    /// out
    pub current_reservation: u64,
    /// out
    pub available_for_reservation: u64,
}

#[derive(Debug, Default)]
pub struct CreateDevice {
    pub adapter: HandleValue,
    pub flags: u32,
    /// out
    pub device: HandleValue,
}

#[derive(Debug, Default)]
pub struct DestroyDevice {
    pub device: HandleValue,
}

#[derive(Debug, Default)]
pub struct SetVidPnSourceOwner {
    pub device: HandleValue,
    pub owner_types: Vec<u32>,
    pub source_ids: Vec<SourceId>,
}

#[derive(Debug, Default)]
pub struct CheckVidPnExclusiveOwnership {
    pub adapter: HandleValue,
    pub source_id: SourceId,
}

impl Syscall<'_> {
    pub fn sys_open_adapter_from_luid(&self, params: &mut OpenAdapterFromLuid) -> KmtResult {
        info!(
            "adapter.open_from_luid: luid={:08x}:{:08x}",
            params.luid.high_part, params.luid.low_part
        );
        params.adapter = self.manager.open_adapter(params.luid)?;
        Ok(())
    }

    /// Open the default adapter on behalf of a display device name.
    pub fn sys_open_adapter_from_device_name(
        &self,
        params: &mut OpenAdapterFromDeviceName,
    ) -> KmtResult {
        info!("adapter.open_from_device_name: name={:?}", params.device_name);
        if params.device_name.is_none() {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let mut open = OpenAdapterFromLuid::default();
        self.sys_open_adapter_from_luid(&mut open)?;
        params.adapter = open.adapter;
        params.luid = open.luid;
        Ok(())
    }

    pub fn sys_close_adapter(&self, params: &mut CloseAdapter) -> KmtResult {
        info!("adapter.close: handle={:#x}", params.adapter);
        if params.adapter == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        self.manager.close_adapter(params.adapter)
    }

    pub fn sys_query_adapter_info(&self, params: &mut QueryAdapterInfo) -> KmtResult {
        info!(
            "adapter.query_info: handle={:#x}, type={}, size={:?}",
            params.adapter,
            params.info_type,
            params.data.as_ref().map(Vec::len)
        );
        let data = match params.data.as_mut() {
            Some(data) if params.adapter != INVALID_HANDLE => data,
            _ => return Err(KmtError::INVALID_PARAMETER),
        };
        let value: u32 = match AdapterInfoType::try_from(params.info_type) {
            // FALSE
            Ok(AdapterInfoType::CHECKDRIVERUPDATESTATUS) => 0,
            Ok(AdapterInfoType::DRIVERVERSION) => KMT_DRIVERVERSION_WDDM_1_3,
            Err(_) => {
                warn!("adapter info type {} not implemented", params.info_type);
                return Err(KmtError::NOT_IMPLEMENTED);
            }
        };
        let bytes = value.to_le_bytes();
        if data.len() < bytes.len() {
            return Err(KmtError::INVALID_PARAMETER);
        }
        data[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn sys_query_video_memory_info(&self, params: &mut QueryVideoMemoryInfo) -> KmtResult {
        info!(
            "adapter.query_video_memory: handle={:#x}, group={}, index={}",
            params.adapter, params.segment_group, params.physical_adapter_index
        );
        if params.adapter == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let group = MemorySegmentGroup::try_from(params.segment_group)
            .map_err(|_| KmtError::INVALID_PARAMETER)?;
        // linked adapters are not supported
        if params.physical_adapter_index > 0 {
            return Err(KmtError::INVALID_PARAMETER);
        }
        params.budget = 0;
        params.current_usage = 0;
        params.current_reservation = 0;
        params.available_for_reservation = 0;

        let heaps = self.manager.adapter_memory_heaps(params.adapter)?;
        if heaps.is_empty() {
            return Ok(());
        }
        let local = group == MemorySegmentGroup::LOCAL;
        for heap in heaps
            .iter()
            .filter(|heap| heap.flags.contains(MemoryHeapFlags::DEVICE_LOCAL) == local)
        {
            params.budget += heap.budget;
            params.current_usage += heap.usage;
        }
        params.available_for_reservation = params.budget / 2;
        Ok(())
    }

    pub fn sys_create_device(&self, params: &mut CreateDevice) -> KmtResult {
        info!(
            "device.create: adapter={:#x}, flags={:#x}",
            params.adapter, params.flags
        );
        if params.adapter == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let flags = CreateDeviceFlags::from_bits_truncate(params.flags);
        if flags.contains(CreateDeviceFlags::LEGACY_MODE)
            || flags.contains(CreateDeviceFlags::REQUEST_VSYNC)
            || flags.contains(CreateDeviceFlags::DISABLE_GPU_TIMEOUT)
        {
            warn!("device flags {:?} not implemented", flags);
        }
        params.device = self.manager.create_device(params.adapter)?;
        Ok(())
    }

    pub fn sys_destroy_device(&self, params: &mut DestroyDevice) -> KmtResult {
        info!("device.destroy: handle={:#x}", params.device);
        if params.device == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        self.manager.destroy_device(params.device)
    }

    pub fn sys_set_vidpn_source_owner(&self, params: &mut SetVidPnSourceOwner) -> KmtResult {
        info!(
            "vidpn.set_owner: device={:#x}, types={:?}, sources={:?}",
            params.device, params.owner_types, params.source_ids
        );
        if params.device == INVALID_HANDLE || params.owner_types.len() != params.source_ids.len() {
            return Err(KmtError::INVALID_PARAMETER);
        }
        let requests = params
            .source_ids
            .iter()
            .zip(params.owner_types.iter())
            .map(|(&source, &raw)| {
                OwnerType::try_from(raw)
                    .map(|owner| (source, owner))
                    .map_err(|_| KmtError::INVALID_PARAMETER)
            })
            .collect::<KmtResult<Vec<_>>>()?;
        self.manager.set_vidpn_source_owner(params.device, &requests)
    }

    pub fn sys_check_vidpn_exclusive_ownership(
        &self,
        params: &mut CheckVidPnExclusiveOwnership,
    ) -> KmtResult {
        info!(
            "vidpn.check_exclusive: adapter={:#x}, source={}",
            params.adapter, params.source_id
        );
        if params.adapter == INVALID_HANDLE {
            return Err(KmtError::INVALID_PARAMETER);
        }
        if self.manager.check_vidpn_exclusive_ownership(params.source_id) {
            return Err(KmtError::PRESENT_OCCLUDED);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Session;
    use super::*;
    use kmt_hal::{GpuProperties, GpuUuid, MemoryHeap};
    use kmt_hal_unix::{StaticGpu, StaticGpus};
    use std::sync::Arc;

    fn open_adapter(sys: &Syscall) -> HandleValue {
        let mut open = OpenAdapterFromLuid::default();
        sys.sys_open_adapter_from_luid(&mut open).unwrap();
        open.adapter
    }

    #[test]
    fn adapter_info() {
        let session = Session::new();
        let manager = session.process();
        let sys = Syscall { manager: &manager };
        let adapter = open_adapter(&sys);

        let mut query = QueryAdapterInfo {
            adapter,
            info_type: AdapterInfoType::DRIVERVERSION as u32,
            data: Some(vec![0xff; 4]),
        };
        sys.sys_query_adapter_info(&mut query).unwrap();
        assert_eq!(query.data.as_deref(), Some(&1300u32.to_le_bytes()[..]));

        query.info_type = AdapterInfoType::CHECKDRIVERUPDATESTATUS as u32;
        sys.sys_query_adapter_info(&mut query).unwrap();
        assert_eq!(query.data.as_deref(), Some(&[0, 0, 0, 0][..]));

        query.data = Some(vec![0; 2]);
        assert_eq!(
            sys.sys_query_adapter_info(&mut query),
            Err(KmtError::INVALID_PARAMETER)
        );
        query.info_type = 1;
        assert_eq!(
            sys.sys_query_adapter_info(&mut query),
            Err(KmtError::NOT_IMPLEMENTED)
        );
        query.data = None;
        assert_eq!(
            sys.sys_query_adapter_info(&mut query),
            Err(KmtError::INVALID_PARAMETER)
        );
    }

    #[test]
    fn open_from_device_name() {
        let session = Session::new();
        let manager = session.process();
        let sys = Syscall { manager: &manager };
        let mut open = OpenAdapterFromDeviceName::default();
        assert_eq!(
            sys.sys_open_adapter_from_device_name(&mut open),
            Err(KmtError::INVALID_PARAMETER)
        );
        open.device_name = Some(String::from("\\\\.\\DISPLAY1"));
        sys.sys_open_adapter_from_device_name(&mut open).unwrap();
        assert_ne!(open.adapter, INVALID_HANDLE);
        assert_eq!(open.luid, Luid::default());
        assert_eq!(
            sys.sys_close_adapter(&mut CloseAdapter { adapter: 0 }),
            Err(KmtError::INVALID_PARAMETER)
        );
    }

    #[test]
    fn video_memory() {
        let session = Session::new();
        let luid = Luid {
            low_part: 7,
            high_part: 0,
        };
        let heap = |budget, usage, flags| MemoryHeap {
            size: budget * 2,
            budget,
            usage,
            flags,
        };
        let gpus = StaticGpus::new(vec![StaticGpu {
            luid,
            properties: GpuProperties {
                uuid: GpuUuid([9; 16]),
                ..Default::default()
            },
            heaps: vec![
                heap(0x1000, 0x100, MemoryHeapFlags::DEVICE_LOCAL),
                heap(0x3000, 0x200, MemoryHeapFlags::DEVICE_LOCAL),
                heap(0x8000, 0x400, MemoryHeapFlags::empty()),
            ],
        }]);
        let manager = session.process().with_gpu(Arc::new(gpus));
        let sys = Syscall { manager: &manager };

        let mut open = OpenAdapterFromLuid {
            luid,
            ..Default::default()
        };
        sys.sys_open_adapter_from_luid(&mut open).unwrap();
        let mut query = QueryVideoMemoryInfo {
            adapter: open.adapter,
            segment_group: MemorySegmentGroup::LOCAL as u32,
            ..Default::default()
        };
        sys.sys_query_video_memory_info(&mut query).unwrap();
        assert_eq!(query.budget, 0x4000);
        assert_eq!(query.current_usage, 0x300);
        assert_eq!(query.available_for_reservation, 0x2000);

        query.segment_group = MemorySegmentGroup::NON_LOCAL as u32;
        sys.sys_query_video_memory_info(&mut query).unwrap();
        assert_eq!(query.budget, 0x8000);
        assert_eq!(query.current_usage, 0x400);

        query.physical_adapter_index = 1;
        assert_eq!(
            sys.sys_query_video_memory_info(&mut query),
            Err(KmtError::INVALID_PARAMETER)
        );
        query.physical_adapter_index = 0;
        query.segment_group = 2;
        assert_eq!(
            sys.sys_query_video_memory_info(&mut query),
            Err(KmtError::INVALID_PARAMETER)
        );

        // no physical device behind the default LUID
        let mut query = QueryVideoMemoryInfo {
            adapter: open_adapter(&sys),
            ..Default::default()
        };
        sys.sys_query_video_memory_info(&mut query).unwrap();
        assert_eq!(query.budget, 0);
        assert_eq!(query.available_for_reservation, 0);
    }

    #[test]
    fn check_exclusive_scans_sources_only() {
        let session = Session::new();
        let manager = session.process();
        let sys = Syscall { manager: &manager };
        let mut check = CheckVidPnExclusiveOwnership {
            adapter: INVALID_HANDLE,
            source_id: 0,
        };
        assert_eq!(
            sys.sys_check_vidpn_exclusive_ownership(&mut check),
            Err(KmtError::INVALID_PARAMETER)
        );

        // adapter never opened
        check.adapter = 0x40;
        sys.sys_check_vidpn_exclusive_ownership(&mut check).unwrap();

        let adapter = open_adapter(&sys);
        let mut device = CreateDevice {
            adapter,
            ..Default::default()
        };
        sys.sys_create_device(&mut device).unwrap();
        let mut set = SetVidPnSourceOwner {
            device: device.device,
            owner_types: vec![OwnerType::Exclusive as u32],
            source_ids: vec![0],
        };
        sys.sys_set_vidpn_source_owner(&mut set).unwrap();
        assert_eq!(
            sys.sys_check_vidpn_exclusive_ownership(&mut check),
            Err(KmtError::PRESENT_OCCLUDED)
        );
    }

    #[test]
    fn vidpn_ownership() {
        let session = Session::new();
        let manager = session.process();
        let sys = Syscall { manager: &manager };
        let adapter = open_adapter(&sys);
        let mut first = CreateDevice {
            adapter,
            ..Default::default()
        };
        sys.sys_create_device(&mut first).unwrap();
        let mut second = CreateDevice {
            adapter,
            flags: CreateDeviceFlags::REQUEST_VSYNC.bits(),
            ..Default::default()
        };
        sys.sys_create_device(&mut second).unwrap();

        let mut check = CheckVidPnExclusiveOwnership {
            adapter,
            source_id: 0,
        };
        sys.sys_check_vidpn_exclusive_ownership(&mut check).unwrap();

        let mut set = SetVidPnSourceOwner {
            device: first.device,
            owner_types: vec![OwnerType::Exclusive as u32],
            source_ids: vec![0],
        };
        sys.sys_set_vidpn_source_owner(&mut set).unwrap();
        assert_eq!(
            sys.sys_check_vidpn_exclusive_ownership(&mut check),
            Err(KmtError::PRESENT_OCCLUDED)
        );

        let mut steal = SetVidPnSourceOwner {
            device: second.device,
            owner_types: vec![OwnerType::Emulated as u32],
            source_ids: vec![0],
        };
        assert_eq!(
            sys.sys_set_vidpn_source_owner(&mut steal),
            Err(KmtError::VIDPN_SOURCE_IN_USE)
        );
        steal.owner_types = vec![0];
        assert_eq!(
            sys.sys_set_vidpn_source_owner(&mut steal),
            Err(KmtError::INVALID_PARAMETER)
        );
        steal.owner_types.clear();
        assert_eq!(
            sys.sys_set_vidpn_source_owner(&mut steal),
            Err(KmtError::INVALID_PARAMETER)
        );

        sys.sys_destroy_device(&mut DestroyDevice {
            device: first.device,
        })
        .unwrap();
        sys.sys_check_vidpn_exclusive_ownership(&mut check).unwrap();
        assert_eq!(
            sys.sys_destroy_device(&mut DestroyDevice { device: 0 }),
            Err(KmtError::INVALID_PARAMETER)
        );
    }
}
