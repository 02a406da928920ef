use {crate::error::*, crate::object::HandleValue, alloc::vec::Vec, numeric_enum_macro::numeric_enum};

/// 显示源（VidPN source）ID
pub type SourceId = u32;

numeric_enum! {
    #[repr(u32)]
    /// 显示源的占有方式
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum OwnerType {
        Shared = 1,
        Exclusive = 2,
        ExclusiveGdi = 3,
        Emulated = 4,
    }
}

/// One `(device, source)` ownership record.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SourceOwner {
    pub device: HandleValue,
    pub source: SourceId,
    pub owner: OwnerType,
}

/// 记录各设备对显示源的占有关系
#[derive(Debug, Default)]
pub struct VidPnSourceOwners {
    records: Vec<SourceOwner>,
}

impl VidPnSourceOwners {
    /// Apply a batch of ownership requests of `device`.
    ///
    /// Every request is checked before anything is committed, so a failing
    /// batch leaves the records untouched. An empty batch clears the device.
    pub fn set_owner(
        &mut self,
        device: HandleValue,
        requests: &[(SourceId, OwnerType)],
    ) -> KmtResult {
        if requests.is_empty() {
            self.clear(device);
            return Ok(());
        }
        for &(source, requested) in requests {
            self.check(device, source, requested)?;
        }
        for &(source, owner) in requests {
            match self
                .records
                .iter_mut()
                .find(|r| r.device == device && r.source == source)
            {
                Some(record) => record.owner = owner,
                None => self.records.push(SourceOwner {
                    device,
                    source,
                    owner,
                }),
            }
        }
        Ok(())
    }

    fn check(&self, device: HandleValue, source: SourceId, requested: OwnerType) -> KmtResult {
        match requested {
            OwnerType::Shared => return Err(KmtError::VIDPN_SOURCE_IN_USE),
            OwnerType::ExclusiveGdi => return Err(KmtError::INVALID_PARAMETER),
            OwnerType::Exclusive | OwnerType::Emulated => {}
        }
        for record in self.records.iter().filter(|r| r.source == source) {
            if record.device != device {
                return Err(KmtError::VIDPN_SOURCE_IN_USE);
            }
            // only an emulated owner may renew its own emulated ownership
            if !(record.owner == OwnerType::Emulated && requested == OwnerType::Emulated) {
                return Err(KmtError::INVALID_PARAMETER);
            }
        }
        Ok(())
    }

    /// Drop every record of `device`.
    pub fn clear(&mut self, device: HandleValue) {
        self.records.retain(|r| r.device != device);
    }

    /// Whether some device owns `source` exclusively.
    pub fn check_exclusive(&self, source: SourceId) -> bool {
        self.records
            .iter()
            .any(|r| r.source == source && r.owner == OwnerType::Exclusive)
    }

    pub fn owner(&self, device: HandleValue, source: SourceId) -> Option<OwnerType> {
        self.records
            .iter()
            .find(|r| r.device == device && r.source == source)
            .map(|r| r.owner)
    }

    pub fn records(&self) -> &[SourceOwner] {
        &self.records
    }
}
