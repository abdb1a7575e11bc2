//! Temporary secure storage (vstore)
//!
//! A handful of 64 byte slots kept by the EC across AP reboots. Once a slot
//! has been written it's locked until the EC resets.

use alloc::format;

use super::command::EcRequestRaw;
use super::commands::*;
use super::{CrosEc, CrosEcTransport, EcError, EcResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VstoreInfo {
    /// Number of slots the EC implements
    pub slot_count: u8,
    /// Bit N is set if slot N is locked
    pub locked: u32,
}

impl VstoreInfo {
    /// Number of slots that can actually be addressed
    pub fn usable_slots(&self) -> u8 {
        self.slot_count.min(EC_VSTORE_SLOT_MAX as u8)
    }

    pub fn is_locked(&self, slot: u8) -> bool {
        slot < 32 && self.locked & (1 << slot) != 0
    }
}

impl<T: CrosEcTransport> CrosEc<T> {
    /// Whether the EC firmware implements vstore
    pub fn vstore_supported(&mut self) -> EcResult<bool> {
        self.check_feature(EcFeatureCode::Vstore)
    }

    /// Slot count and lock state. Queried once, then cached.
    pub fn vstore_info(&mut self) -> EcResult<VstoreInfo> {
        if let Some(info) = self.vstore_info {
            return Ok(info);
        }
        let res = EcRequestVstoreInfo {}.send_command(self)?;
        let info = VstoreInfo {
            slot_count: res.slot_count,
            locked: res.slot_locked,
        };
        debug!(
            "VStore: {} slots, locked: {:#010b}",
            info.slot_count, info.locked
        );
        self.vstore_info = Some(info);
        Ok(info)
    }

    fn check_vstore_slot(&mut self, slot: u8) -> EcResult<VstoreInfo> {
        let info = self.vstore_info()?;
        if slot >= info.usable_slots() {
            return Err(EcError::OutOfRange(format!(
                "VStore slot {} out of range, EC has {}",
                slot,
                info.usable_slots()
            )));
        }
        Ok(info)
    }

    pub fn vstore_read(&mut self, slot: u8) -> EcResult<[u8; EC_VSTORE_SLOT_SIZE]> {
        self.check_vstore_slot(slot)?;
        let res = EcRequestVstoreRead { slot }.send_command(self)?;
        Ok(res.data)
    }

    /// Write a slot and lock it. `data` shorter than a slot is zero padded.
    pub fn vstore_write(&mut self, slot: u8, data: &[u8]) -> EcResult<()> {
        if data.len() > EC_VSTORE_SLOT_SIZE {
            return Err(EcError::RequestTooLarge {
                len: data.len(),
                max: EC_VSTORE_SLOT_SIZE,
            });
        }
        let mut info = self.check_vstore_slot(slot)?;
        if info.is_locked(slot) {
            return Err(EcError::Locked(slot));
        }

        let mut params = EcRequestVstoreWrite {
            slot,
            data: [0; EC_VSTORE_SLOT_SIZE],
        };
        params.data[..data.len()].copy_from_slice(data);
        params.send_command_vec(self)?;

        // The EC locks a slot once it's written
        info.locked |= 1 << slot;
        self.vstore_info = Some(info);
        Ok(())
    }
}
