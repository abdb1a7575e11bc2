//! Host events and the MKBP event queue

use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use super::command::{EcCommands, EcRequestRaw};
use super::commands::*;
use super::{CrosEc, CrosEcTransport, EcError, EcResponseStatus, EcResult};
use crate::util;

pub const EC_MKBP_EVENT_KEY_MATRIX: u8 = 0;
pub const EC_MKBP_EVENT_HOST_EVENT: u8 = 1;
pub const EC_MKBP_EVENT_SENSOR_FIFO: u8 = 2;
pub const EC_MKBP_EVENT_BUTTON: u8 = 3;
pub const EC_MKBP_EVENT_SWITCH: u8 = 4;
pub const EC_MKBP_EVENT_FINGERPRINT: u8 = 5;
pub const EC_MKBP_EVENT_SYSRQ: u8 = 6;
pub const EC_MKBP_EVENT_HOST_EVENT64: u8 = 7;

/// Set in the event type byte if the EC has more events queued
pub const EC_MKBP_HAS_MORE_EVENTS: u8 = 0x80;
pub const EC_MKBP_EVENT_TYPE_MASK: u8 = 0x7f;

/// One event from the EC's MKBP queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkbpEvent {
    /// EC_MKBP_EVENT_*
    pub event_type: u8,
    /// More events are waiting, fetch them before waiting for the interrupt again
    pub has_more: bool,
    pub data: Vec<u8>,
}

impl<T: CrosEcTransport> CrosEc<T> {
    /// Pending host events (32 bit)
    pub fn get_host_events(&mut self) -> EcResult<u32> {
        self.get_event_mask(EcCommands::HostEventGetB)
    }

    /// Clear the events set in `mask`. Others stay pending.
    pub fn clear_host_events(&mut self, mask: u32) -> EcResult<()> {
        debug!("Clearing host events {:#X}", mask);
        self.set_event_mask(EcCommands::HostEventClear, mask)
    }

    /// Read an event mask, `command` being one of the HostEventGet* commands
    pub fn get_event_mask(&mut self, command: EcCommands) -> EcResult<u32> {
        let response = self.send_command(command as u16, 0, &[])?;
        let res: EcResponseHostEventMask = util::read_struct(&response).ok_or_else(|| {
            EcError::DeviceError(format!("{:?} response too short", command))
        })?;
        Ok(res.mask)
    }

    /// Write an event mask, `command` being one of the HostEventSet* or
    /// HostEventClear* commands
    pub fn set_event_mask(&mut self, command: EcCommands, mask: u32) -> EcResult<()> {
        let params = EcParamsHostEventMask { mask };
        let data: &[u8] = unsafe { util::any_as_u8_slice(&params) };
        self.send_command(command as u16, 0, data)?;
        Ok(())
    }

    /// Pending host events (64 bit)
    pub fn get_events_b(&mut self) -> EcResult<u64> {
        let res = EcRequestHostEvent {
            action: EC_HOST_EVENT_GET,
            mask_type: HostEventMaskType::B as u8,
            reserved: 0,
            value: 0,
        }
        .send_command(self)?;
        Ok(res.value)
    }

    /// Clear the 64 bit events set in `mask`
    pub fn clear_events_b(&mut self, mask: u64) -> EcResult<()> {
        debug!("Clearing host events B {:#X}", mask);
        EcRequestHostEvent {
            action: EC_HOST_EVENT_CLEAR,
            mask_type: HostEventMaskType::B as u8,
            reserved: 0,
            value: mask,
        }
        .send_command_vec(self)?;
        Ok(())
    }

    /// Fetch the next event from the MKBP queue. `None` if there's none pending.
    pub fn get_next_event(&mut self) -> EcResult<Option<MkbpEvent>> {
        let res = EcRequestGetNextEvent {}.send_command_vec(self);
        let data = match res {
            Ok(data) => data,
            Err(EcError::Response(EcResponseStatus::Unavailable)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let (event_type, data) = data
            .split_first()
            .ok_or_else(|| EcError::DeviceError("Empty MKBP event".to_string()))?;
        let event = MkbpEvent {
            event_type: event_type & EC_MKBP_EVENT_TYPE_MASK,
            has_more: event_type & EC_MKBP_HAS_MORE_EVENTS != 0,
            data: data.to_vec(),
        };
        trace!("MKBP event: {:X?}", event);
        Ok(Some(event))
    }
}
