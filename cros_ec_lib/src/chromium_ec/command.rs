use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::util;

use super::{CrosEc, CrosEcTransport, EcError, EcResult};

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum EcCommands {
    /// Check that the EC is alive and speaks the protocol
    Hello = 0x01,
    GetVersion = 0x02,
    GetBuildInfo = 0x04,
    /// Is the EC still processing the last command?
    GetCommsStatus = 0x09,
    /// List the features supported by the firmware
    GetFeatures = 0x0D,
    GetSkuId = 0x0E,
    FlashInfo = 0x10,
    /// Read section of EC flash
    FlashRead = 0x11,
    /// Write section of EC flash
    FlashWrite = 0x12,
    /// Erase section of EC flash
    FlashErase = 0x13,
    FlashProtect = 0x15,
    FlashRegionInfo = 0x16,
    /// Read/write the verified boot non-volatile context
    VbnvContext = 0x17,
    PwmSetDuty = 0x25,
    VstoreInfo = 0x49,
    VstoreRead = 0x4A,
    VstoreWrite = 0x4B,
    /// Current keyboard matrix state
    MkbpState = 0x60,
    MkbpInfo = 0x61,
    GetNextEvent = 0x67,
    HostEventGetB = 0x87,
    HostEventGetSmiMask = 0x88,
    HostEventGetSciMask = 0x89,
    HostEventSetSmiMask = 0x8A,
    HostEventSetSciMask = 0x8B,
    HostEventClear = 0x8C,
    HostEventGetWakeMask = 0x8D,
    HostEventSetWakeMask = 0x8E,
    HostEventClearB = 0x8F,
    BatteryCutOff = 0x99,
    LdoSet = 0x9B,
    LdoGet = 0x9C,
    I2cPassthrough = 0x9E,
    ChargeState = 0xA0,
    /// Hash a section of EC flash
    VbootHash = 0xA2,
    /// Unified host event get/set/clear
    HostEvent = 0xA4,
    /// Control EC boot
    RebootEc = 0xD2,
    /// Fetch the response of a command that was in progress
    ResendResponse = 0xDB,
    ConfigPowerButton = 0x0115,
    /// Ask the EC to verify one of its images
    EfsVerify = 0x011E,
}

pub trait EcRequest<R> {
    fn command_id() -> EcCommands;
    // Can optionally override this
    fn command_version() -> u8 {
        0
    }
}

impl<T: EcRequest<R>, R> EcRequestRaw<R> for T {
    fn command_id_u16() -> u16 {
        Self::command_id() as u16
    }
    fn command_version() -> u8 {
        <Self as EcRequest<R>>::command_version()
    }
}

pub trait EcRequestRaw<R> {
    fn command_id_u16() -> u16;
    fn command_version() -> u8;

    fn format_request(&self) -> &[u8]
    where
        Self: Sized,
    {
        unsafe { util::any_as_u8_slice(self) }
    }

    fn send_command_vec<T: CrosEcTransport>(&self, ec: &mut CrosEc<T>) -> EcResult<Vec<u8>>
    where
        Self: Sized,
    {
        self.send_command_vec_extra(ec, &[])
    }

    fn send_command_vec_extra<T: CrosEcTransport>(
        &self,
        ec: &mut CrosEc<T>,
        extra_data: &[u8],
    ) -> EcResult<Vec<u8>>
    where
        Self: Sized,
    {
        let params = self.format_request();
        let request = if extra_data.is_empty() {
            params.to_vec()
        } else {
            let mut buffer: Vec<u8> = vec![0; params.len() + extra_data.len()];
            buffer[..params.len()].copy_from_slice(params);
            buffer[params.len()..].copy_from_slice(extra_data);
            buffer
        };
        trace!(
            "send_command<{:X?}>",
            <EcCommands as FromPrimitive>::from_u16(Self::command_id_u16())
        );
        ec.send_command(
            Self::command_id_u16(),
            <Self as EcRequestRaw<R>>::command_version(),
            &request,
        )
    }

    fn send_command<T: CrosEcTransport>(&self, ec: &mut CrosEc<T>) -> EcResult<R>
    where
        Self: Sized,
    {
        self.send_command_extra(ec, &[])
    }

    // Same as send_command but with extra data packed after the defined struct
    fn send_command_extra<T: CrosEcTransport>(
        &self,
        ec: &mut CrosEc<T>,
        extra_data: &[u8],
    ) -> EcResult<R>
    where
        Self: Sized,
    {
        let response = self.send_command_vec_extra(ec, extra_data)?;
        let expected = std::mem::size_of::<R>();
        if response.len() < expected {
            return Err(EcError::DeviceError(format!(
                "Returned data size ({}) is smaller than the expected size: {}",
                response.len(),
                expected
            )));
        }
        // Length checked above, read_unaligned has no alignment requirement
        let val: R = unsafe { std::ptr::read_unaligned(response.as_ptr() as *const R) };
        Ok(val)
    }
}
