use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::command::{EcCommands, EcRequestRaw};
use super::commands::*;
use super::flash::FlashRegion;
use super::{CrosEc, CrosEcTransport, EcError, EcResponseStatus, EcResult};
use crate::util;

/// Image the EC is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum EcCurrentImage {
    Unknown = 0,
    RO = 1,
    RW = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcVersion {
    pub ro: String,
    pub rw: String,
    pub current_image: EcCurrentImage,
}

impl EcVersion {
    /// Version of the image that is running
    pub fn current(&self) -> &str {
        match self.current_image {
            EcCurrentImage::RO => &self.ro,
            _ => &self.rw,
        }
    }
}

impl<T: CrosEcTransport> CrosEc<T> {
    pub fn read_version(&mut self) -> EcResult<EcVersion> {
        let res = EcRequestGetVersion {}.send_command(self)?;
        let current_image =
            EcCurrentImage::from_u32(res.current_image).unwrap_or(EcCurrentImage::Unknown);
        Ok(EcVersion {
            ro: util::null_terminated_string(&res.version_string_ro),
            rw: util::null_terminated_string(&res.version_string_rw),
            current_image,
        })
    }

    /// Version string of the running EC image
    pub fn read_id(&mut self) -> EcResult<String> {
        Ok(self.read_version()?.current().to_string())
    }

    pub fn read_current_image(&mut self) -> EcResult<EcCurrentImage> {
        Ok(self.read_version()?.current_image)
    }

    pub fn read_build_info(&mut self) -> EcResult<String> {
        let data = EcRequestGetBuildInfo {}.send_command_vec(self)?;
        Ok(util::null_terminated_string(&data))
    }

    pub fn get_sku_id(&mut self) -> EcResult<u32> {
        let res = EcRequestGetSkuId {}.send_command(self)?;
        Ok(res.sku_id)
    }

    /// Reboot the EC or jump between its images.
    ///
    /// Unless the reboot is deferred with [`EC_REBOOT_FLAG_ON_AP_SHUTDOWN`],
    /// the EC goes away. The caller has to wait for it and negotiate again.
    pub fn reboot(&mut self, cmd: RebootEcCmd, flags: u8) -> EcResult<()> {
        info!("Rebooting EC: {:?}, flags: {:#X}", cmd, flags);
        EcRequestRebootEc {
            cmd: cmd as u8,
            flags,
        }
        .send_command_vec(self)?;

        if cmd != RebootEcCmd::Cancel && flags & EC_REBOOT_FLAG_ON_AP_SHUTDOWN == 0 {
            // Different image, layout and slots may differ
            self.flash_layout = None;
            self.vstore_info = None;
        }
        Ok(())
    }

    pub fn mkbp_info(&mut self) -> EcResult<EcResponseMkbpInfo> {
        EcRequestMkbpInfo {}.send_command(self)
    }

    /// Raw state of the keyboard matrix, one byte per column
    pub fn scan_keyboard(&mut self) -> EcResult<[u8; CROS_EC_KEYSCAN_COLS]> {
        let res = EcRequestMkbpState {}.send_command(self)?;
        Ok(res.cols)
    }

    /// Bitmask of the features the EC firmware supports, see [`EcFeatureCode`]
    pub fn get_features(&mut self) -> EcResult<u64> {
        let res = EcRequestGetFeatures {}.send_command(self)?;
        let flags = res.flags;
        Ok(u64::from(flags[0]) | (u64::from(flags[1]) << 32))
    }

    /// Whether the EC firmware supports a feature.
    ///
    /// Failing to get the features is an error, not a missing feature.
    pub fn check_feature(&mut self, feature: EcFeatureCode) -> EcResult<bool> {
        let features = self.get_features()?;
        Ok(features & (1 << feature as u32) != 0)
    }

    /// EC switches, see `EC_SWITCH_*`. Only some bus drivers can read them.
    pub fn get_switches(&mut self) -> EcResult<u8> {
        self.transport.get_switches()
    }

    fn vbnv_context(
        &mut self,
        op: u32,
        block: [u8; EC_VBNV_BLOCK_SIZE],
    ) -> EcResult<[u8; EC_VBNV_BLOCK_SIZE]> {
        let res = EcRequestVbnvContext { op, block }.send_command(self)?;
        Ok(res.block)
    }

    /// Read the verified boot non-volatile context
    pub fn read_nvdata(&mut self) -> EcResult<[u8; EC_VBNV_BLOCK_SIZE]> {
        self.vbnv_context(EC_VBNV_CONTEXT_OP_READ, [0; EC_VBNV_BLOCK_SIZE])
    }

    pub fn write_nvdata(&mut self, block: &[u8; EC_VBNV_BLOCK_SIZE]) -> EcResult<()> {
        self.vbnv_context(EC_VBNV_CONTEXT_OP_WRITE, *block)?;
        Ok(())
    }

    /// Switch an LDO, state is `EC_LDO_STATE_ON` or `EC_LDO_STATE_OFF`
    pub fn set_ldo(&mut self, index: u8, state: u8) -> EcResult<()> {
        EcRequestLdoSet { index, state }.send_command_vec(self)?;
        Ok(())
    }

    pub fn get_ldo(&mut self, index: u8) -> EcResult<u8> {
        let res = EcRequestLdoGet { index }.send_command(self)?;
        Ok(res.state)
    }

    /// Set the duty cycle of a generic PWM. `EC_PWM_MAX_DUTY` is 100%.
    pub fn set_pwm_duty(&mut self, index: u8, duty: u16) -> EcResult<()> {
        EcRequestPwmSetDuty {
            duty,
            pwm_type: EcPwmType::Generic as u8,
            index,
        }
        .send_command_vec(self)?;
        Ok(())
    }

    /// Disconnect the battery, see `EC_BATTERY_CUTOFF_FLAG_*`
    pub fn battery_cutoff(&mut self, flags: u8) -> EcResult<()> {
        info!("Battery cut off, flags: {:#X}", flags);
        EcRequestBatteryCutoff { flags }.send_command_vec(self)?;
        Ok(())
    }

    fn charge_state(&mut self, cmd: ChargeStateCommand, param: u32) -> EcResult<Vec<u8>> {
        EcRequestChargeState {
            cmd: cmd as u8,
            param,
            value: 0,
        }
        .send_command_vec(self)
    }

    /// Whether power draw has to be limited because battery or charger are weak
    pub fn read_limit_power(&mut self) -> EcResult<bool> {
        let res = self.charge_state(
            ChargeStateCommand::GetParam,
            ChargeStateParam::LimitPower as u32,
        );
        let data = match res {
            // Older EC firmware doesn't know the parameter
            Err(EcError::Response(EcResponseStatus::InvalidParameter)) => {
                return Err(EcError::Unsupported("limit power"))
            }
            res => res?,
        };
        let res: EcResponseChargeStateGetParam = util::read_struct(&data).ok_or_else(|| {
            EcError::DeviceError("Charge state response too short".to_string())
        })?;
        let value = res.value;
        match value {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(EcError::DeviceError(format!(
                "Invalid limit power value {}",
                value
            ))),
        }
    }

    /// Battery state of charge in percent
    pub fn read_batt_charge(&mut self) -> EcResult<u32> {
        let data = self.charge_state(ChargeStateCommand::GetState, 0)?;
        let res: EcResponseChargeStateGetState = util::read_struct(&data).ok_or_else(|| {
            EcError::DeviceError("Charge state response too short".to_string())
        })?;
        Ok(res.batt_state_of_charge)
    }

    /// See `EC_POWER_BUTTON_*`
    pub fn config_powerbtn(&mut self, flags: u8) -> EcResult<()> {
        EcRequestConfigPowerButton { flags }.send_command_vec(self)?;
        Ok(())
    }

    /// Whether closing the lid is reported as SMI, which shuts the system down
    pub fn get_lid_shutdown_mask(&mut self) -> EcResult<bool> {
        let mask = self.get_event_mask(EcCommands::HostEventGetSmiMask)?;
        Ok(mask & ec_host_event_mask(EC_HOST_EVENT_LID_CLOSED) != 0)
    }

    pub fn set_lid_shutdown_mask(&mut self, enable: bool) -> EcResult<()> {
        let lid = ec_host_event_mask(EC_HOST_EVENT_LID_CLOSED);
        let mut mask = self.get_event_mask(EcCommands::HostEventGetSmiMask)?;
        if enable {
            mask |= lid;
        } else {
            mask &= !lid;
        }
        self.set_event_mask(EcCommands::HostEventSetSmiMask, mask)
    }

    /// Ask the EC to verify an image it may jump to
    pub fn efs_verify(&mut self, region: FlashRegion) -> EcResult<()> {
        info!("EFS: EC is verifying {:?} image", region);
        let res = EcRequestEfsVerify {
            region: region as u8,
        }
        .send_command_vec(self);
        match res {
            Ok(_) => {
                info!("EFS: Verification success");
                Ok(())
            }
            Err(EcError::Response(EcResponseStatus::InvalidCommand)) => {
                info!("EFS: EC doesn't support EFS_VERIFY command");
                Err(EcError::Unsupported("efs verify"))
            }
            Err(err) => {
                error!("EFS: Verification failed: {}", err);
                Err(err)
            }
        }
    }
}
