//! Simulated EC for the unit tests
//!
//! Speaks both wire framings and keeps just enough state (flash, events,
//! vstore, ...) to check what the driver sends.

use std::collections::{HashMap, VecDeque};

use num_traits::FromPrimitive;
use sha2::{Digest, Sha256};

use super::command::EcCommands;
use super::commands::*;
use super::i2c_passthrough::{EC_I2C_STATUS_NAK, MAX_I2C_CHUNK};
use super::protocol::*;
use super::{
    CrosEcTransport, EcError, EcResponseStatus, EcResult, ProtocolVersion, EC_HELLO_MAGIC,
};
use crate::util;

pub const FLASH_SIZE: u32 = 0x8000;
pub const RO_SIZE: u32 = 0x4000;
pub const ACTIVE_OFFSET: u32 = 0x4000;
pub const ACTIVE_SIZE: u32 = 0x4000;
pub const WRITE_BLOCK: u32 = 4;
pub const ERASE_BLOCK: u32 = 0x800;

pub const VSTORE_SLOTS: u8 = 4;
pub const VERSION_RO: &str = "mock_v1.0.0-ro";
pub const VERSION_RW: &str = "mock_v1.0.1-rw";
pub const BUILD_INFO: &str = "mock_v1.0.1-rw 2024-01-01 builder";
pub const SKU_ID: u32 = 0x1234;
pub const BATTERY_CHARGE: u32 = 87;
/// Address of the simulated I2C device
pub const I2C_DEVICE: u16 = 0x50;

const COMMS_STATUS_PROCESSING: u32 = 1 << 0;

/// Set up logging for a test. Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A well formed version 3 response, the way the EC builds it
pub fn build_response(result: u16, data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN + data.len()];
    buf[0] = EC_HOST_RESPONSE_VERSION;
    buf[2..4].copy_from_slice(&result.to_le_bytes());
    buf[4..6].copy_from_slice(&(data.len() as u16).to_le_bytes());
    buf[HEADER_LEN..].copy_from_slice(data);
    buf[1] = checksum_buffer(&buf);
    buf
}

fn bytes_of<S>(s: &S) -> Vec<u8> {
    unsafe { util::any_as_u8_slice(s) }.to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    PacketOnly,
    CommandOnly,
    Both,
}

type Reply = (EcResponseStatus, Vec<u8>);

fn ok(data: Vec<u8>) -> Reply {
    (EcResponseStatus::Success, data)
}

fn fail(status: EcResponseStatus) -> Reply {
    (status, vec![])
}

pub struct MockEc {
    mode: MockMode,
    packets: usize,
    commands: usize,
    counts: HashMap<u16, usize>,
    /// Response kept while the EC pretends to be busy
    pending: Option<Reply>,
    busy_polls: u32,

    /// Answer of the bus driver's version check. `None` if it can't tell.
    pub check_version: Option<ProtocolVersion>,
    /// Added to the HELLO value
    pub hello_offset: u32,
    /// Every transfer fails with a bus error
    pub fail_bus: bool,
    /// Flip the lowest bit of this response byte (packet framing only)
    pub corrupt_byte: Option<usize>,
    /// Last request packet as sent by the driver
    pub last_packet: Vec<u8>,
    /// Answer the next command with "in progress", then report busy for
    /// this many comms status polls
    pub in_progress_polls: Option<u32>,
    pub switches: Option<u8>,

    pub current_image: u32,
    /// `None` if the EC doesn't know the features command
    pub features: Option<u64>,

    pub flash: Vec<u8>,
    pub protect_flags: u32,
    /// Flash commands touching this offset fail
    pub fail_flash_at: Option<u32>,

    hash: EcResponseVbootHash,
    /// Number of GETs after START until the hash is done
    pub hash_busy_polls: u32,
    hash_polls_left: u32,

    pub events: u32,
    pub events_b: u64,
    pub smi_mask: u32,
    pub sci_mask: u32,
    pub wake_mask: u32,
    pub mkbp_events: VecDeque<Vec<u8>>,
    pub keyboard: [u8; CROS_EC_KEYSCAN_COLS],

    pub vstore: Vec<[u8; EC_VSTORE_SLOT_SIZE]>,
    pub vstore_locked: u32,
    pub nvdata: [u8; EC_VBNV_BLOCK_SIZE],

    pub ldo: [u8; 4],
    pub pwm_duty: Option<(u8, u16)>,
    pub battery_cutoff: Option<u8>,
    /// `None` if the EC doesn't know the limit power parameter
    pub limit_power: Option<u32>,
    pub powerbtn_flags: Option<u8>,
    pub efs_supported: bool,
    pub last_reboot: Option<(u8, u8)>,

    pub i2c_mem: [u8; 256],
    i2c_pointer: u8,
}

impl MockEc {
    pub fn new(mode: MockMode) -> Self {
        let features = (1u64 << EcFeatureCode::Flash as u32)
            | (1 << EcFeatureCode::Vstore as u32)
            | (1 << EcFeatureCode::HostEvents as u32);
        // Some recognizable content
        let flash = (0..FLASH_SIZE)
            .map(|i| (i as u8) ^ ((i >> 8) as u8))
            .collect();
        MockEc {
            mode,
            packets: 0,
            commands: 0,
            counts: HashMap::new(),
            pending: None,
            busy_polls: 0,
            check_version: None,
            hello_offset: EC_HELLO_MAGIC,
            fail_bus: false,
            corrupt_byte: None,
            last_packet: vec![],
            in_progress_polls: None,
            switches: None,
            current_image: 2,
            features: Some(features),
            flash,
            protect_flags: 0,
            fail_flash_at: None,
            hash: EcResponseVbootHash {
                status: EC_VBOOT_HASH_STATUS_NONE,
                hash_type: EC_VBOOT_HASH_TYPE_SHA256,
                digest_size: 0,
                reserved0: 0,
                offset: 0,
                size: 0,
                hash_digest: [0; 64],
            },
            hash_busy_polls: 0,
            hash_polls_left: 0,
            events: 0,
            events_b: 0,
            smi_mask: 0,
            sci_mask: 0,
            wake_mask: 0,
            mkbp_events: VecDeque::new(),
            keyboard: [0; CROS_EC_KEYSCAN_COLS],
            vstore: vec![[0; EC_VSTORE_SLOT_SIZE]; VSTORE_SLOTS as usize],
            vstore_locked: 0,
            nvdata: [0; EC_VBNV_BLOCK_SIZE],
            ldo: [EC_LDO_STATE_OFF; 4],
            pwm_duty: None,
            battery_cutoff: None,
            limit_power: Some(0),
            powerbtn_flags: None,
            efs_supported: true,
            last_reboot: None,
            i2c_mem: [0; 256],
            i2c_pointer: 0,
        }
    }

    /// Number of transfers of either framing
    pub fn transactions(&self) -> usize {
        self.packets + self.commands
    }

    pub fn packets(&self) -> usize {
        self.packets
    }

    pub fn commands(&self) -> usize {
        self.commands
    }

    /// How often a command was received
    pub fn count(&self, command: EcCommands) -> usize {
        self.counts.get(&(command as u16)).copied().unwrap_or(0)
    }

    fn handle(&mut self, command: u16, version: u8, req: &[u8]) -> Reply {
        *self.counts.entry(command).or_insert(0) += 1;

        let Some(cmd) = EcCommands::from_u16(command) else {
            return fail(EcResponseStatus::InvalidCommand);
        };
        match cmd {
            EcCommands::GetCommsStatus => {
                let flags = if self.busy_polls > 0 {
                    self.busy_polls -= 1;
                    COMMS_STATUS_PROCESSING
                } else {
                    0
                };
                ok(bytes_of(&EcResponseGetCommsStatus { flags }))
            }
            EcCommands::ResendResponse => self
                .pending
                .take()
                .unwrap_or_else(|| fail(EcResponseStatus::DupUnavailable)),
            EcCommands::Hello => self.handle_command(cmd, version, req),
            _ => match self.in_progress_polls.take() {
                Some(polls) => {
                    self.pending = Some(self.handle_command(cmd, version, req));
                    self.busy_polls = polls;
                    fail(EcResponseStatus::InProgress)
                }
                None => self.handle_command(cmd, version, req),
            },
        }
    }

    fn flash_range(&self, offset: u32, size: u32) -> Option<std::ops::Range<usize>> {
        let end = offset.checked_add(size)?;
        if end > FLASH_SIZE {
            return None;
        }
        if let Some(fail) = self.fail_flash_at {
            if (offset..end).contains(&fail) {
                return None;
            }
        }
        Some(offset as usize..end as usize)
    }

    fn region(&self, region: u32) -> Option<(u32, u32)> {
        match region {
            0 | 2 => Some((0, RO_SIZE)),
            1 => Some((ACTIVE_OFFSET, ACTIVE_SIZE)),
            _ => None,
        }
    }

    fn vboot_hash(&mut self, p: EcRequestVbootHash) -> Reply {
        match p.cmd {
            EC_VBOOT_HASH_GET => {
                if self.hash.status == EC_VBOOT_HASH_STATUS_BUSY {
                    self.hash_polls_left = self.hash_polls_left.saturating_sub(1);
                    if self.hash_polls_left == 0 {
                        self.hash.status = EC_VBOOT_HASH_STATUS_DONE;
                    }
                }
            }
            EC_VBOOT_HASH_ABORT => self.hash.status = EC_VBOOT_HASH_STATUS_NONE,
            EC_VBOOT_HASH_START => {
                let (start, size) = match { p.offset } {
                    EC_VBOOT_HASH_OFFSET_RO => (0, RO_SIZE),
                    EC_VBOOT_HASH_OFFSET_ACTIVE => (ACTIVE_OFFSET, ACTIVE_SIZE),
                    EC_VBOOT_HASH_OFFSET_UPDATE => {
                        return fail(EcResponseStatus::InvalidParameter)
                    }
                    offset => (offset, { p.size }),
                };
                let Some(range) = self.flash_range(start, size) else {
                    return fail(EcResponseStatus::InvalidParameter);
                };
                let digest = Sha256::digest(&self.flash[range]);
                self.hash.hash_digest = [0; 64];
                self.hash.hash_digest[..32].copy_from_slice(&digest);
                self.hash.digest_size = 32;
                self.hash.offset = p.offset;
                self.hash.size = size;
                self.hash_polls_left = self.hash_busy_polls;
                self.hash.status = if self.hash_busy_polls > 0 {
                    EC_VBOOT_HASH_STATUS_BUSY
                } else {
                    EC_VBOOT_HASH_STATUS_DONE
                };
            }
            _ => return fail(EcResponseStatus::InvalidParameter),
        }
        ok(bytes_of(&self.hash))
    }

    fn i2c_passthrough(&mut self, req: &[u8]) -> Reply {
        let count = req[1] as usize;
        let mut write_data = &req[2 + 4 * count..];
        let mut read_data = vec![];
        for i in 0..count {
            let desc = &req[2 + 4 * i..6 + 4 * i];
            let addr_flags = u16::from_le_bytes([desc[0], desc[1]]);
            let len = u16::from_le_bytes([desc[2], desc[3]]) as usize;
            if len > MAX_I2C_CHUNK {
                return fail(EcResponseStatus::InvalidParameter);
            }
            if addr_flags & 0x3ff != I2C_DEVICE {
                return ok(vec![EC_I2C_STATUS_NAK, 0]);
            }
            if addr_flags & (1 << 15) != 0 {
                for _ in 0..len {
                    read_data.push(self.i2c_mem[self.i2c_pointer as usize]);
                    self.i2c_pointer = self.i2c_pointer.wrapping_add(1);
                }
            } else {
                let (data, rest) = write_data.split_at(len);
                write_data = rest;
                if let Some((pointer, data)) = data.split_first() {
                    self.i2c_pointer = *pointer;
                    for byte in data {
                        self.i2c_mem[self.i2c_pointer as usize] = *byte;
                        self.i2c_pointer = self.i2c_pointer.wrapping_add(1);
                    }
                }
            }
        }
        let mut response = vec![0, count as u8];
        response.extend_from_slice(&read_data);
        ok(response)
    }

    fn handle_command(&mut self, cmd: EcCommands, version: u8, req: &[u8]) -> Reply {
        macro_rules! params {
            ($t:ty) => {
                match util::read_struct::<$t>(req) {
                    Some(p) => p,
                    None => return fail(EcResponseStatus::RequestTruncated),
                }
            };
        }

        match cmd {
            EcCommands::Hello => {
                let p = params!(EcParamsHello);
                let out_data = { p.in_data }.wrapping_add(self.hello_offset);
                ok(bytes_of(&EcResponseHello { out_data }))
            }
            EcCommands::GetVersion => {
                let mut res = EcResponseGetVersion {
                    version_string_ro: [0; 32],
                    version_string_rw: [0; 32],
                    reserved: [0; 32],
                    current_image: self.current_image,
                };
                res.version_string_ro[..VERSION_RO.len()].copy_from_slice(VERSION_RO.as_bytes());
                res.version_string_rw[..VERSION_RW.len()].copy_from_slice(VERSION_RW.as_bytes());
                ok(bytes_of(&res))
            }
            EcCommands::GetBuildInfo => {
                let mut info = BUILD_INFO.as_bytes().to_vec();
                info.push(0);
                ok(info)
            }
            EcCommands::GetFeatures => match self.features {
                Some(features) => ok(bytes_of(&EcResponseGetFeatures {
                    flags: [features as u32, (features >> 32) as u32],
                })),
                None => fail(EcResponseStatus::InvalidCommand),
            },
            EcCommands::GetSkuId => ok(bytes_of(&EcResponseGetSkuId { sku_id: SKU_ID })),

            EcCommands::FlashInfo => ok(bytes_of(&EcResponseFlashInfo {
                flash_size: FLASH_SIZE,
                write_block_size: WRITE_BLOCK,
                erase_block_size: ERASE_BLOCK,
                protect_block_size: ERASE_BLOCK,
            })),
            EcCommands::FlashRegionInfo => {
                if version != 1 {
                    return fail(EcResponseStatus::InvalidVersion);
                }
                let p = params!(EcRequestFlashRegionInfo);
                match self.region(p.region) {
                    Some((offset, size)) => {
                        ok(bytes_of(&EcResponseFlashRegionInfo { offset, size }))
                    }
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::FlashRead => {
                let p = params!(EcRequestFlashRead);
                match self.flash_range(p.offset, p.size) {
                    Some(range) => ok(self.flash[range].to_vec()),
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::FlashWrite => {
                let p = params!(EcRequestFlashWrite);
                let data = &req[std::mem::size_of::<EcRequestFlashWrite>()..];
                if data.len() != p.size as usize {
                    return fail(EcResponseStatus::InvalidParameter);
                }
                if self.protect_flags & EC_FLASH_PROTECT_RO_NOW != 0 && p.offset < RO_SIZE {
                    return fail(EcResponseStatus::AccessDenied);
                }
                match self.flash_range(p.offset, p.size) {
                    Some(range) => {
                        self.flash[range].copy_from_slice(data);
                        ok(vec![])
                    }
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::FlashErase => {
                let p = params!(EcRequestFlashErase);
                if p.offset % ERASE_BLOCK != 0 || p.size % ERASE_BLOCK != 0 {
                    return fail(EcResponseStatus::InvalidParameter);
                }
                match self.flash_range(p.offset, p.size) {
                    Some(range) => {
                        self.flash[range].fill(0xff);
                        ok(vec![])
                    }
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::FlashProtect => {
                let p = params!(EcRequestFlashProtect);
                let writable = EC_FLASH_PROTECT_RO_AT_BOOT | EC_FLASH_PROTECT_RO_NOW;
                let mask = p.mask & writable;
                self.protect_flags = (self.protect_flags & !mask) | (p.flags & mask);
                ok(bytes_of(&EcResponseFlashProtect {
                    flags: self.protect_flags,
                    valid_flags: writable | EC_FLASH_PROTECT_ALL_NOW,
                    writable_flags: writable,
                }))
            }
            EcCommands::VbootHash => {
                let p = params!(EcRequestVbootHash);
                self.vboot_hash(p)
            }
            EcCommands::EfsVerify => {
                if self.efs_supported {
                    ok(vec![])
                } else {
                    fail(EcResponseStatus::InvalidCommand)
                }
            }

            EcCommands::VbnvContext => {
                let p = params!(EcRequestVbnvContext);
                match { p.op } {
                    EC_VBNV_CONTEXT_OP_READ => {}
                    EC_VBNV_CONTEXT_OP_WRITE => self.nvdata = p.block,
                    _ => return fail(EcResponseStatus::InvalidParameter),
                }
                ok(bytes_of(&EcResponseVbnvContext { block: self.nvdata }))
            }

            EcCommands::VstoreInfo => ok(bytes_of(&EcResponseVstoreInfo {
                slot_locked: self.vstore_locked,
                slot_count: VSTORE_SLOTS,
            })),
            EcCommands::VstoreRead => {
                let p = params!(EcRequestVstoreRead);
                match self.vstore.get(p.slot as usize) {
                    Some(data) => ok(data.to_vec()),
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::VstoreWrite => {
                let p = params!(EcRequestVstoreWrite);
                if p.slot >= VSTORE_SLOTS {
                    return fail(EcResponseStatus::InvalidParameter);
                }
                if self.vstore_locked & (1 << p.slot) != 0 {
                    return fail(EcResponseStatus::AccessDenied);
                }
                self.vstore[p.slot as usize] = p.data;
                self.vstore_locked |= 1 << p.slot;
                ok(vec![])
            }

            EcCommands::MkbpState => ok(self.keyboard.to_vec()),
            EcCommands::MkbpInfo => ok(bytes_of(&EcResponseMkbpInfo {
                rows: 8,
                cols: CROS_EC_KEYSCAN_COLS as u32,
                switches: 0,
            })),
            EcCommands::GetNextEvent => match self.mkbp_events.pop_front() {
                Some(mut event) => {
                    if !self.mkbp_events.is_empty() {
                        event[0] |= 0x80;
                    }
                    ok(event)
                }
                None => fail(EcResponseStatus::Unavailable),
            },

            EcCommands::HostEventGetB => ok(bytes_of(&EcResponseHostEventMask {
                mask: self.events,
            })),
            EcCommands::HostEventClear => {
                let p = params!(EcParamsHostEventMask);
                self.events &= !p.mask;
                ok(vec![])
            }
            EcCommands::HostEventGetSmiMask => ok(bytes_of(&EcResponseHostEventMask {
                mask: self.smi_mask,
            })),
            EcCommands::HostEventGetSciMask => ok(bytes_of(&EcResponseHostEventMask {
                mask: self.sci_mask,
            })),
            EcCommands::HostEventGetWakeMask => ok(bytes_of(&EcResponseHostEventMask {
                mask: self.wake_mask,
            })),
            EcCommands::HostEventSetSmiMask => {
                self.smi_mask = params!(EcParamsHostEventMask).mask;
                ok(vec![])
            }
            EcCommands::HostEventSetSciMask => {
                self.sci_mask = params!(EcParamsHostEventMask).mask;
                ok(vec![])
            }
            EcCommands::HostEventSetWakeMask => {
                self.wake_mask = params!(EcParamsHostEventMask).mask;
                ok(vec![])
            }
            EcCommands::HostEvent => {
                let p = params!(EcRequestHostEvent);
                if p.mask_type != HostEventMaskType::B as u8 {
                    return fail(EcResponseStatus::InvalidParameter);
                }
                match p.action {
                    EC_HOST_EVENT_GET => {}
                    EC_HOST_EVENT_SET => self.events_b = p.value,
                    EC_HOST_EVENT_CLEAR => self.events_b &= !p.value,
                    _ => return fail(EcResponseStatus::InvalidParameter),
                }
                ok(bytes_of(&EcResponseHostEvent {
                    value: self.events_b,
                }))
            }

            EcCommands::PwmSetDuty => {
                let p = params!(EcRequestPwmSetDuty);
                self.pwm_duty = Some((p.index, p.duty));
                ok(vec![])
            }
            EcCommands::LdoSet => {
                let p = params!(EcRequestLdoSet);
                match self.ldo.get_mut(p.index as usize) {
                    Some(state) => {
                        *state = p.state;
                        ok(vec![])
                    }
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::LdoGet => {
                let p = params!(EcRequestLdoGet);
                match self.ldo.get(p.index as usize) {
                    Some(state) => ok(vec![*state]),
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::BatteryCutOff => {
                let p = params!(EcRequestBatteryCutoff);
                self.battery_cutoff = Some(p.flags);
                ok(vec![])
            }
            EcCommands::ChargeState => {
                let p = params!(EcRequestChargeState);
                if p.cmd == ChargeStateCommand::GetState as u8 {
                    return ok(bytes_of(&EcResponseChargeStateGetState {
                        ac: 1,
                        chg_voltage: 13200,
                        chg_current: 1500,
                        chg_input_current: 3000,
                        batt_state_of_charge: BATTERY_CHARGE,
                    }));
                }
                if p.cmd != ChargeStateCommand::GetParam as u8
                    || { p.param } != ChargeStateParam::LimitPower as u32
                {
                    return fail(EcResponseStatus::InvalidParameter);
                }
                match self.limit_power {
                    Some(value) => ok(bytes_of(&EcResponseChargeStateGetParam { value })),
                    None => fail(EcResponseStatus::InvalidParameter),
                }
            }
            EcCommands::ConfigPowerButton => {
                let p = params!(EcRequestConfigPowerButton);
                self.powerbtn_flags = Some(p.flags);
                ok(vec![])
            }
            EcCommands::RebootEc => {
                let p = params!(EcRequestRebootEc);
                self.last_reboot = Some((p.cmd, p.flags));
                ok(vec![])
            }
            EcCommands::I2cPassthrough => {
                if req.len() < 2 || req.len() < 2 + 4 * req[1] as usize {
                    return fail(EcResponseStatus::RequestTruncated);
                }
                self.i2c_passthrough(req)
            }
            _ => fail(EcResponseStatus::InvalidCommand),
        }
    }

    /// Check and take apart a request packet
    fn parse_packet(dout: &[u8]) -> Option<(u16, u8, &[u8])> {
        if dout.len() < REQUEST_HEADER_LEN || !checksum_ok(dout) {
            return None;
        }
        let header: EcHostRequest = util::read_struct(dout)?;
        let data_len = header.data_len as usize;
        if header.struct_version != EC_HOST_REQUEST_VERSION
            || REQUEST_HEADER_LEN + data_len != dout.len()
        {
            return None;
        }
        Some((
            header.command,
            header.command_version,
            &dout[REQUEST_HEADER_LEN..],
        ))
    }
}

impl CrosEcTransport for MockEc {
    fn check_version(&mut self) -> EcResult<ProtocolVersion> {
        self.check_version
            .ok_or(EcError::Unsupported("check_version"))
    }

    fn command(
        &mut self,
        command: u8,
        command_version: u8,
        dout: &[u8],
        din: &mut [u8],
    ) -> EcResult<usize> {
        if self.mode == MockMode::PacketOnly {
            return Err(EcError::Unsupported("command"));
        }
        if self.fail_bus {
            return Err(EcError::DeviceError("Bus error".to_string()));
        }
        self.commands += 1;

        let (status, payload) = self.handle(u16::from(command), command_version, dout);
        if status != EcResponseStatus::Success {
            return Err(EcError::Response(status));
        }
        let len = payload.len().min(din.len());
        din[..len].copy_from_slice(&payload[..len]);
        Ok(len)
    }

    fn packet(&mut self, dout: &[u8], din: &mut [u8]) -> EcResult<usize> {
        if self.mode == MockMode::CommandOnly {
            return Err(EcError::Unsupported("packet"));
        }
        if self.fail_bus {
            return Err(EcError::DeviceError("Bus error".to_string()));
        }
        self.packets += 1;
        self.last_packet = dout.to_vec();

        let (status, payload) = match Self::parse_packet(dout) {
            Some((command, version, data)) => self.handle(command, version, data),
            None => fail(EcResponseStatus::InvalidChecksum),
        };
        let mut response = if HEADER_LEN + payload.len() > din.len() {
            build_response(EcResponseStatus::ResponseTooBig as u16, &[])
        } else {
            build_response(status as u16, &payload)
        };
        if let Some(i) = self.corrupt_byte {
            if i < response.len() {
                response[i] ^= 0x01;
            }
        }
        din[..response.len()].copy_from_slice(&response);
        Ok(response.len())
    }

    fn get_switches(&mut self) -> EcResult<u8> {
        self.switches.ok_or(EcError::Unsupported("get_switches"))
    }
}
