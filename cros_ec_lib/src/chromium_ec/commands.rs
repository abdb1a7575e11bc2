//! Parameter and response structs of the host commands
//!
//! All of them are sent as-is over the wire, so they must stay
//! `#[repr(C, packed)]` and match the EC's layout byte for byte.

use num_derive::FromPrimitive;

use super::command::*;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcParamsHello {
    /// Pass anything here
    pub in_data: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseHello {
    /// Output will be in_data + 0x01020304
    pub out_data: u32,
}

impl EcRequest<EcResponseHello> for EcParamsHello {
    fn command_id() -> EcCommands {
        EcCommands::Hello
    }
}

#[repr(C, packed)]
pub struct EcRequestGetVersion {}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseGetVersion {
    /// Null-terminated version of the RO firmware
    pub version_string_ro: [u8; 32],
    /// Null-terminated version of the RW firmware
    pub version_string_rw: [u8; 32],
    /// Used to be the RW-B string
    pub reserved: [u8; 32],
    /// Which EC image is currently in-use. See enum EcCurrentImage
    pub current_image: u32,
}

impl EcRequest<EcResponseGetVersion> for EcRequestGetVersion {
    fn command_id() -> EcCommands {
        EcCommands::GetVersion
    }
}

/// Response is a null-terminated string
#[repr(C, packed)]
pub struct EcRequestGetBuildInfo {}

impl EcRequest<()> for EcRequestGetBuildInfo {
    fn command_id() -> EcCommands {
        EcCommands::GetBuildInfo
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseGetCommsStatus {
    /// Mask of EC_COMMS_STATUS_*
    pub flags: u32,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum EcFeatureCode {
    /// Very limited functionality, e.g. the RO image
    Limited = 0,
    /// Flash commands
    Flash = 1,
    PwmFan = 2,
    PwmKeyboard = 3,
    Lightbar = 4,
    Led = 5,
    MotionSense = 6,
    Keyboard = 7,
    /// Persistent storage
    Pstore = 8,
    Port80 = 9,
    Thermal = 10,
    BacklightSwitch = 11,
    WifiSwitch = 12,
    HostEvents = 13,
    Gpio = 14,
    I2c = 15,
    Charger = 16,
    Battery = 17,
    SmartBattery = 18,
    HangDetect = 19,
    Pmu = 20,
    SubMcu = 21,
    UsbPd = 22,
    UsbMux = 23,
    MotionSenseFifo = 24,
    /// Temporary secure storage, see the vstore commands
    Vstore = 25,
    UsbcSsMuxVirtual = 26,
    Rtc = 27,
    Fingerprint = 28,
    Touchpad = 29,
    Rwsig = 30,
    DeviceEvent = 31,
    UnifiedWakeMasks = 32,
    HostEvent64 = 33,
    ExecInRam = 34,
    Cec = 35,
    MotionSenseTightTimestamps = 36,
    RefinedTabletModeHysteresis = 37,
    /// Early firmware selection, version 2
    Efs2 = 38,
}

#[repr(C, packed)]
pub struct EcRequestGetFeatures {}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseGetFeatures {
    /// Bit N is set if feature N (enum EcFeatureCode) is supported
    pub flags: [u32; 2],
}

impl EcRequest<EcResponseGetFeatures> for EcRequestGetFeatures {
    fn command_id() -> EcCommands {
        EcCommands::GetFeatures
    }
}

#[repr(C, packed)]
pub struct EcRequestGetSkuId {}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseGetSkuId {
    pub sku_id: u32,
}

impl EcRequest<EcResponseGetSkuId> for EcRequestGetSkuId {
    fn command_id() -> EcCommands {
        EcCommands::GetSkuId
    }
}

// --- Flash ---

#[repr(C, packed)]
pub struct EcRequestFlashInfo {}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcResponseFlashInfo {
    /// Usable flash size in bytes
    pub flash_size: u32,
    /// Write block size. Write offset and size must be a multiple of this.
    pub write_block_size: u32,
    /// Erase block size. Erase offset and size must be a multiple of this.
    pub erase_block_size: u32,
    /// Protection block size. Protection offset and size must be a multiple of this.
    pub protect_block_size: u32,
}

impl EcRequest<EcResponseFlashInfo> for EcRequestFlashInfo {
    fn command_id() -> EcCommands {
        EcCommands::FlashInfo
    }
}

/// Response is the flash data
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestFlashRead {
    pub offset: u32,
    pub size: u32,
}

impl EcRequest<()> for EcRequestFlashRead {
    fn command_id() -> EcCommands {
        EcCommands::FlashRead
    }
}

/// Data to write follows the struct
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestFlashWrite {
    pub offset: u32,
    pub size: u32,
}

impl EcRequest<()> for EcRequestFlashWrite {
    fn command_id() -> EcCommands {
        EcCommands::FlashWrite
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestFlashErase {
    pub offset: u32,
    pub size: u32,
}

impl EcRequest<()> for EcRequestFlashErase {
    fn command_id() -> EcCommands {
        EcCommands::FlashErase
    }
}

pub const EC_FLASH_PROTECT_RO_AT_BOOT: u32 = 1 << 0;
pub const EC_FLASH_PROTECT_RO_NOW: u32 = 1 << 1;
pub const EC_FLASH_PROTECT_ALL_NOW: u32 = 1 << 2;
pub const EC_FLASH_PROTECT_GPIO_ASSERTED: u32 = 1 << 3;
pub const EC_FLASH_PROTECT_ERROR_STUCK: u32 = 1 << 4;
pub const EC_FLASH_PROTECT_ERROR_INCONSISTENT: u32 = 1 << 5;
pub const EC_FLASH_PROTECT_ALL_AT_BOOT: u32 = 1 << 6;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestFlashProtect {
    /// Bits in flags to apply
    pub mask: u32,
    /// New flag values
    pub flags: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcResponseFlashProtect {
    /// Current value of flash protect flags
    pub flags: u32,
    /// Flags which are valid on this platform
    pub valid_flags: u32,
    /// Flags which can be changed given the current protection state
    pub writable_flags: u32,
}

impl EcRequest<EcResponseFlashProtect> for EcRequestFlashProtect {
    fn command_id() -> EcCommands {
        EcCommands::FlashProtect
    }
    fn command_version() -> u8 {
        1
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestFlashRegionInfo {
    /// See enum FlashRegion
    pub region: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseFlashRegionInfo {
    pub offset: u32,
    pub size: u32,
}

impl EcRequest<EcResponseFlashRegionInfo> for EcRequestFlashRegionInfo {
    fn command_id() -> EcCommands {
        EcCommands::FlashRegionInfo
    }
    fn command_version() -> u8 {
        1
    }
}

// --- Verified boot ---

pub const EC_VBNV_BLOCK_SIZE: usize = 16;
pub const EC_VBNV_CONTEXT_OP_READ: u32 = 0;
pub const EC_VBNV_CONTEXT_OP_WRITE: u32 = 1;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestVbnvContext {
    pub op: u32,
    pub block: [u8; EC_VBNV_BLOCK_SIZE],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseVbnvContext {
    pub block: [u8; EC_VBNV_BLOCK_SIZE],
}

impl EcRequest<EcResponseVbnvContext> for EcRequestVbnvContext {
    fn command_id() -> EcCommands {
        EcCommands::VbnvContext
    }
    fn command_version() -> u8 {
        1
    }
}

pub const EC_VBOOT_HASH_GET: u8 = 0;
pub const EC_VBOOT_HASH_ABORT: u8 = 1;
pub const EC_VBOOT_HASH_START: u8 = 2;
pub const EC_VBOOT_HASH_RECALC: u8 = 3;

pub const EC_VBOOT_HASH_TYPE_SHA256: u8 = 0;

pub const EC_VBOOT_HASH_STATUS_NONE: u8 = 0;
pub const EC_VBOOT_HASH_STATUS_DONE: u8 = 1;
pub const EC_VBOOT_HASH_STATUS_BUSY: u8 = 2;

/// Special offsets, the EC picks the region
pub const EC_VBOOT_HASH_OFFSET_RO: u32 = 0xfffffffe;
pub const EC_VBOOT_HASH_OFFSET_ACTIVE: u32 = 0xfffffffd;
pub const EC_VBOOT_HASH_OFFSET_UPDATE: u32 = 0xfffffffc;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestVbootHash {
    /// EC_VBOOT_HASH_*
    pub cmd: u8,
    /// EC_VBOOT_HASH_TYPE_*
    pub hash_type: u8,
    /// Nonce size, may be 0
    pub nonce_size: u8,
    pub reserved0: u8,
    /// Offset in flash to hash
    pub offset: u32,
    /// Number of bytes to hash
    pub size: u32,
    pub nonce_data: [u8; 64],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct EcResponseVbootHash {
    /// EC_VBOOT_HASH_STATUS_*
    pub status: u8,
    /// EC_VBOOT_HASH_TYPE_*
    pub hash_type: u8,
    /// Size of hash digest in bytes
    pub digest_size: u8,
    pub reserved0: u8,
    /// Offset in flash which was hashed
    pub offset: u32,
    /// Number of bytes hashed
    pub size: u32,
    pub hash_digest: [u8; 64],
}

impl EcRequest<EcResponseVbootHash> for EcRequestVbootHash {
    fn command_id() -> EcCommands {
        EcCommands::VbootHash
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestEfsVerify {
    /// See enum FlashRegion
    pub region: u8,
}

impl EcRequest<()> for EcRequestEfsVerify {
    fn command_id() -> EcCommands {
        EcCommands::EfsVerify
    }
}

// --- Power ---

pub const EC_PWM_MAX_DUTY: u16 = 0xffff;

#[repr(u8)]
pub enum EcPwmType {
    Generic = 0,
    KeyboardBacklight = 1,
    DisplayBacklight = 2,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestPwmSetDuty {
    /// Duty cycle, EC_PWM_MAX_DUTY = 100%
    pub duty: u16,
    /// See enum EcPwmType
    pub pwm_type: u8,
    /// Type-specific index, or 0 if unique
    pub index: u8,
}

impl EcRequest<()> for EcRequestPwmSetDuty {
    fn command_id() -> EcCommands {
        EcCommands::PwmSetDuty
    }
}

pub const EC_LDO_STATE_OFF: u8 = 0;
pub const EC_LDO_STATE_ON: u8 = 1;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestLdoSet {
    pub index: u8,
    pub state: u8,
}

impl EcRequest<()> for EcRequestLdoSet {
    fn command_id() -> EcCommands {
        EcCommands::LdoSet
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestLdoGet {
    pub index: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseLdoGet {
    pub state: u8,
}

impl EcRequest<EcResponseLdoGet> for EcRequestLdoGet {
    fn command_id() -> EcCommands {
        EcCommands::LdoGet
    }
}

/// Cut off battery power immediately or after the host has shut down
pub const EC_BATTERY_CUTOFF_FLAG_AT_SHUTDOWN: u8 = 1 << 0;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestBatteryCutoff {
    pub flags: u8,
}

impl EcRequest<()> for EcRequestBatteryCutoff {
    fn command_id() -> EcCommands {
        EcCommands::BatteryCutOff
    }
}

#[repr(u8)]
pub enum ChargeStateCommand {
    GetState = 0,
    GetParam = 1,
    SetParam = 2,
}

#[repr(u32)]
pub enum ChargeStateParam {
    ChargeVoltage = 0,
    ChargeCurrent = 1,
    ChargeInputCurrent = 2,
    ChargeStatus = 3,
    ChargeOption = 4,
    /// Whether power draw has to be limited due to a weak battery or charger
    LimitPower = 5,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestChargeState {
    /// See enum ChargeStateCommand
    pub cmd: u8,
    /// See enum ChargeStateParam, ignored for GetState
    pub param: u32,
    /// Only used by SetParam
    pub value: u32,
}

impl EcRequest<()> for EcRequestChargeState {
    fn command_id() -> EcCommands {
        EcCommands::ChargeState
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseChargeStateGetState {
    pub ac: u32,
    pub chg_voltage: u32,
    pub chg_current: u32,
    pub chg_input_current: u32,
    pub batt_state_of_charge: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseChargeStateGetParam {
    pub value: u32,
}

/// Enable a pulse on the power button when the AP boots
pub const EC_POWER_BUTTON_ENABLE_PULSE: u8 = 1 << 0;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestConfigPowerButton {
    /// See EC_POWER_BUTTON_*
    pub flags: u8,
}

impl EcRequest<()> for EcRequestConfigPowerButton {
    fn command_id() -> EcCommands {
        EcCommands::ConfigPowerButton
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootEcCmd {
    /// Cancel a pending reboot
    Cancel = 0,
    /// Jump to RO without rebooting
    JumpRo = 1,
    /// Jump to RW without rebooting
    JumpRw = 2,
    /// Cold-reboot
    Cold = 4,
    /// Disable jump until next reboot
    DisableJump = 5,
    /// Hibernate EC
    Hibernate = 6,
    /// Hibernate EC and clear AP_IDLE flag
    HibernateClearApOff = 7,
    /// Cold-reboot and don't boot AP
    ColdApOff = 8,
}

/// Reboot after the AP shuts down
pub const EC_REBOOT_FLAG_ON_AP_SHUTDOWN: u8 = 1 << 1;
/// Switch the RW slot
pub const EC_REBOOT_FLAG_SWITCH_RW_SLOT: u8 = 1 << 2;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestRebootEc {
    /// See enum RebootEcCmd
    pub cmd: u8,
    /// See EC_REBOOT_FLAG_*
    pub flags: u8,
}

impl EcRequest<()> for EcRequestRebootEc {
    fn command_id() -> EcCommands {
        EcCommands::RebootEc
    }
}

// --- Switches ---

pub const EC_SWITCH_LID_OPEN: u8 = 0x01;
pub const EC_SWITCH_POWER_BUTTON_PRESSED: u8 = 0x02;
pub const EC_SWITCH_WRITE_PROTECT_DISABLED: u8 = 0x04;
/// Recovery requested via dedicated signal (from servo board)
pub const EC_SWITCH_DEDICATED_RECOVERY: u8 = 0x10;

// --- Keyboard ---

/// Number of keyboard columns reported by a key scan
pub const CROS_EC_KEYSCAN_COLS: usize = 13;

#[repr(C, packed)]
pub struct EcRequestMkbpState {}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcResponseMkbpState {
    pub cols: [u8; CROS_EC_KEYSCAN_COLS],
}

impl EcRequest<EcResponseMkbpState> for EcRequestMkbpState {
    fn command_id() -> EcCommands {
        EcCommands::MkbpState
    }
}

#[repr(C, packed)]
pub struct EcRequestMkbpInfo {}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct EcResponseMkbpInfo {
    pub rows: u32,
    pub cols: u32,
    /// Which switches are present
    pub switches: u8,
}

impl EcRequest<EcResponseMkbpInfo> for EcRequestMkbpInfo {
    fn command_id() -> EcCommands {
        EcCommands::MkbpInfo
    }
}

/// Response is the event type and up to 16 bytes of event data
#[repr(C, packed)]
pub struct EcRequestGetNextEvent {}

impl EcRequest<()> for EcRequestGetNextEvent {
    fn command_id() -> EcCommands {
        EcCommands::GetNextEvent
    }
}

// --- Host events ---

pub const EC_HOST_EVENT_LID_CLOSED: u32 = 1;
pub const EC_HOST_EVENT_LID_OPEN: u32 = 2;
pub const EC_HOST_EVENT_POWER_BUTTON: u32 = 3;
pub const EC_HOST_EVENT_AC_CONNECTED: u32 = 4;
pub const EC_HOST_EVENT_AC_DISCONNECTED: u32 = 5;
pub const EC_HOST_EVENT_BATTERY_LOW: u32 = 6;
pub const EC_HOST_EVENT_BATTERY_CRITICAL: u32 = 7;
pub const EC_HOST_EVENT_BATTERY: u32 = 8;
pub const EC_HOST_EVENT_KEYBOARD_RECOVERY: u32 = 14;

/// Bit of a host event in the event masks. Event numbers start at 1.
pub const fn ec_host_event_mask(event: u32) -> u32 {
    1 << (event - 1)
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcParamsHostEventMask {
    pub mask: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseHostEventMask {
    pub mask: u32,
}

pub const EC_HOST_EVENT_GET: u8 = 0;
pub const EC_HOST_EVENT_SET: u8 = 1;
pub const EC_HOST_EVENT_CLEAR: u8 = 2;

#[repr(u8)]
pub enum HostEventMaskType {
    Main = 0,
    B = 1,
    SciMask = 2,
    SmiMask = 3,
    AlwaysReport = 4,
    ActiveWake = 5,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestHostEvent {
    /// EC_HOST_EVENT_GET/SET/CLEAR
    pub action: u8,
    /// See enum HostEventMaskType
    pub mask_type: u8,
    pub reserved: u16,
    /// Value to set or bits to clear
    pub value: u64,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseHostEvent {
    pub value: u64,
}

impl EcRequest<EcResponseHostEvent> for EcRequestHostEvent {
    fn command_id() -> EcCommands {
        EcCommands::HostEvent
    }
}

// --- VStore ---

/// Size of one vstore slot in bytes
pub const EC_VSTORE_SLOT_SIZE: usize = 64;
/// Maximum number of vstore slots
pub const EC_VSTORE_SLOT_MAX: usize = 32;

#[repr(C, packed)]
pub struct EcRequestVstoreInfo {}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseVstoreInfo {
    /// Bit N is set if slot N is locked
    pub slot_locked: u32,
    /// Number of slots the EC implements
    pub slot_count: u8,
}

impl EcRequest<EcResponseVstoreInfo> for EcRequestVstoreInfo {
    fn command_id() -> EcCommands {
        EcCommands::VstoreInfo
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestVstoreRead {
    pub slot: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcResponseVstoreRead {
    pub data: [u8; EC_VSTORE_SLOT_SIZE],
}

impl EcRequest<EcResponseVstoreRead> for EcRequestVstoreRead {
    fn command_id() -> EcCommands {
        EcCommands::VstoreRead
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct EcRequestVstoreWrite {
    pub slot: u8,
    pub data: [u8; EC_VSTORE_SLOT_SIZE],
}

impl EcRequest<()> for EcRequestVstoreWrite {
    fn command_id() -> EcCommands {
        EcCommands::VstoreWrite
    }
}
