//! Host side of the Chromium EC host command protocol
//!
//! [`CrosEc`] owns the bus driver and the message buffers of one EC. Before
//! any command can be sent, [`CrosEc::negotiate`] has to find out which of the
//! two wire framings the EC understands. All commands then go through
//! [`CrosEc::dispatch`].
//!
//! - Protocol version 2: raw parameters, framed by the bus driver ([`CrosEcTransport::command`])
//! - Protocol version 3: checksummed packets built here ([`CrosEcTransport::packet`])

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use std::time::{Duration, Instant};

use log::Level;
use num_derive::FromPrimitive;

use crate::config::CrosEcConfig;
use crate::os_specific;
use crate::util;

pub mod command;
pub mod commands;
pub mod flash;
pub mod host_event;
pub mod i2c_passthrough;
pub mod misc;
#[cfg(test)]
mod mock;
pub mod protocol;
pub mod transport;
pub mod vboot_hash;
pub mod vstore;

pub use transport::{CrosEcTransport, InterruptLine};

use command::EcCommands;
use commands::{EcParamsHello, EcResponseGetCommsStatus, EcResponseHello};
use protocol::*;

/// Value sent with HELLO
pub const EC_HELLO_IN_DATA: u32 = 0x12345678;
/// The EC adds this to the HELLO value
pub const EC_HELLO_MAGIC: u32 = 0x01020304;

/// Command is still being processed, see [`EcResponseGetCommsStatus`]
const EC_COMMS_STATUS_PROCESSING: u32 = 1 << 0;

/// Response codes returned by commands
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcResponseStatus {
    Success = 0,
    InvalidCommand = 1,
    Error = 2,
    InvalidParameter = 3,
    AccessDenied = 4,
    InvalidResponse = 5,
    InvalidVersion = 6,
    InvalidChecksum = 7,
    /// Accepted, command in progress
    InProgress = 8,
    /// No response available
    Unavailable = 9,
    /// We got a timeout
    Timeout = 10,
    /// Table / data overflow
    Overflow = 11,
    /// Header contains invalid data
    InvalidHeader = 12,
    /// Didn't get the entire request
    RequestTruncated = 13,
    /// Response was too big to handle
    ResponseTooBig = 14,
    /// Communications bus error
    BusError = 15,
    /// Up but too busy.  Should retry
    Busy = 16,
    /// Header version invalid
    InvalidHeaderVersion = 17,
    /// Header CRC invalid
    InvalidHeaderCrc = 18,
    /// Data CRC invalid
    InvalidDataCrc = 19,
    /// Can't resend response
    DupUnavailable = 20,
}

#[derive(Debug)]
pub enum EcError {
    /// No protocol version negotiated yet
    NotInitialized,
    /// Couldn't find a protocol version the EC understands
    NegotiationFailed(Box<EcError>),
    /// EC answered HELLO, but with the wrong value
    HandshakeMismatch { expected: u32, received: u32 },
    /// Request doesn't fit into a single message
    RequestTooLarge { len: usize, max: usize },
    /// Asked for a response that can't fit into a single message
    ResponseTooLarge { len: usize, max: usize },
    /// Response failed checksum or header validation
    CorruptResponse(String),
    /// Bus driver or EC lacks this capability
    Unsupported(&'static str),
    /// Address, size or slot outside of what the EC reported
    OutOfRange(String),
    /// VStore slot is write-locked
    Locked(u8),
    /// EC reported an error
    Response(EcResponseStatus),
    /// EC reported a status code we don't know
    UnknownResponseCode(u32),
    /// EC stayed busy for too long
    Timeout,
    /// Multi-chunk flash operation failed part way. Flash may be left partially modified.
    FlashOperation { offset: u32, source: Box<EcError> },
    // TODO: Could be split into different errors
    DeviceError(String),
}

impl fmt::Display for EcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcError::NotInitialized => write!(f, "EC protocol not negotiated yet"),
            EcError::NegotiationFailed(err) => write!(f, "Protocol negotiation failed: {}", err),
            EcError::HandshakeMismatch { expected, received } => write!(
                f,
                "Invalid handshake. Expected {:#X}, received {:#X}",
                expected, received
            ),
            EcError::RequestTooLarge { len, max } => {
                write!(f, "Request of {} bytes too large, max {}", len, max)
            }
            EcError::ResponseTooLarge { len, max } => {
                write!(f, "Response of {} bytes too large, max {}", len, max)
            }
            EcError::CorruptResponse(msg) => write!(f, "Corrupt response: {}", msg),
            EcError::Unsupported(what) => write!(f, "Not supported: {}", what),
            EcError::OutOfRange(msg) => write!(f, "Out of range: {}", msg),
            EcError::Locked(slot) => write!(f, "VStore slot {} is locked", slot),
            EcError::Response(status) => write!(f, "EC responded with {:?}", status),
            EcError::UnknownResponseCode(code) => write!(f, "Unknown EC response code {}", code),
            EcError::Timeout => write!(f, "Timed out waiting for EC"),
            EcError::FlashOperation { offset, source } => {
                write!(f, "Flash operation failed at {:#X}: {}", offset, source)
            }
            EcError::DeviceError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcError::NegotiationFailed(err) => Some(err.as_ref()),
            EcError::FlashOperation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type EcResult<T> = Result<T, EcError>;

/// Wire framing spoken with the EC, selected once by [`CrosEc::negotiate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Protocol version 2, bus driver does the framing
    Command,
    /// Protocol version 3, checksummed packets
    Packet,
}

impl ProtocolVersion {
    /// Version number as used by the EC
    pub fn wire_version(self) -> u8 {
        match self {
            ProtocolVersion::Command => 2,
            ProtocolVersion::Packet => 3,
        }
    }
}

/// 64-bit aligned message buffer
#[repr(C, align(8))]
struct MsgBuffer([u8; MSG_BUFFER_SIZE]);

impl MsgBuffer {
    fn new() -> Box<Self> {
        Box::new(MsgBuffer([0; MSG_BUFFER_SIZE]))
    }
}

/// One Chromium EC, reached through the bus driver `T`
pub struct CrosEc<T: CrosEcTransport> {
    transport: T,
    protocol: Option<ProtocolVersion>,
    din: Box<MsgBuffer>,
    dout: Box<MsgBuffer>,
    ec_int: Option<Box<dyn InterruptLine + Send>>,
    optimise_flash_write: bool,
    config: CrosEcConfig,
    packet_size: usize,
    flash_layout: Option<flash::FlashLayout>,
    vstore_info: Option<vstore::VstoreInfo>,
}

impl<T: CrosEcTransport> CrosEc<T> {
    /// Create the device. No commands can be sent before [`Self::negotiate`].
    pub fn new(transport: T, config: CrosEcConfig) -> Self {
        let packet_size = config.packet_size();
        CrosEc {
            transport,
            protocol: None,
            din: MsgBuffer::new(),
            dout: MsgBuffer::new(),
            ec_int: None,
            optimise_flash_write: config.optimise_flash_write,
            config,
            packet_size,
            flash_layout: None,
            vstore_info: None,
        }
    }

    /// Create the device, negotiate the protocol and check that the EC answers
    pub fn open(transport: T, config: CrosEcConfig) -> EcResult<Self> {
        let mut ec = Self::new(transport, config);
        let protocol = ec.negotiate()?;
        let id = ec.read_id()?;
        info!("Google Chrome EC v{} driver, id '{}'", protocol.wire_version(), id);
        Ok(ec)
    }

    /// Wire up the EC interrupt line
    pub fn with_interrupt(mut self, line: Box<dyn InterruptLine + Send>) -> Self {
        self.ec_int = Some(line);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn config(&self) -> &CrosEcConfig {
        &self.config
    }

    /// Negotiated protocol, `None` before negotiation
    pub fn protocol(&self) -> Option<ProtocolVersion> {
        self.protocol
    }

    pub fn optimise_flash_write(&self) -> bool {
        self.optimise_flash_write
    }

    pub fn set_optimise_flash_write(&mut self, enable: bool) {
        self.optimise_flash_write = enable;
    }

    /// Whether the EC has an interrupt pending.
    ///
    /// Without an interrupt line this is always true, so that callers fall
    /// back to polling.
    pub fn interrupt_pending(&self) -> bool {
        match &self.ec_int {
            None => true,
            Some(line) => line.is_asserted(),
        }
    }

    /// Largest request payload that fits into one message
    pub fn max_request_payload(&self, protocol: ProtocolVersion) -> usize {
        match protocol {
            ProtocolVersion::Command => EC_PROTO2_MAX_PARAM_SIZE,
            ProtocolVersion::Packet => self.packet_size.saturating_sub(REQUEST_HEADER_LEN),
        }
    }

    /// Largest response payload that fits into one message
    pub fn max_response_payload(&self, protocol: ProtocolVersion) -> usize {
        match protocol {
            ProtocolVersion::Command => EC_PROTO2_MAX_PARAM_SIZE,
            ProtocolVersion::Packet => self.packet_size.saturating_sub(HEADER_LEN),
        }
    }

    fn negotiated(&self) -> EcResult<ProtocolVersion> {
        self.protocol.ok_or(EcError::NotInitialized)
    }

    /// Find out which protocol version the EC speaks.
    ///
    /// Asks the bus driver first. If it can't tell, HELLO is sent with
    /// version 3 framing and then with version 2 framing. On failure the
    /// device is left without a protocol and refuses all commands.
    pub fn negotiate(&mut self) -> EcResult<ProtocolVersion> {
        self.protocol = None;
        self.flash_layout = None;
        self.vstore_info = None;

        match self.transport.check_version() {
            Ok(protocol) => {
                debug!(
                    "Bus driver reports protocol version {}",
                    protocol.wire_version()
                );
                self.protocol = Some(protocol);
                return Ok(protocol);
            }
            Err(EcError::Unsupported(_)) => {}
            Err(err) => return Err(EcError::NegotiationFailed(Box::new(err))),
        }

        let mut last_err = EcError::Unsupported("packet");
        for protocol in [ProtocolVersion::Packet, ProtocolVersion::Command] {
            match self.hello_with(protocol) {
                Ok(()) => {
                    debug!("EC speaks protocol version {}", protocol.wire_version());
                    self.protocol = Some(protocol);
                    return Ok(protocol);
                }
                Err(err @ EcError::HandshakeMismatch { .. }) => {
                    warn!("{}", err);
                    return Err(err);
                }
                Err(err) => {
                    debug!(
                        "Protocol version {} not usable: {}",
                        protocol.wire_version(),
                        err
                    );
                    last_err = err;
                }
            }
        }

        error!("EC doesn't understand any protocol version we speak");
        Err(EcError::NegotiationFailed(Box::new(last_err)))
    }

    fn hello_with(&mut self, protocol: ProtocolVersion) -> EcResult<()> {
        let params = EcParamsHello {
            in_data: EC_HELLO_IN_DATA,
        };
        let request: &[u8] = unsafe { util::any_as_u8_slice(&params) };
        let response = self.dispatch_with(
            protocol,
            EcCommands::Hello as u16,
            0,
            request,
            std::mem::size_of::<EcResponseHello>(),
        )?;
        let response: EcResponseHello = util::read_struct(&response).ok_or_else(|| {
            EcError::DeviceError(format!("HELLO response too short: {}", response.len()))
        })?;

        let expected = EC_HELLO_IN_DATA.wrapping_add(EC_HELLO_MAGIC);
        let received = response.out_data;
        if received != expected {
            return Err(EcError::HandshakeMismatch { expected, received });
        }
        Ok(())
    }

    /// Send HELLO with the negotiated protocol and check the answer
    pub fn hello(&mut self) -> EcResult<()> {
        let protocol = self.negotiated()?;
        self.hello_with(protocol)
    }

    /// Check that the EC interface works
    pub fn self_test(&mut self) -> EcResult<()> {
        let res = self.hello();
        if let Err(EcError::HandshakeMismatch { received, .. }) = &res {
            error!("Received invalid handshake {:#X}", received);
        }
        res
    }

    /// Send a command and return the response payload.
    ///
    /// Accepts responses up to the largest one the protocol allows.
    pub fn send_command(
        &mut self,
        command: u16,
        command_version: u8,
        data: &[u8],
    ) -> EcResult<Vec<u8>> {
        let protocol = self.negotiated()?;
        let max_response = self.max_response_payload(protocol);
        self.dispatch_with(protocol, command, command_version, data, max_response)
    }

    /// Send a command and return at most `max_response` bytes of response payload.
    ///
    /// The response is copied out of the device buffers, which are reused by
    /// the next command.
    pub fn dispatch(
        &mut self,
        command: u16,
        command_version: u8,
        data: &[u8],
        max_response: usize,
    ) -> EcResult<Vec<u8>> {
        let protocol = self.negotiated()?;
        self.dispatch_with(protocol, command, command_version, data, max_response)
    }

    fn dispatch_with(
        &mut self,
        protocol: ProtocolVersion,
        command: u16,
        command_version: u8,
        data: &[u8],
        max_response: usize,
    ) -> EcResult<Vec<u8>> {
        if log_enabled!(Level::Trace) {
            trace!(
                "dispatch_v{}(command={:#X}, ver={}, data_len={}, max_response={})",
                protocol.wire_version(),
                command,
                command_version,
                data.len(),
                max_response
            );
            util::trace_multiline_buffer(data, 0);
        }

        let res = match self.transfer(protocol, command, command_version, data, max_response) {
            Err(EcError::Response(EcResponseStatus::InProgress)) => {
                self.wait_for_completion(protocol, command, max_response)
            }
            res => res,
        };

        if log_enabled!(Level::Trace) {
            match &res {
                Ok(response) => {
                    trace!("  Response: {} bytes", response.len());
                    util::trace_multiline_buffer(response, 0);
                }
                Err(err) => trace!("  Failed: {}", err),
            }
        }
        res
    }

    /// The EC accepted the command but hasn't finished it yet.
    /// Poll until it's done, then fetch the response it kept for us.
    fn wait_for_completion(
        &mut self,
        protocol: ProtocolVersion,
        command: u16,
        max_response: usize,
    ) -> EcResult<Vec<u8>> {
        debug!("Command {:#X} in progress, waiting", command);
        let start = Instant::now();
        let timeout = Duration::from_millis(self.config.command_timeout_ms);
        loop {
            os_specific::sleep(self.config.poll_interval_us);
            let response = self.transfer(
                protocol,
                EcCommands::GetCommsStatus as u16,
                0,
                &[],
                std::mem::size_of::<EcResponseGetCommsStatus>(),
            )?;
            let status: EcResponseGetCommsStatus = util::read_struct(&response)
                .ok_or_else(|| EcError::DeviceError("Comms status too short".to_string()))?;
            let flags = status.flags;
            if flags & EC_COMMS_STATUS_PROCESSING == 0 {
                break;
            }
            if start.elapsed() >= timeout {
                debug!("Command {:#X} timeout", command);
                return Err(EcError::Timeout);
            }
        }

        self.transfer(
            protocol,
            EcCommands::ResendResponse as u16,
            0,
            &[],
            max_response,
        )
    }

    /// One request/response exchange with the bus driver
    fn transfer(
        &mut self,
        protocol: ProtocolVersion,
        command: u16,
        command_version: u8,
        data: &[u8],
        max_response: usize,
    ) -> EcResult<Vec<u8>> {
        match protocol {
            ProtocolVersion::Command => {
                self.transfer_command(command, command_version, data, max_response)
            }
            ProtocolVersion::Packet => {
                self.transfer_packet(command, command_version, data, max_response)
            }
        }
    }

    fn transfer_command(
        &mut self,
        command: u16,
        command_version: u8,
        data: &[u8],
        max_response: usize,
    ) -> EcResult<Vec<u8>> {
        let command = u8::try_from(command)
            .map_err(|_| EcError::Unsupported("command number above 0xFF needs protocol v3"))?;
        let max = self.max_request_payload(ProtocolVersion::Command);
        if data.len() > max {
            return Err(EcError::RequestTooLarge {
                len: data.len(),
                max,
            });
        }
        let in_len = max_response.min(self.max_response_payload(ProtocolVersion::Command));

        self.dout.0[..data.len()].copy_from_slice(data);
        let len = self.transport.command(
            command,
            command_version,
            &self.dout.0[..data.len()],
            &mut self.din.0[..in_len],
        )?;

        Ok(self.din.0[..len.min(in_len)].to_vec())
    }

    fn transfer_packet(
        &mut self,
        command: u16,
        command_version: u8,
        data: &[u8],
        max_response: usize,
    ) -> EcResult<Vec<u8>> {
        let max = self.max_request_payload(ProtocolVersion::Packet);
        if data.len() > max {
            return Err(EcError::RequestTooLarge {
                len: data.len(),
                max,
            });
        }
        let max = self.max_response_payload(ProtocolVersion::Packet);
        if max_response > max {
            return Err(EcError::ResponseTooLarge {
                len: max_response,
                max,
            });
        }
        let in_len = HEADER_LEN + max_response;

        let out_len = pack_request(command, command_version, data, &mut self.dout.0);
        if log_enabled!(Level::Trace) {
            trace!("  Request packet: {}", util::format_buffer(&self.dout.0[..out_len]));
        }
        let received = self
            .transport
            .packet(&self.dout.0[..out_len], &mut self.din.0[..in_len])?;

        let payload = unpack_response(&self.din.0[..in_len], received)?;
        Ok(payload.to_vec())
    }
}
