//! Wire framing of host commands
//!
//! Two framings exist. Protocol version 2 ("command") sends the raw
//! parameters and lets the bus driver add its own header. Protocol version 3
//! ("packet") uses the checksummed [`EcHostRequest`]/[`EcHostResponse`]
//! headers defined here.

use alloc::format;
use log::Level;
use num_traits::FromPrimitive;

use super::{EcError, EcResponseStatus, EcResult};
use crate::util;

/*
 * Value written to legacy command port / prefix byte to indicate protocol
 * 3+ structs are being used.  Usage is bus-dependent.
 */
pub const EC_COMMAND_PROTOCOL_3: u8 = 0xda;

/// Maximum size of parameters (and response) of a protocol version 2 command
pub const EC_PROTO2_MAX_PARAM_SIZE: usize = 0xfc;

/// Max size of version 3 packet
pub const EC_LPC_HOST_PACKET_SIZE: u16 = 0x100;

/// Largest message the driver ever builds, header included
pub const MSG_BYTES: usize = EC_LPC_HOST_PACKET_SIZE as usize;

/// Size of the device buffers. Leaves room for up to 7 bytes of padding so
/// that the message body can be kept 64-bit aligned by bus drivers.
pub const MSG_BUFFER_SIZE: usize = util::align_up(MSG_BYTES + 8, 8);

pub const EC_HOST_REQUEST_VERSION: u8 = 3;

/// Request header of version 3
#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct EcHostRequest {
    /// Version of this request structure (must be 3)
    pub struct_version: u8,

    /// Checksum of entire request (header and data)
    /// Everything added together adds up to 0 (wrapping around u8 limit)
    pub checksum: u8,

    /// Command number
    pub command: u16,

    /// Command version, usually 0
    pub command_version: u8,

    /// Reserved byte in protocol v3. Must be 0
    pub reserved: u8,

    /// Data length. Data is immediately after the header
    pub data_len: u16,
}
pub const REQUEST_HEADER_LEN: usize = std::mem::size_of::<EcHostRequest>();

pub const EC_HOST_RESPONSE_VERSION: u8 = 3;

/// Response header of version 3
#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct EcHostResponse {
    /// Version of this request structure (must be 3)
    pub struct_version: u8,

    /// Checksum of entire request (header and data)
    pub checksum: u8,

    /// Status code of response. See enum _EcStatus
    pub result: u16,

    /// Data length. Data is immediately after the header
    pub data_len: u16,

    /// Reserved byte in protocol v3. Must be 0
    pub reserved: u16,
}
pub const HEADER_LEN: usize = std::mem::size_of::<EcHostResponse>();

fn checksum_fold(numbers: &[u8]) -> u8 {
    numbers.iter().fold(0u8, |acc, x| acc.wrapping_add(*x))
}

/// Checksum that makes the buffer, together with the checksum byte, add up to 0
pub fn checksum_buffer(buffer: &[u8]) -> u8 {
    let cs = checksum_fold(buffer).wrapping_neg();
    if log_enabled!(Level::Trace) {
        trace!("Checksum of {} bytes is: {:#X}", buffer.len(), cs);
    }
    cs
}

/// Whether the bytes (checksum included) add up to 0
pub fn checksum_ok(buffer: &[u8]) -> bool {
    checksum_fold(buffer) == 0
}

/// Frame a request into `buffer`. Returns the number of bytes to send.
///
/// `buffer` must have room for the header and the data, the caller checks
/// that against the negotiated packet size.
pub fn pack_request(command: u16, command_version: u8, data: &[u8], buffer: &mut [u8]) -> usize {
    let total = REQUEST_HEADER_LEN + data.len();
    debug_assert!(total <= buffer.len());

    let request = EcHostRequest {
        struct_version: EC_HOST_REQUEST_VERSION,
        checksum: 0,
        command,
        command_version,
        reserved: 0,
        // Bounded by the packet size
        data_len: data.len() as u16,
    };
    let r_bytes: &[u8] = unsafe { util::any_as_u8_slice(&request) };
    buffer[..REQUEST_HEADER_LEN].copy_from_slice(r_bytes);
    buffer[REQUEST_HEADER_LEN..total].copy_from_slice(data);

    // Checksum byte is still 0, so it doesn't contribute
    buffer[1] = checksum_buffer(&buffer[..total]);

    total
}

/// Validate a version 3 response and return the payload.
///
/// `received` is the number of bytes the bus driver put into `buffer`.
pub fn unpack_response(buffer: &[u8], received: usize) -> EcResult<&[u8]> {
    if received < HEADER_LEN || received > buffer.len() {
        return Err(EcError::CorruptResponse(format!(
            "Response length {} invalid",
            received
        )));
    }
    let header: EcHostResponse = util::read_struct(buffer)
        .ok_or_else(|| EcError::CorruptResponse("Truncated header".to_string()))?;

    let data_len = header.data_len as usize;
    if HEADER_LEN + data_len > received {
        return Err(EcError::CorruptResponse(format!(
            "Data length {} exceeds the {} received bytes",
            data_len, received
        )));
    }
    let packet = &buffer[..HEADER_LEN + data_len];
    if !checksum_ok(packet) {
        return Err(EcError::CorruptResponse(format!(
            "Invalid checksum, bytes add up to {:#X}",
            checksum_fold(packet)
        )));
    }
    if header.struct_version != EC_HOST_RESPONSE_VERSION {
        return Err(EcError::CorruptResponse(format!(
            "Struct version invalid. Should be {:#X}, is {:#X}",
            EC_HOST_RESPONSE_VERSION, header.struct_version
        )));
    }
    if header.reserved != 0 {
        return Err(EcError::CorruptResponse(format!(
            "Reserved invalid. Should be 0, is {:#X}",
            { header.reserved }
        )));
    }

    match FromPrimitive::from_u16(header.result) {
        None => return Err(EcError::UnknownResponseCode(header.result as u32)),
        Some(EcResponseStatus::Success) => {}
        Some(status) => return Err(EcError::Response(status)),
    }

    Ok(&packet[HEADER_LEN..])
}
