//! Access I2C devices behind the EC
use crate::chromium_ec::command::EcCommands;
use crate::chromium_ec::{CrosEc, CrosEcTransport, EcError, EcResult};
use crate::util;
use alloc::format;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use std::mem::size_of;

/// Maximum transfer size for one I2C transaction supported by the chip
pub const MAX_I2C_CHUNK: usize = 128;

#[repr(C, packed)]
pub struct EcParamsI2cPassthruMsg {
    /// Slave address and flags
    addr_and_flags: u16,
    transfer_len: u16,
}

#[repr(C, packed)]
pub struct EcParamsI2cPassthru {
    port: u8,
    /// How many messages
    messages: u8,
    msg: [EcParamsI2cPassthruMsg; 0],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct _EcI2cPassthruResponse {
    i2c_status: u8,
    /// How many messages
    messages: u8,
    data: [u8; 0],
}

/// Indicate that it's a read, not a write
const I2C_READ_FLAG: u16 = 1 << 15;
const I2C_ADDR_MASK: u16 = 0x3ff;

/// Transfer not acknowledged
pub const EC_I2C_STATUS_NAK: u8 = 1 << 0;
/// Timeout during transfer
pub const EC_I2C_STATUS_TIMEOUT: u8 = 1 << 1;

/// One message of an I2C transaction
#[derive(Debug)]
pub enum I2cMsg<'a> {
    Write { addr: u16, data: &'a [u8] },
    /// Reads `buf.len()` bytes
    Read { addr: u16, buf: &'a mut [u8] },
}

impl I2cMsg<'_> {
    fn descriptor(&self) -> EcParamsI2cPassthruMsg {
        match self {
            I2cMsg::Write { addr, data } => EcParamsI2cPassthruMsg {
                addr_and_flags: addr & I2C_ADDR_MASK,
                transfer_len: data.len() as u16,
            },
            I2cMsg::Read { addr, buf } => EcParamsI2cPassthruMsg {
                addr_and_flags: (addr & I2C_ADDR_MASK) | I2C_READ_FLAG,
                transfer_len: buf.len() as u16,
            },
        }
    }

    fn len(&self) -> usize {
        match self {
            I2cMsg::Write { data, .. } => data.len(),
            I2cMsg::Read { buf, .. } => buf.len(),
        }
    }
}

fn check_i2c_status(i2c_status: u8) -> EcResult<()> {
    if i2c_status & EC_I2C_STATUS_NAK > 0 {
        return Err(EcError::DeviceError(
            "I2C Transfer not acknowledged".to_string(),
        ));
    }
    if i2c_status & EC_I2C_STATUS_TIMEOUT > 0 {
        return Err(EcError::DeviceError("I2C Transfer timeout".to_string()));
    }
    if i2c_status != 0 {
        return Err(EcError::DeviceError(format!(
            "I2C Transfer failed with status {:#X}",
            i2c_status
        )));
    }
    Ok(())
}

/// Register address as sent before a read or write. 8 bit if it fits.
fn register_address_bytes(addr: u16) -> Vec<u8> {
    if addr < 0xFF {
        vec![addr as u8]
    } else {
        u16::to_le_bytes(addr).to_vec()
    }
}

impl<T: CrosEcTransport> CrosEc<T> {
    /// Run an I2C transaction on one of the EC's ports.
    ///
    /// All messages are sent in one go, with repeated starts in between. Data
    /// read by the device ends up in the buffers of the read messages.
    pub fn i2c_tunnel(&mut self, port: u8, msgs: &mut [I2cMsg]) -> EcResult<()> {
        if let Some(msg) = msgs.iter().find(|msg| msg.len() > MAX_I2C_CHUNK) {
            return Err(EcError::RequestTooLarge {
                len: msg.len(),
                max: MAX_I2C_CHUNK,
            });
        }
        let messages = u8::try_from(msgs.len()).map_err(|_| {
            EcError::DeviceError(format!("Too many I2C messages: {}", msgs.len()))
        })?;

        let descriptors: Vec<EcParamsI2cPassthruMsg> =
            msgs.iter().map(|msg| msg.descriptor()).collect();
        let msgs_buffer: &[u8] = unsafe { util::any_vec_as_u8_slice(&descriptors) };

        let params = EcParamsI2cPassthru {
            port,
            messages,
            msg: [], // Messages are copied right after this struct
        };
        let params_buffer: &[u8] = unsafe { util::any_as_u8_slice(&params) };

        let write_len: usize = msgs
            .iter()
            .filter_map(|msg| match msg {
                I2cMsg::Write { data, .. } => Some(data.len()),
                I2cMsg::Read { .. } => None,
            })
            .sum();
        let mut buffer: Vec<u8> =
            Vec::with_capacity(params_buffer.len() + msgs_buffer.len() + write_len);
        buffer.extend_from_slice(params_buffer);
        buffer.extend_from_slice(msgs_buffer);
        for msg in msgs.iter() {
            if let I2cMsg::Write { data, .. } = msg {
                buffer.extend_from_slice(data);
            }
        }

        let read_len: usize = msgs
            .iter()
            .filter_map(|msg| match msg {
                I2cMsg::Read { buf, .. } => Some(buf.len()),
                I2cMsg::Write { .. } => None,
            })
            .sum();
        let header_len = size_of::<_EcI2cPassthruResponse>();

        trace!(
            "i2c_tunnel(port: {}, messages: {}, write: {} bytes, read: {} bytes)",
            port,
            messages,
            write_len,
            read_len
        );
        let data = self.dispatch(
            EcCommands::I2cPassthrough as u16,
            0,
            &buffer,
            header_len + read_len,
        )?;
        let res: _EcI2cPassthruResponse = util::read_struct(&data).ok_or_else(|| {
            EcError::DeviceError(format!("I2C response too short: {}", data.len()))
        })?;
        check_i2c_status(res.i2c_status)?;
        if res.messages != messages {
            trace!("EC reports {} of {} messages", res.messages, messages);
        }

        let mut res_data = &data[header_len..];
        if res_data.len() < read_len {
            return Err(EcError::DeviceError(format!(
                "I2C read returned {} bytes, expected {}",
                res_data.len(),
                read_len
            )));
        }
        for msg in msgs.iter_mut() {
            if let I2cMsg::Read { buf, .. } = msg {
                let (chunk, rest) = res_data.split_at(buf.len());
                buf.copy_from_slice(chunk);
                res_data = rest;
            }
        }
        Ok(())
    }

    /// Read `len` bytes from register `addr` of a device
    pub fn i2c_read(
        &mut self,
        i2c_port: u8,
        i2c_addr: u16,
        addr: u16,
        len: u16,
    ) -> EcResult<Vec<u8>> {
        trace!(
            "i2c_read(i2c_port: 0x{:X}, i2c_addr: 0x{:X}, addr: 0x{:X}, len: 0x{:X})",
            i2c_port,
            i2c_addr,
            addr,
            len
        );
        let addr_bytes = register_address_bytes(addr);
        let mut data = vec![0; usize::from(len)];
        self.i2c_tunnel(
            i2c_port,
            &mut [
                I2cMsg::Write {
                    addr: i2c_addr,
                    data: &addr_bytes,
                },
                I2cMsg::Read {
                    addr: i2c_addr,
                    buf: &mut data,
                },
            ],
        )?;
        Ok(data)
    }

    /// Write `data` to register `addr` of a device
    pub fn i2c_write(
        &mut self,
        i2c_port: u8,
        i2c_addr: u16,
        addr: u16,
        data: &[u8],
    ) -> EcResult<()> {
        trace!(
            "  i2c_write(addr: {}, len: {}, data: {:?})",
            addr,
            data.len(),
            data
        );
        let mut buffer = register_address_bytes(addr);
        buffer.extend_from_slice(data);
        self.i2c_tunnel(
            i2c_port,
            &mut [I2cMsg::Write {
                addr: i2c_addr,
                data: &buffer,
            }],
        )
    }
}
