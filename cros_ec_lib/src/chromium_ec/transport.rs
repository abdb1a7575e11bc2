//! Interface that a bus driver (I2C, SPI, LPC, ...) implements to carry host commands

use super::{EcError, EcResult, ProtocolVersion};

/// Bus driver for an EC
///
/// A driver implements `command`, `packet` or both. The operations it does
/// not implement keep the default body, which reports
/// [`EcError::Unsupported`] so that the caller can tell "not there" apart
/// from an I/O failure.
pub trait CrosEcTransport {
    /// Check which protocol version the EC speaks.
    ///
    /// Optional. If not provided, HELLO messages are sent to find out.
    fn check_version(&mut self) -> EcResult<ProtocolVersion> {
        Err(EcError::Unsupported("check_version"))
    }

    /// Old-style (protocol version 2) command interface
    ///
    /// The driver adds and strips its own bus framing. `dout` holds the
    /// command parameters, the response parameters go into `din`, which is
    /// sized to the largest response the caller accepts.
    ///
    /// Returns the number of bytes in the response. A non-success EC status
    /// must be reported as [`EcError::Response`].
    fn command(
        &mut self,
        _command: u8,
        _command_version: u8,
        _dout: &[u8],
        _din: &mut [u8],
    ) -> EcResult<usize> {
        Err(EcError::Unsupported("command"))
    }

    /// New-style (protocol version 3) packet interface
    ///
    /// `dout` holds a complete request packet, header and checksum included.
    /// The driver only moves bytes: the raw response packet goes into `din`.
    ///
    /// Returns the number of bytes in the response packet.
    fn packet(&mut self, _dout: &[u8], _din: &mut [u8]) -> EcResult<usize> {
        Err(EcError::Unsupported("packet"))
    }

    /// Current value of the EC switches, see `EC_SWITCH_*`
    fn get_switches(&mut self) -> EcResult<u8> {
        Err(EcError::Unsupported("get_switches"))
    }
}

impl<T: CrosEcTransport + ?Sized> CrosEcTransport for &mut T {
    fn check_version(&mut self) -> EcResult<ProtocolVersion> {
        (**self).check_version()
    }
    fn command(
        &mut self,
        command: u8,
        command_version: u8,
        dout: &[u8],
        din: &mut [u8],
    ) -> EcResult<usize> {
        (**self).command(command, command_version, dout, din)
    }
    fn packet(&mut self, dout: &[u8], din: &mut [u8]) -> EcResult<usize> {
        (**self).packet(dout, din)
    }
    fn get_switches(&mut self) -> EcResult<u8> {
        (**self).get_switches()
    }
}

impl<T: CrosEcTransport + ?Sized> CrosEcTransport for alloc::boxed::Box<T> {
    fn check_version(&mut self) -> EcResult<ProtocolVersion> {
        (**self).check_version()
    }
    fn command(
        &mut self,
        command: u8,
        command_version: u8,
        dout: &[u8],
        din: &mut [u8],
    ) -> EcResult<usize> {
        (**self).command(command, command_version, dout, din)
    }
    fn packet(&mut self, dout: &[u8], din: &mut [u8]) -> EcResult<usize> {
        (**self).packet(dout, din)
    }
    fn get_switches(&mut self) -> EcResult<u8> {
        (**self).get_switches()
    }
}

/// Interrupt line from the EC to the host, usually a GPIO
pub trait InterruptLine {
    /// Whether the EC currently asserts the line. Must not block.
    fn is_asserted(&self) -> bool;
}
