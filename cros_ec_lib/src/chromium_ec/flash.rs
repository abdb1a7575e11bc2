//! Chunked access to the EC's own flash
//!
//! Every operation is split into as many host commands as needed to fit the
//! negotiated message size. A failure part way through aborts the operation
//! and is reported as [`EcError::FlashOperation`] with the offset of the
//! chunk that failed. Nothing is rolled back, so the flash may be left
//! partially erased or written.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use num_derive::FromPrimitive;

use super::command::{EcCommands, EcRequestRaw};
use super::commands::*;
use super::{CrosEc, CrosEcTransport, EcError, EcResult};
use crate::util;

/// Flash regions the EC knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum FlashRegion {
    /// Region which holds the read-only EC image
    Ro = 0,
    /// Region which holds the active RW image. Not necessarily the one
    /// currently running.
    Active = 1,
    /// Region which should be write-protected in the factory
    WpRo = 2,
    /// Region which holds the updatable (non-active) RW image
    Update = 3,
}

impl FlashRegion {
    pub const ALL: [FlashRegion; 4] = [
        FlashRegion::Ro,
        FlashRegion::Active,
        FlashRegion::WpRo,
        FlashRegion::Update,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegionInfo {
    pub region: FlashRegion,
    pub offset: u32,
    pub size: u32,
}

impl FlashRegionInfo {
    /// Whether `[offset, offset + size)` lies completely inside this region
    pub fn contains(&self, offset: u32, size: u32) -> bool {
        let start = u64::from(self.offset);
        let end = start + u64::from(self.size);
        let req_start = u64::from(offset);
        req_start >= start && req_start + u64::from(size) <= end
    }
}

/// Flash geometry and region table, as reported by the EC
#[derive(Debug, Clone)]
pub struct FlashLayout {
    pub info: EcResponseFlashInfo,
    /// Regions the EC reported. Regions it refused to describe are left out.
    pub regions: Vec<FlashRegionInfo>,
}

impl FlashLayout {
    pub fn region(&self, region: FlashRegion) -> Option<&FlashRegionInfo> {
        self.regions.iter().find(|r| r.region == region)
    }

    /// First region that fully contains the range
    pub fn region_containing(&self, offset: u32, size: u32) -> Option<&FlashRegionInfo> {
        self.regions.iter().find(|r| r.contains(offset, size))
    }
}

fn flash_err(offset: u32) -> impl FnOnce(EcError) -> EcError {
    move |err| EcError::FlashOperation {
        offset,
        source: Box::new(err),
    }
}

impl<T: CrosEcTransport> CrosEc<T> {
    pub fn flash_info(&mut self) -> EcResult<EcResponseFlashInfo> {
        EcRequestFlashInfo {}.send_command(self)
    }

    /// Look up where a flash region is located
    pub fn flash_offset(&mut self, region: FlashRegion) -> EcResult<FlashRegionInfo> {
        let res = EcRequestFlashRegionInfo {
            region: region as u32,
        }
        .send_command(self)?;
        Ok(FlashRegionInfo {
            region,
            offset: res.offset,
            size: res.size,
        })
    }

    /// Flash geometry and regions. Queried once, then cached until the next negotiation.
    pub fn flash_layout(&mut self) -> EcResult<FlashLayout> {
        if let Some(layout) = &self.flash_layout {
            return Ok(layout.clone());
        }

        let info = self.flash_info()?;
        let mut regions = Vec::with_capacity(FlashRegion::ALL.len());
        for region in FlashRegion::ALL {
            match self.flash_offset(region) {
                Ok(info) => regions.push(info),
                Err(EcError::Response(status)) => {
                    debug!("EC has no flash region {:?}: {:?}", region, status);
                }
                Err(err) => return Err(err),
            }
        }
        debug!(
            "Flash size: {:#X}, write block: {:#X}, erase block: {:#X}, regions: {:X?}",
            { info.flash_size },
            { info.write_block_size },
            { info.erase_block_size },
            regions
        );

        let layout = FlashLayout { info, regions };
        self.flash_layout = Some(layout.clone());
        Ok(layout)
    }

    /// Most bytes a single read command can return
    pub fn flash_read_chunk_size(&self) -> EcResult<usize> {
        let protocol = self.negotiated()?;
        Ok(self.max_response_payload(protocol))
    }

    /// Most bytes a single write command can carry, in whole write blocks
    pub fn flash_write_chunk_size(&mut self) -> EcResult<usize> {
        let protocol = self.negotiated()?;
        let layout = self.flash_layout()?;
        let max = self
            .max_request_payload(protocol)
            .saturating_sub(std::mem::size_of::<EcRequestFlashWrite>());
        let block = layout.info.write_block_size as usize;
        let chunk = if block > 1 { max - max % block } else { max };
        if chunk == 0 {
            return Err(EcError::DeviceError(format!(
                "Write block size {} doesn't fit into a message of {} bytes",
                block, max
            )));
        }
        Ok(chunk)
    }

    /// Check that a range is within one flash region. Doesn't send anything
    /// once the layout is cached.
    fn check_flash_range(&mut self, offset: u32, size: usize) -> EcResult<FlashLayout> {
        let layout = self.flash_layout()?;
        let size32 = u32::try_from(size)
            .map_err(|_| EcError::OutOfRange(format!("Flash size {:#X} too large", size)))?;
        if offset.checked_add(size32).is_none()
            || layout.region_containing(offset, size32).is_none()
        {
            return Err(EcError::OutOfRange(format!(
                "Flash range {:#X}..{:#X} not within a single region",
                offset,
                u64::from(offset) + size as u64
            )));
        }
        Ok(layout)
    }

    /// Erase flash. Offset and size must be multiples of the erase block size.
    pub fn flash_erase(&mut self, offset: u32, size: u32) -> EcResult<()> {
        self.negotiated()?;
        if size == 0 {
            return Ok(());
        }
        let layout = self.check_flash_range(offset, size as usize)?;
        let block = layout.info.erase_block_size;
        if block == 0 {
            return Err(EcError::DeviceError(
                "EC reports no erase block size".to_string(),
            ));
        }
        if offset % block != 0 || size % block != 0 {
            return Err(EcError::OutOfRange(format!(
                "Erase of {:#X} bytes at {:#X} not aligned to erase block size {:#X}",
                size, offset, block
            )));
        }

        debug!("Erasing {:#X} bytes at {:#X}", size, offset);
        for block_offset in (offset..offset + size).step_by(block as usize) {
            EcRequestFlashErase {
                offset: block_offset,
                size: block,
            }
            .send_command(self)
            .map_err(flash_err(block_offset))?;
        }
        Ok(())
    }

    /// Read `buf.len()` bytes of flash starting at `offset`.
    ///
    /// On failure the part of `buf` that wasn't read yet is left as it was.
    pub fn flash_read(&mut self, offset: u32, buf: &mut [u8]) -> EcResult<()> {
        self.negotiated()?;
        if buf.is_empty() {
            return Ok(());
        }
        self.check_flash_range(offset, buf.len())?;
        self.read_chunks(offset, buf)
    }

    fn read_chunks(&mut self, offset: u32, buf: &mut [u8]) -> EcResult<()> {
        let chunk_size = self.flash_read_chunk_size()?;
        for (i, chunk) in buf.chunks_mut(chunk_size).enumerate() {
            // Range already checked to fit into u32
            let chunk_offset = offset + (i * chunk_size) as u32;
            let data = self
                .read_chunk(chunk_offset, chunk.len())
                .map_err(flash_err(chunk_offset))?;
            chunk.copy_from_slice(&data[..chunk.len()]);
        }
        Ok(())
    }

    fn read_chunk(&mut self, offset: u32, len: usize) -> EcResult<Vec<u8>> {
        let params = EcRequestFlashRead {
            offset,
            size: len as u32,
        };
        let data = self.dispatch(
            EcCommands::FlashRead as u16,
            0,
            params.format_request(),
            len,
        )?;
        if data.len() < len {
            return Err(EcError::DeviceError(format!(
                "Short flash read. Requested {} bytes, got {}",
                len,
                data.len()
            )));
        }
        Ok(data)
    }

    /// Write `data` to flash at `offset`. The flash must have been erased before.
    ///
    /// With [`CrosEc::optimise_flash_write`] enabled, chunks that already hold
    /// the right data are read back but not written.
    pub fn flash_write(&mut self, offset: u32, data: &[u8]) -> EcResult<()> {
        self.negotiated()?;
        if data.is_empty() {
            return Ok(());
        }
        self.check_flash_range(offset, data.len())?;
        self.write_chunks(offset, data, None)
    }

    /// Write chunk by chunk. Chunks made up only of `erased` bytes are skipped.
    fn write_chunks(&mut self, offset: u32, data: &[u8], erased: Option<u8>) -> EcResult<()> {
        let chunk_size = self.flash_write_chunk_size()?;
        let optimise = self.optimise_flash_write;
        let mut current = vec![0u8; chunk_size];

        for (i, chunk) in data.chunks(chunk_size).enumerate() {
            let chunk_offset = offset + (i * chunk_size) as u32;

            if let Some(erased) = erased {
                if chunk.iter().all(|b| *b == erased) {
                    trace!("Skipping erased chunk at {:#X}", chunk_offset);
                    continue;
                }
            }

            if optimise {
                let current = &mut current[..chunk.len()];
                self.read_chunks(chunk_offset, current)?;
                if *current == *chunk {
                    debug!("Chunk at {:#X} unchanged, not writing", chunk_offset);
                    continue;
                }
            }

            let params = EcRequestFlashWrite {
                offset: chunk_offset,
                size: chunk.len() as u32,
            };
            if log_enabled!(log::Level::Trace) {
                trace!("Writing {:#X} bytes at {:#X}", chunk.len(), chunk_offset);
                util::trace_multiline_buffer(chunk, chunk_offset as usize);
            }
            params
                .send_command_extra(self, chunk)
                .map_err(flash_err(chunk_offset))?;
        }
        Ok(())
    }

    /// Replace the active RW image.
    ///
    /// Erases the whole region, then writes the image. Chunks that are
    /// entirely erased already are not sent.
    pub fn flash_update_rw(&mut self, image: &[u8]) -> EcResult<()> {
        self.negotiated()?;
        let region = self.flash_offset(FlashRegion::Active)?;
        if image.len() > region.size as usize {
            return Err(EcError::OutOfRange(format!(
                "Image of {:#X} bytes doesn't fit into RW region of {:#X} bytes",
                image.len(),
                region.size
            )));
        }
        info!(
            "Updating RW image at {:#X}, {:#X} bytes",
            region.offset,
            image.len()
        );

        self.flash_erase(region.offset, region.size)?;
        if image.is_empty() {
            return Ok(());
        }
        let erased = self.config.flash_erase_value;
        self.write_chunks(region.offset, image, erased)
    }

    /// Change the flash protection flags. Returns the new state.
    pub fn flash_protect(&mut self, mask: u32, flags: u32) -> EcResult<EcResponseFlashProtect> {
        let res = EcRequestFlashProtect { mask, flags }.send_command(self)?;
        debug!(
            "Flash protect flags: {:#X}, valid: {:#X}, writable: {:#X}",
            { res.flags },
            { res.valid_flags },
            { res.writable_flags }
        );
        Ok(res)
    }
}
