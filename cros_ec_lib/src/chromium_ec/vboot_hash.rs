//! SHA-256 of EC images, calculated by the EC itself
//!
//! Hashing a whole image takes a while, so the EC does it in the background.
//! The host starts it and polls until the status is no longer busy.

use alloc::format;
use alloc::string::ToString;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use super::command::EcRequestRaw;
use super::commands::*;
use super::{CrosEc, CrosEcTransport, EcError, EcResult};
use crate::os_specific;

const SHA256_DIGEST_SIZE: usize = 32;

impl<T: CrosEcTransport> CrosEc<T> {
    fn vboot_hash_command(&mut self, cmd: u8, offset: u32) -> EcResult<EcResponseVbootHash> {
        EcRequestVbootHash {
            cmd,
            hash_type: EC_VBOOT_HASH_TYPE_SHA256,
            nonce_size: 0,
            reserved0: 0,
            offset,
            // EC picks the size of the image
            size: 0,
            nonce_data: [0; 64],
        }
        .send_command(self)
    }

    /// Poll until the EC is done hashing
    fn wait_on_hash_done(
        &mut self,
        mut hash: EcResponseVbootHash,
        start: Instant,
    ) -> EcResult<EcResponseVbootHash> {
        let timeout = Duration::from_millis(self.config.hash_timeout_ms);
        while hash.status == EC_VBOOT_HASH_STATUS_BUSY {
            if start.elapsed() >= timeout {
                debug!("EC still hashing after {:?}", timeout);
                return Err(EcError::Timeout);
            }
            os_specific::sleep(self.config.poll_interval_us);
            hash = self.vboot_hash_command(EC_VBOOT_HASH_GET, 0)?;
        }
        Ok(hash)
    }

    /// Get the hash of an image. `offset` is a flash offset or one of
    /// `EC_VBOOT_HASH_OFFSET_*`.
    ///
    /// The EC keeps the last hash it calculated. If that isn't the one asked
    /// for, a new one is calculated.
    pub fn read_hash(&mut self, offset: u32) -> EcResult<EcResponseVbootHash> {
        let start = Instant::now();
        let hash = self.vboot_hash_command(EC_VBOOT_HASH_GET, 0)?;
        let hash = self.wait_on_hash_done(hash, start)?;

        if hash.status == EC_VBOOT_HASH_STATUS_DONE && { hash.offset } == offset {
            return Ok(hash);
        }

        debug!("Hash of {:#X} not available, recalculating", offset);
        self.vboot_hash_command(EC_VBOOT_HASH_ABORT, 0)?;

        let start = Instant::now();
        let hash = self.vboot_hash_command(EC_VBOOT_HASH_START, offset)?;
        let hash = self.wait_on_hash_done(hash, start)?;
        if hash.status != EC_VBOOT_HASH_STATUS_DONE {
            return Err(EcError::DeviceError(format!(
                "Hash status {} after recalculation",
                hash.status
            )));
        }
        Ok(hash)
    }

    /// Check that the image the EC has at `offset` matches `image`
    pub fn verify_hash(&mut self, offset: u32, image: &[u8]) -> EcResult<bool> {
        let hash = self.read_hash(offset)?;
        if hash.hash_type != EC_VBOOT_HASH_TYPE_SHA256
            || hash.digest_size as usize != SHA256_DIGEST_SIZE
        {
            return Err(EcError::DeviceError(
                "EC returned a hash that isn't SHA-256".to_string(),
            ));
        }

        let expected = Sha256::digest(image);
        let matches = hash.hash_digest[..SHA256_DIGEST_SIZE] == expected[..];
        if !matches {
            warn!(
                "Hash mismatch at {:#X}. EC: {:02X?}, expected: {:02X?}",
                offset,
                &hash.hash_digest[..SHA256_DIGEST_SIZE],
                &expected[..]
            );
        }
        Ok(matches)
    }
}
