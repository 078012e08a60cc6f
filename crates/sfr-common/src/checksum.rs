//! Checksum utilities for stored artifacts
//!
//! Every artifact written to content storage carries a SHA-256 checksum in
//! its stored-artifact descriptor so downstream consumers can verify what
//! they fetch.

use sha2::{Digest, Sha256};
use std::io::Read;

/// Compute the SHA-256 checksum of an in-memory byte slice
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 checksum of any readable source
pub fn sha256_hex_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
