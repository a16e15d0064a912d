/*
 * SHA256 helpers for rendered content. The checksum of a rendered page is
 * handed to the web layer as an entity tag, so identical output must always
 * hash to the same hex string.
 */
use sha2::{Digest, Sha256};

pub fn calculate_sha256_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hex_checksum = format!("{:x}", hasher.finalize());
    log::trace!(
        "ChecksumUtils: Calculated checksum {hex_checksum} for {} bytes",
        content.len()
    );
    hex_checksum
}
