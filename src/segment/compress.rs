//! Whole-payload gzip compression.
//!
//! Producers compress before chunking and consumers decompress after
//! reassembly; individual fragments are never compressed on their own.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::utils::{PopsubError, Result};

pub fn compress(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(payload)
        .map_err(|e| PopsubError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PopsubError::Compression(e.to_string()))
}

pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut payload = Vec::new();
    decoder
        .read_to_end(&mut payload)
        .map_err(|e| PopsubError::Compression(e.to_string()))?;
    Ok(payload)
}
