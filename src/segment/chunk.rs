//! Fixed-size chunking
//!
//! Each fragment starts with its own index as a 4-byte big-endian integer,
//! followed by at most `CHUNK_SIZE` bytes of payload. Carrying the index
//! inside the fragment makes reassembly independent of arrival order.

use crate::utils::{PopsubError, Result};

/// Frame budget for one fragment, index prefix included.
pub const FRAGMENT_SIZE: usize = 4096;

pub const INDEX_LEN: usize = 4;

/// Payload bytes carried by one fragment.
pub const CHUNK_SIZE: usize = FRAGMENT_SIZE - INDEX_LEN;

/// Number of fragments `chunk` produces for a payload of `len` bytes.
pub fn fragment_count(len: usize) -> usize {
    len.div_ceil(CHUNK_SIZE)
}

/// Splits `payload` into fragments with indices `0..fragment_count(len)`,
/// in ascending order. An empty payload yields no fragments.
pub fn chunk(payload: &[u8]) -> Vec<Vec<u8>> {
    payload
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(index, piece)| {
            let mut fragment = Vec::with_capacity(INDEX_LEN + piece.len());
            fragment.extend_from_slice(&(index as u32).to_be_bytes());
            fragment.extend_from_slice(piece);
            fragment
        })
        .collect()
}

/// Reads the index embedded at the front of a fragment.
pub fn fragment_index(fragment: &[u8]) -> Result<u32> {
    let prefix: [u8; INDEX_LEN] = fragment
        .get(..INDEX_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            PopsubError::protocol(format!(
                "fragment of {} bytes has no index prefix",
                fragment.len()
            ))
        })?;
    Ok(u32::from_be_bytes(prefix))
}

/// Rebuilds a payload from fragments given in any order.
pub fn reconstruct<I>(fragments: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut indexed = fragments
        .into_iter()
        .map(|fragment| Ok((fragment_index(&fragment)?, fragment)))
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(index, _)| *index);

    let len = indexed.iter().map(|(_, f)| f.len() - INDEX_LEN).sum();
    let mut payload = Vec::with_capacity(len);
    for (_, fragment) in indexed {
        payload.extend_from_slice(&fragment[INDEX_LEN..]);
    }
    Ok(payload)
}
