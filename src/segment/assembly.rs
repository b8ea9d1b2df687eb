//! Reassembly of fragment streams
//!
//! Fragments are grouped per `(topic id, sequence id)`. A buffer is created
//! by the first fragment of an unseen key and removed as soon as all of its
//! declared indices have arrived. Incomplete buffers are kept indefinitely.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::chunk::{fragment_index, reconstruct};
use super::compress::decompress;
use crate::utils::{PopsubError, Result};

pub type AssemblyKey = (String, u32);

#[derive(Debug)]
pub struct AssemblyBuffer {
    count: u32,
    compressed: bool,
    fragments: HashMap<u32, Vec<u8>>,
}

impl AssemblyBuffer {
    pub fn new(count: u32, compressed: bool) -> Self {
        Self {
            count,
            compressed,
            fragments: HashMap::new(),
        }
    }

    /// Stores a fragment under its embedded index. A repeated index
    /// overwrites the earlier copy. Returns whether the buffer is complete.
    pub fn insert(&mut self, fragment: Vec<u8>) -> Result<bool> {
        let index = fragment_index(&fragment)?;
        check_index(index, self.count)?;
        self.fragments.insert(index, fragment);
        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.fragments.len() == self.count as usize
    }

    pub fn received(&self) -> usize {
        self.fragments.len()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Concatenates the fragments by index and undoes compression.
    pub fn into_payload(self) -> Result<Vec<u8>> {
        let payload = reconstruct(self.fragments.into_values())?;
        if self.compressed {
            decompress(&payload)
        } else {
            Ok(payload)
        }
    }
}

#[derive(Debug, Default)]
pub struct Assembler {
    pending: HashMap<AssemblyKey, AssemblyBuffer>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one fragment into its buffer. Returns the reconstructed payload
    /// once the buffer holds every index in `0..count`.
    pub fn accept(
        &mut self,
        topic_id: &str,
        sequence: u32,
        count: u32,
        compressed: bool,
        fragment: Vec<u8>,
    ) -> Result<Option<Vec<u8>>> {
        if count == 0 {
            return Err(PopsubError::protocol("fragment declares a count of zero"));
        }

        check_index(fragment_index(&fragment)?, count)?;

        let key = (topic_id.to_string(), sequence);
        let buffer = self
            .pending
            .entry(key.clone())
            .or_insert_with(|| AssemblyBuffer::new(count, compressed));

        if buffer.count() != count {
            warn!(
                "fragment for {topic_id}#{sequence} declares {count} fragments, buffer expects {}",
                buffer.count()
            );
        }

        if !buffer.insert(fragment)? {
            debug!(
                "{topic_id}#{sequence}: {}/{} fragments",
                buffer.received(),
                buffer.count()
            );
            return Ok(None);
        }

        let Some(buffer) = self.pending.remove(&key) else {
            return Ok(None);
        };
        buffer.into_payload().map(Some)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn get(&self, topic_id: &str, sequence: u32) -> Option<&AssemblyBuffer> {
        self.pending.get(&(topic_id.to_string(), sequence))
    }
}

fn check_index(index: u32, count: u32) -> Result<()> {
    if index >= count {
        return Err(PopsubError::protocol(format!(
            "fragment index {index} out of range for {count} fragments"
        )));
    }
    Ok(())
}
