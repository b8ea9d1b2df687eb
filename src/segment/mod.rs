//! The `segment` module turns payloads of any size into datagram-sized
//! fragments and back.
//!
//! - `chunk`: fixed-size fragments carrying their own index
//! - `compress`: gzip over whole payloads
//! - `assembly`: per-(topic, sequence) buffers that collect fragments until
//!   a payload can be rebuilt

pub mod assembly;
pub mod chunk;
pub mod compress;

pub use assembly::{Assembler, AssemblyBuffer, AssemblyKey};
pub use chunk::{
    CHUNK_SIZE, FRAGMENT_SIZE, INDEX_LEN, chunk, fragment_count, fragment_index, reconstruct,
};
pub use compress::{compress, decompress};

#[cfg(test)]
mod tests;
