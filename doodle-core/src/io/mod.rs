//! Low-level encoding helpers shared by the chunk codecs and the archive.

pub mod varint;
