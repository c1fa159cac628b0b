//! ABI infrastructure - Alloy-based hashing, encoding and decoding

mod codec;

pub use codec::AlloyCodec;
