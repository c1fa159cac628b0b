//! Decoding of revert data, logs, calldata and return data

mod dispatcher;

pub use dispatcher::DecodeDispatcher;
