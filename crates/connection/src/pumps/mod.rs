//! Per-connection tasks: writer, reader and keepalive.

pub(crate) mod ping;
pub(crate) mod read;
pub(crate) mod write;
