//! Subcommand implementations

pub mod datagram;
pub mod decode;
pub mod listen;
pub mod pack;
