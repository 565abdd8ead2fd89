//! Process-level helpers shared by the binary and embedding services.

pub mod bootstrap;
