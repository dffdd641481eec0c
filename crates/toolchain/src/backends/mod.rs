//! Toolchain backends.

pub mod go;
