//! WebAssembly bindings for the lib8086 emulator.
//!
//! This module provides JavaScript-callable interfaces to the 8086 CPU emulator,
//! enabling browser-based execution of real-mode machine code.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::Emulator8086;
