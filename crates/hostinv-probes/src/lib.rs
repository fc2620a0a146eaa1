//! hostinv-probes: built-in probe catalogue
//!
//! Output grammars for the package managers, socket tools, firmware
//! readers and OS identity commands of Linux, macOS and Windows, plus the
//! registry that wires them into probe chains.

mod common;
pub mod firmware;
pub mod ports;
pub mod reference;
pub mod registry;
pub mod software;
pub mod system;

pub use registry::builtin;
