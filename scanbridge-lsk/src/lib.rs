//! ScanBridge Link-Side Kernel
//!
//! This crate provides stream framing, per-device frame assembly and
//! ordering for raw scanner fragments.

pub mod assembler;
pub mod demultiplex;
pub mod receiver;

pub use assembler::{AssemblyState, CompletedScan, FrameAssembler, PendingAssembly};
pub use demultiplex::{DeviceSlot, DeviceState, DeviceTable, ReorderBuffer};
pub use receiver::{BufferOverflow, FrameDelimiter, StreamBuffer};
