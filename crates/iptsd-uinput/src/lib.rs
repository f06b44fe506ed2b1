#![forbid(unsafe_code)]

//! Kernel-facing [`OutputSink`](iptsd_core::OutputSink) backed by uinput.
//!
//! Capabilities are collected until [`create`](iptsd_core::OutputSink::create)
//! builds the virtual device. Emitted values are batched and written on
//! `sync`; the kernel appends the `SYN_REPORT` marker.
//!
//! Only available on Linux.

#[cfg(target_os = "linux")]
mod device;

#[cfg(target_os = "linux")]
pub use device::UinputSink;
