//! fmctl - NVIDIA Fabric Manager control client.
//!
//! Safe Rust access to the Fabric Manager SDK (`libnvfm`): list fabric
//! partitions and activate or deactivate them. The raw C ABI lives in the
//! `fmctl-ffi` crate; this crate marshals it into owned types and wraps the
//! session handle so it is released exactly once.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod marshal;
pub mod output;
pub mod sdk;
pub mod types;
pub mod utils;

pub use client::{Capability, Connection, FabricManager};
pub use error::{FabricError, Operation, Result};
pub use fmctl_ffi::FmReturn;
pub use types::{ConnectParams, GpuInfo, PartitionInfo};
