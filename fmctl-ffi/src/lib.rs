//! Native ABI descriptor for the NVIDIA Fabric Manager SDK
//!
//! This crate mirrors the fixed-layout structures, buffer sizes and return
//! codes declared by `nv_fm_agent.h` / `nv_fm_types.h`. It carries no
//! behavior beyond the version tag arithmetic in [`version`]; everything that
//! touches these structures at runtime lives in the `fmctl` marshaling layer.

#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use core::fmt;

#[cfg(not(test))]
use core::ffi::c_void;

#[cfg(test)]
use std::ffi::c_void;

pub use libc::{c_char, c_int, c_uint};

pub mod version;

pub use version::{make_version, split_version, VersionTagError, MAX_STRUCT_SIZE, MAX_VERSION};

/// Opaque session handle returned by `fmConnect` (C `fmHandle_t`).
pub type fmHandle_t = *mut c_void;

/// Raw status returned by every SDK entry point (C `fmReturn_t`).
pub type fmReturn_t = c_int;

/// Partition identifier (C `fmFabricPartitionId_t`).
pub type fmFabricPartitionId_t = c_uint;

/// Capacity of the connect address buffer, terminator included.
pub const FM_MAX_STR_LENGTH: usize = 256;
/// Capacity of a GPU UUID buffer, terminator included.
pub const FM_UUID_BUFFER_SIZE: usize = 80;
/// Capacity of a PCI bus id buffer, terminator included.
pub const FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE: usize = 32;
/// Fixed capacity of the per-partition GPU array.
pub const FM_MAX_NUM_GPUS: usize = 16;
/// Fixed capacity of the partition array in a partition list.
pub const FM_MAX_FABRIC_PARTITIONS: usize = 64;

/// Status codes matching `fmReturn_t` exactly.
///
/// These values are a wire contract with the daemon and must never be
/// renumbered.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FmReturn {
    Success = 0,
    BadParam = -1,
    GenericError = -2,
    NotSupported = -3,
    Uninitialized = -4,
    Timeout = -5,
    VersionMismatch = -6,
    InUse = -7,
    NotConfigured = -8,
    ConnectionNotValid = -9,
    NvlinkError = -10,
}

impl FmReturn {
    /// Every defined status, in declaration order.
    pub const ALL: [FmReturn; 11] = [
        FmReturn::Success,
        FmReturn::BadParam,
        FmReturn::GenericError,
        FmReturn::NotSupported,
        FmReturn::Uninitialized,
        FmReturn::Timeout,
        FmReturn::VersionMismatch,
        FmReturn::InUse,
        FmReturn::NotConfigured,
        FmReturn::ConnectionNotValid,
        FmReturn::NvlinkError,
    ];

    /// Interpret a raw status. Returns `None` for values outside the ABI.
    pub const fn from_raw(raw: fmReturn_t) -> Option<Self> {
        match raw {
            0 => Some(FmReturn::Success),
            -1 => Some(FmReturn::BadParam),
            -2 => Some(FmReturn::GenericError),
            -3 => Some(FmReturn::NotSupported),
            -4 => Some(FmReturn::Uninitialized),
            -5 => Some(FmReturn::Timeout),
            -6 => Some(FmReturn::VersionMismatch),
            -7 => Some(FmReturn::InUse),
            -8 => Some(FmReturn::NotConfigured),
            -9 => Some(FmReturn::ConnectionNotValid),
            -10 => Some(FmReturn::NvlinkError),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> fmReturn_t {
        self as fmReturn_t
    }

    pub const fn is_success(self) -> bool {
        matches!(self, FmReturn::Success)
    }

    /// SDK constant name, e.g. `FM_ST_IN_USE`.
    pub const fn name(self) -> &'static str {
        match self {
            FmReturn::Success => "FM_ST_SUCCESS",
            FmReturn::BadParam => "FM_ST_BADPARAM",
            FmReturn::GenericError => "FM_ST_GENERIC_ERROR",
            FmReturn::NotSupported => "FM_ST_NOT_SUPPORTED",
            FmReturn::Uninitialized => "FM_ST_UNINITIALIZED",
            FmReturn::Timeout => "FM_ST_TIMEOUT",
            FmReturn::VersionMismatch => "FM_ST_VERSION_MISMATCH",
            FmReturn::InUse => "FM_ST_IN_USE",
            FmReturn::NotConfigured => "FM_ST_NOT_CONFIGURED",
            FmReturn::ConnectionNotValid => "FM_ST_CONNECTION_NOT_VALID",
            FmReturn::NvlinkError => "FM_ST_NVLINK_ERROR",
        }
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            FmReturn::Success => "Success",
            FmReturn::BadParam => "Bad parameter",
            FmReturn::GenericError => "Generic error",
            FmReturn::NotSupported => "Not supported",
            FmReturn::Uninitialized => "Uninitialized",
            FmReturn::Timeout => "Timeout",
            FmReturn::VersionMismatch => "Version mismatch",
            FmReturn::InUse => "In use",
            FmReturn::NotConfigured => "Not configured",
            FmReturn::ConnectionNotValid => "Connection not valid",
            FmReturn::NvlinkError => "NVLink error",
        }
    }
}

impl fmt::Display for FmReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// `fmConnectParams_v1`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FmConnectParamsV1 {
    pub version: c_uint,
    pub address_info: [c_char; FM_MAX_STR_LENGTH],
    pub timeout_ms: c_uint,
    pub address_is_unix_socket: c_uint,
}

impl FmConnectParamsV1 {
    /// Zeroed structure with the version tag already filled in.
    pub const fn new() -> Self {
        Self {
            version: FM_CONNECT_PARAMS_VERSION,
            address_info: [0; FM_MAX_STR_LENGTH],
            timeout_ms: 0,
            address_is_unix_socket: 0,
        }
    }
}

impl Default for FmConnectParamsV1 {
    fn default() -> Self {
        Self::new()
    }
}

/// `fmFabricPartitionGpuInfo_t`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FmFabricPartitionGpuInfo {
    pub physical_id: c_uint,
    pub uuid: [c_char; FM_UUID_BUFFER_SIZE],
    pub pci_bus_id: [c_char; FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE],
    pub num_nvlinks_available: c_uint,
    pub max_num_nvlinks: c_uint,
    pub nvlink_line_rate_mbps: c_uint,
}

impl FmFabricPartitionGpuInfo {
    pub const ZERO: Self = Self {
        physical_id: 0,
        uuid: [0; FM_UUID_BUFFER_SIZE],
        pci_bus_id: [0; FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE],
        num_nvlinks_available: 0,
        max_num_nvlinks: 0,
        nvlink_line_rate_mbps: 0,
    };
}

/// `fmFabricPartitionInfo_t`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FmFabricPartitionInfo {
    pub partition_id: fmFabricPartitionId_t,
    pub is_active: c_uint,
    pub num_gpus: c_uint,
    pub gpu_info: [FmFabricPartitionGpuInfo; FM_MAX_NUM_GPUS],
}

impl FmFabricPartitionInfo {
    pub const ZERO: Self = Self {
        partition_id: 0,
        is_active: 0,
        num_gpus: 0,
        gpu_info: [FmFabricPartitionGpuInfo::ZERO; FM_MAX_NUM_GPUS],
    };
}

/// `fmFabricPartitionList_t`
///
/// Only the first `num_partitions` entries of `partition_info` are written
/// by the daemon.
#[repr(C)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmFabricPartitionList {
    pub version: c_uint,
    pub num_partitions: c_uint,
    pub max_num_partitions: c_uint,
    pub partition_info: [FmFabricPartitionInfo; FM_MAX_FABRIC_PARTITIONS],
}

impl FmFabricPartitionList {
    /// Zeroed structure with the version tag already filled in.
    pub const fn new() -> Self {
        Self {
            version: FM_FABRIC_PARTITION_LIST_VERSION,
            num_partitions: 0,
            max_num_partitions: 0,
            partition_info: [FmFabricPartitionInfo::ZERO; FM_MAX_FABRIC_PARTITIONS],
        }
    }
}

impl Default for FmFabricPartitionList {
    fn default() -> Self {
        Self::new()
    }
}

const fn tag(size: usize, version: u32) -> u32 {
    match make_version(size, version) {
        Ok(tag) => tag,
        Err(_) => panic!("structure version tag does not fit the 32-bit encoding"),
    }
}

/// `fmConnectParams_version`
pub const FM_CONNECT_PARAMS_VERSION: u32 = tag(core::mem::size_of::<FmConnectParamsV1>(), 1);

/// `fmFabricPartitionList_version`
pub const FM_FABRIC_PARTITION_LIST_VERSION: u32 =
    tag(core::mem::size_of::<FmFabricPartitionList>(), 1);

static_assertions::assert_eq_size!(FmConnectParamsV1, [u8; 268]);
static_assertions::assert_eq_size!(FmFabricPartitionGpuInfo, [u8; 128]);
static_assertions::assert_eq_size!(FmFabricPartitionInfo, [u8; 2060]);
static_assertions::assert_eq_size!(FmFabricPartitionList, [u8; 131852]);
static_assertions::assert_eq_size!(FmReturn, fmReturn_t);
