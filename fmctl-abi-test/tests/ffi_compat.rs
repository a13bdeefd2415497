//! FFI Layer Compatibility Tests
//!
//! Verify that FFI types, constants and return codes match the SDK header

use fmctl_abi_test::{verify_align, verify_offset, verify_size};
use fmctl_ffi::*;
use static_assertions::*;

// From nv_fm_types.h
const SDK_FM_MAX_STR_LENGTH: usize = 256;
const SDK_FM_UUID_BUFFER_SIZE: usize = 80;
const SDK_FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE: usize = 32;
const SDK_FM_MAX_NUM_GPUS: usize = 16;
const SDK_FM_MAX_FABRIC_PARTITIONS: usize = 64;

#[test]
fn test_buffer_constants() {
    assert_eq!(FM_MAX_STR_LENGTH, SDK_FM_MAX_STR_LENGTH);
    assert_eq!(FM_UUID_BUFFER_SIZE, SDK_FM_UUID_BUFFER_SIZE);
    assert_eq!(
        FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE,
        SDK_FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE
    );
    assert_eq!(FM_MAX_NUM_GPUS, SDK_FM_MAX_NUM_GPUS);
    assert_eq!(FM_MAX_FABRIC_PARTITIONS, SDK_FM_MAX_FABRIC_PARTITIONS);
}

// From nv_fm_types.h enum fmReturn_enum
const SDK_FM_ST_SUCCESS: i32 = 0;
const SDK_FM_ST_BADPARAM: i32 = -1;
const SDK_FM_ST_GENERIC_ERROR: i32 = -2;
const SDK_FM_ST_NOT_SUPPORTED: i32 = -3;
const SDK_FM_ST_UNINITIALIZED: i32 = -4;
const SDK_FM_ST_TIMEOUT: i32 = -5;
const SDK_FM_ST_VERSION_MISMATCH: i32 = -6;
const SDK_FM_ST_IN_USE: i32 = -7;
const SDK_FM_ST_NOT_CONFIGURED: i32 = -8;
const SDK_FM_ST_CONNECTION_NOT_VALID: i32 = -9;
const SDK_FM_ST_NVLINK_ERROR: i32 = -10;

#[test]
fn test_return_code_values() {
    assert_eq!(FmReturn::Success as i32, SDK_FM_ST_SUCCESS);
    assert_eq!(FmReturn::BadParam as i32, SDK_FM_ST_BADPARAM);
    assert_eq!(FmReturn::GenericError as i32, SDK_FM_ST_GENERIC_ERROR);
    assert_eq!(FmReturn::NotSupported as i32, SDK_FM_ST_NOT_SUPPORTED);
    assert_eq!(FmReturn::Uninitialized as i32, SDK_FM_ST_UNINITIALIZED);
    assert_eq!(FmReturn::Timeout as i32, SDK_FM_ST_TIMEOUT);
    assert_eq!(FmReturn::VersionMismatch as i32, SDK_FM_ST_VERSION_MISMATCH);
    assert_eq!(FmReturn::InUse as i32, SDK_FM_ST_IN_USE);
    assert_eq!(FmReturn::NotConfigured as i32, SDK_FM_ST_NOT_CONFIGURED);
    assert_eq!(
        FmReturn::ConnectionNotValid as i32,
        SDK_FM_ST_CONNECTION_NOT_VALID
    );
    assert_eq!(FmReturn::NvlinkError as i32, SDK_FM_ST_NVLINK_ERROR);
}

#[test]
fn test_error_codes_are_negative() {
    for code in FmReturn::ALL.iter().filter(|c| !c.is_success()) {
        assert!(code.as_raw() < 0, "{} must be negative", code.name());
    }
}

#[test]
fn test_version_tag_formula() {
    let (size, version) = split_version(FM_CONNECT_PARAMS_VERSION);
    assert_eq!(size, core::mem::size_of::<FmConnectParamsV1>());
    assert_eq!(version, 1);

    let (size, version) = split_version(FM_FABRIC_PARTITION_LIST_VERSION);
    assert_eq!(size, core::mem::size_of::<FmFabricPartitionList>());
    assert_eq!(version, 1);
}

#[test]
fn test_handle_is_pointer_sized() {
    assert_eq!(
        core::mem::size_of::<fmHandle_t>(),
        core::mem::size_of::<*mut libc::c_void>()
    );
}

// Compile-time assertions
assert_eq_size!(FmReturn, i32);
assert_eq_size!(fmFabricPartitionId_t, u32);
assert_eq_size!(fmHandle_t, usize);

verify_size!(FmConnectParamsV1, 268);
verify_size!(FmFabricPartitionGpuInfo, 128);
verify_size!(FmFabricPartitionInfo, 2060);
verify_size!(FmFabricPartitionList, 131852);

verify_align!(FmConnectParamsV1, 4);
verify_align!(FmFabricPartitionList, 4);

verify_offset!(FmConnectParamsV1, address_info, 4);
verify_offset!(FmConnectParamsV1, timeout_ms, 260);
verify_offset!(FmConnectParamsV1, address_is_unix_socket, 264);
verify_offset!(FmFabricPartitionGpuInfo, uuid, 4);
verify_offset!(FmFabricPartitionGpuInfo, pci_bus_id, 84);
verify_offset!(FmFabricPartitionGpuInfo, num_nvlinks_available, 116);
verify_offset!(FmFabricPartitionInfo, gpu_info, 12);
verify_offset!(FmFabricPartitionList, partition_info, 12);
