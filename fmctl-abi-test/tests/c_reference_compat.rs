//! C Reference Compatibility Tests
//!
//! Compare Rust structures against the compiled C reference structures

use fmctl_abi_test::c_reference::*;
use fmctl_abi_test::verify_struct_layout;
use fmctl_ffi::{
    FmConnectParamsV1, FmFabricPartitionGpuInfo, FmFabricPartitionInfo, FmFabricPartitionList,
    FmReturn, FM_CONNECT_PARAMS_VERSION, FM_FABRIC_PARTITION_LIST_VERSION,
};

#[test]
fn test_struct_layouts_vs_c() {
    let results = unsafe {
        [
            verify_struct_layout::<FmConnectParamsV1>(
                "fmConnectParams_v1",
                connect_params_size(),
                connect_params_align(),
            ),
            verify_struct_layout::<FmFabricPartitionGpuInfo>(
                "fmFabricPartitionGpuInfo_t",
                gpu_info_size(),
                gpu_info_align(),
            ),
            verify_struct_layout::<FmFabricPartitionInfo>(
                "fmFabricPartitionInfo_t",
                partition_info_size(),
                partition_info_align(),
            ),
            verify_struct_layout::<FmFabricPartitionList>(
                "fmFabricPartitionList_t",
                partition_list_size(),
                partition_list_align(),
            ),
        ]
    };

    for result in &results {
        assert!(result.is_compatible(), "{:?}", result);
    }
}

#[test]
fn test_connect_params_offsets_vs_c() {
    unsafe {
        assert_eq!(
            memoffset::offset_of!(FmConnectParamsV1, address_info),
            connect_params_address_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmConnectParamsV1, timeout_ms),
            connect_params_timeout_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmConnectParamsV1, address_is_unix_socket),
            connect_params_socket_offset()
        );
    }
}

#[test]
fn test_gpu_info_offsets_vs_c() {
    unsafe {
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionGpuInfo, uuid),
            gpu_info_uuid_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionGpuInfo, pci_bus_id),
            gpu_info_pci_bus_id_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionGpuInfo, num_nvlinks_available),
            gpu_info_nvlinks_available_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionGpuInfo, max_num_nvlinks),
            gpu_info_max_nvlinks_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionGpuInfo, nvlink_line_rate_mbps),
            gpu_info_line_rate_offset()
        );
    }
}

#[test]
fn test_partition_info_offsets_vs_c() {
    unsafe {
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionInfo, is_active),
            partition_info_is_active_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionInfo, num_gpus),
            partition_info_num_gpus_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionInfo, gpu_info),
            partition_info_gpu_info_offset()
        );
    }
}

#[test]
fn test_partition_list_offsets_vs_c() {
    unsafe {
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionList, num_partitions),
            partition_list_num_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionList, max_num_partitions),
            partition_list_max_offset()
        );
        assert_eq!(
            memoffset::offset_of!(FmFabricPartitionList, partition_info),
            partition_list_info_offset()
        );
    }
}

#[test]
fn test_version_tags_vs_c() {
    unsafe {
        assert_eq!(FM_CONNECT_PARAMS_VERSION, VERIFY_CONNECT_PARAMS_VERSION);
        assert_eq!(FM_FABRIC_PARTITION_LIST_VERSION, VERIFY_PARTITION_LIST_VERSION);
    }
}

#[test]
fn test_return_codes_vs_c() {
    unsafe {
        assert_eq!(core::mem::size_of::<FmReturn>(), return_code_size());
        for (code, c_value) in FmReturn::ALL.iter().zip(VERIFY_RETURN_CODES.iter()) {
            assert_eq!(code.as_raw(), *c_value, "{} value must match C", code.name());
        }
    }
}
