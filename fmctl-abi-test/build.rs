//! Build script for ABI compatibility testing
//!
//! Compiles a C transcription of the Fabric Manager SDK structures so the
//! tests can compare the Rust layouts against what a C compiler produces.

use std::env;
use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    generate_reference_c_code(&out_dir);

    println!("cargo:rerun-if-changed=build.rs");
}

fn generate_reference_c_code(out_dir: &Path) {
    let c_code = r#"
#include <stddef.h>

/* Transcribed from nv_fm_types.h / nv_fm_agent.h */
#define FM_MAX_STR_LENGTH 256
#define FM_UUID_BUFFER_SIZE 80
#define FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE 32
#define FM_MAX_NUM_GPUS 16
#define FM_MAX_FABRIC_PARTITIONS 64

#define MAKE_FM_PARAM_VERSION(typeName, ver) \
    (unsigned int)(sizeof(typeName) | ((ver) << 24U))

typedef enum fmReturn_enum {
    FM_ST_SUCCESS = 0,
    FM_ST_BADPARAM = -1,
    FM_ST_GENERIC_ERROR = -2,
    FM_ST_NOT_SUPPORTED = -3,
    FM_ST_UNINITIALIZED = -4,
    FM_ST_TIMEOUT = -5,
    FM_ST_VERSION_MISMATCH = -6,
    FM_ST_IN_USE = -7,
    FM_ST_NOT_CONFIGURED = -8,
    FM_ST_CONNECTION_NOT_VALID = -9,
    FM_ST_NVLINK_ERROR = -10
} fmReturn_t;

typedef struct {
    unsigned int version;
    char addressInfo[FM_MAX_STR_LENGTH];
    unsigned int timeoutMs;
    unsigned int addressIsUnixSocket;
} fmConnectParams_v1;

typedef struct {
    unsigned int physicalId;
    char uuid[FM_UUID_BUFFER_SIZE];
    char pciBusId[FM_DEVICE_PCI_BUS_ID_BUFFER_SIZE];
    unsigned int numNvLinksAvailable;
    unsigned int maxNumNvLinks;
    unsigned int nvlinkLineRateMBps;
} fmFabricPartitionGpuInfo_t;

typedef struct {
    unsigned int partitionId;
    unsigned int isActive;
    unsigned int numGpus;
    fmFabricPartitionGpuInfo_t gpuInfo[FM_MAX_NUM_GPUS];
} fmFabricPartitionInfo_t;

typedef struct {
    unsigned int version;
    unsigned int numPartitions;
    unsigned int maxNumPartitions;
    fmFabricPartitionInfo_t partitionInfo[FM_MAX_FABRIC_PARTITIONS];
} fmFabricPartitionList_t;

size_t connect_params_size(void) { return sizeof(fmConnectParams_v1); }
size_t connect_params_align(void) { return _Alignof(fmConnectParams_v1); }
size_t connect_params_address_offset(void) { return offsetof(fmConnectParams_v1, addressInfo); }
size_t connect_params_timeout_offset(void) { return offsetof(fmConnectParams_v1, timeoutMs); }
size_t connect_params_socket_offset(void) { return offsetof(fmConnectParams_v1, addressIsUnixSocket); }

size_t gpu_info_size(void) { return sizeof(fmFabricPartitionGpuInfo_t); }
size_t gpu_info_align(void) { return _Alignof(fmFabricPartitionGpuInfo_t); }
size_t gpu_info_uuid_offset(void) { return offsetof(fmFabricPartitionGpuInfo_t, uuid); }
size_t gpu_info_pci_bus_id_offset(void) { return offsetof(fmFabricPartitionGpuInfo_t, pciBusId); }
size_t gpu_info_nvlinks_available_offset(void) { return offsetof(fmFabricPartitionGpuInfo_t, numNvLinksAvailable); }
size_t gpu_info_max_nvlinks_offset(void) { return offsetof(fmFabricPartitionGpuInfo_t, maxNumNvLinks); }
size_t gpu_info_line_rate_offset(void) { return offsetof(fmFabricPartitionGpuInfo_t, nvlinkLineRateMBps); }

size_t partition_info_size(void) { return sizeof(fmFabricPartitionInfo_t); }
size_t partition_info_align(void) { return _Alignof(fmFabricPartitionInfo_t); }
size_t partition_info_is_active_offset(void) { return offsetof(fmFabricPartitionInfo_t, isActive); }
size_t partition_info_num_gpus_offset(void) { return offsetof(fmFabricPartitionInfo_t, numGpus); }
size_t partition_info_gpu_info_offset(void) { return offsetof(fmFabricPartitionInfo_t, gpuInfo); }

size_t partition_list_size(void) { return sizeof(fmFabricPartitionList_t); }
size_t partition_list_align(void) { return _Alignof(fmFabricPartitionList_t); }
size_t partition_list_num_offset(void) { return offsetof(fmFabricPartitionList_t, numPartitions); }
size_t partition_list_max_offset(void) { return offsetof(fmFabricPartitionList_t, maxNumPartitions); }
size_t partition_list_info_offset(void) { return offsetof(fmFabricPartitionList_t, partitionInfo); }

unsigned int VERIFY_CONNECT_PARAMS_VERSION = MAKE_FM_PARAM_VERSION(fmConnectParams_v1, 1);
unsigned int VERIFY_PARTITION_LIST_VERSION = MAKE_FM_PARAM_VERSION(fmFabricPartitionList_t, 1);

int VERIFY_RETURN_CODES[11] = {
    FM_ST_SUCCESS, FM_ST_BADPARAM, FM_ST_GENERIC_ERROR, FM_ST_NOT_SUPPORTED,
    FM_ST_UNINITIALIZED, FM_ST_TIMEOUT, FM_ST_VERSION_MISMATCH, FM_ST_IN_USE,
    FM_ST_NOT_CONFIGURED, FM_ST_CONNECTION_NOT_VALID, FM_ST_NVLINK_ERROR
};
size_t return_code_size(void) { return sizeof(fmReturn_t); }
"#;

    let c_file = out_dir.join("fm_reference.c");
    std::fs::write(&c_file, c_code).expect("Failed to write C reference code");

    cc::Build::new()
        .file(&c_file)
        .warnings(false)
        .static_flag(true)
        .compile("fm_reference");
}
