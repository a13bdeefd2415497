//! Conversion between native SDK structures and safe types.
//!
//! This is the only module that reads or writes the fixed-layout structures
//! from `fmctl-ffi`. Every decode function is pure: it takes a borrowed
//! native value and returns an owned result, keeping no reference into the
//! native memory afterwards.
//!
//! Counts reported by the daemon are never trusted to index the fixed
//! arrays; a count larger than the static capacity is a protocol violation.

use fmctl_ffi::{
    c_char, FmConnectParamsV1, FmFabricPartitionGpuInfo, FmFabricPartitionInfo,
    FmFabricPartitionList, FM_FABRIC_PARTITION_LIST_VERSION, FM_MAX_FABRIC_PARTITIONS,
    FM_MAX_NUM_GPUS,
};

use crate::error::{FabricError, Result};
use crate::types::{ConnectParams, GpuInfo, PartitionInfo};

/// Copy `value` plus a NUL terminator into `buf`, zeroing the remainder.
///
/// Fails without touching `buf` if the value (terminator included) does not
/// fit, or if it contains a NUL byte.
pub fn encode_bounded_string(value: &str, buf: &mut [c_char]) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() + 1 > buf.len() {
        return Err(FabricError::AddressTooLong {
            len: bytes.len(),
            capacity: buf.len(),
        });
    }
    if let Some(offset) = bytes.iter().position(|&b| b == 0) {
        return Err(FabricError::AddressContainsNul(offset));
    }

    let (head, tail) = buf.split_at_mut(bytes.len());
    for (dst, &src) in head.iter_mut().zip(bytes) {
        *dst = src as c_char;
    }
    tail.fill(0);
    Ok(())
}

/// Read a NUL-terminated string out of a fixed buffer.
///
/// A missing terminator means the string fills the whole buffer. An empty
/// or all-zero buffer decodes to an empty string.
pub fn decode_bounded_string(buf: &[c_char]) -> Result<String> {
    let bytes: Vec<u8> = buf
        .iter()
        .map(|&c| c as u8)
        .take_while(|&b| b != 0)
        .collect();
    String::from_utf8(bytes).map_err(|e| {
        FabricError::ProtocolViolation(format!(
            "bounded string is not valid UTF-8 (error at byte {})",
            e.utf8_error().valid_up_to()
        ))
    })
}

/// Build the native connect request.
pub fn encode_connect_params(params: &ConnectParams) -> Result<FmConnectParamsV1> {
    let mut raw = FmConnectParamsV1::new();
    encode_bounded_string(&params.address, &mut raw.address_info)?;
    raw.timeout_ms = params.timeout_ms;
    raw.address_is_unix_socket = u32::from(params.address_is_unix_socket);
    Ok(raw)
}

/// Allocate an empty, versioned partition list for a query.
///
/// The structure is large (see `fmctl-ffi`), so it lives on the heap.
pub fn new_partition_list() -> Box<FmFabricPartitionList> {
    Box::new(FmFabricPartitionList::new())
}

pub fn decode_gpu_info(raw: &FmFabricPartitionGpuInfo) -> Result<GpuInfo> {
    Ok(GpuInfo {
        physical_id: raw.physical_id,
        uuid: decode_bounded_string(&raw.uuid)?,
        pci_bus_id: decode_bounded_string(&raw.pci_bus_id)?,
        num_nvlinks_available: raw.num_nvlinks_available,
        max_num_nvlinks: raw.max_num_nvlinks,
        nvlink_line_rate_mbps: raw.nvlink_line_rate_mbps,
    })
}

pub fn decode_partition_info(raw: &FmFabricPartitionInfo) -> Result<PartitionInfo> {
    let count = raw.num_gpus as usize;
    if count > FM_MAX_NUM_GPUS {
        return Err(FabricError::ProtocolViolation(format!(
            "partition {} declares {} GPUs but the native array holds {}",
            raw.partition_id, count, FM_MAX_NUM_GPUS
        )));
    }

    let gpus = raw.gpu_info[..count]
        .iter()
        .map(decode_gpu_info)
        .collect::<Result<Vec<_>>>()?;

    Ok(PartitionInfo {
        partition_id: raw.partition_id,
        is_active: raw.is_active != 0,
        num_gpus: raw.num_gpus,
        gpus,
    })
}

/// Decode the partitions of a list response, in daemon order.
pub fn decode_partition_list(raw: &FmFabricPartitionList) -> Result<Vec<PartitionInfo>> {
    if raw.version != FM_FABRIC_PARTITION_LIST_VERSION {
        return Err(FabricError::ProtocolViolation(format!(
            "partition list version tag {:#010x} does not match {:#010x}",
            raw.version, FM_FABRIC_PARTITION_LIST_VERSION
        )));
    }

    let count = raw.num_partitions as usize;
    if count > FM_MAX_FABRIC_PARTITIONS {
        return Err(FabricError::ProtocolViolation(format!(
            "daemon declares {} partitions but the native array holds {}",
            count, FM_MAX_FABRIC_PARTITIONS
        )));
    }

    raw.partition_info[..count]
        .iter()
        .map(decode_partition_info)
        .collect()
}

/// Daemon-side encoding of a GPU entry, used by the mock daemon.
pub fn encode_gpu_info(gpu: &GpuInfo) -> Result<FmFabricPartitionGpuInfo> {
    let mut raw = FmFabricPartitionGpuInfo::ZERO;
    raw.physical_id = gpu.physical_id;
    encode_bounded_string(&gpu.uuid, &mut raw.uuid)?;
    encode_bounded_string(&gpu.pci_bus_id, &mut raw.pci_bus_id)?;
    raw.num_nvlinks_available = gpu.num_nvlinks_available;
    raw.max_num_nvlinks = gpu.max_num_nvlinks;
    raw.nvlink_line_rate_mbps = gpu.nvlink_line_rate_mbps;
    Ok(raw)
}

/// Daemon-side encoding of a partition entry, used by the mock daemon.
///
/// `num_gpus` is written from the GPU list, not from the declared count.
pub fn encode_partition_info(partition: &PartitionInfo) -> Result<FmFabricPartitionInfo> {
    if partition.gpus.len() > FM_MAX_NUM_GPUS {
        return Err(FabricError::ProtocolViolation(format!(
            "partition {} has {} GPUs but the native array holds {}",
            partition.partition_id,
            partition.gpus.len(),
            FM_MAX_NUM_GPUS
        )));
    }

    let mut raw = FmFabricPartitionInfo::ZERO;
    raw.partition_id = partition.partition_id;
    raw.is_active = u32::from(partition.is_active);
    raw.num_gpus = partition.gpus.len() as u32;
    for (slot, gpu) in raw.gpu_info.iter_mut().zip(&partition.gpus) {
        *slot = encode_gpu_info(gpu)?;
    }
    Ok(raw)
}
