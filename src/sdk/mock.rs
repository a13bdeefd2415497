//! In-memory fabric manager for tests and offline development.
//!
//! Behaves like a daemon with a fixed set of partitions: it validates
//! version tags and handles, writes responses into the native structures
//! through the marshaling layer, and records every call it receives.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fmctl_ffi::{
    fmFabricPartitionId_t, fmHandle_t, fmReturn_t, FmConnectParamsV1, FmFabricPartitionList,
    FmReturn, FM_CONNECT_PARAMS_VERSION, FM_FABRIC_PARTITION_LIST_VERSION,
    FM_MAX_FABRIC_PARTITIONS,
};

use super::FabricManagerApi;
use crate::marshal;
use crate::types::PartitionInfo;

const HANDLE_BASE: usize = 0x1000;

/// SDK entry points whose status can be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    LibInit,
    Connect,
    Disconnect,
    ListPartitions,
    Activate,
    Deactivate,
}

/// A call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    LibInit,
    LibShutdown,
    Connect {
        address: String,
        timeout_ms: u32,
        unix_socket: bool,
    },
    Disconnect,
    ListPartitions,
    Activate(u32),
    Deactivate(u32),
}

#[derive(Default)]
struct MockState {
    partitions: Vec<PartitionInfo>,
    statuses: HashMap<MockOp, fmReturn_t>,
    declared_partition_count: Option<u32>,
    declared_gpu_counts: HashMap<u32, u32>,
    response_version: Option<u32>,
    null_handle: bool,
    initialized: bool,
    next_handle: usize,
    live_handles: Vec<usize>,
    calls: Vec<MockCall>,
}

impl MockState {
    fn status(&self, op: MockOp) -> fmReturn_t {
        self.statuses
            .get(&op)
            .copied()
            .unwrap_or(FmReturn::Success.as_raw())
    }

    fn is_live(&self, handle: fmHandle_t) -> bool {
        self.live_handles.contains(&(handle as usize))
    }
}

/// Simulated fabric manager daemon.
#[derive(Default)]
pub struct MockFabricManager {
    state: Mutex<MockState>,
}

impl MockFabricManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Daemon that reports `partitions` in this order.
    pub fn with_partitions(partitions: Vec<PartitionInfo>) -> Self {
        let mock = Self::default();
        mock.state().partitions = partitions;
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `op` return `code` from now on.
    pub fn set_status(&self, op: MockOp, code: FmReturn) {
        self.set_raw_status(op, code.as_raw());
    }

    /// Make `op` return an arbitrary raw status, including undefined ones.
    pub fn set_raw_status(&self, op: MockOp, raw: fmReturn_t) {
        self.state().statuses.insert(op, raw);
    }

    /// Report `count` partitions regardless of how many are configured.
    pub fn set_declared_partition_count(&self, count: u32) {
        self.state().declared_partition_count = Some(count);
    }

    /// Report `count` GPUs for `partition_id` regardless of its GPU list.
    pub fn set_declared_gpu_count(&self, partition_id: u32, count: u32) {
        self.state().declared_gpu_counts.insert(partition_id, count);
    }

    /// Overwrite the version tag of partition list responses.
    pub fn set_response_version(&self, version: u32) {
        self.state().response_version = Some(version);
    }

    /// Report success from connect without producing a handle.
    pub fn set_null_handle(&self, null_handle: bool) {
        self.state().null_handle = null_handle;
    }

    /// Current partition state.
    pub fn partitions(&self) -> Vec<PartitionInfo> {
        self.state().partitions.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, call: &MockCall) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    /// Number of handles connected and not yet disconnected.
    pub fn live_connections(&self) -> usize {
        self.state().live_handles.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    fn set_active(&self, handle: fmHandle_t, partition_id: u32, active: bool) -> fmReturn_t {
        let mut state = self.state();
        state.calls.push(if active {
            MockCall::Activate(partition_id)
        } else {
            MockCall::Deactivate(partition_id)
        });

        if !state.is_live(handle) {
            return FmReturn::ConnectionNotValid.as_raw();
        }
        let op = if active {
            MockOp::Activate
        } else {
            MockOp::Deactivate
        };
        let status = state.status(op);
        if status != FmReturn::Success.as_raw() {
            return status;
        }

        match state
            .partitions
            .iter_mut()
            .find(|p| p.partition_id == partition_id)
        {
            Some(partition) => {
                partition.is_active = active;
                FmReturn::Success.as_raw()
            }
            None => FmReturn::BadParam.as_raw(),
        }
    }
}

impl FabricManagerApi for MockFabricManager {
    fn lib_init(&self) -> fmReturn_t {
        let mut state = self.state();
        state.calls.push(MockCall::LibInit);
        let status = state.status(MockOp::LibInit);
        if status == FmReturn::Success.as_raw() {
            state.initialized = true;
        }
        status
    }

    fn lib_shutdown(&self) -> fmReturn_t {
        let mut state = self.state();
        state.calls.push(MockCall::LibShutdown);
        if !state.initialized {
            return FmReturn::Uninitialized.as_raw();
        }
        state.initialized = false;
        FmReturn::Success.as_raw()
    }

    fn connect(&self, params: &mut FmConnectParamsV1, handle: &mut fmHandle_t) -> fmReturn_t {
        let mut state = self.state();
        state.calls.push(MockCall::Connect {
            address: marshal::decode_bounded_string(&params.address_info).unwrap_or_default(),
            timeout_ms: params.timeout_ms,
            unix_socket: params.address_is_unix_socket != 0,
        });

        if !state.initialized {
            return FmReturn::Uninitialized.as_raw();
        }
        if params.version != FM_CONNECT_PARAMS_VERSION {
            return FmReturn::VersionMismatch.as_raw();
        }
        let status = state.status(MockOp::Connect);
        if status != FmReturn::Success.as_raw() {
            return status;
        }

        if state.null_handle {
            *handle = std::ptr::null_mut();
            return FmReturn::Success.as_raw();
        }

        state.next_handle += 1;
        let value = HANDLE_BASE + state.next_handle * 8;
        state.live_handles.push(value);
        *handle = value as fmHandle_t;
        FmReturn::Success.as_raw()
    }

    unsafe fn disconnect(&self, handle: fmHandle_t) -> fmReturn_t {
        let mut state = self.state();
        state.calls.push(MockCall::Disconnect);
        if !state.is_live(handle) {
            return FmReturn::ConnectionNotValid.as_raw();
        }
        state.live_handles.retain(|&h| h != handle as usize);
        state.status(MockOp::Disconnect)
    }

    unsafe fn get_supported_fabric_partitions(
        &self,
        handle: fmHandle_t,
        list: &mut FmFabricPartitionList,
    ) -> fmReturn_t {
        let mut state = self.state();
        state.calls.push(MockCall::ListPartitions);

        if !state.is_live(handle) {
            return FmReturn::ConnectionNotValid.as_raw();
        }
        if list.version != FM_FABRIC_PARTITION_LIST_VERSION {
            return FmReturn::VersionMismatch.as_raw();
        }
        let status = state.status(MockOp::ListPartitions);
        if status != FmReturn::Success.as_raw() {
            return status;
        }
        if state.partitions.len() > FM_MAX_FABRIC_PARTITIONS {
            return FmReturn::GenericError.as_raw();
        }

        for (slot, partition) in list.partition_info.iter_mut().zip(&state.partitions) {
            match marshal::encode_partition_info(partition) {
                Ok(raw) => *slot = raw,
                Err(_) => return FmReturn::GenericError.as_raw(),
            }
            if let Some(&count) = state.declared_gpu_counts.get(&partition.partition_id) {
                slot.num_gpus = count;
            }
        }
        list.num_partitions = state
            .declared_partition_count
            .unwrap_or(state.partitions.len() as u32);
        list.max_num_partitions = FM_MAX_FABRIC_PARTITIONS as u32;
        if let Some(version) = state.response_version {
            list.version = version;
        }
        FmReturn::Success.as_raw()
    }

    unsafe fn activate_fabric_partition(
        &self,
        handle: fmHandle_t,
        partition_id: fmFabricPartitionId_t,
    ) -> fmReturn_t {
        self.set_active(handle, partition_id, true)
    }

    unsafe fn deactivate_fabric_partition(
        &self,
        handle: fmHandle_t,
        partition_id: fmFabricPartitionId_t,
    ) -> fmReturn_t {
        self.set_active(handle, partition_id, false)
    }
}
