//! Native SDK entry points.
//!
//! [`FabricManagerApi`] is the raw function table of `libnvfm`. The client
//! layer is generic over it so the same code drives the real library
//! ([`NativeLibrary`]) and the in-memory daemon ([`MockFabricManager`]).

pub mod mock;
pub mod native;

pub use mock::{MockCall, MockFabricManager, MockOp};
pub use native::{NativeLibrary, DEFAULT_LIBRARY_NAMES};

use fmctl_ffi::{
    fmFabricPartitionId_t, fmHandle_t, fmReturn_t, FmConnectParamsV1, FmFabricPartitionList,
};

/// Raw Fabric Manager SDK calls.
///
/// Implementations return the SDK status unchanged; interpreting it is the
/// caller's job. Calls taking a handle are `unsafe`: the caller must pass a
/// handle produced by a successful [`connect`](Self::connect) on the same
/// implementation that has not yet been passed to
/// [`disconnect`](Self::disconnect).
pub trait FabricManagerApi {
    /// `fmLibInit`
    fn lib_init(&self) -> fmReturn_t;

    /// `fmLibShutdown`
    fn lib_shutdown(&self) -> fmReturn_t;

    /// `fmConnect`
    fn connect(&self, params: &mut FmConnectParamsV1, handle: &mut fmHandle_t) -> fmReturn_t;

    /// `fmDisconnect`
    ///
    /// # Safety
    /// `handle` must be live and is dead after this call.
    unsafe fn disconnect(&self, handle: fmHandle_t) -> fmReturn_t;

    /// `fmGetSupportedFabricPartitions`
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn get_supported_fabric_partitions(
        &self,
        handle: fmHandle_t,
        list: &mut FmFabricPartitionList,
    ) -> fmReturn_t;

    /// `fmActivateFabricPartition`
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn activate_fabric_partition(
        &self,
        handle: fmHandle_t,
        partition_id: fmFabricPartitionId_t,
    ) -> fmReturn_t;

    /// `fmDeactivateFabricPartition`
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn deactivate_fabric_partition(
        &self,
        handle: fmHandle_t,
        partition_id: fmFabricPartitionId_t,
    ) -> fmReturn_t;
}
