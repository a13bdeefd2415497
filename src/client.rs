//! Safe fabric manager client.
//!
//! ```text
//! Capability::probe ──> FabricManager (library initialized)
//!                            │ connect
//!                            v
//!                       Connection<'_> ── list / activate / deactivate
//!                            │ disconnect (or drop)
//!                            v
//!                       FabricManager ── shutdown (or drop)
//! ```
//!
//! A [`Connection`] borrows its [`FabricManager`], so the library cannot be
//! shut down while a handle is live. `disconnect` consumes the connection,
//! and dropping an undisconnected connection releases it; the native
//! disconnect therefore runs exactly once on every path.

use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::path::Path;
use std::ptr::{self, NonNull};

use tracing::{debug, info, warn};

use fmctl_ffi::fmHandle_t;

use crate::error::{FabricError, Operation, Result};
use crate::marshal;
use crate::sdk::{FabricManagerApi, NativeLibrary};
use crate::types::{ConnectParams, PartitionInfo};

/// Outcome of bringing up the native SDK.
pub enum Capability<A: FabricManagerApi = NativeLibrary> {
    /// Library loaded and `fmLibInit` succeeded.
    Available(FabricManager<A>),
    /// Library could not be loaded; only informational commands can run.
    Unavailable(FabricError),
    /// Library loaded but `fmLibInit` failed, or another instance of the
    /// library is already live in this process.
    InitFailed(FabricError),
}

impl Capability<NativeLibrary> {
    /// Load `libnvfm` (from `path` if given) and initialize it.
    pub fn probe(path: Option<&Path>) -> Self {
        let loaded = NativeLibrary::open(path).inspect(|library| {
            debug!(path = %library.path(), "Initializing fabric manager library");
        });
        Self::from_loaded(loaded)
    }
}

impl<A: FabricManagerApi> Capability<A> {
    /// Classify the outcome of loading a backend, initializing it if loaded.
    pub fn from_loaded(loaded: Result<A>) -> Self {
        match loaded {
            Ok(api) => Self::from_api(api),
            Err(e @ FabricError::AlreadyInitialized) => {
                warn!(error = %e, "Fabric manager library already live in this process");
                Capability::InitFailed(e)
            }
            Err(e) => {
                warn!(error = %e, "Fabric manager library unavailable, continuing degraded");
                Capability::Unavailable(e)
            }
        }
    }

    /// Initialize an already-loaded SDK backend.
    pub fn from_api(api: A) -> Self {
        match FabricManager::initialize(api) {
            Ok(manager) => Capability::Available(manager),
            Err(e) => {
                warn!(error = %e, "Fabric manager library initialization failed");
                Capability::InitFailed(e)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Capability::Available(_) => "available",
            Capability::Unavailable(_) => "unavailable",
            Capability::InitFailed(_) => "initialization failed",
        }
    }

    /// The initialized manager, or the reason there is none.
    pub fn into_manager(self) -> Result<FabricManager<A>> {
        match self {
            Capability::Available(manager) => Ok(manager),
            Capability::Unavailable(e) | Capability::InitFailed(e) => Err(e),
        }
    }
}

/// An initialized SDK. Shuts the library down when dropped.
pub struct FabricManager<A: FabricManagerApi = NativeLibrary> {
    api: A,
    shut_down: bool,
}

impl<A: FabricManagerApi> FabricManager<A> {
    /// Run `fmLibInit` on `api`.
    pub fn initialize(api: A) -> Result<Self> {
        FabricError::check(|| Operation::LibInit, api.lib_init())?;
        debug!("Fabric manager library initialized");
        Ok(Self {
            api,
            shut_down: false,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Open a session with the daemon.
    ///
    /// The address is encoded before any native call, so an oversized
    /// address fails locally with [`FabricError::AddressTooLong`].
    pub fn connect(&self, params: &ConnectParams) -> Result<Connection<'_, A>> {
        let mut raw = marshal::encode_connect_params(params)?;
        let mut handle: fmHandle_t = ptr::null_mut();

        debug!(
            address = %params.address,
            timeout_ms = params.timeout_ms,
            unix_socket = params.address_is_unix_socket,
            "Connecting to fabric manager"
        );
        let status = self.api.connect(&mut raw, &mut handle);
        FabricError::check(
            || Operation::Connect {
                address: params.address.clone(),
            },
            status,
        )?;

        let handle = NonNull::new(handle).ok_or_else(|| {
            FabricError::ProtocolViolation("connect reported success without a handle".to_string())
        })?;

        info!(address = %params.address, "Connected to fabric manager");
        Ok(Connection {
            api: &self.api,
            handle,
        })
    }

    /// Run `fmLibShutdown` now instead of on drop.
    pub fn shutdown(mut self) -> Result<()> {
        self.shut_down = true;
        FabricError::check(|| Operation::LibShutdown, self.api.lib_shutdown())
    }
}

impl<A: FabricManagerApi> Drop for FabricManager<A> {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(e) = FabricError::check(|| Operation::LibShutdown, self.api.lib_shutdown()) {
            warn!(error = %e, "Fabric manager library shutdown failed");
        }
    }
}

/// A live daemon session.
///
/// Not `Send` or `Sync`: the daemon serves one outstanding request per
/// connection, so a handle stays on the thread that opened it.
///
/// ```
/// use fmctl::sdk::MockFabricManager;
/// use fmctl::{ConnectParams, FabricManager};
///
/// let manager = FabricManager::initialize(MockFabricManager::new()).unwrap();
/// let conn = manager.connect(&ConnectParams::default()).unwrap();
/// assert!(conn.list_partitions().unwrap().is_empty());
/// conn.disconnect().unwrap();
/// manager.shutdown().unwrap();
/// ```
///
/// A connection is consumed by `disconnect`, so it cannot be disconnected
/// twice:
///
/// ```compile_fail,E0382
/// use fmctl::sdk::MockFabricManager;
/// use fmctl::{ConnectParams, FabricManager};
///
/// let manager = FabricManager::initialize(MockFabricManager::new()).unwrap();
/// let conn = manager.connect(&ConnectParams::default()).unwrap();
/// conn.disconnect().unwrap();
/// conn.disconnect().unwrap();
/// ```
///
/// or used after disconnecting:
///
/// ```compile_fail,E0382
/// use fmctl::sdk::MockFabricManager;
/// use fmctl::{ConnectParams, FabricManager};
///
/// let manager = FabricManager::initialize(MockFabricManager::new()).unwrap();
/// let conn = manager.connect(&ConnectParams::default()).unwrap();
/// conn.disconnect().unwrap();
/// let _ = conn.list_partitions();
/// ```
///
/// It cannot outlive a library shutdown:
///
/// ```compile_fail,E0505
/// use fmctl::sdk::MockFabricManager;
/// use fmctl::{ConnectParams, FabricManager};
///
/// let manager = FabricManager::initialize(MockFabricManager::new()).unwrap();
/// let conn = manager.connect(&ConnectParams::default()).unwrap();
/// manager.shutdown().unwrap();
/// let _ = conn.list_partitions();
/// ```
///
/// And it cannot move to another thread:
///
/// ```compile_fail,E0277
/// use fmctl::sdk::MockFabricManager;
/// use fmctl::{ConnectParams, FabricManager};
///
/// fn assert_send<T: Send>(_: &T) {}
///
/// let manager = FabricManager::initialize(MockFabricManager::new()).unwrap();
/// let conn = manager.connect(&ConnectParams::default()).unwrap();
/// assert_send(&conn);
/// ```
pub struct Connection<'a, A: FabricManagerApi> {
    api: &'a A,
    handle: NonNull<c_void>,
}

impl<'a, A: FabricManagerApi> Connection<'a, A> {
    fn raw_handle(&self) -> fmHandle_t {
        self.handle.as_ptr()
    }

    /// All partitions, in the order the daemon reports them.
    pub fn list_partitions(&self) -> Result<Vec<PartitionInfo>> {
        let mut raw = marshal::new_partition_list();
        // SAFETY: the handle is live for as long as `self` exists.
        let status = unsafe {
            self.api
                .get_supported_fabric_partitions(self.raw_handle(), &mut *raw)
        };
        FabricError::check(|| Operation::ListPartitions, status)?;

        let partitions = marshal::decode_partition_list(&raw)?;
        debug!(
            count = partitions.len(),
            max_partitions = raw.max_num_partitions,
            "Received fabric partitions"
        );
        Ok(partitions)
    }

    /// A single partition by id.
    pub fn partition(&self, partition_id: u32) -> Result<PartitionInfo> {
        self.list_partitions()?
            .into_iter()
            .find(|p| p.partition_id == partition_id)
            .ok_or(FabricError::PartitionNotFound(partition_id))
    }

    /// Activate a partition. A failure, including a transient `In use`, is
    /// returned as is and never retried.
    pub fn activate(&self, partition_id: u32) -> Result<()> {
        debug!(partition_id, "Activating fabric partition");
        // SAFETY: the handle is live for as long as `self` exists.
        let status = unsafe {
            self.api
                .activate_fabric_partition(self.raw_handle(), partition_id)
        };
        FabricError::check(|| Operation::Activate(partition_id), status)?;
        info!(partition_id, "Activated fabric partition");
        Ok(())
    }

    /// Deactivate a partition. Failures are never retried.
    pub fn deactivate(&self, partition_id: u32) -> Result<()> {
        debug!(partition_id, "Deactivating fabric partition");
        // SAFETY: the handle is live for as long as `self` exists.
        let status = unsafe {
            self.api
                .deactivate_fabric_partition(self.raw_handle(), partition_id)
        };
        FabricError::check(|| Operation::Deactivate(partition_id), status)?;
        info!(partition_id, "Deactivated fabric partition");
        Ok(())
    }

    /// Close the session, reporting the daemon's status.
    pub fn disconnect(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        this.release()
    }

    fn release(&self) -> Result<()> {
        // SAFETY: called once, from `disconnect` or `drop`, never both.
        let status = unsafe { self.api.disconnect(self.raw_handle()) };
        debug!(status, "Disconnected from fabric manager");
        FabricError::check(|| Operation::Disconnect, status)
    }
}

impl<A: FabricManagerApi> Drop for Connection<'_, A> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "Implicit disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{MockCall, MockFabricManager, MockOp};
    use crate::types::GpuInfo;
    use fmctl_ffi::{FmReturn, FM_MAX_STR_LENGTH};

    fn two_partitions() -> Vec<PartitionInfo> {
        vec![
            PartitionInfo {
                partition_id: 0,
                is_active: true,
                num_gpus: 1,
                gpus: vec![GpuInfo {
                    physical_id: 1,
                    num_nvlinks_available: 18,
                    max_num_nvlinks: 18,
                    nvlink_line_rate_mbps: 53_125,
                    ..Default::default()
                }],
            },
            PartitionInfo {
                partition_id: 1,
                is_active: false,
                num_gpus: 0,
                gpus: vec![],
            },
        ]
    }

    fn manager(partitions: Vec<PartitionInfo>) -> FabricManager<MockFabricManager> {
        FabricManager::initialize(MockFabricManager::with_partitions(partitions)).unwrap()
    }

    #[test]
    fn test_list_partitions_in_daemon_order() {
        let manager = manager(two_partitions());
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let partitions = conn.list_partitions().unwrap();
        assert_eq!(partitions, two_partitions());
        conn.disconnect().unwrap();
    }

    #[test]
    fn test_connect_sends_encoded_params() {
        let manager = manager(vec![]);
        let params = ConnectParams::new("/var/run/nvidia-fabricmanager/nv-fabricmanager.sock")
            .with_timeout_ms(5000);
        let conn = manager.connect(&params).unwrap();
        drop(conn);

        assert_eq!(
            manager.api().calls()[1],
            MockCall::Connect {
                address: params.address.clone(),
                timeout_ms: 5000,
                unix_socket: true,
            }
        );
    }

    #[test]
    fn test_connect_failure_produces_no_handle() {
        let manager = manager(vec![]);
        manager
            .api()
            .set_status(MockOp::Connect, FmReturn::Timeout);
        let err = manager.connect(&ConnectParams::default()).err().unwrap();
        assert_eq!(err.code(), Some(FmReturn::Timeout));
        assert_eq!(manager.api().live_connections(), 0);
        assert_eq!(manager.api().count_calls(&MockCall::Disconnect), 0);
    }

    #[test]
    fn test_connect_address_too_long_skips_native_call() {
        let manager = manager(vec![]);
        let params = ConnectParams::new("x".repeat(FM_MAX_STR_LENGTH + 10));
        let err = manager.connect(&params).err().unwrap();
        assert!(matches!(err, FabricError::AddressTooLong { .. }));
        assert_eq!(manager.api().calls(), vec![MockCall::LibInit]);
    }

    #[test]
    fn test_null_handle_is_protocol_violation() {
        let manager = manager(vec![]);
        manager.api().set_null_handle(true);
        let err = manager.connect(&ConnectParams::default()).err().unwrap();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_drop_disconnects_once() {
        let manager = manager(two_partitions());
        {
            let conn = manager.connect(&ConnectParams::default()).unwrap();
            assert!(conn.list_partitions().is_ok());
            assert_eq!(manager.api().live_connections(), 1);
        }
        assert_eq!(manager.api().live_connections(), 0);
        assert_eq!(manager.api().count_calls(&MockCall::Disconnect), 1);
    }

    #[test]
    fn test_explicit_disconnect_is_not_repeated_on_drop() {
        let manager = manager(vec![]);
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        conn.disconnect().unwrap();
        assert_eq!(manager.api().count_calls(&MockCall::Disconnect), 1);
    }

    #[test]
    fn test_disconnect_reports_daemon_status() {
        let manager = manager(vec![]);
        manager
            .api()
            .set_status(MockOp::Disconnect, FmReturn::GenericError);
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let err = conn.disconnect().unwrap_err();
        assert_eq!(err.code(), Some(FmReturn::GenericError));
        assert_eq!(err.operation(), Some(&Operation::Disconnect));
    }

    #[test]
    fn test_activate_and_deactivate() {
        let manager = manager(two_partitions());
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        conn.activate(1).unwrap();
        assert!(conn.partition(1).unwrap().is_active);
        conn.deactivate(0).unwrap();
        assert!(!conn.partition(0).unwrap().is_active);
    }

    #[test]
    fn test_activate_in_use_is_not_retried() {
        let manager = manager(two_partitions());
        manager.api().set_status(MockOp::Activate, FmReturn::InUse);
        let conn = manager.connect(&ConnectParams::default()).unwrap();

        let err = conn.activate(7).unwrap_err();
        assert_eq!(err.code(), Some(FmReturn::InUse));
        assert_eq!(err.to_string(), "failed to activate partition 7: In use");
        assert_eq!(manager.api().count_calls(&MockCall::Activate(7)), 1);
    }

    #[test]
    fn test_partition_not_found() {
        let manager = manager(two_partitions());
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let err = conn.partition(42).unwrap_err();
        assert!(matches!(err, FabricError::PartitionNotFound(42)));
    }

    #[test]
    fn test_list_count_overflow_is_protocol_violation() {
        let manager = manager(two_partitions());
        manager.api().set_declared_partition_count(65);
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        assert!(conn.list_partitions().unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_list_gpu_count_overflow_is_protocol_violation() {
        let manager = manager(two_partitions());
        manager.api().set_declared_gpu_count(0, 17);
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        assert!(conn.list_partitions().unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_unknown_status_is_protocol_violation() {
        let manager = manager(two_partitions());
        manager.api().set_raw_status(MockOp::ListPartitions, -99);
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        assert!(conn.list_partitions().unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_explicit_shutdown() {
        let manager = FabricManager::initialize(MockFabricManager::new()).unwrap();
        assert!(manager.api().is_initialized());
        manager.shutdown().unwrap();
    }

    #[test]
    fn test_capability_from_api() {
        let capability = Capability::from_api(MockFabricManager::new());
        assert!(capability.is_available());
        assert_eq!(capability.label(), "available");

        let failing = MockFabricManager::new();
        failing.set_status(MockOp::LibInit, FmReturn::NotSupported);
        let capability = Capability::from_api(failing);
        assert_eq!(capability.label(), "initialization failed");
        let err = capability.into_manager().err().unwrap();
        assert_eq!(err.code(), Some(FmReturn::NotSupported));
        assert_eq!(err.operation(), Some(&Operation::LibInit));
    }

    #[test]
    fn test_already_initialized_is_init_failed() {
        let capability =
            Capability::<MockFabricManager>::from_loaded(Err(FabricError::AlreadyInitialized));
        assert_eq!(capability.label(), "initialization failed");
        assert!(matches!(
            capability,
            Capability::InitFailed(FabricError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_failure_is_unavailable() {
        let capability = Capability::<MockFabricManager>::from_loaded(Err(
            FabricError::LibraryUnavailable("libnvfm.so.1: not found".to_string()),
        ));
        assert!(!capability.is_available());
        assert_eq!(capability.label(), "unavailable");
    }

    #[test]
    #[serial_test::serial]
    fn test_probe_missing_library_is_unavailable() {
        let capability = Capability::probe(Some(Path::new("/nonexistent/libnvfm.so")));
        assert!(matches!(
            capability,
            Capability::Unavailable(FabricError::LibraryUnavailable(_))
        ));
    }
}
