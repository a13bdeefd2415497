//! Fabric Manager SDK loaded at runtime via libloading.
//!
//! The library is optional on a node: when it cannot be opened the caller
//! gets [`FabricError::LibraryUnavailable`] and can fall back to a degraded
//! mode instead of failing to start.

use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use libloading::Library;
use tracing::{debug, error};

use fmctl_ffi::{
    fmFabricPartitionId_t, fmHandle_t, fmReturn_t, FmConnectParamsV1, FmFabricPartitionList,
};

use super::FabricManagerApi;
use crate::error::{FabricError, Result};

/// Library names tried, in order, when no explicit path is configured.
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libnvfm.so.1", "libnvfm.so"];

type LibInitFn = unsafe extern "C" fn() -> fmReturn_t;
type LibShutdownFn = unsafe extern "C" fn() -> fmReturn_t;
type ConnectFn = unsafe extern "C" fn(*mut FmConnectParamsV1, *mut fmHandle_t) -> fmReturn_t;
type DisconnectFn = unsafe extern "C" fn(fmHandle_t) -> fmReturn_t;
type GetPartitionsFn = unsafe extern "C" fn(fmHandle_t, *mut FmFabricPartitionList) -> fmReturn_t;
type PartitionFn = unsafe extern "C" fn(fmHandle_t, fmFabricPartitionId_t) -> fmReturn_t;

/// Set while a `NativeLibrary` is alive; the SDK keeps process-wide state.
static LIBRARY_LOADED: AtomicBool = AtomicBool::new(false);

/// Resolved `libnvfm` entry points.
pub struct NativeLibrary {
    path: String,
    lib_init: LibInitFn,
    lib_shutdown: LibShutdownFn,
    connect: ConnectFn,
    disconnect: DisconnectFn,
    get_partitions: GetPartitionsFn,
    activate: PartitionFn,
    deactivate: PartitionFn,
    // Keeps the function pointers above valid.
    _library: Library,
}

impl NativeLibrary {
    /// Open the SDK from `path`, or from [`DEFAULT_LIBRARY_NAMES`].
    ///
    /// Only one `NativeLibrary` may exist per process at a time.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        if LIBRARY_LOADED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FabricError::AlreadyInitialized);
        }

        Self::load(path).inspect_err(|_| LIBRARY_LOADED.store(false, Ordering::SeqCst))
    }

    /// Path or soname the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let candidates: Vec<OsString> = match path {
            Some(path) => vec![path.as_os_str().to_owned()],
            None => DEFAULT_LIBRARY_NAMES.iter().map(OsString::from).collect(),
        };

        let mut failures = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let name = candidate.to_string_lossy().into_owned();
            // SAFETY: loading runs the library's initializers; libnvfm has no
            // initializers with preconditions.
            match unsafe { Library::new(&candidate) } {
                Ok(library) => {
                    debug!(path = %name, "Loaded fabric manager library");
                    return Self::resolve(library, name);
                }
                Err(e) => {
                    debug!(path = %name, error = %e, "Fabric manager library not loadable");
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        Err(FabricError::LibraryUnavailable(failures.join("; ")))
    }

    fn resolve(library: Library, path: String) -> Result<Self> {
        // SAFETY: each type alias matches the prototype in nv_fm_agent.h.
        unsafe {
            Ok(Self {
                lib_init: symbol(&library, b"fmLibInit\0")?,
                lib_shutdown: symbol(&library, b"fmLibShutdown\0")?,
                connect: symbol(&library, b"fmConnect\0")?,
                disconnect: symbol(&library, b"fmDisconnect\0")?,
                get_partitions: symbol(&library, b"fmGetSupportedFabricPartitions\0")?,
                activate: symbol(&library, b"fmActivateFabricPartition\0")?,
                deactivate: symbol(&library, b"fmDeactivateFabricPartition\0")?,
                path,
                _library: library,
            })
        }
    }
}

/// Look up a function symbol and copy out the pointer.
///
/// # Safety
/// `T` must be the exact function pointer type of the symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
    let symbol_name =
        String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned();
    library
        .get::<T>(name)
        .map(|sym| *sym)
        .map_err(|e| {
            error!(symbol = %symbol_name, error = %e, "Failed to resolve fabric manager symbol");
            FabricError::LibraryUnavailable(format!("{} not found: {}", symbol_name, e))
        })
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        LIBRARY_LOADED.store(false, Ordering::SeqCst);
    }
}

impl FabricManagerApi for NativeLibrary {
    fn lib_init(&self) -> fmReturn_t {
        // SAFETY: no preconditions.
        unsafe { (self.lib_init)() }
    }

    fn lib_shutdown(&self) -> fmReturn_t {
        // SAFETY: no preconditions.
        unsafe { (self.lib_shutdown)() }
    }

    fn connect(&self, params: &mut FmConnectParamsV1, handle: &mut fmHandle_t) -> fmReturn_t {
        // SAFETY: both pointers come from live references.
        unsafe { (self.connect)(params, handle) }
    }

    unsafe fn disconnect(&self, handle: fmHandle_t) -> fmReturn_t {
        (self.disconnect)(handle)
    }

    unsafe fn get_supported_fabric_partitions(
        &self,
        handle: fmHandle_t,
        list: &mut FmFabricPartitionList,
    ) -> fmReturn_t {
        (self.get_partitions)(handle, list)
    }

    unsafe fn activate_fabric_partition(
        &self,
        handle: fmHandle_t,
        partition_id: fmFabricPartitionId_t,
    ) -> fmReturn_t {
        (self.activate)(handle, partition_id)
    }

    unsafe fn deactivate_fabric_partition(
        &self,
        handle: fmHandle_t,
        partition_id: fmFabricPartitionId_t,
    ) -> fmReturn_t {
        (self.deactivate)(handle, partition_id)
    }
}
