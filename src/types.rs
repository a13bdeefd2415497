//! Safe, owned representations of fabric manager data.
//!
//! Nothing here borrows native memory; values can be cloned, stored and
//! serialized freely. JSON field names are part of the command line's
//! output format and stay stable for scripts.

use serde::{Deserialize, Serialize};

/// Default fabric manager socket path.
pub const DEFAULT_ADDRESS: &str = "/var/run/nvidia-fabricmanager/nv-fabricmanager.sock";
/// Default connect timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 5000;

/// Returns true if the address looks like a filesystem socket path.
pub fn is_unix_socket_address(address: &str) -> bool {
    address.ends_with(".sock")
}

/// Parameters for a connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Socket path or `host:port`.
    pub address: String,
    pub timeout_ms: u32,
    pub address_is_unix_socket: bool,
}

impl ConnectParams {
    /// Build parameters with the default timeout, detecting socket vs network
    /// addressing from the address itself.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let address_is_unix_socket = is_unix_socket_address(&address);
        Self {
            address,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            address_is_unix_socket,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_unix_socket(mut self, is_unix_socket: bool) -> Self {
        self.address_is_unix_socket = is_unix_socket;
        self
    }
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

/// A GPU that belongs to a fabric partition.
///
/// `uuid` and `pci_bus_id` are legitimately empty on some systems (DGX/HGX
/// H100 and later); use `physical_id` to correlate with `nvidia-smi`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    #[serde(rename = "PhysicalID")]
    pub physical_id: u32,
    #[serde(rename = "UUID")]
    pub uuid: String,
    #[serde(rename = "PCIBusID")]
    pub pci_bus_id: String,
    #[serde(rename = "NumNvLinksAvailable")]
    pub num_nvlinks_available: u32,
    #[serde(rename = "MaxNumNvLinks")]
    pub max_num_nvlinks: u32,
    #[serde(rename = "NvlinkLineRateMBps")]
    pub nvlink_line_rate_mbps: u32,
}

/// A fabric partition as reported by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    #[serde(rename = "PartitionID")]
    pub partition_id: u32,
    #[serde(rename = "IsActive")]
    pub is_active: bool,
    /// Declared GPU count; always equals `gpus.len()` for decoded values.
    #[serde(rename = "NumGpus")]
    pub num_gpus: u32,
    #[serde(rename = "GPUInfo")]
    pub gpus: Vec<GpuInfo>,
}

impl PartitionInfo {
    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Inactive"
        }
    }

    /// Sum of available NVLinks across the partition's GPUs.
    pub fn total_nvlinks_available(&self) -> u64 {
        self.gpus
            .iter()
            .map(|gpu| u64::from(gpu.num_nvlinks_available))
            .sum()
    }

    pub fn gpu_physical_ids(&self) -> Vec<u32> {
        self.gpus.iter().map(|gpu| gpu.physical_id).collect()
    }
}
