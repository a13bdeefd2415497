//! Human and JSON rendering of command results.
//!
//! Everything renders to a `String`; the binary only prints.

use serde::Serialize;

use crate::types::{PartitionInfo, DEFAULT_ADDRESS, DEFAULT_TIMEOUT_MS};

/// Spaces between table columns.
const COLUMN_PADDING: usize = 2;

/// Left-aligned text table with a dashed rule under the header.
struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        let header = headers.iter().map(|h| h.to_string()).collect();
        let rule = headers.iter().map(|h| "-".repeat(h.len())).collect();
        Self {
            rows: vec![header, rule],
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in &self.rows {
            let mut line = String::new();
            for (cell, width) in row.iter().zip(&widths) {
                line.push_str(cell);
                let pad = width + COLUMN_PADDING - cell.chars().count();
                line.extend(std::iter::repeat(' ').take(pad));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// `list` output.
pub fn partition_table(partitions: &[PartitionInfo]) -> String {
    let mut table = Table::new(&["PARTITION ID", "STATUS", "GPUs", "NVLINKS", "GPU PHYSICAL IDs"]);
    for partition in partitions {
        let ids = partition
            .gpu_physical_ids()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        table.push(vec![
            partition.partition_id.to_string(),
            partition.status_label().to_string(),
            partition.num_gpus.to_string(),
            partition.total_nvlinks_available().to_string(),
            ids,
        ]);
    }
    table.render()
}

/// `status` output: summary lines, then one row per GPU.
pub fn partition_detail(partition: &PartitionInfo) -> String {
    let mut out = format!(
        "Partition ID: {}\nStatus: {}\nNumber of GPUs: {}\n",
        partition.partition_id,
        partition.status_label(),
        partition.num_gpus
    );

    if !partition.gpus.is_empty() {
        out.push('\n');
        let mut table = Table::new(&[
            "PHYSICAL ID",
            "UUID",
            "PCI BUS ID",
            "NVLINKS (Available/Max)",
            "RATE (MB/s)",
        ]);
        for gpu in &partition.gpus {
            table.push(vec![
                gpu.physical_id.to_string(),
                or_na(&gpu.uuid).to_string(),
                or_na(&gpu.pci_bus_id).to_string(),
                format!("{}/{}", gpu.num_nvlinks_available, gpu.max_num_nvlinks),
                gpu.nvlink_line_rate_mbps.to_string(),
            ]);
        }
        out.push_str(&table.render());
    }
    out
}

/// State change requested on a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Activate,
    Deactivate,
}

impl Action {
    fn past_tense(self) -> &'static str {
        match self {
            Action::Activate => "activated",
            Action::Deactivate => "deactivated",
        }
    }
}

/// JSON body reported after a successful activate or deactivate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action: Action,
    pub partition_id: u32,
    pub status: &'static str,
}

impl ActionResult {
    pub fn success(action: Action, partition_id: u32) -> Self {
        Self {
            action,
            partition_id,
            status: "success",
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Successfully {} partition {}",
            self.action.past_tense(),
            self.partition_id
        )
    }
}

/// `info` output. Describes configuration only; nothing here talks to the
/// daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub address: String,
    pub default_address: &'static str,
    pub default_timeout: u32,
    pub is_unix_socket: bool,
    /// Native library availability, e.g. "available".
    pub library: String,
    pub timeout: u32,
}

impl ConnectionInfo {
    pub fn new(address: String, timeout: u32, is_unix_socket: bool, library: String) -> Self {
        Self {
            address,
            default_address: DEFAULT_ADDRESS,
            default_timeout: DEFAULT_TIMEOUT_MS,
            is_unix_socket,
            library,
            timeout,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Fabric Manager Connection Info:\n  \
             Address: {}\n  \
             Timeout: {}ms\n  \
             Unix Socket: {}\n  \
             Library: {}\n\
             \n\
             Defaults:\n  \
             Default Address: {}\n  \
             Default Timeout: {}ms\n",
            self.address,
            self.timeout,
            self.is_unix_socket,
            self.library,
            self.default_address,
            self.default_timeout
        )
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}
