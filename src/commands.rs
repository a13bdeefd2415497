//! Partition commands run against an open connection.

use tracing::debug;

use crate::client::Connection;
use crate::config::ConfigError;
use crate::error::FabricError;
use crate::output::{self, Action, ActionResult};
use crate::sdk::FabricManagerApi;

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// A command that needs a daemon connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionCommand {
    List,
    Status(u32),
    Activate(u32),
    Deactivate(u32),
}

/// Errors surfaced by the command line.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Fabric(#[from] FabricError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run `command` on `connection` and return the rendered output.
pub fn execute<A: FabricManagerApi>(
    connection: &Connection<'_, A>,
    command: PartitionCommand,
    format: OutputFormat,
) -> Result<String, CommandError> {
    debug!(?command, ?format, "Executing command");
    match command {
        PartitionCommand::List => {
            let partitions = connection.list_partitions()?;
            match format {
                OutputFormat::Text => Ok(output::partition_table(&partitions)),
                OutputFormat::Json => Ok(output::to_json(&partitions)?),
            }
        }
        PartitionCommand::Status(partition_id) => {
            let partition = connection.partition(partition_id)?;
            match format {
                OutputFormat::Text => Ok(output::partition_detail(&partition)),
                OutputFormat::Json => Ok(output::to_json(&partition)?),
            }
        }
        PartitionCommand::Activate(partition_id) => {
            connection.activate(partition_id)?;
            render_action(ActionResult::success(Action::Activate, partition_id), format)
        }
        PartitionCommand::Deactivate(partition_id) => {
            connection.deactivate(partition_id)?;
            render_action(ActionResult::success(Action::Deactivate, partition_id), format)
        }
    }
}

fn render_action(result: ActionResult, format: OutputFormat) -> Result<String, CommandError> {
    match format {
        OutputFormat::Text => Ok(format!("{}\n", result.message())),
        OutputFormat::Json => Ok(output::to_json(&result)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FabricManager;
    use crate::sdk::{MockCall, MockFabricManager, MockOp};
    use crate::types::{ConnectParams, GpuInfo, PartitionInfo};
    use fmctl_ffi::FmReturn;

    fn manager() -> FabricManager<MockFabricManager> {
        let mock = MockFabricManager::with_partitions(vec![
            PartitionInfo {
                partition_id: 0,
                is_active: false,
                num_gpus: 1,
                gpus: vec![GpuInfo {
                    physical_id: 4,
                    num_nvlinks_available: 18,
                    max_num_nvlinks: 18,
                    ..Default::default()
                }],
            },
            PartitionInfo {
                partition_id: 1,
                ..Default::default()
            },
        ]);
        FabricManager::initialize(mock).unwrap()
    }

    #[test]
    fn test_list_text() {
        let manager = manager();
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let out = execute(&conn, PartitionCommand::List, OutputFormat::Text).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("0 "));
        assert!(lines[2].ends_with("18       4"));
        assert!(lines[3].starts_with("1 "));
    }

    #[test]
    fn test_list_json() {
        let manager = manager();
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let out = execute(&conn, PartitionCommand::List, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["GPUInfo"][0]["PhysicalID"], 4);
        assert_eq!(json[1]["IsActive"], false);
    }

    #[test]
    fn test_status_unknown_partition() {
        let manager = manager();
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let err = execute(&conn, PartitionCommand::Status(9), OutputFormat::Text).unwrap_err();
        assert_eq!(err.to_string(), "partition 9 not found");
    }

    #[test]
    fn test_activate_then_status() {
        let manager = manager();
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let out = execute(&conn, PartitionCommand::Activate(0), OutputFormat::Text).unwrap();
        assert_eq!(out, "Successfully activated partition 0\n");

        let out = execute(&conn, PartitionCommand::Status(0), OutputFormat::Text).unwrap();
        assert!(out.contains("Status: Active\n"));
    }

    #[test]
    fn test_deactivate_json() {
        let manager = manager();
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let out = execute(&conn, PartitionCommand::Deactivate(1), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["action"], "deactivate");
        assert_eq!(json["partitionId"], 1);
    }

    #[test]
    fn test_daemon_error_message_names_operation() {
        let manager = manager();
        manager
            .api()
            .set_status(MockOp::Deactivate, FmReturn::NvlinkError);
        let conn = manager.connect(&ConnectParams::default()).unwrap();
        let err = execute(&conn, PartitionCommand::Deactivate(1), OutputFormat::Text).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to deactivate partition 1: NVLink error"
        );
        assert_eq!(manager.api().count_calls(&MockCall::Deactivate(1)), 1);
    }
}
