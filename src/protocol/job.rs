//! Job status snapshot returned by `GET /api/job`.
//!
//! # Format
//!
//! ```json
//! {
//!   "job": {
//!     "file": { "name": "cube.gcode", "display": "cube.gcode", "size": 2048 },
//!     "estimatedPrintTime": 3600,
//!     "filament": { "tool0": { "length": 1234.5, "volume": 3.1 } },
//!     "user": "alice"
//!   },
//!   "progress": { "completion": 12.5, "printTime": 450, "printTimeLeft": 3150 },
//!   "state": "Printing"
//! }
//! ```
//!
//! Every field is optional; `null` and missing values degrade to defaults so
//! a failed or partial fetch still yields a usable (empty) snapshot.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Constants
// ============================================================================

/// States that mean no job is running.
const TERMINAL_STATES: [&str; 3] = ["Operational", "Error", "Offline"];

// ============================================================================
// JobStatus
// ============================================================================

/// Snapshot of the controller's current print job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Printer state text (`Printing`, `Paused`, `Operational`, ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,

    /// Job details.
    #[serde(default, deserialize_with = "null_as_default")]
    pub job: JobInfo,

    /// Job progress.
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: Progress,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Job details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    /// File being printed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub file: FileInfo,

    /// Slicer or analysis estimate of total print time, in seconds.
    #[serde(default)]
    pub estimated_print_time: Option<f64>,

    /// Filament use per tool.
    #[serde(default)]
    pub filament: Option<FxHashMap<String, Filament>>,

    /// User that started the job.
    #[serde(default)]
    pub user: Option<String>,
}

/// File being printed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name.
    #[serde(default)]
    pub name: Option<String>,

    /// Display name, if different from the file name.
    #[serde(default)]
    pub display: Option<String>,

    /// Path within the storage.
    #[serde(default)]
    pub path: Option<String>,

    /// Storage origin.
    #[serde(default)]
    pub origin: Option<String>,

    /// File size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Filament use of a single tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    /// Length in millimetres.
    #[serde(default)]
    pub length: Option<f64>,

    /// Volume in cubic centimetres.
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Job progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Completion in percent.
    #[serde(default)]
    pub completion: Option<f64>,

    /// Byte position in the file.
    #[serde(default)]
    pub filepos: Option<u64>,

    /// Elapsed print time in seconds.
    #[serde(default)]
    pub print_time: Option<f64>,

    /// Estimated time left in seconds.
    #[serde(default)]
    pub print_time_left: Option<f64>,
}

// ============================================================================
// JobStatus - Accessors
// ============================================================================

impl JobStatus {
    /// Parses a `/api/job` response body.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body is not an object.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Returns `true` if the controller reports no running job.
    ///
    /// An empty state (unknown status) is not terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATES
            .iter()
            .any(|terminal| self.state.starts_with(terminal))
    }

    /// Returns the display name of the printed file, if known.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.job
            .file
            .display
            .as_deref()
            .or(self.job.file.name.as_deref())
    }

    /// Returns the estimated time left, in whole seconds.
    #[must_use]
    pub fn estimated_time_left(&self) -> Option<u64> {
        self.progress.print_time_left.map(truncate_whole)
    }

    /// Returns the elapsed print time, in whole seconds.
    #[must_use]
    pub fn print_time(&self) -> Option<u64> {
        self.progress.print_time.map(truncate_whole)
    }

    /// Returns the estimated total print time, in whole seconds.
    #[must_use]
    pub fn estimated_print_time(&self) -> Option<u64> {
        self.job.estimated_print_time.map(truncate_whole)
    }

    /// Returns the filament length summed over all tools, in whole millimetres.
    #[must_use]
    pub fn filament_length(&self) -> Option<u64> {
        let tools = self.job.filament.as_ref()?;
        let total: f64 = tools.values().filter_map(|f| f.length).sum();
        (total > 0.0).then(|| truncate_whole(total))
    }

    /// Returns the structured snapshot attached to chat messages.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Truncates a float to a whole number, clamping negatives and NaN to zero.
fn truncate_whole(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

/// Deserializes `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_full_response() {
        let status = JobStatus::from_value(json!({
            "job": {
                "file": { "name": "cube.gcode", "display": "Cube.gcode", "size": 2048 },
                "estimatedPrintTime": 3600.7,
                "filament": { "tool0": { "length": 1000.0, "volume": 2.4 }, "tool1": { "length": 250.0 } },
                "user": "alice"
            },
            "progress": { "completion": 12.5, "printTime": 450, "printTimeLeft": 3150 },
            "state": "Printing"
        }))
        .unwrap();

        assert_eq!(status.state, "Printing");
        assert_eq!(status.file_name(), Some("Cube.gcode"));
        assert_eq!(status.estimated_print_time(), Some(3600));
        assert_eq!(status.estimated_time_left(), Some(3150));
        assert_eq!(status.print_time(), Some(450));
        assert_eq!(status.filament_length(), Some(1250));
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_parse_minimal_response() {
        let status =
            JobStatus::from_value(json!({ "state": "Printing", "progress": { "completion": 0 } }))
                .unwrap();

        assert_eq!(status.progress.completion, Some(0.0));
        assert_eq!(status.file_name(), None);
        assert_eq!(status.filament_length(), None);
    }

    #[test]
    fn test_nulls_degrade_to_defaults() {
        let status = JobStatus::from_value(json!({
            "job": { "file": null, "filament": null },
            "progress": null,
            "state": null
        }))
        .unwrap();

        assert_eq!(status, JobStatus::default());
    }

    #[test]
    fn test_terminal_states() {
        for state in ["Operational", "Error", "Offline", "Offline after error"] {
            let status = JobStatus {
                state: state.into(),
                ..Default::default()
            };
            assert!(status.is_terminal(), "{state} should be terminal");
        }

        for state in ["Printing", "Paused", "Pausing", "Cancelling", ""] {
            let status = JobStatus {
                state: state.into(),
                ..Default::default()
            };
            assert!(!status.is_terminal(), "{state} should not be terminal");
        }
    }

    #[test]
    fn test_extra_fields_survive_snapshot() {
        let status = JobStatus::from_value(json!({ "state": "Printing", "plugin_data": 7 })).unwrap();
        assert_eq!(status.snapshot()["plugin_data"], json!(7));
        assert_eq!(status.snapshot()["state"], json!("Printing"));
    }
}
