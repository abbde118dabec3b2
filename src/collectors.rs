pub mod gpu;
pub mod memory;
pub mod process;

use chrono::{DateTime, Utc};
use crate::errors::SampleError;
use crate::metrics::{FailureRecord, Sample, SuccessRecord};
use self::gpu::ComputeDevice;
use self::process::ProcessTable;

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Assembles one tick's sample. Never fails: any error becomes a failure record
/// stamped with the same `time`.
pub fn take_sample(
    time: DateTime<Utc>,
    table: &dyn ProcessTable,
    device: Option<&dyn ComputeDevice>,
    name_filter: &str,
) -> Sample {
    let time = format_time(&time);

    match take_success_record(&time, table, device, name_filter) {
        Ok(record) => Sample::Success(record),
        Err(e) => Sample::Failure(FailureRecord {
            time,
            error: e.to_string(),
        }),
    }
}

fn take_success_record(
    time: &str,
    table: &dyn ProcessTable,
    device: Option<&dyn ComputeDevice>,
    name_filter: &str,
) -> Result<SuccessRecord, SampleError> {
    let total_cpu_percent = table.total_cpu_percent();
    let handles = process::discover_processes(table, name_filter)?;
    let per_process_cpu_info = process::take_processes_snapshot(table, &handles)?;
    let per_process_gpu_info = gpu::take_gpu_snapshot(device)?;

    Ok(SuccessRecord {
        time: time.to_string(),
        total_cpu_percent,
        per_process_cpu_info,
        per_process_gpu_info,
    })
}

/// Serializes a sample to one line. A success record that fails to serialize
/// is replaced by a failure record carrying the same time.
pub fn render_sample(sample: &Sample) -> String {
    match serde_json::to_string(sample) {
        Ok(line) => line,
        Err(e) => {
            let time = match sample {
                Sample::Success(record) => record.time.clone(),
                Sample::Failure(record) => record.time.clone(),
            };
            render_failure(time, &SampleError::from(e))
        }
    }
}

fn render_failure(time: String, error: &SampleError) -> String {
    let failure = Sample::Failure(FailureRecord {
        time: time.clone(),
        error: error.to_string(),
    });
    serde_json::to_string(&failure).unwrap_or_else(|_| {
        format!(r#"{{"time":{:?},"error":"serialization failed"}}"#, time)
    })
}
