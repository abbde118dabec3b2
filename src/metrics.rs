use serde::Serialize;

pub type Pid = u32;


/// One emitted line. Both variants always carry `time`.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum Sample {
    Success(SuccessRecord),
    Failure(FailureRecord),
}

#[derive(Serialize, Debug)]
pub struct SuccessRecord {
    pub time: String,
    pub total_cpu_percent: f32,
    pub per_process_cpu_info: Vec<ProcessCpuInfo>,
    /// Present iff a GPU device was acquired at startup, even when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_process_gpu_info: Option<Vec<ProcessGpuInfo>>,
}

#[derive(Serialize, Debug)]
pub struct FailureRecord {
    pub time: String,
    pub error: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProcessCpuInfo {
    pub pid: Pid,
    pub cmd: String,
    pub cpu_percent: f32,
    pub rss_memory: u64,
    pub uss_memory: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pss_memory: Option<u64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProcessGpuInfo {
    pub pid: Pid,
    pub gpu_memory: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub rss_bytes: u64,
    pub uss_bytes: u64,
    pub pss_bytes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn failure_record_has_only_time_and_error() {
        let sample = Sample::Failure(FailureRecord {
            time: "2024-05-01T10:00:00.000000Z".to_string(),
            error: "boom".to_string(),
        });
        let value: Value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value, json!({"time": "2024-05-01T10:00:00.000000Z", "error": "boom"}));
    }

    #[test]
    fn optional_fields_are_omitted_not_null() {
        let sample = Sample::Success(SuccessRecord {
            time: "2024-05-01T10:00:00.000000Z".to_string(),
            total_cpu_percent: 12.5,
            per_process_cpu_info: vec![ProcessCpuInfo {
                pid: 42,
                cmd: "python -m pytest".to_string(),
                cpu_percent: 3.0,
                rss_memory: 4096,
                uss_memory: 2048,
                pss_memory: None,
            }],
            per_process_gpu_info: None,
        });
        let line = serde_json::to_string(&sample).unwrap();
        assert!(!line.contains("pss_memory"));
        assert!(!line.contains("per_process_gpu_info"));
        assert!(line.starts_with(r#"{"time":"#));
    }
}
