#[cfg(any(target_os = "linux", test))]
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;

#[cfg(target_os = "linux")]
use crate::errors::SampleError;
#[cfg(target_os = "linux")]
use crate::metrics::Pid;

/// Unique and proportional set sizes, in bytes.
#[cfg(any(target_os = "linux", test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmapsUsage {
    pub uss_bytes: u64,
    pub pss_bytes: u64,
}

/// Sums every `Key: <n> kB` line, so it accepts both `smaps_rollup` and the per-mapping `smaps`.
#[cfg(any(target_os = "linux", test))]
fn parse_smaps(content: &str) -> HashMap<&str, u64> {
    let mut totals: HashMap<&str, u64> = HashMap::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        // Mapping header lines start with an address range, not `Key:`
        let Some(key) = key.strip_suffix(':') else {
            continue;
        };
        if parts.next() != Some("kB") {
            continue;
        }
        if let Ok(kb) = value.parse::<u64>() {
            *totals.entry(key).or_insert(0) += kb;
        }
    }

    totals
}

#[cfg(any(target_os = "linux", test))]
pub fn usage_from_smaps(content: &str) -> SmapsUsage {
    let totals = parse_smaps(content);
    let kb = |key: &str| totals.get(key).copied().unwrap_or(0);

    SmapsUsage {
        uss_bytes: (kb("Private_Clean") + kb("Private_Dirty") + kb("Private_Hugetlb")) * 1024,
        pss_bytes: kb("Pss") * 1024,
    }
}

#[cfg(target_os = "linux")]
pub fn read_smaps_usage(pid: Pid) -> Result<SmapsUsage, SampleError> {
    let rollup = format!("/proc/{}/smaps_rollup", pid);
    let content = match fs::read_to_string(&rollup) {
        Ok(content) => content,
        // Kernels before 4.14 only have the per-mapping file
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let smaps = format!("/proc/{}/smaps", pid);
            fs::read_to_string(&smaps).map_err(|e| SampleError::from_proc_io(pid, &smaps, e))?
        }
        Err(e) => return Err(SampleError::from_proc_io(pid, &rollup, e)),
    };

    Ok(usage_from_smaps(&content))
}
