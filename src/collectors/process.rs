use sysinfo::{Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use crate::errors::SampleError;
use crate::metrics::{MemoryInfo, Pid, ProcessCpuInfo};

/// Read access to the host process table, as of its last refresh.
pub trait ProcessTable {
    /// Takes a fresh snapshot of the host. Called once per tick.
    fn refresh(&mut self) {}
    /// Host-wide CPU usage since the previous refresh.
    fn total_cpu_percent(&self) -> f32;
    /// Every visible pid, in table order.
    fn pids(&self) -> Vec<Pid>;
    fn name(&self, pid: Pid) -> Result<String, SampleError>;
    fn cmdline(&self, pid: Pid) -> Result<Vec<String>, SampleError>;
    fn cpu_percent(&self, pid: Pid) -> Result<f32, SampleError>;
    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, SampleError>;
}

/// A discovered process, valid for the tick that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessHandle {
    pub pid: Pid,
    pub cmdline: Vec<String>,
}

pub struct SysinfoTable {
    system: System,
}

impl SysinfoTable {
    pub fn new() -> Self {
        let mut table = SysinfoTable { system: System::new() };
        // First refresh to initialize counters
        table.refresh();
        table
    }

    fn process(&self, pid: Pid) -> Result<&Process, SampleError> {
        self.system
            .process(sysinfo::Pid::from_u32(pid))
            .ok_or(SampleError::NoSuchProcess(pid))
    }
}

impl ProcessTable for SysinfoTable {
    fn refresh(&mut self) {
        self.system.refresh_cpu_usage();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );
    }

    fn total_cpu_percent(&self) -> f32 {
        self.system.global_cpu_usage()
    }

    fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.system.processes().keys().map(|pid| pid.as_u32()).collect();
        pids.sort_unstable();
        pids
    }

    fn name(&self, pid: Pid) -> Result<String, SampleError> {
        let process = self.process(pid)?;
        let comm = process.name().to_string_lossy();
        let argv0 = process.cmd().first().map(|arg| arg.to_string_lossy());
        Ok(expand_truncated_name(&comm, argv0.as_deref()))
    }

    fn cmdline(&self, pid: Pid) -> Result<Vec<String>, SampleError> {
        Ok(self
            .process(pid)?
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect())
    }

    fn cpu_percent(&self, pid: Pid) -> Result<f32, SampleError> {
        Ok(self.process(pid)?.cpu_usage())
    }

    #[cfg(target_os = "linux")]
    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, SampleError> {
        let rss_bytes = self.process(pid)?.memory();
        let smaps = super::memory::read_smaps_usage(pid)?;
        Ok(MemoryInfo {
            rss_bytes,
            uss_bytes: smaps.uss_bytes,
            pss_bytes: Some(smaps.pss_bytes),
        })
    }

    // No private-page accounting available; USS falls back to RSS
    #[cfg(not(target_os = "linux"))]
    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, SampleError> {
        let rss_bytes = self.process(pid)?.memory();
        Ok(MemoryInfo {
            rss_bytes,
            uss_bytes: rss_bytes,
            pss_bytes: None,
        })
    }
}

/// Linux caps `comm` at 15 bytes. When it is a prefix of argv[0]'s basename,
/// the basename is the real name.
fn expand_truncated_name(comm: &str, argv0: Option<&str>) -> String {
    const COMM_LEN: usize = 15;

    if comm.len() >= COMM_LEN {
        if let Some(argv0) = argv0 {
            let basename = argv0.rsplit('/').next().unwrap_or(argv0);
            if basename.starts_with(comm) {
                return basename.to_string();
            }
        }
    }
    comm.to_string()
}

/// Processes whose name contains `name_filter` and whose command line is non-empty.
///
/// Candidates that vanish or deny access while being inspected are skipped.
pub fn discover_processes(
    table: &dyn ProcessTable,
    name_filter: &str,
) -> Result<Vec<ProcessHandle>, SampleError> {
    let mut handles = Vec::new();

    for pid in table.pids() {
        match inspect_candidate(table, pid, name_filter) {
            Ok(Some(handle)) => handles.push(handle),
            Ok(None) => {}
            Err(e) if e.is_transient_inspection() => {}
            Err(e) => return Err(e),
        }
    }

    Ok(handles)
}

fn inspect_candidate(
    table: &dyn ProcessTable,
    pid: Pid,
    name_filter: &str,
) -> Result<Option<ProcessHandle>, SampleError> {
    if !table.name(pid)?.contains(name_filter) {
        return Ok(None);
    }
    let cmdline = table.cmdline(pid)?;
    if cmdline.is_empty() {
        return Ok(None);
    }
    Ok(Some(ProcessHandle { pid, cmdline }))
}

/// CPU and memory figures for each discovered process, in discovery order.
///
/// Any failure here fails the whole list: a process that exits between discovery
/// and sampling turns the tick into an error record.
pub fn take_processes_snapshot(
    table: &dyn ProcessTable,
    handles: &[ProcessHandle],
) -> Result<Vec<ProcessCpuInfo>, SampleError> {
    handles
        .iter()
        .map(|handle| {
            let memory = table.memory_info(handle.pid)?;
            Ok(ProcessCpuInfo {
                pid: handle.pid,
                cmd: handle.cmdline.join(" "),
                cpu_percent: table.cpu_percent(handle.pid)?,
                rss_memory: memory.rss_bytes,
                uss_memory: memory.uss_bytes,
                pss_memory: memory.pss_bytes,
            })
        })
        .collect()
}
