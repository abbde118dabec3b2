use chrono::Utc;
use log::debug;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crate::collectors::gpu::ComputeDevice;
use crate::collectors::process::ProcessTable;
use crate::collectors::{render_sample, take_sample};
use crate::metrics::Sample;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Delay after each emitted record.
    pub interval: Duration,
    /// Case-sensitive substring a process name must contain.
    pub name_filter: String,
    /// Stop after this many ticks. `None` runs until killed.
    pub max_ticks: Option<u64>,
}

/// Emits one line per tick to `out`. Only a failed write ends the loop early.
pub fn run<W: Write>(
    out: &mut W,
    table: &mut dyn ProcessTable,
    device: Option<&dyn ComputeDevice>,
    config: &SamplerConfig,
) -> io::Result<()> {
    let mut ticks: u64 = 0;

    loop {
        if config.max_ticks.is_some_and(|max| ticks >= max) {
            return Ok(());
        }
        if ticks > 0 {
            thread::sleep(config.interval);
        }

        let time = Utc::now();
        table.refresh();
        let sample = take_sample(time, table, device, &config.name_filter);

        if let Sample::Failure(failure) = &sample {
            debug!("Tick failed: {}", failure.error);
        }

        writeln!(out, "{}", render_sample(&sample))?;
        out.flush()?;

        ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::fake::{FakeDevice, FakeProcess, FakeTable};
    use chrono::DateTime;
    use serde_json::Value;

    fn config(max_ticks: u64) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::ZERO,
            name_filter: "python".to_string(),
            max_ticks: Some(max_ticks),
        }
    }

    fn lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn zero_ticks_emits_nothing() {
        let mut table = FakeTable::new(vec![FakeProcess::new(7, "python", &["python", "t.py"])]);
        let mut out = Vec::new();
        run(&mut out, &mut table, None, &config(0)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn single_tick_does_not_sleep() {
        let mut table = FakeTable::new(vec![]);
        let config = SamplerConfig {
            interval: Duration::from_secs(30),
            ..config(1)
        };
        let started = std::time::Instant::now();
        let mut out = Vec::new();
        run(&mut out, &mut table, None, &config).unwrap();
        assert_eq!(lines(&out).len(), 1);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn emits_one_line_per_tick_with_ordered_times() {
        let mut table = FakeTable::new(vec![FakeProcess::new(7, "python", &["python", "t.py"])]);
        let mut out = Vec::new();
        run(&mut out, &mut table, None, &config(3)).unwrap();

        let records = lines(&out);
        assert_eq!(records.len(), 3);

        let times: Vec<DateTime<_>> = records
            .iter()
            .map(|r| DateTime::parse_from_rfc3339(r["time"].as_str().unwrap()).unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!(records.iter().all(|r| r.get("per_process_gpu_info").is_none()));
    }

    #[test]
    fn failed_ticks_still_emit_and_loop_continues() {
        let mut table = FakeTable::new(vec![FakeProcess::new(7, "python", &["python"]).memory_vanished()]);
        let device = FakeDevice::with_processes(vec![]);
        let mut out = Vec::new();
        run(&mut out, &mut table, Some(&device), &config(2)).unwrap();

        let records = lines(&out);
        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(record["error"].is_string());
            assert!(record.get("per_process_cpu_info").is_none());
        }
    }

    #[test]
    fn interval_is_slept_between_ticks() {
        let mut table = FakeTable::new(vec![]);
        let config = SamplerConfig {
            interval: Duration::from_millis(50),
            ..config(3)
        };
        let started = std::time::Instant::now();
        run(&mut io::sink(), &mut table, None, &config).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_fatal() {
        let mut table = FakeTable::new(vec![]);
        let err = run(&mut BrokenPipe, &mut table, None, &config(5)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
