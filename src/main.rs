mod collectors;
mod emitter;
mod errors;
mod logger;
mod metrics;

use std::io;
use std::time::Duration;
use clap::Parser;
use log::{error, info};
use crate::collectors::gpu::{self, ComputeDevice};
use crate::collectors::process::SysinfoTable;
use crate::emitter::SamplerConfig;


fn main() {

    let cli = Cli::parse();
    logger::setup_logger();

    let config = match cli.sampler_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    // Initialize NVML for GPU monitoring, once
    let nvml = if cli.no_gpu { None } else { gpu::init_nvml() };
    let device = gpu::acquire_device(nvml.as_ref());

    let mut table = SysinfoTable::new();

    info!(
        "Sampling processes matching {:?} every {}s (GPU {})",
        config.name_filter,
        config.interval.as_secs_f64(),
        if device.is_some() { "enabled" } else { "disabled" },
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let device = device.as_ref().map(|d| d as &dyn ComputeDevice);

    if let Err(e) = emitter::run(&mut out, &mut table, device, &config) {
        error!("Failed to write sample: {}", e);
        std::process::exit(1);
    }
}

#[derive(Parser)]
#[command(name = "procscope")]
#[command(about = "Side-car sampler of per-process CPU, memory and GPU usage", long_about = None)]
struct Cli {
    /// Delay between samples in seconds
    #[arg(short, long, default_value_t = 1.0)]
    interval: f64,

    /// Substring a process name must contain to be sampled
    #[arg(short, long, default_value = "python")]
    name_filter: String,

    /// Stop after this many samples instead of running forever
    #[arg(long)]
    ticks: Option<u64>,

    /// Never initialize NVML
    #[arg(long, default_value_t = false)]
    no_gpu: bool,
}

impl Cli {
    fn sampler_config(&self) -> Result<SamplerConfig, String> {
        let interval = Duration::try_from_secs_f64(self.interval)
            .map_err(|e| format!("Invalid interval {}: {}", self.interval, e))?;

        Ok(SamplerConfig {
            interval,
            name_filter: self.name_filter.clone(),
            max_ticks: self.ticks,
        })
    }
}
