//! test-merge - runs the merge stability test over the loopback pipeline
//!
//! Prints the report on stdout. Exit status is 0 on PASS, 1 on FAIL and 2
//! when the run could not be carried out.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mergetest_core::{
    HarnessConfig, HarnessResult, PortId, Report, DEFAULT_TOTAL_PACKETS, FINGERPRINT_SIZE,
};
use mergetest_runtime::{
    build_runtime, init_tracing, run, Impairment, LogFormat, LoopbackPipeline, MergeSpec,
    PortFabric,
};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "test-merge", version, about = "Merge stability test harness")]
struct Args {
    /// Minimum received/sent percentage to pass (exclusive)
    #[arg(long = "PASSED_LIMIT", default_value_t = 85)]
    passed_limit: u64,

    /// Packets per second for each generator
    #[arg(long = "SPEED", default_value_t = 1000)]
    speed: u64,

    /// Send port of Group1
    #[arg(long, default_value_t = 0)]
    outport1: PortId,

    /// Send port of Group2
    #[arg(long, default_value_t = 1)]
    outport2: PortId,

    /// Receive port
    #[arg(long, default_value_t = 0)]
    inport: PortId,

    /// Received packets that complete the run
    #[arg(long, default_value_t = DEFAULT_TOTAL_PACKETS)]
    total_packets: u64,

    /// Give up after this long, e.g. "30s" or "2m"
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Payload bytes per packet, fingerprint included
    #[arg(long, default_value_t = FINGERPRINT_SIZE)]
    payload_size: usize,

    /// Worker threads
    #[arg(long, default_value_t = 16)]
    cores: usize,

    /// Loss rate on each merge input link
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    loss: f64,

    /// Header corruption rate on each merge input link
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    corrupt: f64,

    /// Foreign frame injection rate on each merge input link
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    foreign: f64,

    /// Impairment seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log format: pretty or json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

impl Args {
    fn config(&self) -> HarnessConfig {
        let config = HarnessConfig::default()
            .with_passed_limit(self.passed_limit)
            .with_speed(self.speed)
            .with_ports(self.outport1, self.outport2, self.inport)
            .with_total_packets(self.total_packets)
            .with_payload_size(self.payload_size)
            .with_cores(self.cores);
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }

    fn impairment(&self) -> Impairment {
        Impairment::none()
            .with_loss(self.loss)
            .with_corruption(self.corrupt)
            .with_foreign(self.foreign)
    }

    /// Merge both send ports into the receive port
    fn merge_spec(&self) -> MergeSpec {
        let impairment = self.impairment();
        let mut spec = MergeSpec::new(self.inport)
            .with_seed(self.seed)
            .input(self.outport1, impairment);
        if self.outport2 != self.outport1 {
            spec = spec.input(self.outport2, impairment);
        }
        spec
    }
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(format!("{} is not between 0 and 1", rate));
    }
    Ok(rate)
}

fn execute(args: &Args) -> HarnessResult<Report> {
    let config = args.config();
    config.validate()?;

    let fabric = PortFabric::covering(&[config.outport1, config.outport2, config.inport]);
    let mut pipeline = LoopbackPipeline::new(Arc::new(fabric));
    pipeline.add_merge(&args.merge_spec())?;

    let runtime = build_runtime(config.cores)?;
    runtime.block_on(run(&config, pipeline))
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_tracing(args.log_format) {
        eprintln!("{}", e);
    }

    let report = match execute(&args) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "test-merge failed");
            return ExitCode::from(2);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to encode report: {}", e);
                return ExitCode::from(2);
            }
        }
    } else {
        println!("{}", report);
    }

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["test-merge"]);
        assert_eq!(args.config(), HarnessConfig::default());
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(args.impairment().is_none());
    }

    #[test]
    fn test_uppercase_flag_names() {
        let args = Args::parse_from([
            "test-merge",
            "--PASSED_LIMIT",
            "90",
            "--SPEED",
            "2000",
            "--outport1",
            "2",
            "--outport2",
            "3",
            "--inport",
            "4",
        ]);
        let config = args.config();

        assert_eq!(config.passed_limit, 90);
        assert_eq!(config.speed, 2000);
        assert_eq!((config.outport1, config.outport2, config.inport), (2, 3, 4));
    }

    #[test]
    fn test_timeout_parsed_by_humantime() {
        let args = Args::parse_from(["test-merge", "--timeout", "1m 30s"]);
        assert_eq!(args.config().timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        assert!(Args::try_parse_from(["test-merge", "--loss", "1.5"]).is_err());
        assert!(Args::try_parse_from(["test-merge", "--corrupt", "x"]).is_err());
    }

    #[test]
    fn test_shared_send_port_merged_once() {
        let args = Args::parse_from(["test-merge", "--outport2", "0"]);
        assert_eq!(args.merge_spec().inputs.len(), 1);

        let args = Args::parse_from(["test-merge"]);
        assert_eq!(args.merge_spec().inputs.len(), 2);
    }
}
