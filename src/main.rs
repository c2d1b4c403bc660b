use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

mod config;
mod host;
mod model;
mod sockperf;
mod sql;

use config::Config;
use model::RunParameters;

pub type Result<T> = anyhow::Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Accelerated networking enabled.
    #[value(name = "AN")]
    An,
    #[value(name = "NoAN")]
    NoAn,
}

#[derive(Parser)]
#[command(name = "sockperf-ingest")]
#[command(about = "Store a sockperf latency summary in the results database", long_about = None)]
#[command(after_help = "Example: sockperf-ingest AN 4 vmone vmtwo sockperf.out AvSet")]
struct Cli {
    #[arg(value_enum, ignore_case = true)]
    mode: Mode,

    /// Message size in bytes.
    msg_size: u32,

    vm_sender: String,

    vm_receiver: String,

    /// sockperf client output.
    file: PathBuf,

    /// How the VMs were placed (e.g. AvSet, AvZone).
    placement_mode: String,

    /// Log every stage, including unrecognized input lines.
    #[arg(short, long)]
    verbose: bool,

    /// Print the statement without touching the database.
    #[arg(long)]
    dry_run: bool,

    #[arg(long, default_value = config::DEFAULT_TABLE)]
    table: String,

    #[arg(long, default_value = config::DEFAULT_METADATA_URL)]
    metadata_url: String,

    /// Where to look for resgrp.txt and connectionstring.txt, in order.
    #[arg(long = "config-dir", value_name = "DIR")]
    config_dirs: Vec<PathBuf>,
}

impl Cli {
    fn into_run(self) -> Result<(Config, RunParameters)> {
        let config = Config::new(
            self.table,
            self.verbose,
            self.dry_run,
            self.metadata_url,
            self.config_dirs,
        )?;
        let params = RunParameters::new(
            self.mode == Mode::An,
            self.msg_size,
            self.vm_sender,
            self.vm_receiver,
            self.file,
            self.placement_mode,
        );
        Ok((config, params))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Usage problems exit with 1, help and version with 0.
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    let (config, params) = cli.into_run()?;
    init_logging(config.verbose);
    run(&config, params).await
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        "info,sockperf_ingest=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run(config: &Config, mut params: RunParameters) -> Result<()> {
    // Fail on a misconfigured host before doing any work.
    let credentials = if config.dry_run {
        None
    } else {
        Some(sql::load_credentials(&config.search_dirs)?)
    };

    // 1) Parse sockperf output.
    debug!("parsing {}", params.input_file.display());
    let metrics = sockperf::parse_log_file(&params.input_file)?;
    debug!(
        "{} of {} messages received",
        metrics.received_messages.as_deref().unwrap_or("?"),
        metrics.sent_messages.as_deref().unwrap_or("?")
    );

    // 2) Stamp host facts.
    let client = reqwest::Client::builder()
        .build()
        .context("build metadata client")?;
    params.host = host::gather_metadata(&client, &config.metadata_url).await;
    params.patch_version = host::kernel_release();
    params.resource_group = host::resource_group(&config.search_dirs);
    debug!("run parameters: {:?}", params);

    // 3) Merge into the table row.
    let row = model::normalize(&params, &metrics)
        .with_context(|| format!("summarize {}", params.input_file.display()))?;

    // 4) Render and submit.
    let statement = sql::generate(&config.table, &row);
    println!("{}", statement);

    let Some(credentials) = credentials else {
        info!("dry run, nothing submitted");
        return Ok(());
    };
    match sql::submit(&credentials, &statement).await {
        Ok(rows) => {
            info!("inserted {} row(s) into {}", rows, config.table);
            Ok(())
        }
        Err(e) => {
            if e.is_retryable() {
                warn!("insert failed on a transient error; rerunning may succeed");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARGS: [&str; 7] = [
        "sockperf-ingest",
        "AN",
        "4",
        "vmone",
        "vmtwo",
        "sockperf.out",
        "AvSet",
    ];

    #[test]
    fn missing_arguments_are_a_usage_error() {
        let err = match Cli::try_parse_from(ARGS[..4].iter().copied()) {
            Ok(_) => panic!("three positional arguments accepted"),
            Err(e) => e,
        };
        // Routed to the exit(1) branch in main.
        assert!(err.use_stderr());
    }

    #[test]
    fn help_is_not_a_usage_error() {
        let err = match Cli::try_parse_from(["sockperf-ingest", "--help"]) {
            Ok(_) => panic!("--help parsed as a run"),
            Err(e) => e,
        };
        assert!(!err.use_stderr());
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn mode_is_case_insensitive() {
        for (token, mode) in [
            ("AN", Mode::An),
            ("an", Mode::An),
            ("NoAN", Mode::NoAn),
            ("noan", Mode::NoAn),
        ] {
            let mut args = ARGS;
            args[1] = token;
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.mode, mode, "mode token {}", token);
        }

        let mut args = ARGS;
        args[1] = "fast";
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn into_run_maps_arguments() {
        let (config, params) = Cli::try_parse_from(ARGS).unwrap().into_run().unwrap();
        assert!(params.accel_net);
        assert_eq!(params.msg_size, 4);
        assert_eq!(params.vm_sender, "vmone");
        assert_eq!(params.vm_receiver, "vmtwo");
        assert_eq!(params.input_file, PathBuf::from("sockperf.out"));
        assert_eq!(params.placement_mode, "AvSet");
        assert_eq!(config.table, config::DEFAULT_TABLE);
        assert!(!config.dry_run);

        let mut args = ARGS;
        args[1] = "NoAN";
        let (_, params) = Cli::try_parse_from(args).unwrap().into_run().unwrap();
        assert!(!params.accel_net);
    }

    #[test]
    fn into_run_rejects_bad_table() {
        let args = ARGS.iter().copied().chain(["--table", "x; DROP TABLE y"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.into_run().is_err());
    }
}
