//! virtmem - demand paging simulator
//!
//! Usage: virtmem [OPTIONS] <npages> <nframes> <rand|fifo|lru|custom> <sort|scan|focus>
//!
//! Prints the workload result followed by the page fault, disk read and disk
//! write counts.

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use log::{error, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use virtmem::config::{Cli, Config};
use virtmem::simulation::{self, Report};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_status(e.kind()));
        }
    };

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("couldn't set up logging: {}", e);
        return ExitCode::from(1);
    }

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let (status, stdout) = finish(&config, &simulation::run(&config));
    if let Some(text) = stdout {
        print!("{}", text);
    }
    ExitCode::from(status)
}

/// Exit status for a clap parse failure: usage errors exit with 1, not
/// clap's default of 2
fn usage_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Exit status and stdout text for a finished run
fn finish(config: &Config, outcome: &virtmem::Result<Report>) -> (u8, Option<String>) {
    match outcome {
        Ok(report) => (0, Some(render_report(config, report))),
        // deliberate abort rather than a failure, so the exit status stays zero
        Err(e) if e.is_thrashing() => {
            error!("run aborted: {}", e);
            (0, None)
        }
        Err(e) => {
            error!("{}", e);
            (1, None)
        }
    }
}

fn init_logging(verbose: u8) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();

    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .build(Root::builder().appender("console").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn render_report(config: &Config, report: &Report) -> String {
    format!(
        "{} result is {}\nPage Faults: {}\nDisk reads: {}\nDisk writes: {}\n",
        config.workload,
        report.result,
        report.stats.faults,
        report.stats.disk_reads,
        report.stats.disk_writes
    )
}
