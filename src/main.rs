use cachesweep::config::{Size, Sweep};
use cachesweep::trace::{self, AddressTrace};
use cachesweep::{report, Runner};
use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use console::style;
use std::path::PathBuf;
use std::time::Instant;

/// Parameters of the synthetic workload used when no trace file is given.
#[derive(Debug, Clone, clap::Args)]
struct SyntheticOptions {
    /// Number of generated accesses
    #[arg(long = "accesses", default_value = "200000")]
    num_accesses: usize,
    /// Bytes of code executed in a loop
    #[arg(long = "code-size", default_value = "16KiB")]
    code_size: Size,
    /// Bytes of data touched before the data stream wraps around
    #[arg(long = "data-size", default_value = "512KiB")]
    data_size: Size,
    /// Distance between consecutive data accesses in bytes
    #[arg(long = "stride", default_value = "64")]
    stride: u64,
    /// Instruction fetches between two data accesses
    #[arg(long = "fetches-per-data-access", default_value = "3")]
    fetches_per_data_access: usize,
    /// Every n-th data access is a store (0 disables stores)
    #[arg(long = "stores-every", default_value = "4")]
    stores_every: usize,
}

impl From<SyntheticOptions> for trace::Synthetic {
    fn from(options: SyntheticOptions) -> Self {
        Self {
            num_accesses: options.num_accesses,
            code_size: options.code_size.bytes(),
            data_size: options.data_size.bytes(),
            stride: options.stride,
            fetches_per_data_access: options.fetches_per_data_access,
            stores_every: options.stores_every,
            ..Self::default()
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Sweep cache hierarchy configurations over an address trace", long_about = None)]
struct Options {
    /// YAML sweep file with the base hierarchy and the experiments to run
    #[arg(short, long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address trace (.csv or .msgpack), defaults to a synthetic workload
    #[arg(short, long = "trace", value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Hit rate report
    #[arg(short, long = "output", value_name = "FILE", default_value = "output.txt")]
    output: PathBuf,

    /// Full statistics of every configuration as JSON
    #[arg(long = "stats", value_name = "FILE")]
    stats: Option<PathBuf>,

    /// Simulate configurations one after another
    #[arg(long = "serial")]
    serial: bool,

    #[command(flatten)]
    synthetic: SyntheticOptions,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn create_file(path: &PathBuf) -> eyre::Result<std::io::BufWriter<std::fs::File>> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(path)
        .wrap_err_with(|| format!("failed to create {}", path.display()))?;
    Ok(std::io::BufWriter::new(file))
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let options = Options::parse();

    let default_level = match options.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let sweep = match options.config {
        Some(ref path) => Sweep::load(path)?,
        None => Sweep::default(),
    };

    let trace: Box<dyn AddressTrace> = match options.trace {
        Some(ref path) => Box::new(trace::Recorded::from_path(path)?),
        None => Box::new(trace::Synthetic::from(options.synthetic.clone())),
    };
    log::debug!("trace: {:?}", trace.len_hint());

    let runner = Runner {
        parallel: !options.serial && cfg!(feature = "parallel"),
        ..Runner::new(sweep.base)
    };

    let start = Instant::now();
    let rows = runner.run(&sweep.experiments, trace.as_ref());

    report::write_report(create_file(&options.output)?, &rows)
        .wrap_err_with(|| format!("failed to write {}", options.output.display()))?;
    if let Some(ref path) = options.stats {
        report::write_stats_json(create_file(path)?, &rows)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    }

    for row in &rows {
        let line = report::format_row(row);
        match row.result {
            Ok(_) => println!("{}", style(line).green()),
            Err(ref err) => println!("{} ({})", style(line).red(), err),
        }
    }

    let num_failed = rows.iter().filter(|row| row.result.is_err()).count();
    if num_failed > 0 {
        eprintln!(
            "{}",
            style(format!("{num_failed} configuration(s) failed")).red()
        );
    }
    println!(
        "All simulations complete. Results written to {} (took {:?})",
        options.output.display(),
        start.elapsed()
    );
    Ok(())
}
