use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use frsc_reader::{DumpConfig, DumpSession, DEFAULT_COLUMNS_FILE};
use log::{info, warn, LevelFilter};

#[derive(Parser, Debug)]
#[command(
    name = "frsc-read",
    version = env!("CARGO_PKG_VERSION"),
    about = "Dump the contents of an frsc report file",
    long_about = None,
)]
struct Cli {
    /// Файл отчётов frsc
    report_file: PathBuf,
    /// Канал (1..=n_ch), столбцы которого пишутся в файл столбцов
    channel: Option<usize>,
    /// Путь к файлу столбцов
    #[arg(long, default_value = DEFAULT_COLUMNS_FILE)]
    columns: PathBuf,
    /// Печатать каждый отчёт строкой JSON
    #[arg(long)]
    json: bool,
    /// Подробный вывод
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Диагностика в stderr, содержимое файла в stdout
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_target(false)
        .format_timestamp(None)
        .init();

    info!("<infile> = {:?}", cli.report_file);
    if let Some(ch) = cli.channel {
        info!("<ch> = {ch}, columns -> {:?}", cli.columns);
    }

    let config = DumpConfig {
        input_path: cli.report_file,
        channel: cli.channel,
        columns_path: cli.columns,
        json: cli.json,
    };

    let session = DumpSession::new(config)?;
    let summary = session
        .run()
        .with_context(|| format!("reading {:?}", session.config().input_path))?;

    info!(
        "✓ {} reports ({} with time-domain body)",
        summary.reports, summary.td_reports
    );
    if summary.truncated_bytes > 0 {
        warn!("{} trailing bytes ignored", summary.truncated_bytes);
    }

    Ok(())
}
