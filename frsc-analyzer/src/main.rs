use std::{
    path::PathBuf,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use frsc_analyzer::{AnalysisPipeline, AnalyzerConfig};
use frsc_core::{GUPPI_BLOCK_SIZE, MAX_HEADER_LEN, REPORT_HEADER_SIZE, TD_BODY_SIZE};
use frsc_types::TOOL_VERSION;
use log::{error, info, LevelFilter};

#[derive(Parser, Debug)]
#[command(
    name = "frsc",
    version = env!("CARGO_PKG_VERSION"),
    about = "Time-domain statistics of GUPPI raw data files",
    long_about = None,
)]
struct Cli {
    /// Job-файл с параметрами анализа
    jobfile: PathBuf,
    /// Путь к файлу отчётов
    #[arg(short, long, default_value = "out.dat")]
    output: PathBuf,
    /// Входной файл GUPPI (заменяет INFILE из job-файла)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Ожидаемый размер сырого блока (BLOCSIZE), байт
    #[arg(long, default_value_t = GUPPI_BLOCK_SIZE)]
    block_size: usize,
    /// Предельная длина текстового заголовка, байт
    #[arg(long, default_value_t = MAX_HEADER_LEN)]
    max_header_len: usize,
    /// Писать отчёты и для окна T1
    #[arg(long)]
    t1_reports: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
    /// Подробный вывод (по блокам и отчётам)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .target(env_logger::Target::Stdout)
        .init();

    info!("This is frsc v.{TOOL_VERSION} ({})", env!("CARGO_PKG_VERSION"));
    info!("  A report header is {REPORT_HEADER_SIZE} bytes");
    info!("  A time-domain body is {TD_BODY_SIZE} bytes");
    let unix_now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    info!("Execution begins: unix time {unix_now}");
    info!("<jobfile> = {:?}", cli.jobfile);

    let mut config = match AnalyzerConfig::from_job_file(&cli.jobfile) {
        Ok(c) => c,
        Err(e) => {
            error!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    if let Some(input) = cli.input {
        config.info = input.display().to_string();
        config.input_path = Some(input);
    }
    config.output_path = cli.output;
    config.block_size = cli.block_size;
    config.max_header_len = cli.max_header_len;
    config.t1_reports = cli.t1_reports;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Source        : {}", config.source);
    info!("  Info          : {}", config.info);
    info!("  TFLAGS        : {:#04x}", config.tflags);
    info!("  T0            : {} s", config.t0);
    info!("  T1            : {} s", config.t1);
    info!("  Excluded      : {} channels", config.exclude_all.count());
    info!("  Block size    : {} bytes", config.block_size);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let session_start = Instant::now();
    let (pipeline, metrics) = AnalysisPipeline::new(config);

    if let Err(e) = pipeline.run() {
        error!("FATAL: {e}");
        std::process::exit(1);
    }

    // --- Итоговая статистика ---
    let summary = metrics.summary(&session_start);
    info!("\n{summary}");

    info!("✓ Analysis complete: {:?}", pipeline.config().output_path);
}
