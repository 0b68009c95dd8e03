use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    sync::{atomic::Ordering, Arc},
    time::Instant,
};

use frsc_core::{BlockRead, GuppiMetadata, GuppiReader, ReportWriter};
use frsc_types::{FrscError, FrscResult, ReportHeader, ReportType, SourceKind};
use log::{debug, info, warn};

use crate::{
    metrics::RunMetrics, window_samples, AnalyzerConfig, AnalyzerError, AnalyzerResult,
    Rebuffer, StatisticsEngine, WindowBuffer,
};

/// Ёмкость буфера чтения входного файла.
const INPUT_BUFFER: usize = 1 << 20;

/// Окно с подключённым движком статистики.
struct WindowStage {
    rebuffer: Rebuffer,
    engine: StatisticsEngine,
}

/// Оркестрирует прогон анализа одного файла.
pub struct AnalysisPipeline {
    config: AnalyzerConfig,
    metrics: Arc<RunMetrics>,
}

impl AnalysisPipeline {
    /// Создаёт пайплайн. Возвращает также shared-ссылку на метрики.
    pub fn new(config: AnalyzerConfig) -> (Self, Arc<RunMetrics>) {
        let metrics = RunMetrics::new();
        let p = Self {
            config,
            metrics: metrics.clone(),
        };

        (p, metrics)
    }

    /// Открывает вход и выход из конфигурации и выполняет прогон.
    pub fn run(&self) -> AnalyzerResult<()> {
        let input_path = self
            .config
            .input_path
            .as_ref()
            .ok_or(AnalyzerError::MissingInput)?;

        info!("Input : {input_path:?}");
        info!("Output: {:?}", self.config.output_path);

        let input = BufReader::with_capacity(INPUT_BUFFER, File::open(input_path)?);
        let output = File::create(&self.config.output_path)?;

        self.run_with(input, output)?;

        info!("Report file closed: {:?}", self.config.output_path);
        Ok(())
    }

    /// Прогон на произвольных потоках. Возвращает поток отчётов.
    pub fn run_with<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> AnalyzerResult<W> {
        let cfg = &self.config;
        let metrics = &self.metrics;

        if cfg.source != SourceKind::GuppiFile {
            return Err(FrscError::UnsupportedSource(cfg.source.to_string()).into());
        }

        let mut reader = GuppiReader::new(input).with_max_header_len(cfg.max_header_len);

        // Метаданные берутся из первого заголовка
        let first = reader.read_header()?.ok_or(AnalyzerError::EmptyInput)?;
        debug!(
            "First header: {} bytes, payload at {}",
            first.len(),
            first.payload_offset
        );
        let meta = GuppiMetadata::extract(&first.text, cfg.block_size)?;
        log_metadata(&meta);

        let mut prototype = cfg.prototype_header(&meta);

        let n0 = window_samples(prototype.t0, prototype.fs);
        if n0 == 0 {
            return Err(FrscError::invalid_layout(format!(
                "T0={} s is shorter than one sample at fs={} Hz",
                prototype.t0, prototype.fs
            ))
            .into());
        }
        prototype.t0 = n0 as f64 / prototype.fs;
        log_window("T0", n0, prototype.t0, meta.n_chan);

        let n1 = window_samples(prototype.t1, prototype.fs);
        if n1 > 0 {
            prototype.t1 = n1 as f64 / prototype.fs;
            log_window("T1", n1, prototype.t1, meta.n_chan);
        }

        let mut t0 = WindowStage {
            rebuffer: Rebuffer::new(&meta, n0, prototype.exclude_channel)?,
            engine: StatisticsEngine::with_scratch(ReportType::TimeFull0, n0)?,
        };
        let mut t1 = match (n1 > 0, cfg.t1_reports) {
            (true, true) => Some(WindowStage {
                rebuffer: Rebuffer::new(&meta, n1, prototype.exclude_channel)?,
                engine: StatisticsEngine::with_scratch(ReportType::TimeFull1, n1)?,
            }),
            (true, false) => {
                info!("T1 window configured but not driven (use --t1-reports)");
                None
            }
            _ => None,
        };

        let mut writer = ReportWriter::new(output, prototype)?;
        metrics.reports_written.fetch_add(1, Ordering::Relaxed);

        let mut block = Vec::new();
        block
            .try_reserve_exact(meta.block_size)
            .map_err(|_| FrscError::AllocationFailed {
                what: "raw block",
                bytes: meta.block_size,
            })?;
        block.resize(meta.block_size, 0);

        info!("Beginning main loop...");

        loop {
            let started = Instant::now();
            let status = reader.read_block(&mut block)?;
            metrics.add_read_time(started.elapsed());

            if let BlockRead::Short(n) = status {
                warn!(
                    "Block {} ends after {n} of {} bytes; treating as end of input",
                    reader.blocks_read() + 1,
                    meta.block_size
                );
                break;
            }
            metrics.blocks_read.fetch_add(1, Ordering::Relaxed);
            metrics
                .bytes_read
                .fetch_add(meta.block_size as u64, Ordering::Relaxed);

            let started = Instant::now();
            self.feed(&mut t0, &block, &mut writer)?;
            if let Some(stage) = t1.as_mut() {
                self.feed(stage, &block, &mut writer)?;
            }
            metrics.add_swallow_time(started.elapsed());

            debug!(
                "Block {}: f_start0 = {:.6} s",
                reader.blocks_read(),
                t0.rebuffer.f_start()
            );

            let started = Instant::now();
            let next = reader.read_header();
            metrics.add_read_time(started.elapsed());

            match next {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(FrscError::TruncatedHeader { read }) => {
                    warn!("{read} trailing bytes do not form a header; treating as end of input");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("End of main loop.");

        for (name, stage) in [("T0", Some(&t0)), ("T1", t1.as_ref())] {
            if let Some(stage) = stage {
                let window = stage.rebuffer.window();
                if window.filled() > 0 {
                    info!(
                        "Discarding partial {name} window: {} of {} samples/channel",
                        window.filled(),
                        window.samples_per_channel()
                    );
                }
            }
        }

        Ok(writer.finish()?)
    }

    /// Передаёт блок в окно; каждое заполненное окно сразу анализируется и
    /// записывается.
    fn feed<W: Write>(
        &self,
        stage: &mut WindowStage,
        block: &[u8],
        writer: &mut ReportWriter<W>,
    ) -> FrscResult<()> {
        let metrics = &self.metrics;
        let engine = &mut stage.engine;

        stage.rebuffer.swallow(
            block,
            &mut |window: &WindowBuffer, f_start: f64| -> FrscResult<()> {
                metrics.windows_completed.fetch_add(1, Ordering::Relaxed);
                if engine.analyze(window, f_start, writer)?.is_some() {
                    metrics.reports_written.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            },
        )?;

        Ok(())
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

fn log_metadata(meta: &GuppiMetadata) {
    info!("Here is what I learned from the header:");
    info!("  BACKEND  = {}", meta.backend);
    info!("  PKTFMT   = {}", meta.pktfmt);
    info!("  FD_POLN  = {}", meta.fd_poln);
    info!("  NBITS    = {}", meta.nbits);
    info!("  NPOL     = {}", meta.npol);
    info!("  BLOCSIZE = {} bytes", meta.block_size);
    info!("  OVERLAP  = {} samples", meta.overlap);
    info!("  OBSFREQ  = {} MHz (center frequency)", meta.obsfreq);
    info!("  OBSBW    = {} MHz (all channels)", meta.obsbw);
    info!("  CHAN_BW  = {} MHz (one channel)", meta.chan_bw);
    info!("  OBSNCHAN = {}", meta.n_chan);
    info!("  fs       = {:e} samples/s (1/TBIN)", meta.sample_rate());
    if let Some((day, sec)) = meta.start_mjd {
        info!("  STT      = MJD {day} + {sec} s");
    }
}

fn log_window(
    name: &str,
    samples: usize,
    duration: f64,
    n_chan: usize,
) {
    info!(
        "n{name} = {samples}; {name} recomputed, now {duration:e} s. Buffer is {:.3} MB",
        (samples * n_chan * 4) as f64 / (1024.0 * 1024.0)
    );
}

/// Прототип, который запишет пайплайн для `meta` (для проверок и
/// инструментов).
pub fn expected_prototype(
    config: &AnalyzerConfig,
    meta: &GuppiMetadata,
) -> ReportHeader {
    let mut prototype = config.prototype_header(meta);
    let n0 = window_samples(prototype.t0, prototype.fs);
    if n0 > 0 {
        prototype.t0 = n0 as f64 / prototype.fs;
    }
    let n1 = window_samples(prototype.t1, prototype.fs);
    if n1 > 0 {
        prototype.t1 = n1 as f64 / prototype.fs;
    }
    prototype
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use frsc_core::{read_all_reports, GuppiHeaderBuilder, ReportReader};
    use frsc_types::{DualPolSample, BYTES_PER_SAMPLE};

    use super::*;

    /// 2 канала × 8 выборок, перекрытие 2, fs = 4 Гц.
    fn meta() -> GuppiMetadata {
        GuppiMetadata {
            block_size: 2 * 8 * BYTES_PER_SAMPLE,
            n_chan: 2,
            chan_bw: 0.5,
            tbin: 0.25,
            overlap: 2,
            ..GuppiMetadata::default()
        }
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            t0: 1.0,
            block_size: meta().block_size,
            ..AnalyzerConfig::default()
        }
    }

    fn guppi_stream(blocks: usize) -> Vec<u8> {
        let builder = GuppiHeaderBuilder::from_metadata(&meta());
        let mut out = Vec::new();
        for b in 0..blocks {
            let payload: Vec<u8> = (0..16)
                .flat_map(|i| {
                    DualPolSample {
                        xi: (b * 16 + i) as i8 + 1,
                        xq: 1,
                        yi: -1,
                        yq: 2,
                    }
                    .to_bytes()
                })
                .collect();
            builder.write_block(&mut out, &payload).unwrap();
        }
        out
    }

    fn reports(bytes: Vec<u8>) -> Vec<frsc_types::Report> {
        read_all_reports(&mut ReportReader::new(Cursor::new(bytes))).unwrap()
    }

    #[test]
    fn test_pipeline_emits_gap_free_sequence() {
        let (pipeline, metrics) = AnalysisPipeline::new(config());
        let out = pipeline
            .run_with(Cursor::new(guppi_stream(4)), Vec::new())
            .unwrap();

        // 4 блока × 6 выборок = 24 = 6 окон по 4
        let reports = reports(out);
        assert_eq!(reports.len(), 7);
        for (i, r) in reports.iter().enumerate() {
            assert_eq!(r.header.seq_no, i as i64);
        }
        assert_eq!(reports[0].header.report_type, ReportType::Null);
        assert!(reports[1..]
            .iter()
            .all(|r| r.header.report_type == ReportType::TimeFull0));
        for pair in reports.windows(2) {
            assert!(pair[1].header.f_start >= pair[0].header.f_start);
        }

        assert_eq!(metrics.blocks_read.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.windows_completed.load(Ordering::Relaxed), 6);
        assert_eq!(metrics.reports_written.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_pipeline_rejects_realtime_source() {
        let cfg = AnalyzerConfig {
            source: SourceKind::GuppiRealtime,
            ..config()
        };
        let (pipeline, _) = AnalysisPipeline::new(cfg);
        let err = pipeline
            .run_with(Cursor::new(guppi_stream(1)), Vec::new())
            .unwrap_err();

        assert!(matches!(
            err,
            AnalyzerError::Frsc(FrscError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_pipeline_empty_input() {
        let (pipeline, _) = AnalysisPipeline::new(config());
        let err = pipeline
            .run_with(Cursor::new(Vec::new()), Vec::new())
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::EmptyInput));
    }

    #[test]
    fn test_pipeline_window_shorter_than_sample() {
        let cfg = AnalyzerConfig {
            t0: 0.1,
            ..config()
        };
        let (pipeline, _) = AnalysisPipeline::new(cfg);
        let err = pipeline
            .run_with(Cursor::new(guppi_stream(1)), Vec::new())
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Frsc(FrscError::InvalidLayout(_))));
    }

    #[test]
    fn test_pipeline_t1_reports() {
        let cfg = AnalyzerConfig {
            t1: 3.0,
            t1_reports: true,
            ..config()
        };
        let (pipeline, _) = AnalysisPipeline::new(cfg);
        let out = pipeline
            .run_with(Cursor::new(guppi_stream(4)), Vec::new())
            .unwrap();

        let reports = reports(out);
        let t0 = reports
            .iter()
            .filter(|r| r.header.report_type == ReportType::TimeFull0)
            .count();
        let t1 = reports
            .iter()
            .filter(|r| r.header.report_type == ReportType::TimeFull1)
            .count();

        // 24 выборки: 6 окон T0 (4) и 2 окна T1 (12)
        assert_eq!(t0, 6);
        assert_eq!(t1, 2);
        assert_eq!(reports[0].header.t1, 3.0);
    }

    #[test]
    fn test_pipeline_t1_not_driven_by_default() {
        let cfg = AnalyzerConfig {
            t1: 3.0,
            ..config()
        };
        let (pipeline, _) = AnalysisPipeline::new(cfg);
        let out = pipeline
            .run_with(Cursor::new(guppi_stream(4)), Vec::new())
            .unwrap();

        assert!(reports(out)
            .iter()
            .all(|r| r.header.report_type != ReportType::TimeFull1));
    }

    #[test]
    fn test_expected_prototype_matches_written() {
        let cfg = AnalyzerConfig {
            t0: 1.1,
            ..config()
        };
        let (pipeline, _) = AnalysisPipeline::new(cfg.clone());
        let out = pipeline
            .run_with(Cursor::new(guppi_stream(1)), Vec::new())
            .unwrap();

        let written = &reports(out)[0].header;
        assert_eq!(*written, expected_prototype(&cfg, &meta()));
        assert_eq!(written.t0, 1.0);
    }
}
