use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
};

use frsc_core::ReportReader;
use frsc_types::{ChannelMask, ReportHeader, TdBody};
use log::{info, warn};

use crate::{DumpConfig, ReadError, ReadResult};

/// Число столбцов в строке файла столбцов: номер, время, клиппинг x/y и
/// 8 величин × 5 моментов.
pub const COLUMN_COUNT: usize = 44;

/// Итоги чтения файла отчётов.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    /// Прочитано полных отчётов
    pub reports: u64,
    /// Из них с телом временного анализа
    pub td_reports: u64,
    /// Строк записано в файл столбцов
    pub rows_written: u64,
    /// Байт в усечённом хвосте файла
    pub truncated_bytes: u64,
}

/// Сессия чтения файла отчётов.
pub struct DumpSession {
    config: DumpConfig,
}

impl DumpSession {
    /// Создаёт сессию, проверяя конфигурацию.
    pub fn new(config: DumpConfig) -> ReadResult<Self> {
        if config.channel == Some(0) {
            return Err(ReadError::Config("channel numbers start at 1".to_string()));
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Читает файл из конфигурации. Текст идёт в stdout, столбцы выбранного
    /// канала в файл столбцов.
    pub fn run(&self) -> ReadResult<DumpSummary> {
        let input = File::open(&self.config.input_path)?;

        let mut columns = match self.config.channel {
            Some(_) => Some(BufWriter::new(File::create(&self.config.columns_path)?)),
            None => None,
        };

        let stdout = io::stdout();
        let mut out = stdout.lock();

        let summary = self.dump(
            input,
            &mut out,
            columns.as_mut().map(|w| w as &mut dyn Write),
        )?;

        if let Some(mut w) = columns {
            w.flush()?;
            info!(
                "{} rows written to {:?}",
                summary.rows_written, self.config.columns_path
            );
        }

        Ok(summary)
    }

    /// Читает отчёты из `input`: полный заголовок первого отчёта и по
    /// строке на каждый отчёт в `out`, столбцы канала в `columns`.
    pub fn dump<R: Read, O: Write>(
        &self,
        input: R,
        out: &mut O,
        mut columns: Option<&mut dyn Write>,
    ) -> ReadResult<DumpSummary> {
        let mut reader = ReportReader::new(input);
        let mut summary = DumpSummary::default();

        while let Some(result) = reader.next_report() {
            let report = result?;
            let h = &report.header;

            if summary.reports == 0 {
                write_header(out, h)?;

                if let Some(ch) = self.config.channel {
                    if ch as i64 > h.n_ch {
                        return Err(ReadError::Config(format!(
                            "channel {ch} is out of range 1..={}",
                            h.n_ch
                        )));
                    }
                }

                writeln!(out, "Reports in file order:")?;
            }
            summary.reports += 1;

            writeln!(
                out,
                "  type={} err={} seq_no={} f_start={:.6}",
                h.report_type.as_i32(),
                h.err,
                h.seq_no,
                h.f_start
            )?;

            if self.config.json {
                writeln!(out, "{}", serde_json::to_string(&report)?)?;
            }

            if let Some(body) = &report.body {
                summary.td_reports += 1;

                if let (Some(ch), Some(w)) = (self.config.channel, columns.as_deref_mut()) {
                    if let Some(row) = format_columns(h, body, ch) {
                        writeln!(w, "{row}")?;
                        summary.rows_written += 1;
                    }
                }
            }
        }

        summary.truncated_bytes = reader.stats().truncated_bytes;
        if summary.truncated_bytes > 0 {
            warn!(
                "Report file ends with {} bytes of an incomplete report",
                summary.truncated_bytes
            );
        }
        if summary.reports == 0 {
            warn!("No reports found");
        }

        Ok(summary)
    }
}

/// Строка файла столбцов для канала `ch` (1-based): номер отчёта, время
/// начала, клиппинг окна, затем среднее, максимум, СКО, асимметрия и
/// эксцесс для xi, xq, yi, yq, |x|², |y|², U, V.
pub fn format_columns(
    header: &ReportHeader,
    body: &TdBody,
    ch: usize,
) -> Option<String> {
    let stats = body.channel(ch)?;

    let mut row = format!(
        "{} {:.6} {} {}",
        header.seq_no, header.f_start, body.clips.x, body.clips.y
    );
    for q in stats.pol.quantities() {
        for v in [q.mean, q.max, q.rms, q.skewness, q.kurtosis] {
            row.push_str(&format!(" {v:.6}"));
        }
    }

    Some(row)
}

/// Печатает все поля заголовка.
pub fn write_header<W: Write>(
    out: &mut W,
    h: &ReportHeader,
) -> io::Result<()> {
    writeln!(out, "First report header:")?;
    writeln!(out, "  report_type    = {}", h.report_type.as_i32())?;
    writeln!(out, "  err            = {}", h.err)?;
    writeln!(out, "  report_version = {}", h.report_version)?;
    writeln!(out, "  tool_version   = {}", h.tool_version)?;
    writeln!(out, "  source         = {} ({})", h.source.as_u8(), h.source)?;
    writeln!(out, "  info           = '{}'", h.info)?;
    writeln!(
        out,
        "  start          = {}.{:06} (unix time)",
        h.start_sec, h.start_usec
    )?;
    writeln!(out, "  n_ch           = {}", h.n_ch)?;
    writeln!(out, "  bw             = {:.6}", h.bw)?;
    writeln!(out, "  fc             = {:.6}", h.fc)?;
    writeln!(out, "  fs             = {:.6}", h.fs)?;
    writeln!(out, "  tflags         = {:#04x}", h.tflags)?;
    writeln!(out, "  fflags         = {:#04x}", h.fflags)?;
    writeln!(out, "  t0             = {:.6}", h.t0)?;
    writeln!(out, "  t1             = {:.6}", h.t1)?;
    writeln!(out, "  t2             = {:.6}", h.t2)?;
    writeln!(out, "  exclude_all    = {}", mask_words(&h.exclude_all))?;
    writeln!(out, "  exclude_ch     = {}", mask_words(&h.exclude_channel))?;
    writeln!(out, "  n_sub_ch       = {}", h.n_sub_ch)?;
    writeln!(out, "  sub_ch_method  = {}", h.sub_ch_method.as_u8())?;
    writeln!(out, "  tbl_method     = {}", h.tbl_method.as_u8())?;
    writeln!(out, "  tbl_order      = {}", h.tbl_order)?;
    writeln!(out, "  tbl_units      = {}", h.tbl_units.as_u8())?;
    writeln!(out, "  nfft           = {}", h.nfft)?;
    writeln!(out, "  nfch           = {}", h.nfch)?;
    writeln!(out, "  fbl_method     = {}", h.fbl_method.as_u8())?;
    writeln!(out, "  fbl_order      = {}", h.fbl_order)?;
    writeln!(out, "  fbl_units      = {}", h.fbl_units.as_u8())?;
    writeln!(out, "  seq_no         = {}", h.seq_no)?;
    writeln!(out, "  f_start        = {:.6}", h.f_start)
}

/// Слова маски от старшего к младшему.
fn mask_words(mask: &ChannelMask) -> String {
    mask.words()
        .iter()
        .rev()
        .map(|w| format!("{w:#018x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
