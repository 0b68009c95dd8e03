use std::io::{self, BufReader, BufWriter, Read, Write};

use frsc_types::{FrscError, FrscResult, Report, ReportHeader, ReportType, TdBody};
use log::warn;

use crate::format::{body_size, ReportHeaderExt, TdBodyExt, REPORT_HEADER_SIZE};

/// Потоковый писатель файла отчётов.
///
/// Каждый отчёт сбрасывается в нижележащий поток сразу после записи.
pub struct ReportWriter<W: Write> {
    writer: BufWriter<W>,
    prototype: ReportHeader,
    reports_written: u64,
}

/// Потоковый читатель файла отчётов.
pub struct ReportReader<R: Read> {
    reader: BufReader<R>,
    header_buf: [u8; REPORT_HEADER_SIZE],
    stats: ReadStats,
    done: bool,
}

/// Статистика, накопленная [`ReportReader`] в процессе чтения.
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    /// Успешно прочитанных отчётов.
    pub reports_ok: u64,
    /// Отчётов с телом временного анализа.
    pub td_reports: u64,
    /// Байт в усечённом хвосте файла (0, если файл цел).
    pub truncated_bytes: u64,
    /// Всего обработано байт.
    pub bytes_processed: u64,
}

impl<W: Write> ReportWriter<W> {
    /// Создаёт писатель и сразу записывает прототип заголовка как отчёт без
    /// тела.
    pub fn new(
        inner: W,
        prototype: ReportHeader,
    ) -> FrscResult<Self> {
        let mut writer = BufWriter::new(inner);

        prototype.write_to(&mut writer)?;
        writer.flush()?;

        Ok(Self {
            writer,
            prototype,
            reports_written: 1,
        })
    }

    /// Записывает очередной отчёт: копию прототипа с новым номером, типом и
    /// временем начала окна, затем тело. Возвращает номер отчёта.
    pub fn write_report(
        &mut self,
        report_type: ReportType,
        f_start: f64,
        body: Option<&TdBody>,
    ) -> FrscResult<i64> {
        if report_type.has_time_domain_body() != body.is_some() {
            return Err(FrscError::format_violation(format!(
                "report type {report_type:?} does not match the supplied body"
            )));
        }

        let header = self.prototype.next_report(report_type, f_start);

        header.write_to(&mut self.writer)?;
        if let Some(body) = body {
            body.write_to(&mut self.writer)?;
        }
        self.writer.flush()?;

        self.reports_written += 1;

        Ok(header.seq_no)
    }

    /// Завершает запись и возвращает нижележащий поток.
    pub fn finish(mut self) -> FrscResult<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| FrscError::Io(e.into_error()))
    }

    /// Количество записанных отчётов, включая прототип.
    pub fn reports_written(&self) -> u64 {
        self.reports_written
    }

    /// Прототип заголовка (с номером последнего отчёта).
    pub fn prototype(&self) -> &ReportHeader {
        &self.prototype
    }
}

impl<R: Read> ReportReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            header_buf: [0u8; REPORT_HEADER_SIZE],
            stats: ReadStats::default(),
            done: false,
        }
    }

    /// Возвращает следующий отчёт или `None` на конце файла.
    ///
    /// Усечённый последний отчёт не ошибка: он учитывается в
    /// [`ReadStats::truncated_bytes`] и завершает чтение. Отчёт, формат тела
    /// которого не определён, возвращается как ошибка и тоже завершает
    /// чтение.
    pub fn next_report(&mut self) -> Option<FrscResult<Report>> {
        if self.done {
            return None;
        }

        match self.read_report() {
            Ok(Some(report)) => Some(Ok(report)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn read_report(&mut self) -> FrscResult<Option<Report>> {
        let got = read_full(&mut self.reader, &mut self.header_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < REPORT_HEADER_SIZE {
            self.truncated(got);
            return Ok(None);
        }

        let header = ReportHeader::deserialize(&self.header_buf)?;
        let size = body_size(header.report_type).ok_or_else(|| {
            FrscError::format_violation(format!(
                "report #{} has type {:?} without a defined body layout",
                header.seq_no, header.report_type
            ))
        })?;

        let body = if size == 0 {
            None
        } else {
            let mut raw = vec![0u8; size];
            let got = read_full(&mut self.reader, &mut raw)?;
            if got < size {
                self.truncated(REPORT_HEADER_SIZE + got);
                return Ok(None);
            }
            self.stats.td_reports += 1;
            Some(TdBody::read_from(&mut raw.as_slice())?)
        };

        self.stats.reports_ok += 1;
        self.stats.bytes_processed += (REPORT_HEADER_SIZE + size) as u64;

        Ok(Some(Report { header, body }))
    }

    fn truncated(
        &mut self,
        bytes: usize,
    ) {
        warn!(
            "Truncated report after {} complete reports ({} trailing bytes)",
            self.stats.reports_ok, bytes
        );
        self.stats.truncated_bytes = bytes as u64;
        self.stats.bytes_processed += bytes as u64;
    }

    /// Накопленная статистика чтения.
    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }
}

impl<R: Read> Iterator for ReportReader<R> {
    type Item = FrscResult<Report>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_report()
    }
}

/// Convenience: читает все отчёты, останавливаясь на первой ошибке.
pub fn read_all_reports<R: Read>(reader: &mut ReportReader<R>) -> FrscResult<Vec<Report>> {
    let mut reports = Vec::new();
    while let Some(result) = reader.next_report() {
        reports.push(result?);
    }
    Ok(reports)
}

/// Читает до заполнения `buf` или конца потока; возвращает число байт.
fn read_full<R: Read>(
    r: &mut R,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
