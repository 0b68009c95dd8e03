//! Статистика окна во временной области.
//!
//! Для каждого из восьми производных сигналов (xi, xq, yi, yq, |x|², |y|²,
//! U, V) считаются среднее, максимум, СКО, асимметрия и эксцесс за три
//! прохода: производные величины и клиппинг, суммы и максимумы, центральные
//! моменты. Суммы накапливаются в `f64`, в отчёт идут `f32`.

use std::io::Write;

use frsc_core::ReportWriter;
use frsc_types::{
    Clips, DaStats, DualPolSample, FrscError, FrscResult, PolStats, ReportHeader, ReportType,
    TdBody, TFLAG_CHANNELS, TFLAG_FULL_BAND,
};
use log::debug;

use crate::WindowBuffer;

/// Число производных величин в строке.
pub const QUANTITIES: usize = 8;

/// Множители U и V: U = 2·Re(x·y*), V = −2·Im(x·y*).
const SCALE: [f64; QUANTITIES] = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, -2.0];

/// Производные величины одной выборки до масштабирования.
type Row = [f64; QUANTITIES];

fn derive(s: &DualPolSample) -> Row {
    [
        s.xi as f64,
        s.xq as f64,
        s.yi as f64,
        s.yq as f64,
        s.x_power(),
        s.y_power(),
        s.cross_re(),
        s.cross_im(),
    ]
}

/// Рабочие буферы статистики: одна строка производных величин на выборку
/// канала. Размер фиксируется при создании.
#[derive(Debug)]
pub struct ScratchSpace {
    rows: Vec<Row>,
}

impl ScratchSpace {
    pub fn new(samples: usize) -> FrscResult<Self> {
        let mut rows = Vec::new();
        rows.try_reserve_exact(samples)
            .map_err(|_| FrscError::AllocationFailed {
                what: "statistics scratch space",
                bytes: samples.saturating_mul(std::mem::size_of::<Row>()),
            })?;
        rows.resize(samples, [0.0; QUANTITIES]);

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Проверяет, что окно совпадает с размером буферов.
    pub fn check(
        &self,
        samples: usize,
    ) -> FrscResult<()> {
        if samples != self.rows.len() {
            return Err(FrscError::ScratchSizeMismatch {
                expected: self.rows.len(),
                found: samples,
            });
        }
        Ok(())
    }
}

/// Суммы и максимумы (второй проход).
struct FirstMoments {
    count: usize,
    sum: Row,
    max: Row,
}

impl FirstMoments {
    fn new() -> Self {
        Self {
            count: 0,
            sum: [0.0; QUANTITIES],
            max: [f64::NEG_INFINITY; QUANTITIES],
        }
    }

    fn push(
        &mut self,
        row: &Row,
    ) {
        self.count += 1;
        for q in 0..QUANTITIES {
            self.sum[q] += row[q];
            if row[q] > self.max[q] {
                self.max[q] = row[q];
            }
        }
    }

    fn means(&self) -> Row {
        let n = self.count as f64;
        std::array::from_fn(|q| SCALE[q] * self.sum[q] / n)
    }
}

/// Центральные моменты (третий проход).
struct CentralMoments {
    mean: Row,
    m2: Row,
    m3: Row,
    m4: Row,
}

impl CentralMoments {
    fn new(mean: Row) -> Self {
        Self {
            mean,
            m2: [0.0; QUANTITIES],
            m3: [0.0; QUANTITIES],
            m4: [0.0; QUANTITIES],
        }
    }

    fn push(
        &mut self,
        row: &Row,
    ) {
        for q in 0..QUANTITIES {
            let d = SCALE[q] * row[q] - self.mean[q];
            let d2 = d * d;
            self.m2[q] += d2;
            self.m3[q] += d2 * d;
            self.m4[q] += d2 * d2;
        }
    }

    fn finish(
        &self,
        first: &FirstMoments,
        out: &mut PolStats,
    ) {
        let n = first.count as f64;
        for (q, stats) in out.quantities_mut().into_iter().enumerate() {
            let rms = (self.m2[q] / n).sqrt();
            *stats = DaStats {
                mean: self.mean[q] as f32,
                max: (SCALE[q] * first.max[q]) as f32,
                rms: rms as f32,
                skewness: ((self.m3[q] / n) / (rms * rms * rms)) as f32,
                kurtosis: ((self.m4[q] / n) / (rms * rms * rms * rms) - 3.0) as f32,
            };
        }
    }
}

/// Движок статистики одного окна.
///
/// Владеет телом отчёта: поля исключённых каналов сохраняют значения
/// предыдущего окна.
#[derive(Debug)]
pub struct StatisticsEngine {
    report_type: ReportType,
    scratch: Option<ScratchSpace>,
    body: TdBody,
}

impl StatisticsEngine {
    ////////// Собственные методы

    /// `report_type` — тип отчётов движка (`TimeFull0` для окна T0,
    /// `TimeFull1` для T1).
    pub fn new(report_type: ReportType) -> Self {
        Self {
            report_type,
            scratch: None,
            body: TdBody::default(),
        }
    }

    /// Движок с заранее выделенными буферами под окно из `samples` выборок.
    pub fn with_scratch(
        report_type: ReportType,
        samples: usize,
    ) -> FrscResult<Self> {
        Ok(Self {
            scratch: Some(ScratchSpace::new(samples)?),
            ..Self::new(report_type)
        })
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn body(&self) -> &TdBody {
        &self.body
    }

    /// Считает статистику окна по флагам и маскам `prototype`. Возвращает
    /// `false`, если ни поканальный, ни полнополосный анализ не включён.
    ///
    /// Буферы выделяются при первом вызове; окно другого размера позже —
    /// ошибка [`FrscError::ScratchSizeMismatch`].
    pub fn compute(
        &mut self,
        window: &WindowBuffer,
        prototype: &ReportHeader,
    ) -> FrscResult<bool> {
        let do_channels = prototype.has_tflag(TFLAG_CHANNELS);
        let do_full_band = prototype.has_tflag(TFLAG_FULL_BAND);
        if !do_channels && !do_full_band {
            return Ok(false);
        }

        let samples = window.samples_per_channel();
        let scratch = match &mut self.scratch {
            Some(scratch) => {
                scratch.check(samples)?;
                scratch
            }
            slot @ None => slot.insert(ScratchSpace::new(samples)?),
        };

        let threshold = prototype.source.clip_power_threshold() as f64;
        let mut window_clips = Clips::default();

        if do_channels {
            for ch in 1..=window.n_chan() {
                if prototype.exclude_channel.test(ch) {
                    continue;
                }
                let stats = &mut self.body.channels[ch - 1];
                stats.clips = channel_stats(window, ch, scratch, threshold, &mut stats.pol);
                window_clips += stats.clips;
            }
        }

        if do_full_band {
            let included: Vec<usize> = (1..=window.n_chan())
                .filter(|&ch| !prototype.exclude_all.test(ch))
                .collect();
            let clips = full_band_stats(window, &included, threshold, &mut self.body.full_band);
            if !do_channels {
                window_clips = clips;
            }
        }

        self.body.clips = window_clips;

        Ok(true)
    }

    /// Считает статистику окна и записывает отчёт. Возвращает номер отчёта
    /// или `None`, если анализ выключен флагами.
    pub fn analyze<W: Write>(
        &mut self,
        window: &WindowBuffer,
        f_start: f64,
        writer: &mut ReportWriter<W>,
    ) -> FrscResult<Option<i64>> {
        if !self.compute(window, writer.prototype())? {
            return Ok(None);
        }

        let seq = writer.write_report(self.report_type, f_start, Some(&self.body))?;
        debug!(
            "report #{seq}: {:?} f_start={f_start:.6}s clips x={} y={}",
            self.report_type, self.body.clips.x, self.body.clips.y
        );

        Ok(Some(seq))
    }
}

/// Три прохода по каналу `ch` через рабочие буферы.
fn channel_stats(
    window: &WindowBuffer,
    ch: usize,
    scratch: &mut ScratchSpace,
    threshold: f64,
    out: &mut PolStats,
) -> Clips {
    let mut clips = Clips::default();

    // Проход 1: производные величины и клиппинг
    for (row, s) in scratch.rows.iter_mut().zip(window.channel_samples(ch)) {
        *row = derive(&s);
        if row[4] >= threshold {
            clips.x += 1;
        }
        if row[5] >= threshold {
            clips.y += 1;
        }
    }

    // Проход 2: средние и максимумы
    let mut first = FirstMoments::new();
    for row in &scratch.rows {
        first.push(row);
    }

    // Проход 3: центральные моменты
    let mut central = CentralMoments::new(first.means());
    for row in &scratch.rows {
        central.push(row);
    }
    central.finish(&first, out);

    clips
}

/// Статистика по объединённым выборкам каналов `channels`.
fn full_band_stats(
    window: &WindowBuffer,
    channels: &[usize],
    threshold: f64,
    out: &mut PolStats,
) -> Clips {
    let mut clips = Clips::default();
    if channels.is_empty() {
        return clips;
    }

    let pooled = || {
        channels
            .iter()
            .flat_map(|&ch| window.channel_samples(ch))
            .map(|s| derive(&s))
    };

    let mut first = FirstMoments::new();
    for row in pooled() {
        if row[4] >= threshold {
            clips.x += 1;
        }
        if row[5] >= threshold {
            clips.y += 1;
        }
        first.push(&row);
    }

    let mut central = CentralMoments::new(first.means());
    for row in pooled() {
        central.push(&row);
    }
    central.finish(&first, out);

    clips
}
