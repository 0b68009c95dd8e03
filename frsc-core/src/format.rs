//! Бинарный формат файла отчётов frsc.
//!
//! Файл — последовательность отчётов `[заголовок][тело]`. Все числа
//! little-endian, без выравнивания, поля в порядке объявления. Размер тела
//! определяется типом отчёта из заголовка.

use std::io::{Read, Write};

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use frsc_types::{
    BaselineMethod, BaselineUnits, ChannelMask, ChannelStats, Clips, DaStats, FrscError,
    FrscResult, PolStats, ReportHeader, ReportType, SourceKind, SubChannelMethod, TdBody,
    INFO_LEN, MASK_WORDS, MAX_CHANNELS,
};

/// Размер заголовка отчёта на диске
pub const REPORT_HEADER_SIZE: usize = 468;

/// Размер записи статистики восьми величин (8 × 5 × f32)
pub const POL_STATS_SIZE: usize = PolStats::FIELD_COUNT * 4;

/// Размер пары счётчиков клиппирования
pub const CLIPS_SIZE: usize = 16;

/// Размер поканальной записи
pub const CHANNEL_STATS_SIZE: usize = POL_STATS_SIZE + CLIPS_SIZE;

/// Размер тела временного анализа (типы 1 и 2)
pub const TD_BODY_SIZE: usize = CLIPS_SIZE + POL_STATS_SIZE + MAX_CHANNELS * CHANNEL_STATS_SIZE;

/// Размер тела отчёта заданного типа; `None`, если формат тела не определён.
pub fn body_size(report_type: ReportType) -> Option<usize> {
    match report_type {
        ReportType::Null => Some(0),
        ReportType::TimeFull0 | ReportType::TimeFull1 => Some(TD_BODY_SIZE),
        _ => None,
    }
}

/// Сериализация заголовка отчёта
pub trait ReportHeaderExt: Sized {
    fn write_to<W: Write>(
        &self,
        w: &mut W,
    ) -> FrscResult<()>;

    fn read_from<R: Read>(r: &mut R) -> FrscResult<Self>;

    fn serialize(&self) -> FrscResult<Vec<u8>>;

    fn deserialize(buf: &[u8]) -> FrscResult<Self>;
}

/// Сериализация тела временного анализа
pub trait TdBodyExt: Sized {
    fn write_to<W: Write>(
        &self,
        w: &mut W,
    ) -> FrscResult<()>;

    fn read_from<R: Read>(r: &mut R) -> FrscResult<Self>;
}

impl ReportHeaderExt for ReportHeader {
    fn write_to<W: Write>(
        &self,
        w: &mut W,
    ) -> FrscResult<()> {
        w.write_i32::<LE>(self.report_type.as_i32())?;
        w.write_i64::<LE>(self.err)?;
        w.write_u16::<LE>(self.report_version)?;
        w.write_u16::<LE>(self.tool_version)?;
        w.write_u8(self.source.as_u8())?;
        w.write_all(&encode_info(&self.info))?;

        w.write_i64::<LE>(self.start_sec)?;
        w.write_i64::<LE>(self.start_usec)?;
        w.write_i64::<LE>(self.n_ch)?;
        w.write_f32::<LE>(self.bw)?;
        w.write_f64::<LE>(self.fc)?;
        w.write_f64::<LE>(self.fs)?;

        w.write_u8(self.tflags)?;
        w.write_u8(self.fflags)?;
        w.write_f64::<LE>(self.t0)?;
        w.write_f64::<LE>(self.t1)?;
        w.write_f64::<LE>(self.t2)?;
        write_mask(w, &self.exclude_all)?;
        write_mask(w, &self.exclude_channel)?;

        w.write_i64::<LE>(self.n_sub_ch)?;
        w.write_u8(self.sub_ch_method.as_u8())?;
        w.write_u8(self.tbl_method.as_u8())?;
        w.write_i32::<LE>(self.tbl_order)?;
        w.write_u8(self.tbl_units.as_u8())?;
        w.write_i32::<LE>(self.nfft)?;
        w.write_i32::<LE>(self.nfch)?;
        w.write_u8(self.fbl_method.as_u8())?;
        w.write_i32::<LE>(self.fbl_order)?;
        w.write_u8(self.fbl_units.as_u8())?;

        w.write_i64::<LE>(self.seq_no)?;
        w.write_f64::<LE>(self.f_start)?;

        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> FrscResult<Self> {
        let report_type = ReportType::from_i32(r.read_i32::<LE>()?)?;
        let err = r.read_i64::<LE>()?;
        let report_version = r.read_u16::<LE>()?;
        let tool_version = r.read_u16::<LE>()?;
        let source = SourceKind::from_u8(r.read_u8()?)
            .map_err(|e| FrscError::format_violation(e.to_string()))?;

        let mut info = [0u8; INFO_LEN];
        r.read_exact(&mut info)?;

        Ok(ReportHeader {
            report_type,
            err,
            report_version,
            tool_version,
            source,
            info: decode_info(&info),
            start_sec: r.read_i64::<LE>()?,
            start_usec: r.read_i64::<LE>()?,
            n_ch: r.read_i64::<LE>()?,
            bw: r.read_f32::<LE>()?,
            fc: r.read_f64::<LE>()?,
            fs: r.read_f64::<LE>()?,
            tflags: r.read_u8()?,
            fflags: r.read_u8()?,
            t0: r.read_f64::<LE>()?,
            t1: r.read_f64::<LE>()?,
            t2: r.read_f64::<LE>()?,
            exclude_all: read_mask(r)?,
            exclude_channel: read_mask(r)?,
            n_sub_ch: r.read_i64::<LE>()?,
            sub_ch_method: SubChannelMethod::from_u8(r.read_u8()?)?,
            tbl_method: BaselineMethod::from_u8(r.read_u8()?)?,
            tbl_order: r.read_i32::<LE>()?,
            tbl_units: BaselineUnits::from_u8(r.read_u8()?)?,
            nfft: r.read_i32::<LE>()?,
            nfch: r.read_i32::<LE>()?,
            fbl_method: BaselineMethod::from_u8(r.read_u8()?)?,
            fbl_order: r.read_i32::<LE>()?,
            fbl_units: BaselineUnits::from_u8(r.read_u8()?)?,
            seq_no: r.read_i64::<LE>()?,
            f_start: r.read_f64::<LE>()?,
        })
    }

    fn serialize(&self) -> FrscResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(REPORT_HEADER_SIZE);
        self.write_to(&mut buf)?;
        debug_assert_eq!(buf.len(), REPORT_HEADER_SIZE);
        Ok(buf)
    }

    fn deserialize(buf: &[u8]) -> FrscResult<Self> {
        if buf.len() < REPORT_HEADER_SIZE {
            return Err(FrscError::corrupted(format!(
                "report header needs {REPORT_HEADER_SIZE} bytes, got {}",
                buf.len()
            )));
        }
        let mut slice = &buf[..REPORT_HEADER_SIZE];
        Self::read_from(&mut slice)
    }
}

impl TdBodyExt for TdBody {
    fn write_to<W: Write>(
        &self,
        w: &mut W,
    ) -> FrscResult<()> {
        if self.channels.len() != MAX_CHANNELS {
            return Err(FrscError::format_violation(format!(
                "time-domain body must carry {MAX_CHANNELS} channel records, has {}",
                self.channels.len()
            )));
        }

        write_clips(w, &self.clips)?;
        write_pol(w, &self.full_band)?;
        for ch in &self.channels {
            write_pol(w, &ch.pol)?;
            write_clips(w, &ch.clips)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> FrscResult<Self> {
        let clips = read_clips(r)?;
        let full_band = read_pol(r)?;

        let mut channels = Vec::with_capacity(MAX_CHANNELS);
        for _ in 0..MAX_CHANNELS {
            let pol = read_pol(r)?;
            let clips = read_clips(r)?;
            channels.push(ChannelStats { pol, clips });
        }

        Ok(TdBody {
            clips,
            full_band,
            channels,
        })
    }
}

/// Строка `info` в поле фиксированной длины с завершающим NUL.
fn encode_info(info: &str) -> [u8; INFO_LEN] {
    let mut out = [0u8; INFO_LEN];
    let bytes = info.as_bytes();
    let n = bytes.len().min(INFO_LEN - 1);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

fn decode_info(raw: &[u8; INFO_LEN]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(INFO_LEN);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn write_mask<W: Write>(
    w: &mut W,
    mask: &ChannelMask,
) -> FrscResult<()> {
    for &word in mask.words() {
        w.write_u64::<LE>(word)?;
    }
    Ok(())
}

fn read_mask<R: Read>(r: &mut R) -> FrscResult<ChannelMask> {
    let mut words = [0u64; MASK_WORDS];
    r.read_u64_into::<LE>(&mut words)?;
    Ok(ChannelMask::from_words(words))
}

fn write_clips<W: Write>(
    w: &mut W,
    clips: &Clips,
) -> FrscResult<()> {
    w.write_i64::<LE>(clips.x)?;
    w.write_i64::<LE>(clips.y)?;
    Ok(())
}

fn read_clips<R: Read>(r: &mut R) -> FrscResult<Clips> {
    Ok(Clips {
        x: r.read_i64::<LE>()?,
        y: r.read_i64::<LE>()?,
    })
}

fn write_pol<W: Write>(
    w: &mut W,
    pol: &PolStats,
) -> FrscResult<()> {
    for q in pol.quantities() {
        w.write_f32::<LE>(q.mean)?;
        w.write_f32::<LE>(q.max)?;
        w.write_f32::<LE>(q.rms)?;
        w.write_f32::<LE>(q.skewness)?;
        w.write_f32::<LE>(q.kurtosis)?;
    }
    Ok(())
}

fn read_pol<R: Read>(r: &mut R) -> FrscResult<PolStats> {
    let mut pol = PolStats::default();
    for q in pol.quantities_mut() {
        *q = DaStats {
            mean: r.read_f32::<LE>()?,
            max: r.read_f32::<LE>()?,
            rms: r.read_f32::<LE>()?,
            skewness: r.read_f32::<LE>()?,
            kurtosis: r.read_f32::<LE>()?,
        };
    }
    Ok(pol)
}
