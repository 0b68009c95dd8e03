use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use frsc_core::{GuppiMetadata, GUPPI_BLOCK_SIZE, MAX_HEADER_LEN};
use frsc_types::{
    BaselineMethod, BaselineUnits, ChannelMask, ReportHeader, ReportType, SourceKind,
    SubChannelMethod, MAX_CHANNELS, TFLAG_CHANNELS,
};

use crate::{AnalyzerError, AnalyzerResult};

/// Полная конфигурация прогона анализа: job-файл плюс параметры командной
/// строки.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Тип источника данных
    pub source: SourceKind,
    /// Сырой файл GUPPI (INFILE или --input)
    pub input_path: Option<PathBuf>,
    /// Файл отчётов
    pub output_path: PathBuf,
    /// Строка описания в заголовке отчёта
    pub info: String,
    pub tflags: u8,
    pub fflags: u8,
    /// Длительность быстрого окна, с
    pub t0: f64,
    /// Длительность медленного окна, с (`<= 0` — отключено)
    pub t1: f64,
    pub t2: f64,
    /// Каналы, исключённые из всей обработки
    pub exclude_all: ChannelMask,
    /// Каналы, исключённые из поканальной обработки
    pub exclude_channel: ChannelMask,
    pub n_sub_ch: i64,
    pub sub_ch_method: SubChannelMethod,
    pub tbl_method: BaselineMethod,
    pub tbl_order: i32,
    pub tbl_units: BaselineUnits,
    pub nfft: i32,
    pub nfch: i32,
    pub fbl_method: BaselineMethod,
    pub fbl_order: i32,
    pub fbl_units: BaselineUnits,
    /// Ожидаемый BLOCSIZE
    pub block_size: usize,
    /// Предельная длина текстового заголовка
    pub max_header_len: usize,
    /// Подключить статистику к окну T1
    pub t1_reports: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl AnalyzerConfig {
    /// Читает job-файл. Имя файла становится строкой описания, пока его не
    /// заменит INFILE.
    pub fn from_job_file<P: AsRef<Path>>(path: P) -> AnalyzerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::JobFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self {
            info: path.display().to_string(),
            ..Self::default()
        };
        config.apply_job_text(&text)?;

        Ok(config)
    }

    /// Применяет директивы job-файла по строкам.
    pub fn apply_job_text(
        &mut self,
        text: &str,
    ) -> AnalyzerResult<()> {
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            self.apply_directive(keyword, tokens.next())
                .map_err(|message| AnalyzerError::Config {
                    line: idx + 1,
                    message,
                })?;
        }

        Ok(())
    }

    fn apply_directive(
        &mut self,
        keyword: &str,
        value: Option<&str>,
    ) -> Result<(), String> {
        let value = || value.ok_or_else(|| format!("{keyword} requires a value"));

        match keyword {
            "SOURCE" => {
                self.source = SourceKind::from_u8(parse(keyword, value()?)?).map_err(|e| e.to_string())?
            }
            "INFILE" => {
                let value = value()?;
                self.input_path = Some(PathBuf::from(value));
                self.info = value.to_string();
            }
            "TFLAGS" => self.tflags = parse(keyword, value()?)?,
            "FFLAGS" => self.fflags = parse(keyword, value()?)?,
            "T0" => self.t0 = parse(keyword, value()?)?,
            "T1" => self.t1 = parse(keyword, value()?)?,
            "T2" => self.t2 = parse(keyword, value()?)?,
            "EXCLUDE" => {
                let ch = parse_channel(keyword, value()?)?;
                self.exclude_all.set(ch).map_err(|e| e.to_string())?;
                self.exclude_channel.set(ch).map_err(|e| e.to_string())?;
            }
            "INCLUDE" => {
                let ch = parse_channel(keyword, value()?)?;
                self.exclude_channel.clear(ch).map_err(|e| e.to_string())?;
            }
            "N_SUB_CH" => self.n_sub_ch = parse(keyword, value()?)?,
            "SUB_CH_METHOD" => {
                self.sub_ch_method =
                    SubChannelMethod::from_u8(parse(keyword, value()?)?).map_err(|e| e.to_string())?
            }
            "TBL_METHOD" => {
                self.tbl_method =
                    BaselineMethod::from_u8(parse(keyword, value()?)?).map_err(|e| e.to_string())?
            }
            "TBL_ORDER" => self.tbl_order = parse(keyword, value()?)?,
            "TBL_UNITS" => {
                self.tbl_units =
                    BaselineUnits::from_u8(parse(keyword, value()?)?).map_err(|e| e.to_string())?
            }
            "NFFT" => self.nfft = parse(keyword, value()?)?,
            "NFCH" => self.nfch = parse(keyword, value()?)?,
            "FBL_METHOD" => {
                self.fbl_method =
                    BaselineMethod::from_u8(parse(keyword, value()?)?).map_err(|e| e.to_string())?
            }
            "FBL_ORDER" => self.fbl_order = parse(keyword, value()?)?,
            "FBL_UNITS" => {
                self.fbl_units =
                    BaselineUnits::from_u8(parse(keyword, value()?)?).map_err(|e| e.to_string())?
            }
            _ => return Err(format!("keyword '{keyword}' not recognized")),
        }

        Ok(())
    }

    /// Прототип заголовка отчёта: параметры job-файла плюс то, что известно
    /// из заголовка GUPPI. Длительности окон ещё не пересчитаны.
    pub fn prototype_header(
        &self,
        meta: &GuppiMetadata,
    ) -> ReportHeader {
        let (start_sec, start_usec) = meta.start_unix().unwrap_or((0, 0));

        ReportHeader {
            report_type: ReportType::Null,
            source: self.source,
            info: self.info.clone(),
            start_sec,
            start_usec,
            n_ch: meta.n_chan as i64,
            bw: meta.bandwidth_hz() as f32,
            fc: meta.center_freq_hz(),
            fs: meta.sample_rate(),
            tflags: self.tflags,
            fflags: self.fflags,
            t0: self.t0,
            t1: self.t1,
            t2: self.t2,
            exclude_all: self.exclude_all,
            exclude_channel: self.exclude_channel,
            n_sub_ch: self.n_sub_ch,
            sub_ch_method: self.sub_ch_method,
            tbl_method: self.tbl_method,
            tbl_order: self.tbl_order,
            tbl_units: self.tbl_units,
            nfft: self.nfft,
            nfch: self.nfch,
            fbl_method: self.fbl_method,
            fbl_order: self.fbl_order,
            fbl_units: self.fbl_units,
            seq_no: 0,
            f_start: 0.0,
            ..ReportHeader::default()
        }
    }
}

/// Число целых выборок на канал в окне длительностью `duration` при частоте
/// `fs` (округление вниз). Неположительная длительность даёт 0.
pub fn window_samples(
    duration: f64,
    fs: f64,
) -> usize {
    let n = (duration * fs).floor();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

fn parse<T>(
    keyword: &str,
    value: &str,
) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| format!("invalid {keyword} value '{value}': {e}"))
}

fn parse_channel(
    keyword: &str,
    value: &str,
) -> Result<usize, String> {
    let ch: usize = parse(keyword, value)?;
    if !(1..=MAX_CHANNELS).contains(&ch) {
        return Err(format!(
            "{keyword} channel {ch} is outside 1..={MAX_CHANNELS}"
        ));
    }
    Ok(ch)
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для AnalyzerConfig
////////////////////////////////////////////////////////////////////////////////

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::GuppiFile,
            input_path: None,
            output_path: PathBuf::from("out.dat"),
            info: String::new(),
            tflags: TFLAG_CHANNELS,
            fflags: 0,
            t0: 1.0,
            t1: -1.0,
            t2: -1.0,
            exclude_all: ChannelMask::new(),
            exclude_channel: ChannelMask::new(),
            n_sub_ch: 0,
            sub_ch_method: SubChannelMethod::Fft,
            tbl_method: BaselineMethod::Simple,
            tbl_order: 1,
            tbl_units: BaselineUnits::Natural,
            nfft: 16,
            nfch: 12,
            fbl_method: BaselineMethod::Simple,
            fbl_order: 1,
            fbl_units: BaselineUnits::Natural,
            block_size: GUPPI_BLOCK_SIZE,
            max_header_len: MAX_HEADER_LEN,
            t1_reports: false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
