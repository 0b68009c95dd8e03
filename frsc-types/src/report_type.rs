use serde::Serialize;

use crate::{FrscError, FrscResult};

/// Тип отчёта (поле `eType` заголовка)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ReportType {
    /// Только заголовок (например, диагностический)
    Null = 0,
    /// Временной анализ, полная полоса и каналы, период T0
    TimeFull0 = 1,
    /// Временной анализ, полная полоса и каналы, период T1
    TimeFull1 = 2,
    /// Временной анализ, подканалы, период T0
    TimeSub0 = 3,
    /// Временной анализ, подканалы, период T1
    TimeSub1 = 4,
    /// Частотный анализ заданного канала, период T0
    FreqChannel0 = 5,
    /// Частотный анализ заданного канала, период T2
    FreqChannel2 = 6,
}

impl ReportType {
    pub fn from_i32(v: i32) -> FrscResult<Self> {
        match v {
            0 => Ok(ReportType::Null),
            1 => Ok(ReportType::TimeFull0),
            2 => Ok(ReportType::TimeFull1),
            3 => Ok(ReportType::TimeSub0),
            4 => Ok(ReportType::TimeSub1),
            5 => Ok(ReportType::FreqChannel0),
            6 => Ok(ReportType::FreqChannel2),
            _ => Err(FrscError::format_violation(format!(
                "Unknown report type: {v}"
            ))),
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Несёт ли отчёт этого типа тело временного анализа.
    pub fn has_time_domain_body(&self) -> bool {
        matches!(self, ReportType::TimeFull0 | ReportType::TimeFull1)
    }
}

/// Источник сырых данных (поле `eSource`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SourceKind {
    /// Файл сырых данных GUPPI
    GuppiFile = 1,
    /// GUPPI в реальном времени
    GuppiRealtime = 2,
}

impl SourceKind {
    pub fn from_u8(v: u8) -> FrscResult<Self> {
        match v {
            1 => Ok(SourceKind::GuppiFile),
            2 => Ok(SourceKind::GuppiRealtime),
            _ => Err(FrscError::UnsupportedSource(format!("selector {v}"))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Максимальное кодируемое значение компоненты выборки.
    pub fn max_encodable(&self) -> i32 {
        match self {
            SourceKind::GuppiFile | SourceKind::GuppiRealtime => 127, // 8 бит со знаком
        }
    }

    /// Порог мгновенной мощности, начиная с которого выборка считается
    /// клиппированной.
    pub fn clip_power_threshold(&self) -> f32 {
        let m = self.max_encodable();
        (m * m) as f32
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SourceKind::GuppiFile => write!(f, "guppi-file"),
            SourceKind::GuppiRealtime => write!(f, "guppi-realtime"),
        }
    }
}

/// Метод формирования подканалов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SubChannelMethod {
    /// БПФ без окна
    Fft = 0,
    /// БПФ с окном Хэмминга
    FftHamming = 1,
}

impl SubChannelMethod {
    pub fn from_u8(v: u8) -> FrscResult<Self> {
        match v {
            0 => Ok(SubChannelMethod::Fft),
            1 => Ok(SubChannelMethod::FftHamming),
            _ => Err(FrscError::format_violation(format!(
                "Unknown sub-channel method: {v}"
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Метод вычисления базовой линии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum BaselineMethod {
    /// Полином порядка N по среднему за последний период T2, затем деление
    Simple = 1,
}

impl BaselineMethod {
    pub fn from_u8(v: u8) -> FrscResult<Self> {
        match v {
            1 => Ok(BaselineMethod::Simple),
            _ => Err(FrscError::format_violation(format!(
                "Unknown baseline method: {v}"
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Единицы, в которых отдаётся спектр после базовой линии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum BaselineUnits {
    /// Без изменения единиц
    Natural = 0,
    /// В стандартных отклонениях
    StdDev = 1,
}

impl BaselineUnits {
    pub fn from_u8(v: u8) -> FrscResult<Self> {
        match v {
            0 => Ok(BaselineUnits::Natural),
            1 => Ok(BaselineUnits::StdDev),
            _ => Err(FrscError::format_violation(format!(
                "Unknown baseline units: {v}"
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_codes() {
        for v in 0..=6 {
            assert_eq!(ReportType::from_i32(v).unwrap().as_i32(), v);
        }
        assert!(ReportType::from_i32(7).is_err());
        assert!(ReportType::TimeFull0.has_time_domain_body());
        assert!(!ReportType::Null.has_time_domain_body());
    }

    #[test]
    fn test_clip_threshold_8bit() {
        assert_eq!(SourceKind::GuppiFile.clip_power_threshold(), 16_129.0);
        assert!(SourceKind::from_u8(3).is_err());
    }
}
