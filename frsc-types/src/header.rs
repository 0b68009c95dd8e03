use serde::Serialize;

use crate::{
    BaselineMethod, BaselineUnits, ChannelMask, ReportType, SourceKind, SubChannelMethod,
};

/// Версия формата отчёта
pub const REPORT_VERSION: u16 = 0;

/// Версия анализатора, записывающего отчёт
pub const TOOL_VERSION: u16 = 1;

/// Длина поля `info` в байтах (включая завершающий NUL)
pub const INFO_LEN: usize = 80;

/// Флаги временного анализа (`tflags`)
pub const TFLAG_FULL_BAND: u8 = 1;
pub const TFLAG_CHANNELS: u8 = 2;
pub const TFLAG_SUB_CHANNELS: u8 = 4;
pub const TFLAG_BASELINE_FULL: u8 = 8;
pub const TFLAG_BASELINE_CHANNELS: u8 = 16;

/// Флаги частотного анализа (`fflags`)
pub const FFLAG_FULL_BAND: u8 = 1;
pub const FFLAG_CHANNELS: u8 = 2;
pub const FFLAG_SUB_CHANNELS: u8 = 4;
pub const FFLAG_BASELINE_CHANNELS: u8 = 8;
pub const FFLAG_BASELINE_SUB_CHANNELS: u8 = 16;

/// Заголовок отчёта (фиксированный размер 468 байт на диске).
///
/// Прототип строится один раз при старте из конфигурации и метаданных
/// сырого файла; каждый записанный отчёт — его копия с перезаписанными
/// `report_type`, `err`, `seq_no` и `f_start`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHeader {
    /// Тип отчёта
    pub report_type: ReportType,
    /// Биты ошибок/состояния, 0 — всё в порядке
    pub err: i64,
    pub report_version: u16,
    pub tool_version: u16,
    /// Источник данных
    pub source: SourceKind,
    /// Произвольная строка (на диске не длиннее `INFO_LEN - 1` байт)
    pub info: String,
    /// Начало интервала первого отчёта (unix time): секунды
    pub start_sec: i64,
    /// ...и микросекунды
    pub start_usec: i64,
    /// Число каналов
    pub n_ch: i64,
    /// Полная полоса в Гц (может быть отрицательной)
    pub bw: f32,
    /// Центральная частота полной полосы в Гц
    pub fc: f64,
    /// Частота дискретизации одного канала в Гц
    pub fs: f64,
    pub tflags: u8,
    pub fflags: u8,
    /// Периоды обновления в секундах; `< 0` — выключено
    pub t0: f64,
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
    /// Порядковый номер отчёта любого типа
    pub seq_no: i64,
    /// Секунды от `start_sec` до начала описываемого интервала
    pub f_start: f64,
}

impl Default for ReportHeader {
    fn default() -> Self {
        Self {
            report_type: ReportType::Null,
            err: 0,
            report_version: REPORT_VERSION,
            tool_version: TOOL_VERSION,
            source: SourceKind::GuppiFile,
            info: String::new(),
            start_sec: 0,
            start_usec: 0,
            n_ch: 0,
            bw: 0.0,
            fc: 0.0,
            fs: 0.0,
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
            seq_no: 0,
            f_start: 0.0,
        }
    }
}

impl ReportHeader {
    ////////// Собственные методы

    pub fn has_tflag(
        &self,
        flag: u8,
    ) -> bool {
        self.tflags & flag != 0
    }

    /// Продвигает счётчик последовательности прототипа и возвращает копию
    /// для очередного отчёта.
    pub fn next_report(
        &mut self,
        report_type: ReportType,
        f_start: f64,
    ) -> ReportHeader {
        self.seq_no += 1;
        let mut header = self.clone();
        header.report_type = report_type;
        header.err = 0;
        header.f_start = f_start;
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_report_increments_prototype() {
        let mut proto = ReportHeader::default();
        let first = proto.next_report(ReportType::TimeFull0, 0.0);
        let second = proto.next_report(ReportType::TimeFull0, 1.5);

        assert_eq!(first.seq_no, 1);
        assert_eq!(second.seq_no, 2);
        assert_eq!(proto.seq_no, 2);
        assert_eq!(proto.report_type, ReportType::Null);
        assert_eq!(second.f_start, 1.5);
    }

    #[test]
    fn test_default_flags() {
        let h = ReportHeader::default();
        assert!(h.has_tflag(TFLAG_CHANNELS));
        assert!(!h.has_tflag(TFLAG_FULL_BAND));
        assert_eq!(h.tool_version, TOOL_VERSION);
    }
}
