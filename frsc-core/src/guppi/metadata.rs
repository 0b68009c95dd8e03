//! Разбор и проверка метаданных текстового заголовка GUPPI.

use std::{collections::HashMap, str::FromStr};

use frsc_types::{FrscError, FrscResult, BYTES_PER_SAMPLE, MAX_CHANNELS};

use crate::guppi::GUPPI_BLOCK_SIZE;

/// Разность между MJD и началом эпохи unix в сутках
const MJD_UNIX_EPOCH: i64 = 40_587;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Таблица `KEY = value` заголовка.
///
/// Заголовок токенизируется один раз. При повторе ключа действует первое
/// вхождение.
#[derive(Debug, Clone, Default)]
pub struct HeaderTable {
    entries: HashMap<String, String>,
    order: Vec<String>,
}

impl HeaderTable {
    /// Разбирает текст заголовка.
    ///
    /// Ключ — последнее слово перед `=`. Значение — строка в одинарных
    /// кавычках (без кавычек и хвостовых пробелов) либо следующий токен до
    /// пробела.
    pub fn parse(text: &str) -> Self {
        let mut table = HeaderTable::default();
        let mut rest = text;

        while let Some(eq) = rest.find('=') {
            let key = rest[..eq].split_whitespace().last().unwrap_or("");
            let after = rest[eq + 1..].trim_start_matches(' ');

            let (value, tail) = if let Some(quoted) = after.strip_prefix('\'') {
                match quoted.find('\'') {
                    Some(end) => (quoted[..end].trim(), &quoted[end + 1..]),
                    None => (quoted.trim(), ""),
                }
            } else {
                let end = after
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(after.len());
                (&after[..end], &after[end..])
            };

            if !key.is_empty() {
                table.insert(key, value);
            }
            rest = tail;
        }

        table
    }

    fn insert(
        &mut self,
        key: &str,
        value: &str,
    ) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_string(), value.to_string());
            self.order.push(key.to_string());
        }
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Значение обязательного ключа.
    pub fn require(
        &self,
        key: &str,
    ) -> FrscResult<&str> {
        self.get(key).ok_or_else(|| FrscError::missing_key(key))
    }

    /// Значение обязательного ключа, разобранное в `T`.
    pub fn parse_value<T: FromStr>(
        &self,
        key: &str,
    ) -> FrscResult<T> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| FrscError::malformed(key, raw))
    }

    /// Как [`HeaderTable::parse_value`], но отсутствие ключа не ошибка.
    pub fn parse_optional<T: FromStr>(
        &self,
        key: &str,
    ) -> FrscResult<Option<T>> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| FrscError::malformed(key, raw)),
            None => Ok(None),
        }
    }

    /// Ключи в порядке первого появления.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Метаданные прогона, извлечённые из первого заголовка GUPPI.
///
/// Частоты и полосы хранятся в МГц, как в заголовке.
#[derive(Debug, Clone, PartialEq)]
pub struct GuppiMetadata {
    pub backend: String,
    pub pktfmt: String,
    pub fd_poln: String,
    pub nbits: u32,
    pub npol: u32,
    /// Размер сырого блока в байтах
    pub block_size: usize,
    /// Число каналов
    pub n_chan: usize,
    /// Центральная частота, МГц
    pub obsfreq: f64,
    /// Полная полоса, МГц (может быть отрицательной)
    pub obsbw: f64,
    /// Полоса канала, МГц (может быть отрицательной)
    pub chan_bw: f64,
    /// Период дискретизации, с
    pub tbin: f64,
    /// Число выборок в начале каждого блока, повторяющих хвост предыдущего
    pub overlap: usize,
    /// `STT_IMJD`, `STT_SMJD`
    pub start_mjd: Option<(i64, f64)>,
}

impl GuppiMetadata {
    /// Извлекает и проверяет метаданные заголовка.
    ///
    /// `expected_block_size` — ожидаемое значение `BLOCSIZE`, обычно
    /// [`GUPPI_BLOCK_SIZE`].
    pub fn extract(
        text: &str,
        expected_block_size: usize,
    ) -> FrscResult<Self> {
        Self::from_table(&HeaderTable::parse(text), expected_block_size)
    }

    pub fn from_table(
        table: &HeaderTable,
        expected_block_size: usize,
    ) -> FrscResult<Self> {
        let backend = require_prefix(table, "BACKEND", "GUPPI")?;
        let pktfmt = require_prefix(table, "PKTFMT", "1SFA")?;
        let fd_poln = require_prefix(table, "FD_POLN", "LIN")?;

        let nbits: u32 = table.parse_value("NBITS")?;
        if nbits != 8 {
            return Err(FrscError::mismatch("NBITS", nbits, 8));
        }

        // NPOL = 4: две поляризации, I и Q считаются отдельно
        let npol: u32 = table.parse_value("NPOL")?;
        if npol != 4 {
            return Err(FrscError::mismatch("NPOL", npol, 4));
        }

        let block_size: usize = table.parse_value("BLOCSIZE")?;
        if block_size != expected_block_size {
            return Err(FrscError::mismatch(
                "BLOCSIZE",
                block_size,
                expected_block_size,
            ));
        }

        let obsfreq: f64 = table.parse_value("OBSFREQ")?;

        let n_chan: usize = table.parse_value("OBSNCHAN")?;
        if n_chan > MAX_CHANNELS {
            return Err(FrscError::mismatch(
                "OBSNCHAN",
                n_chan,
                format!("at most {MAX_CHANNELS}"),
            ));
        }

        let obsbw: f64 = table.parse_value("OBSBW")?;
        let chan_bw: f64 = table.parse_value("CHAN_BW")?;
        let tbin: f64 = table.parse_value("TBIN")?;
        let overlap: usize = table.parse_value("OVERLAP")?;

        let start_mjd = match (
            table.parse_optional::<i64>("STT_IMJD")?,
            table.parse_optional::<f64>("STT_SMJD")?,
        ) {
            (Some(day), Some(sec)) => Some((day, sec)),
            _ => None,
        };

        let meta = GuppiMetadata {
            backend,
            pktfmt,
            fd_poln,
            nbits,
            npol,
            block_size,
            n_chan,
            obsfreq,
            obsbw,
            chan_bw,
            tbin,
            overlap,
            start_mjd,
        };
        meta.validate_layout()?;

        Ok(meta)
    }

    /// Проверяет, что геометрия блока позволяет перебуферизацию.
    fn validate_layout(&self) -> FrscResult<()> {
        if self.n_chan == 0 {
            return Err(FrscError::invalid_layout("OBSNCHAN is 0"));
        }

        let stride = self.n_chan * BYTES_PER_SAMPLE;
        if self.block_size % stride != 0 {
            return Err(FrscError::invalid_layout(format!(
                "BLOCSIZE={} is not a multiple of OBSNCHAN*{}={}",
                self.block_size, BYTES_PER_SAMPLE, stride
            )));
        }

        let spc = self.samples_per_channel();
        if self.overlap >= spc {
            return Err(FrscError::invalid_layout(format!(
                "OVERLAP={} does not leave any samples of the {} per channel",
                self.overlap, spc
            )));
        }

        if self.chan_bw == 0.0 || !self.chan_bw.is_finite() {
            return Err(FrscError::invalid_layout(format!(
                "CHAN_BW={} is not usable",
                self.chan_bw
            )));
        }

        if self.tbin == 0.0 || !self.tbin.is_finite() {
            return Err(FrscError::invalid_layout(format!(
                "TBIN={} is not usable",
                self.tbin
            )));
        }

        Ok(())
    }

    ////////// Производные величины

    /// Выборок на канал в одном сыром блоке (включая перекрытие).
    pub fn samples_per_channel(&self) -> usize {
        self.block_size / (self.n_chan * BYTES_PER_SAMPLE)
    }

    /// Частота дискретизации канала, Гц (`1 / TBIN`).
    pub fn sample_rate(&self) -> f64 {
        1.0 / self.tbin
    }

    pub fn center_freq_hz(&self) -> f64 {
        self.obsfreq * 1.0e6
    }

    pub fn bandwidth_hz(&self) -> f64 {
        self.obsbw * 1.0e6
    }

    pub fn channel_bandwidth_hz(&self) -> f64 {
        self.chan_bw * 1.0e6
    }

    /// Центральная частота канала `ch` (1-based), Гц.
    pub fn channel_center_hz(
        &self,
        ch: usize,
    ) -> f64 {
        (self.obsfreq - self.obsbw / 2.0 + (ch as f64 - 0.5) * self.chan_bw) * 1.0e6
    }

    /// Время начала наблюдения (unix): секунды и микросекунды.
    pub fn start_unix(&self) -> Option<(i64, i64)> {
        self.start_mjd.map(|(day, sec)| {
            let whole = sec.floor();
            let usec = ((sec - whole) * 1.0e6).round() as i64;
            let base = (day - MJD_UNIX_EPOCH) * SECONDS_PER_DAY as i64 + whole as i64;
            if usec >= 1_000_000 {
                (base + 1, usec - 1_000_000)
            } else {
                (base, usec)
            }
        })
    }
}

impl Default for GuppiMetadata {
    fn default() -> Self {
        Self {
            backend: "GUPPI".into(),
            pktfmt: "1SFA".into(),
            fd_poln: "LIN".into(),
            nbits: 8,
            npol: 4,
            block_size: GUPPI_BLOCK_SIZE,
            n_chan: 32,
            obsfreq: 1_400.0,
            obsbw: -100.0,
            chan_bw: -3.125,
            tbin: 3.2e-7,
            overlap: 0,
            start_mjd: None,
        }
    }
}

fn require_prefix(
    table: &HeaderTable,
    key: &str,
    prefix: &str,
) -> FrscResult<String> {
    let value = table.require(key)?;
    if !value.starts_with(prefix) {
        return Err(FrscError::mismatch(key, value, format!("{prefix}*")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frsc_types::ErrorKind;

    fn card(
        key: &str,
        value: &str,
    ) -> String {
        format!("{key:<8}= {value:<70}")
    }

    fn sample_header(overrides: &[(&str, &str)]) -> String {
        let mut fields = vec![
            ("BACKEND", "'GUPPI   '"),
            ("PKTFMT", "'1SFA    '"),
            ("FD_POLN", "'LIN     '"),
            ("NBITS", "8"),
            ("NPOL", "4"),
            ("BLOCSIZE", "4096"),
            ("OBSFREQ", "1410.5"),
            ("OBSNCHAN", "8"),
            ("OBSBW", "-200.0"),
            ("CHAN_BW", "-25.0"),
            ("TBIN", "4.0E-08"),
            ("OVERLAP", "16"),
        ];
        for (k, v) in overrides {
            match fields.iter_mut().find(|(key, _)| key == k) {
                Some(slot) => slot.1 = *v,
                None => fields.push((*k, *v)),
            }
        }
        let mut text: String = fields.iter().map(|(k, v)| card(k, v)).collect();
        text.push_str(&format!("{:<80}", "END"));
        text
    }

    #[test]
    fn test_table_first_occurrence_wins() {
        let table = HeaderTable::parse("A = 1 B = 'two words ' A = 3 END");
        assert_eq!(table.get("A"), Some("1"));
        assert_eq!(table.get("B"), Some("two words"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_extract_valid_header() {
        let meta = GuppiMetadata::extract(&sample_header(&[]), 4096).unwrap();

        assert_eq!(meta.backend, "GUPPI");
        assert_eq!(meta.n_chan, 8);
        assert_eq!(meta.samples_per_channel(), 128);
        assert_eq!(meta.overlap, 16);
        assert!((meta.sample_rate() - 25.0e6).abs() < 1.0);
        assert_eq!(meta.center_freq_hz(), 1410.5e6);
        assert_eq!(meta.bandwidth_hz(), -200.0e6);
        assert!(meta.start_unix().is_none());
    }

    #[test]
    fn test_validation_failures() {
        let cases: [(&str, &str); 6] = [
            ("BACKEND", "'VEGAS'"),
            ("PKTFMT", "'VDIF'"),
            ("FD_POLN", "'CIRC'"),
            ("NBITS", "4"),
            ("NPOL", "2"),
            ("OBSNCHAN", "2048"),
        ];
        for (key, value) in cases {
            let err = GuppiMetadata::extract(&sample_header(&[(key, value)]), 4096).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{key}");
            assert!(err.to_string().starts_with(key), "{err}");
        }

        let err = GuppiMetadata::extract(&sample_header(&[]), 8192).unwrap_err();
        assert!(matches!(err, FrscError::ValidationMismatch { ref key, .. } if key == "BLOCSIZE"));
    }

    #[test]
    fn test_missing_and_malformed() {
        let text = sample_header(&[]).replace("OVERLAP", "OVERLAX");
        let err = GuppiMetadata::extract(&text, 4096).unwrap_err();
        assert!(matches!(err, FrscError::MissingKey(ref k) if k == "OVERLAP"));

        let err = GuppiMetadata::extract(&sample_header(&[("NBITS", "eight")]), 4096).unwrap_err();
        assert!(matches!(err, FrscError::MalformedValue { .. }));
    }

    #[test]
    fn test_layout_checks() {
        let err = GuppiMetadata::extract(&sample_header(&[("OBSNCHAN", "3")]), 4096).unwrap_err();
        assert!(matches!(err, FrscError::InvalidLayout(_)));

        let err = GuppiMetadata::extract(&sample_header(&[("OVERLAP", "128")]), 4096).unwrap_err();
        assert!(matches!(err, FrscError::InvalidLayout(_)));

        let err = GuppiMetadata::extract(&sample_header(&[("TBIN", "0")]), 4096).unwrap_err();
        assert!(matches!(err, FrscError::InvalidLayout(_)));
    }

    #[test]
    fn test_start_time_from_mjd() {
        let text = sample_header(&[("STT_IMJD", "56000"), ("STT_SMJD", "3600.25")]);
        let meta = GuppiMetadata::extract(&text, 4096).unwrap();

        // MJD 56000 = 2012-03-14
        assert_eq!(meta.start_unix(), Some((1_331_683_200 + 3_600, 250_000)));
    }

    #[test]
    fn test_channel_center() {
        let meta = GuppiMetadata::extract(&sample_header(&[]), 4096).unwrap();
        // 1410.5 + 100 - 12.5 = 1498.0 МГц
        assert!((meta.channel_center_hz(1) - 1498.0e6).abs() < 1.0);
    }
}
