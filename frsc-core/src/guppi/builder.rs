//! Сборка синтетических заголовков и файлов GUPPI (для тестов, примеров и
//! бенчмарков).

use std::io::Write;

use frsc_types::FrscResult;

use crate::guppi::GuppiMetadata;

/// Длина одной карточки заголовка
pub const CARD_LEN: usize = 80;

/// Построитель текстового заголовка GUPPI из карточек `KEY = value`.
#[derive(Debug, Clone, Default)]
pub struct GuppiHeaderBuilder {
    cards: Vec<String>,
}

impl GuppiHeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Заголовок с полным набором обязательных ключей из `meta`.
    pub fn from_metadata(meta: &GuppiMetadata) -> Self {
        let mut b = Self::new()
            .string("BACKEND", &meta.backend)
            .string("PKTFMT", &meta.pktfmt)
            .string("FD_POLN", &meta.fd_poln)
            .value("NBITS", meta.nbits)
            .value("NPOL", meta.npol)
            .value("BLOCSIZE", meta.block_size)
            .value("OBSFREQ", meta.obsfreq)
            .value("OBSNCHAN", meta.n_chan)
            .value("OBSBW", meta.obsbw)
            .value("CHAN_BW", meta.chan_bw)
            .value("TBIN", format!("{:E}", meta.tbin))
            .value("OVERLAP", meta.overlap);

        if let Some((day, sec)) = meta.start_mjd {
            b = b.value("STT_IMJD", day).value("STT_SMJD", sec);
        }
        b
    }

    /// Карточка со строковым значением в одинарных кавычках.
    pub fn string(
        mut self,
        key: &str,
        value: &str,
    ) -> Self {
        self.cards.push(format!("{key:<8}= '{value:<8}'"));
        self
    }

    /// Карточка с числовым (или произвольным неквотированным) значением.
    pub fn value<V: std::fmt::Display>(
        mut self,
        key: &str,
        value: V,
    ) -> Self {
        self.cards.push(format!("{key:<8}= {value:>20}"));
        self
    }

    /// Текст заголовка: карточки по 80 байт и карточка `END`.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.cards.len() + 1) * CARD_LEN);
        for card in self.cards.iter().map(String::as_str).chain(["END"]) {
            push_card(&mut out, card);
        }
        out
    }

    /// Записывает заголовок и следующий за ним блок данных.
    pub fn write_block<W: Write>(
        &self,
        out: &mut W,
        payload: &[u8],
    ) -> FrscResult<()> {
        out.write_all(&self.build())?;
        out.write_all(payload)?;
        Ok(())
    }
}

fn push_card(
    out: &mut Vec<u8>,
    card: &str,
) {
    let bytes = card.as_bytes();
    let n = bytes.len().min(CARD_LEN);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + CARD_LEN - n, b' ');
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::guppi::frame_header;

    #[test]
    fn test_cards_are_fixed_width() {
        let text = GuppiHeaderBuilder::new()
            .string("BACKEND", "GUPPI")
            .value("NBITS", 8)
            .build();

        assert_eq!(text.len(), 3 * CARD_LEN);
        assert!(text.starts_with(b"BACKEND = 'GUPPI   '"));
        assert_eq!(&text[2 * CARD_LEN..2 * CARD_LEN + 3], b"END");
    }

    #[test]
    fn test_metadata_round_trip() {
        let meta = GuppiMetadata {
            block_size: 1024,
            n_chan: 4,
            overlap: 8,
            start_mjd: Some((57_000, 12.5)),
            ..GuppiMetadata::default()
        };
        let text = GuppiHeaderBuilder::from_metadata(&meta).build();
        let parsed = GuppiMetadata::extract(&String::from_utf8_lossy(&text), 1024).unwrap();

        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_framer_finds_builder_header() {
        let builder = GuppiHeaderBuilder::new().value("OBSNCHAN", 2);
        let mut raw = Vec::new();
        builder.write_block(&mut raw, &[9u8, 8, 7]).unwrap();

        let mut cursor = Cursor::new(raw);
        let header = frame_header(&mut cursor, 1024, 0).unwrap().unwrap();
        assert_eq!(header.payload_offset, 2 * CARD_LEN as u64);
    }
}
