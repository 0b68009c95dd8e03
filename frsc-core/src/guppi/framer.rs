//! Поиск границы между текстовым заголовком GUPPI и бинарным блоком.
//!
//! Заголовок заканчивается токеном `END`, перед которым стоит хотя бы один
//! пробел. За `END` следует выравнивающая последовательность пробелов;
//! первый непробельный байт после неё — начало полезной нагрузки, и он
//! остаётся непрочитанным в потоке.

use std::io::{self, BufRead};

use frsc_types::{FrscError, FrscResult};

/// Состояние автомата поиска терминатора ` END`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Ничего не совпало
    Idle,
    /// Последний байт — пробел
    SawSpace,
    /// ` E`
    SawE,
    /// ` EN`
    SawN,
    /// ` END` найден, пропускаем выравнивающие пробелы
    SawD,
    /// Следующий байт — начало полезной нагрузки
    Terminated,
}

impl ScanState {
    /// Переход автомата по одному байту заголовка.
    ///
    /// Пробел всегда переводит в [`ScanState::SawSpace`], поэтому серия
    /// пробелов не ломает последующее совпадение.
    pub fn advance(
        self,
        byte: u8,
    ) -> Self {
        match (self, byte) {
            (ScanState::SawD, b' ') => ScanState::SawD,
            (ScanState::SawD, _) | (ScanState::Terminated, _) => ScanState::Terminated,
            (_, b' ') => ScanState::SawSpace,
            (ScanState::SawSpace, b'E') => ScanState::SawE,
            (ScanState::SawE, b'N') => ScanState::SawN,
            (ScanState::SawN, b'D') => ScanState::SawD,
            _ => ScanState::Idle,
        }
    }
}

/// Найденный заголовок
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedHeader {
    /// Текст заголовка вместе с `END` и выравнивающими пробелами
    pub text: String,
    /// Смещение первого байта заголовка в потоке
    pub header_offset: u64,
    /// Смещение первого байта полезной нагрузки в потоке
    pub payload_offset: u64,
}

impl FramedHeader {
    /// Длина заголовка в байтах.
    pub fn len(&self) -> usize {
        (self.payload_offset - self.header_offset) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Читает один заголовок из `reader`.
///
/// Возвращает `Ok(None)`, если поток закончился до первого байта заголовка.
/// Если поток обрывается внутри заголовка, возвращает
/// [`FrscError::TruncatedHeader`]; если терминатор не найден за `max_len`
/// байт — [`FrscError::HeaderTooLong`].
pub fn frame_header<R: BufRead>(
    reader: &mut R,
    max_len: usize,
    offset: u64,
) -> FrscResult<Option<FramedHeader>> {
    let mut text: Vec<u8> = Vec::with_capacity(max_len.min(8 * 1024));
    let mut state = ScanState::Idle;

    while state != ScanState::SawD {
        let byte = match next_byte(reader)? {
            Some(b) => b,
            None if text.is_empty() => return Ok(None),
            None => return Err(FrscError::TruncatedHeader { read: text.len() }),
        };

        state = state.advance(byte);
        text.push(byte);

        if state != ScanState::SawD && text.len() >= max_len {
            return Err(FrscError::HeaderTooLong { max_len });
        }
    }

    // Выравнивающие пробелы: первый непробельный байт остаётся в потоке
    while let Some(byte) = peek_byte(reader)? {
        state = state.advance(byte);
        if state == ScanState::Terminated {
            break;
        }
        reader.consume(1);
        text.push(byte);
    }

    let len = text.len() as u64;

    Ok(Some(FramedHeader {
        text: String::from_utf8_lossy(&text).into_owned(),
        header_offset: offset,
        payload_offset: offset + len,
    }))
}

fn next_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    let byte = peek_byte(reader)?;
    if byte.is_some() {
        reader.consume(1);
    }
    Ok(byte)
}

fn peek_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok(buf) => return Ok(buf.first().copied()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    #[test]
    fn test_payload_starts_after_padding() {
        let input = b"FOO = 1  END     <payload>".to_vec();
        let mut cursor = Cursor::new(input);

        let header = frame_header(&mut cursor, 1024, 0).unwrap().unwrap();
        assert_eq!(header.text, "FOO = 1  END     ");
        assert_eq!(header.payload_offset, 17);

        let mut rest = String::new();
        cursor.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "<payload>");
    }

    #[test]
    fn test_padding_length_does_not_matter() {
        for pad in [0usize, 1, 5, 63] {
            let mut input = b"A = 'x' END".to_vec();
            input.extend(std::iter::repeat(b' ').take(pad));
            input.extend_from_slice(b"\x01\x02");
            let mut cursor = Cursor::new(input);

            let header = frame_header(&mut cursor, 1024, 100).unwrap().unwrap();
            assert_eq!(header.len(), 11 + pad);
            assert_eq!(header.payload_offset, 100 + 11 + pad as u64);

            let mut rest = Vec::new();
            cursor.read_to_end(&mut rest).unwrap();
            assert_eq!(rest, vec![1, 2]);
        }
    }

    #[test]
    fn test_end_requires_leading_space() {
        // "XEND" не терминатор, "BACKEND" тоже
        let input = b"BACKEND = 'GUPPI' XEND  END  \x07".to_vec();
        let mut cursor = Cursor::new(input);

        let header = frame_header(&mut cursor, 1024, 0).unwrap().unwrap();
        assert!(header.text.ends_with("XEND  END  "));
    }

    #[test]
    fn test_interrupted_match_restarts() {
        let input = b" EN END \x00".to_vec();
        let mut cursor = Cursor::new(input);

        let header = frame_header(&mut cursor, 1024, 0).unwrap().unwrap();
        assert_eq!(header.text, " EN END ");
    }

    #[test]
    fn test_too_long() {
        let input = vec![b'X'; 64];
        let mut cursor = Cursor::new(input);

        let err = frame_header(&mut cursor, 32, 0).unwrap_err();
        assert!(matches!(err, FrscError::HeaderTooLong { max_len: 32 }));
    }

    #[test]
    fn test_clean_eof_and_truncation() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(frame_header(&mut empty, 32, 0).unwrap().is_none());

        let mut partial = Cursor::new(b"NBITS = 8 EN".to_vec());
        let err = frame_header(&mut partial, 1024, 0).unwrap_err();
        assert!(matches!(err, FrscError::TruncatedHeader { read: 12 }));
    }

    #[test]
    fn test_state_transitions() {
        let mut s = ScanState::Idle;
        for &b in b"x END" {
            s = s.advance(b);
        }
        assert_eq!(s, ScanState::SawD);
        assert_eq!(s.advance(b' '), ScanState::SawD);
        assert_eq!(s.advance(b'z'), ScanState::Terminated);
        assert_eq!(ScanState::SawE.advance(b' '), ScanState::SawSpace);
    }
}
