//! Чтение сырых файлов GUPPI: последовательность `[текстовый заголовок]
//! [бинарный блок]`.

pub mod builder;
pub mod framer;
pub mod metadata;

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

pub use builder::*;
pub use framer::*;
use frsc_types::{FrscError, FrscResult};
pub use metadata::*;

/// Размер сырого блока GUPPI в байтах
pub const GUPPI_BLOCK_SIZE: usize = 1_073_545_216;

/// Максимальная длина текстового заголовка
pub const MAX_HEADER_LEN: usize = 16_384;

/// Результат чтения блока
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRead {
    /// Блок прочитан целиком
    Complete,
    /// Поток закончился раньше; прочитано столько байт
    Short(usize),
}

/// Потоковый читатель сырого файла GUPPI.
pub struct GuppiReader<R: BufRead> {
    reader: R,
    position: u64,
    max_header_len: usize,
    blocks_read: u64,
}

impl GuppiReader<BufReader<File>> {
    /// Открывает файл на диске.
    pub fn open<P: AsRef<Path>>(path: P) -> FrscResult<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(1 << 20, file)))
    }
}

impl<R: BufRead> GuppiReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
            max_header_len: MAX_HEADER_LEN,
            blocks_read: 0,
        }
    }

    /// Переопределяет предельную длину заголовка.
    pub fn with_max_header_len(
        mut self,
        max_header_len: usize,
    ) -> Self {
        self.max_header_len = max_header_len;
        self
    }

    /// Читает следующий заголовок; `None` на чистом конце потока.
    pub fn read_header(&mut self) -> FrscResult<Option<FramedHeader>> {
        let framed = frame_header(&mut self.reader, self.max_header_len, self.position)?;
        if let Some(h) = &framed {
            self.position = h.payload_offset;
        }
        Ok(framed)
    }

    /// Читает блок в `buf` целиком (или сколько осталось в потоке).
    pub fn read_block(
        &mut self,
        buf: &mut [u8],
    ) -> FrscResult<BlockRead> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FrscError::Io(e)),
            }
        }

        self.position += filled as u64;

        if filled == buf.len() {
            self.blocks_read += 1;
            Ok(BlockRead::Complete)
        } else {
            Ok(BlockRead::Short(filled))
        }
    }

    /// Текущее смещение в потоке.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Количество прочитанных целых блоков.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
