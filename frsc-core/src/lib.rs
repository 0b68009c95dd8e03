//! Форматы файлов frsc
//!
//! Чтение сырых файлов GUPPI (заголовки и блоки) и бинарный формат файла
//! отчётов анализатора.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use frsc_core::{GuppiMetadata, GuppiReader, ReportWriter, GUPPI_BLOCK_SIZE};
//! use frsc_types::ReportHeader;
//! use std::fs::File;
//!
//! let mut input = GuppiReader::open("guppi_56000_J1713+0747.0000.raw")?;
//! let header = input.read_header()?.expect("empty file");
//! let meta = GuppiMetadata::extract(&header.text, GUPPI_BLOCK_SIZE)?;
//!
//! let prototype = ReportHeader {
//!     n_ch: meta.n_chan as i64,
//!     fs: meta.sample_rate(),
//!     ..ReportHeader::default()
//! };
//! let writer = ReportWriter::new(File::create("out.dat")?, prototype)?;
//! writer.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod format;
pub mod guppi;
pub mod serialization;

pub use format::*;
pub use guppi::*;
pub use serialization::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(REPORT_HEADER_SIZE, 468);
        assert_eq!(GUPPI_BLOCK_SIZE, 1_073_545_216);
        assert_eq!(MAX_HEADER_LEN, 16_384);
    }
}
