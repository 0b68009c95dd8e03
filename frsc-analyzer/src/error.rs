use std::path::PathBuf;

use frsc_types::FrscError;
use thiserror::Error;

pub type AnalyzerResult<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Не удалось прочитать job-файл
    #[error("Unable to read job file {path:?}: {source}")]
    JobFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Ошибка в строке job-файла
    #[error("Job file line {line}: {message}")]
    Config { line: usize, message: String },

    /// Не задан входной файл (ни INFILE, ни --input)
    #[error("No input file: set INFILE in the job file or pass --input")]
    MissingInput,

    /// Входной поток пуст
    #[error("Input contains no GUPPI header")]
    EmptyInput,

    /// Ошибка ввода/вывода
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка формата или анализа
    #[error(transparent)]
    Frsc(#[from] FrscError),
}
