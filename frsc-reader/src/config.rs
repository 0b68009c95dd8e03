use std::path::PathBuf;

/// Файл столбцов по умолчанию.
pub const DEFAULT_COLUMNS_FILE: &str = "frsc_read.dat";

#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub input_path: PathBuf,
    /// Канал (1-based) для файла столбцов; `None` — файл не пишется
    pub channel: Option<usize>,
    pub columns_path: PathBuf,
    /// Печатать каждый отчёт строкой JSON
    pub json: bool,
}

impl DumpConfig {
    fn new() -> Self {
        Self {
            input_path: PathBuf::from("out.dat"),
            channel: None,
            columns_path: PathBuf::from(DEFAULT_COLUMNS_FILE),
            json: false,
        }
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self::new()
    }
}
