use thiserror::Error;

/// Результат для операций frsc
pub type FrscResult<T> = std::result::Result<T, FrscError>;

/// Категория ошибки.
///
/// Все категории, кроме [`ErrorKind::Format`], фатальны для прогона анализа:
/// драйвер печатает диагностику и завершает работу без частичного
/// восстановления.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Не найден терминатор текстового заголовка
    Framing,
    /// Поле метаданных не совпадает с ожидаемым значением
    Validation,
    /// Не удалось выделить память или нарушен инвариант размера буфера
    Resource,
    /// Повреждённый файл отчётов (только при обратном чтении)
    Format,
    /// Ошибка ввода/вывода
    Io,
}

/// Типы ошибок frsc.
#[derive(Debug, Error)]
pub enum FrscError {
    /// Терминатор ` END` не найден в пределах максимальной длины заголовка
    #[error("Header terminator not found within {max_len} bytes")]
    HeaderTooLong { max_len: usize },

    /// Поток закончился посреди заголовка
    #[error("Input ended inside a header after {read} bytes")]
    TruncatedHeader { read: usize },

    /// Обязательный ключ отсутствует в заголовке
    #[error("Missing header key: {0}")]
    MissingKey(String),

    /// Значение ключа не разбирается
    #[error("Malformed value for {key}: '{value}'")]
    MalformedValue { key: String, value: String },

    /// Значение ключа не совпадает с ожидаемым
    #[error("{key} is {found}, expected {expected}")]
    ValidationMismatch {
        key: String,
        found: String,
        expected: String,
    },

    /// Неподдерживаемый источник данных
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// Геометрия сырого блока или окна не согласована
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Не удалось выделить буфер фиксированного размера
    #[error("Allocation of {bytes} bytes for {what} failed")]
    AllocationFailed { what: &'static str, bytes: usize },

    /// Рабочие буферы статистики уже выделены под другой размер окна
    #[error("Scratch space sized for {expected} samples/channel, window has {found}")]
    ScratchSizeMismatch { expected: usize, found: usize },

    /// Повреждённые или некорректные данные отчёта
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Нарушение формата файла отчётов
    #[error("Format violation: {0}")]
    FormatViolation(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrscError {
    /// Удобные конструкторы
    pub fn missing_key<S: Into<String>>(s: S) -> Self {
        Self::MissingKey(s.into())
    }

    pub fn malformed<K: Into<String>, V: Into<String>>(
        key: K,
        value: V,
    ) -> Self {
        Self::MalformedValue {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn mismatch<K, F, E>(
        key: K,
        found: F,
        expected: E,
    ) -> Self
    where
        K: Into<String>,
        F: ToString,
        E: ToString,
    {
        Self::ValidationMismatch {
            key: key.into(),
            found: found.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn invalid_layout<S: Into<String>>(s: S) -> Self {
        Self::InvalidLayout(s.into())
    }

    pub fn corrupted<S: Into<String>>(s: S) -> Self {
        Self::Corrupted(s.into())
    }

    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }

    /// Категория ошибки.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HeaderTooLong { .. } | Self::TruncatedHeader { .. } => ErrorKind::Framing,
            Self::MissingKey(_)
            | Self::MalformedValue { .. }
            | Self::ValidationMismatch { .. }
            | Self::UnsupportedSource(_)
            | Self::InvalidLayout(_) => ErrorKind::Validation,
            Self::AllocationFailed { .. } | Self::ScratchSizeMismatch { .. } => {
                ErrorKind::Resource
            }
            Self::Corrupted(_) | Self::FormatViolation(_) => ErrorKind::Format,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FrscError::HeaderTooLong { max_len: 16 }.kind(),
            ErrorKind::Framing
        );
        assert_eq!(
            FrscError::mismatch("NBITS", 4, 8).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            FrscError::ScratchSizeMismatch {
                expected: 4,
                found: 8
            }
            .kind(),
            ErrorKind::Resource
        );
    }

    #[test]
    fn test_mismatch_message() {
        let e = FrscError::mismatch("NPOL", 2, 4);
        assert_eq!(e.to_string(), "NPOL is 2, expected 4");
    }
}
