use serde::Serialize;

use crate::{FrscError, FrscResult};

/// Количество 64-битных слов в маске каналов
pub const MASK_WORDS: usize = 16;

/// Максимальное число каналов, которое помещается в маску (1024)
pub const MAX_CHANNELS: usize = MASK_WORDS * 64;

/// Битовая маска каналов фиксированной ёмкости.
///
/// Адресация 1-based: канал `1` — младший бит слова `0`. Установленный бит
/// означает "канал исключён".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelMask {
    words: [u64; MASK_WORDS],
}

impl ChannelMask {
    /// Пустая маска (ни один канал не исключён).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words(words: [u64; MASK_WORDS]) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u64; MASK_WORDS] {
        &self.words
    }

    /// Установлен ли бит канала `ch`. Каналы вне `1..=MAX_CHANNELS` считаются
    /// не установленными.
    pub fn test(
        &self,
        ch: usize,
    ) -> bool {
        match Self::locate(ch) {
            Some((word, bit)) => self.words[word] & (1u64 << bit) != 0,
            None => false,
        }
    }

    /// Устанавливает бит канала `ch`.
    pub fn set(
        &mut self,
        ch: usize,
    ) -> FrscResult<()> {
        let (word, bit) = Self::checked(ch)?;
        self.words[word] |= 1u64 << bit;
        Ok(())
    }

    /// Сбрасывает бит канала `ch`.
    pub fn clear(
        &mut self,
        ch: usize,
    ) -> FrscResult<()> {
        let (word, bit) = Self::checked(ch)?;
        self.words[word] &= !(1u64 << bit);
        Ok(())
    }

    /// Количество установленных битов.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Номера установленных каналов по возрастанию.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=MAX_CHANNELS).filter(move |&ch| self.test(ch))
    }

    fn locate(ch: usize) -> Option<(usize, usize)> {
        if ch == 0 || ch > MAX_CHANNELS {
            return None;
        }
        let idx = ch - 1;
        Some((idx / 64, idx % 64))
    }

    fn checked(ch: usize) -> FrscResult<(usize, usize)> {
        Self::locate(ch).ok_or_else(|| {
            FrscError::invalid_layout(format!("channel {ch} outside 1..={MAX_CHANNELS}"))
        })
    }
}

/// Слова от старшего к младшему, как их печатает утилита чтения отчётов.
impl std::fmt::Display for ChannelMask {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        for (i, word) in self.words.iter().rev().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "0x{word:016x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_based_addressing() {
        let mut mask = ChannelMask::new();
        mask.set(1).unwrap();
        mask.set(64).unwrap();
        mask.set(65).unwrap();
        mask.set(MAX_CHANNELS).unwrap();

        assert_eq!(mask.words()[0], 1 | (1 << 63));
        assert_eq!(mask.words()[1], 1);
        assert_eq!(mask.words()[MASK_WORDS - 1], 1 << 63);
        assert!(mask.test(1));
        assert!(!mask.test(2));
        assert_eq!(mask.count(), 4);
    }

    #[test]
    fn test_clear_only_touches_one_bit() {
        let mut mask = ChannelMask::new();
        mask.set(3).unwrap();
        mask.set(4).unwrap();
        mask.clear(3).unwrap();
        mask.clear(5).unwrap(); // уже сброшен — no-op

        assert!(!mask.test(3));
        assert!(mask.test(4));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_out_of_range() {
        let mut mask = ChannelMask::new();
        assert!(mask.set(0).is_err());
        assert!(mask.set(MAX_CHANNELS + 1).is_err());
        assert!(!mask.test(0));
        assert!(!mask.test(MAX_CHANNELS + 1));
        assert!(mask.is_empty());
    }

    #[test]
    fn test_display_high_word_first() {
        let mut mask = ChannelMask::new();
        mask.set(1).unwrap();
        let s = mask.to_string();
        assert!(s.starts_with("0x0000000000000000"));
        assert!(s.ends_with("0x0000000000000001"));
    }
}
