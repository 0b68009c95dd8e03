//! Перебуферизация сырых блоков GUPPI в окна анализа.
//!
//! Сырой блок хранит каналы подряд: `spc` выборок по 4 байта на канал, из
//! которых первые `overlap` повторяют хвост предыдущего блока. Движок
//! копирует из каждого канала только выборки без перекрытия в окно из `N`
//! выборок на канал и вызывает потребителя, как только окно заполнено.
//! Окно может охватывать несколько сырых блоков, а один блок может заполнить
//! несколько окон.

use frsc_core::GuppiMetadata;
use frsc_types::{ChannelMask, DualPolSample, FrscError, FrscResult, BYTES_PER_SAMPLE};

/// Окно анализа: `N` выборок без перекрытия на каждый канал.
///
/// Канал `ch` (1-based) занимает байты `[(ch-1)*N*4, ch*N*4)`.
#[derive(Debug)]
pub struct WindowBuffer {
    data: Vec<u8>,
    n_chan: usize,
    samples: usize,
    filled: usize,
}

/// Потребитель заполненных окон.
pub trait WindowSink {
    /// Вызывается синхронно для каждого заполненного окна. `f_start` — время
    /// начала окна от начала прогона, с.
    fn window_full(
        &mut self,
        window: &WindowBuffer,
        f_start: f64,
    ) -> FrscResult<()>;
}

impl<F> WindowSink for F
where
    F: FnMut(&WindowBuffer, f64) -> FrscResult<()>,
{
    fn window_full(
        &mut self,
        window: &WindowBuffer,
        f_start: f64,
    ) -> FrscResult<()> {
        self(window, f_start)
    }
}

/// Движок перебуферизации одного окна (T0 или T1).
#[derive(Debug)]
pub struct Rebuffer {
    window: WindowBuffer,
    exclude: ChannelMask,
    spc: usize,
    overlap: usize,
    window_duration: f64,
    f_start: f64,
    windows_completed: u64,
}

impl WindowBuffer {
    ////////// Собственные методы

    /// Выделяет окно. Ошибка выделения памяти возвращается, а не прерывает
    /// процесс.
    pub fn new(
        n_chan: usize,
        samples: usize,
    ) -> FrscResult<Self> {
        if n_chan == 0 || samples == 0 {
            return Err(FrscError::invalid_layout(format!(
                "window of {samples} samples x {n_chan} channels is empty"
            )));
        }

        let bytes = n_chan
            .checked_mul(samples)
            .and_then(|n| n.checked_mul(BYTES_PER_SAMPLE))
            .ok_or(FrscError::AllocationFailed {
                what: "window buffer",
                bytes: usize::MAX,
            })?;

        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| FrscError::AllocationFailed {
                what: "window buffer",
                bytes,
            })?;
        data.resize(bytes, 0);

        Ok(Self {
            data,
            n_chan,
            samples,
            filled: 0,
        })
    }

    pub fn n_chan(&self) -> usize {
        self.n_chan
    }

    /// Ёмкость окна в выборках на канал (`N`).
    pub fn samples_per_channel(&self) -> usize {
        self.samples
    }

    /// Сколько выборок на канал уже скопировано.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.samples
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Байты канала `ch` (1-based). Для исключённых каналов содержимое
    /// устаревшее.
    pub fn channel(
        &self,
        ch: usize,
    ) -> &[u8] {
        let stride = self.samples * BYTES_PER_SAMPLE;
        &self.data[(ch - 1) * stride..ch * stride]
    }

    /// Выборки канала `ch` (1-based).
    pub fn channel_samples(
        &self,
        ch: usize,
    ) -> impl Iterator<Item = DualPolSample> + Clone + '_ {
        DualPolSample::iter_bytes(self.channel(ch))
    }

    fn copy_run(
        &mut self,
        ch: usize,
        src: &[u8],
    ) {
        let at = ((ch - 1) * self.samples + self.filled) * BYTES_PER_SAMPLE;
        self.data[at..at + src.len()].copy_from_slice(src);
    }
}

impl Rebuffer {
    ////////// Собственные методы

    /// Создаёт движок для окна из `samples` выборок на канал по геометрии
    /// блока из `meta`. Каналы с установленным битом в `exclude` не
    /// копируются.
    pub fn new(
        meta: &GuppiMetadata,
        samples: usize,
        exclude: ChannelMask,
    ) -> FrscResult<Self> {
        let spc = meta.samples_per_channel();
        if meta.overlap >= spc {
            return Err(FrscError::invalid_layout(format!(
                "overlap of {} samples leaves nothing of {spc} per channel",
                meta.overlap
            )));
        }

        Ok(Self {
            window: WindowBuffer::new(meta.n_chan, samples)?,
            exclude,
            spc,
            overlap: meta.overlap,
            window_duration: samples as f64 / meta.channel_bandwidth_hz().abs(),
            f_start: 0.0,
            windows_completed: 0,
        })
    }

    /// Переносит один сырой блок в окно. Каждое заполненное окно передаётся
    /// в `sink`, после чего время начала сдвигается на длительность окна, а
    /// окно начинается заново. Незаполненное окно переходит в следующий
    /// вызов. Возвращает число окон, заполненных этим блоком.
    pub fn swallow<S: WindowSink + ?Sized>(
        &mut self,
        block: &[u8],
        sink: &mut S,
    ) -> FrscResult<usize> {
        let n_chan = self.window.n_chan;
        let expected = n_chan * self.spc * BYTES_PER_SAMPLE;
        if block.len() != expected {
            return Err(FrscError::invalid_layout(format!(
                "raw block is {} bytes, expected {expected}",
                block.len()
            )));
        }

        let per_channel = self.spc - self.overlap;
        let channel_stride = self.spc * BYTES_PER_SAMPLE;
        let mut src = 0;
        let mut completed = 0;
        let mut exhausted = false;

        while !exhausted {
            let mut n = per_channel;

            // Не больше, чем осталось до конца окна
            let room = self.window.samples - self.window.filled;
            if n >= room {
                n = room;
            }

            // Не больше, чем осталось в блоке
            if src + n >= per_channel {
                n = per_channel - src;
                exhausted = true;
            }

            // Заполненность окна проверяется по фактической длине копии
            let full = self.window.filled + n >= self.window.samples;

            if n > 0 {
                let offset = (self.overlap + src) * BYTES_PER_SAMPLE;
                for ch in 1..=n_chan {
                    if self.exclude.test(ch) {
                        continue;
                    }
                    let start = (ch - 1) * channel_stride + offset;
                    self.window
                        .copy_run(ch, &block[start..start + n * BYTES_PER_SAMPLE]);
                }
            }

            src += n;
            self.window.filled += n;

            if full {
                sink.window_full(&self.window, self.f_start)?;
                self.f_start += self.window_duration;
                self.window.filled = 0;
                self.windows_completed += 1;
                completed += 1;
            }
        }

        Ok(completed)
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    /// Время начала текущего (незаполненного) окна, с.
    pub fn f_start(&self) -> f64 {
        self.f_start
    }

    /// Номинальная длительность окна, с.
    pub fn window_duration(&self) -> f64 {
        self.window_duration
    }

    pub fn windows_completed(&self) -> u64 {
        self.windows_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2 канала × 8 выборок, перекрытие 2.
    fn meta() -> GuppiMetadata {
        GuppiMetadata {
            block_size: 2 * 8 * BYTES_PER_SAMPLE,
            n_chan: 2,
            chan_bw: -0.5,
            tbin: 0.25,
            overlap: 2,
            ..GuppiMetadata::default()
        }
    }

    /// Блок, в котором каждая выборка кодирует (блок, канал, индекс).
    fn block(idx: u8) -> Vec<u8> {
        let mut data = Vec::new();
        for ch in 0..2u8 {
            for i in 0..8u8 {
                data.extend_from_slice(&[idx, ch, i, 0]);
            }
        }
        data
    }

    #[test]
    fn test_window_buffer_rejects_empty() {
        assert!(matches!(
            WindowBuffer::new(0, 4),
            Err(FrscError::InvalidLayout(_))
        ));
        assert!(matches!(
            WindowBuffer::new(2, 0),
            Err(FrscError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_block_fills_exact_window() {
        let mut rb = Rebuffer::new(&meta(), 6, ChannelMask::new()).unwrap();
        let mut seen = Vec::new();

        let n = rb
            .swallow(&block(1), &mut |w: &WindowBuffer, f: f64| -> FrscResult<()> {
                seen.push((w.channel(2).to_vec(), f));
                Ok(())
            })
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(seen.len(), 1);
        let (ch2, f_start) = &seen[0];
        assert_eq!(*f_start, 0.0);
        // Выборки 2..8 второго канала, перекрытие отброшено
        let indices: Vec<u8> = ch2.chunks(4).map(|s| s[2]).collect();
        assert_eq!(indices, vec![2, 3, 4, 5, 6, 7]);
        assert!(ch2.chunks(4).all(|s| s[0] == 1 && s[1] == 1));
        assert_eq!(rb.window().filled(), 0);
    }

    #[test]
    fn test_window_spans_blocks() {
        let mut rb = Rebuffer::new(&meta(), 10, ChannelMask::new()).unwrap();
        let mut windows = Vec::new();
        let mut sink = |w: &WindowBuffer, _: f64| -> FrscResult<()> {
            windows.push(w.channel(1).to_vec());
            Ok(())
        };

        assert_eq!(rb.swallow(&block(1), &mut sink).unwrap(), 0);
        assert_eq!(rb.swallow(&block(2), &mut sink).unwrap(), 1);
        drop(sink);

        assert_eq!(rb.window().filled(), 2);
        let w = &windows[0];
        let tags: Vec<(u8, u8)> = w.chunks(4).map(|s| (s[0], s[2])).collect();
        assert_eq!(
            tags,
            vec![
                (1, 2),
                (1, 3),
                (1, 4),
                (1, 5),
                (1, 6),
                (1, 7),
                (2, 2),
                (2, 3),
                (2, 4),
                (2, 5)
            ]
        );
    }

    #[test]
    fn test_block_fills_several_windows() {
        let mut rb = Rebuffer::new(&meta(), 2, ChannelMask::new()).unwrap();
        let mut starts = Vec::new();

        let n = rb
            .swallow(&block(1), &mut |_: &WindowBuffer, f: f64| -> FrscResult<()> {
                starts.push(f);
                Ok(())
            })
            .unwrap();

        assert_eq!(n, 3);
        // Длительность окна: 2 выборки / 500 кГц
        assert!((rb.window_duration() - 4.0e-6).abs() < 1e-18);
        for (i, f) in starts.iter().enumerate() {
            assert!((f - 4.0e-6 * i as f64).abs() < 1e-15);
        }
        assert_eq!(rb.windows_completed(), 3);
    }

    #[test]
    fn test_excluded_channel_not_copied() {
        let mut exclude = ChannelMask::new();
        exclude.set(1).unwrap();
        let mut rb = Rebuffer::new(&meta(), 6, exclude).unwrap();

        let mut ch1_zero = false;
        rb.swallow(&block(7), &mut |w: &WindowBuffer, _: f64| -> FrscResult<()> {
            ch1_zero = w.channel(1).iter().all(|&b| b == 0);
            assert!(w.channel(2).chunks(4).all(|s| s[0] == 7));
            Ok(())
        })
        .unwrap();

        assert!(ch1_zero);
    }

    #[test]
    fn test_wrong_block_length() {
        let mut rb = Rebuffer::new(&meta(), 6, ChannelMask::new()).unwrap();
        let err = rb
            .swallow(&[0u8; 12], &mut |_: &WindowBuffer, _: f64| -> FrscResult<()> { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, FrscError::InvalidLayout(_)));
    }

    #[test]
    fn test_sink_error_propagates() {
        let mut rb = Rebuffer::new(&meta(), 6, ChannelMask::new()).unwrap();
        let err = rb
            .swallow(&block(1), &mut |_: &WindowBuffer, _: f64| -> FrscResult<()> {
                Err(FrscError::ScratchSizeMismatch {
                    expected: 4,
                    found: 6,
                })
            })
            .unwrap_err();
        assert!(matches!(err, FrscError::ScratchSizeMismatch { .. }));
    }
}
