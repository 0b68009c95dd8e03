use serde::Serialize;

use crate::{ReportHeader, MAX_CHANNELS};

/// Описательная статистика одной величины за окно
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DaStats {
    pub mean: f32,
    /// Максимум за окно
    pub max: f32,
    /// Среднеквадратичное отклонение (по генеральной совокупности)
    pub rms: f32,
    pub skewness: f32,
    /// Эксцесс (для гауссова сигнала равен 0)
    pub kurtosis: f32,
}

/// Статистика восьми производных величин двух поляризаций
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PolStats {
    pub xi: DaStats,
    pub xq: DaStats,
    pub yi: DaStats,
    pub yq: DaStats,
    /// |X|²
    pub xm2: DaStats,
    /// |Y|²
    pub ym2: DaStats,
    /// Параметр Стокса U
    pub u: DaStats,
    /// Параметр Стокса V
    pub v: DaStats,
}

impl PolStats {
    /// Количество значений `f32` в записи (8 величин × 5 моментов).
    pub const FIELD_COUNT: usize = 40;

    /// Величины в порядке записи на диск.
    pub fn quantities(&self) -> [&DaStats; 8] {
        [
            &self.xi, &self.xq, &self.yi, &self.yq, &self.xm2, &self.ym2, &self.u, &self.v,
        ]
    }

    pub fn quantities_mut(&mut self) -> [&mut DaStats; 8] {
        [
            &mut self.xi,
            &mut self.xq,
            &mut self.yi,
            &mut self.yq,
            &mut self.xm2,
            &mut self.ym2,
            &mut self.u,
            &mut self.v,
        ]
    }
}

/// Счётчики клиппирования по поляризациям
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Clips {
    pub x: i64,
    pub y: i64,
}

impl std::ops::AddAssign for Clips {
    fn add_assign(
        &mut self,
        rhs: Self,
    ) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Статистика одного канала
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChannelStats {
    pub pol: PolStats,
    pub clips: Clips,
}

/// Тело отчёта временного анализа (типы 1 и 2).
///
/// Массив каналов всегда имеет длину `MAX_CHANNELS`; записи каналов, которые
/// не анализировались в этом окне, сохраняют значения предыдущего окна.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TdBody {
    /// Клиппирование за всё окно
    pub clips: Clips,
    /// Полная полоса (все каналы как один)
    pub full_band: PolStats,
    /// Поканальная статистика, индекс `ch - 1`
    pub channels: Vec<ChannelStats>,
}

impl Default for TdBody {
    fn default() -> Self {
        Self {
            clips: Clips::default(),
            full_band: PolStats::default(),
            channels: vec![ChannelStats::default(); MAX_CHANNELS],
        }
    }
}

impl TdBody {
    /// Статистика канала `ch` (1-based).
    pub fn channel(
        &self,
        ch: usize,
    ) -> Option<&ChannelStats> {
        ch.checked_sub(1).and_then(|i| self.channels.get(i))
    }
}

/// Отчёт целиком: заголовок и тело (если тип отчёта его предусматривает)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub header: ReportHeader,
    pub body: Option<TdBody>,
}
