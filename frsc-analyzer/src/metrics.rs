use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Счётчики прогона анализа.
#[derive(Debug, Default)]
pub struct RunMetrics {
    pub blocks_read: AtomicU64,
    pub bytes_read: AtomicU64,
    pub windows_completed: AtomicU64,
    pub reports_written: AtomicU64,
    /// Время чтения входного файла, нс
    pub read_nanos: AtomicU64,
    /// Время перебуферизации и анализа, нс
    pub swallow_nanos: AtomicU64,
}

/// Snapshot метрик для вывода в конце прогона.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub duration_secs: f64,
    pub blocks_read: u64,
    pub bytes_read: u64,
    pub windows_completed: u64,
    pub reports_written: u64,
    pub read_secs: f64,
    pub swallow_secs: f64,
    pub read_speed_mbps: f64,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_read_time(
        &self,
        elapsed: Duration,
    ) {
        self.read_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn add_swallow_time(
        &self,
        elapsed: Duration,
    ) {
        self.swallow_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Скорость чтения входа в МБ/с (по времени самого чтения).
    pub fn read_speed_mbps(&self) -> f64 {
        let secs = self.read_nanos.load(Ordering::Relaxed) as f64 / 1e9;

        if secs < 1e-9 {
            return 0.0;
        }

        self.bytes_read.load(Ordering::Relaxed) as f64 / secs / 1_000_000.0
    }

    /// Итоговая сводка для вывода в конце прогона.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> MetricsSummary {
        MetricsSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            blocks_read: self.blocks_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            windows_completed: self.windows_completed.load(Ordering::Relaxed),
            reports_written: self.reports_written.load(Ordering::Relaxed),
            read_secs: self.read_nanos.load(Ordering::Relaxed) as f64 / 1e9,
            swallow_secs: self.swallow_nanos.load(Ordering::Relaxed) as f64 / 1e9,
            read_speed_mbps: self.read_speed_mbps(),
        }
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(f, "  Blocks        : {}", self.blocks_read)?;
        writeln!(
            f,
            "  Bytes read    : {:.1} MB",
            self.bytes_read as f64 / 1e6
        )?;
        writeln!(f, "  Windows       : {}", self.windows_completed)?;
        writeln!(f, "  Reports       : {}", self.reports_written)?;
        writeln!(
            f,
            "  Read time     : {:.3}s ({:.1} MB/s)",
            self.read_secs, self.read_speed_mbps
        )?;
        writeln!(f, "  Analysis time : {:.3}s", self.swallow_secs)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_metrics_zero() {
        let metrics = RunMetrics::new();
        let summary = metrics.summary(&Instant::now());

        assert_eq!(summary.blocks_read, 0);
        assert_eq!(summary.bytes_read, 0);
        assert_eq!(summary.windows_completed, 0);
        assert_eq!(summary.reports_written, 0);
        assert_eq!(summary.read_secs, 0.0);
        assert_eq!(summary.read_speed_mbps, 0.0);
    }

    #[test]
    fn test_read_speed() {
        let metrics = RunMetrics::new();
        metrics.bytes_read.store(10_000_000, Ordering::Relaxed);
        metrics.add_read_time(Duration::from_secs(2));

        // 10 МБ за 2 с
        assert!((metrics.read_speed_mbps() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_timers_accumulate() {
        let metrics = RunMetrics::new();
        metrics.add_swallow_time(Duration::from_millis(250));
        metrics.add_swallow_time(Duration::from_millis(750));

        let summary = metrics.summary(&Instant::now());
        assert!((summary.swallow_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let metrics = RunMetrics::new();
        metrics.blocks_read.store(3, Ordering::Relaxed);
        metrics.reports_written.store(7, Ordering::Relaxed);

        let text = metrics.summary(&Instant::now()).to_string();
        assert!(text.contains("Blocks        : 3"));
        assert!(text.contains("Reports       : 7"));
    }
}
