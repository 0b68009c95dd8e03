//! Пример: чтение файла отчётов через ReportReader
//!
//! Демонстрирует:
//! - итерацию отчётов (усечённый хвост завершает чтение)
//! - разбор поканальной статистики

use std::fs::File;

use frsc_core::ReportReader;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = "out.dat";

    let mut reader = ReportReader::new(File::open(input_path)?);

    for report in reader.by_ref() {
        let report = report?;
        let h = &report.header;
        println!(
            "#{:<5} type={:?} f_start={:.3}s n_ch={}",
            h.seq_no, h.report_type, h.f_start, h.n_ch
        );

        if let Some(body) = &report.body {
            println!(
                "       clips x={} y={}; ch1 xm2 mean={:.2} rms={:.2}",
                body.clips.x,
                body.clips.y,
                body.channels[0].pol.xm2.mean,
                body.channels[0].pol.xm2.rms
            );
        }
    }

    let stats = reader.stats();
    println!("\n✓ Read complete");
    println!("  Reports ok      : {}", stats.reports_ok);
    println!("  With TD body    : {}", stats.td_reports);
    println!("  Truncated bytes : {}", stats.truncated_bytes);

    Ok(())
}
