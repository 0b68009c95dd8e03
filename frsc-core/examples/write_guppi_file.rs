//! Пример: запись синтетического файла GUPPI
//!
//! Демонстрирует:
//! - сборку заголовка из метаданных через GuppiHeaderBuilder
//! - генерацию 8-битных выборок двух поляризаций (тон + шум)
//! - проверку записанного файла через GuppiReader

use std::{
    fs::File,
    io::{BufWriter, Write},
};

use frsc_core::{BlockRead, GuppiHeaderBuilder, GuppiMetadata, GuppiReader};
use frsc_types::DualPolSample;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = "frsc-core/test_output.raw";

    // --- Метаданные: 16 каналов × 4096 выборок на блок ---
    let meta = GuppiMetadata {
        block_size: 16 * 4096 * 4,
        n_chan: 16,
        obsfreq: 1_420.0,
        obsbw: -50.0,
        chan_bw: -3.125,
        tbin: 3.2e-7,
        overlap: 64,
        ..GuppiMetadata::default()
    };
    let builder = GuppiHeaderBuilder::from_metadata(&meta);

    let mut out = BufWriter::new(File::create(output_path)?);
    let num_blocks = 4;
    let spc = meta.samples_per_channel();

    for block_idx in 0..num_blocks {
        let mut data = Vec::with_capacity(meta.block_size);

        for ch in 0..meta.n_chan {
            for i in 0..spc {
                // Перекрытие повторяет хвост предыдущего блока
                let t = (block_idx * (spc - meta.overlap) + i) as f32;
                let phase = 2.0 * std::f32::consts::PI * t * (ch + 1) as f32 / 64.0;
                let s = DualPolSample {
                    xi: (40.0 * phase.cos()) as i8,
                    xq: (40.0 * phase.sin()) as i8,
                    yi: (20.0 * phase.sin()) as i8,
                    yq: (-20.0 * phase.cos()) as i8,
                };
                data.extend_from_slice(&s.to_bytes());
            }
        }
        // Первый байт блока не должен быть пробелом
        if data[0] == b' ' {
            data[0] += 1;
        }

        builder.write_block(&mut out, &data)?;
        println!("Block {block_idx}: {} bytes written", data.len());
    }
    out.flush()?;
    drop(out);

    // --- Проверка ---
    let mut reader = GuppiReader::open(output_path)?;
    let mut block = vec![0u8; meta.block_size];
    while let Some(header) = reader.read_header()? {
        let parsed = GuppiMetadata::extract(&header.text, meta.block_size)?;
        if reader.read_block(&mut block)? != BlockRead::Complete {
            break;
        }
        println!(
            "  header @ {:>8}: {} channels, fs = {:.3e} Hz",
            header.header_offset,
            parsed.n_chan,
            parsed.sample_rate()
        );
    }

    println!("\n✓ Записано: {output_path}");
    println!("  Blocks   : {}", reader.blocks_read());
    println!("  Bytes    : {}", reader.position());

    Ok(())
}
