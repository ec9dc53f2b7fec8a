//! Encodes a generated test image and writes it to disk.
//!
//! ```bash
//! cargo run --example encode_buffer -- out.jxl
//! ```

use anyhow::Context;
use jxls::{encode, EncoderOptions, RayonRunner};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "out.jxl".into());

    let width = 800usize;
    let height = 600usize;
    let mut pixels = vec![0u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            let px = &mut pixels[(y * width + x) * 4..][..4];
            px[0] = (x * 255 / width) as u8;
            px[1] = (y * 255 / height) as u8;
            px[2] = ((x + y) * 127 / (width + height)) as u8;
            px[3] = 255;
        }
    }

    let options = EncoderOptions::new(width, height, 4).effort(2);
    let encoded = encode(&pixels, width * 4, &options, Some(&RayonRunner))
        .context("encoding failed")?;

    println!(
        "{width}x{height} RGBA: {} -> {} bytes ({:.2} bpp)",
        pixels.len(),
        encoded.len(),
        encoded.len() as f64 * 8.0 / (width * height) as f64
    );
    std::fs::write(&path, &encoded).with_context(|| format!("writing {path}"))?;
    Ok(())
}
