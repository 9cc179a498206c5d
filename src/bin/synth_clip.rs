//! Records a synthetic clip: renders each frame, encodes it as a PNG on its own task, muxes the
//! results into an APNG and writes a JSON report next to it.

use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use apng_mux::{sink::save_as_file, still::StillEncoder, EncoderConfig, Muxer};
use futures::{stream, StreamExt};

const DEFAULT_FRAME_COUNT: usize = 45;

fn main() -> anyhow::Result<()> {
    let args: Vec<_> = std::env::args().skip(1).collect();
    let verbosity = if args.iter().any(|arg| arg == "-v") {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Error
    };
    pretty_env_logger::formatted_builder()
        .filter_level(verbosity)
        .parse_default_env()
        .init();

    let frame_count = match args.iter().position(|arg| arg == "--frames") {
        Some(i) => args
            .get(i + 1)
            .context("--frames expects a value")?
            .parse()
            .context("--frames expects a whole number")?,
        None => DEFAULT_FRAME_COUNT,
    };
    let output = args
        .iter()
        .enumerate()
        .find(|(i, arg)| {
            !arg.starts_with('-') && (*i == 0 || args[*i - 1] != "--frames")
        })
        .map(|(_, arg)| PathBuf::from(arg));

    async_std::task::block_on(record(EncoderConfig::default(), frame_count, output))
}

async fn record(
    config: EncoderConfig,
    frame_count: usize,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let (width, height) = (config.width, config.height);
    let muxer = Muxer::new(config.clone())?;

    let frames = stream::iter(0..frame_count).then(move |index| {
        async_std::task::spawn(async move {
            let pixels = render(width, height, index, frame_count);
            StillEncoder::rgba(width, height).encode(&pixels)
        })
    });
    let apng = muxer.mux_stream(frame_count, frames).await?;
    let saved = save_as_file(&apng, output.as_deref()).await?;

    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Iso8601::DEFAULT)?;
    let report = serde_json::json!({
        "date": now,
        "frames": frame_count,
        "width": width,
        "height": height,
        "fps": config.fps,
        "bytes": apng.len(),
        "output": saved.display().to_string(),
        "elapsed_ms": started.elapsed().as_millis() as u64,
    });
    let report_path = saved.with_extension("json");
    let report_file: async_std::path::PathBuf = report_path.clone().into();
    async_std::fs::write(&report_file, report.to_string())
        .await
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    println!("{}", report);
    Ok(())
}

/// A bright bar sweeping left to right over a gradient.
fn render(width: u32, height: u32, index: usize, frame_count: usize) -> Vec<u8> {
    let (width, height) = (width as usize, height as usize);
    let bar = index * width / frame_count.max(1);
    let half_bar = width / 32 + 1;
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            if x.abs_diff(bar) < half_bar {
                pixels.extend([255, 255, 255, 255]);
            } else {
                pixels.extend([(y * 255 / height) as u8, (x * 255 / width) as u8, 128, 255]);
            }
        }
    }
    pixels
}
