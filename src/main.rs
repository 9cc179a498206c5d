use std::path::PathBuf;

use anyhow::{bail, Context};
use apng_mux::{
    chunks::read_header,
    inspect,
    sink::{save_as_file, HttpTransport, Upload},
    EncoderConfig, Muxer,
};
use futures::{stream, StreamExt};

const USAGE: &str = "usage:
    apng-mux [-v] [--config FILE] [--fps N] [--size WxH] [--timeout-ms MS] [-o OUT]
             [--upload URL [--field NAME=VALUE]...] FRAME...
    apng-mux inspect FILE";

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("inspect") {
        init_logging(false);
        let file = args.get(1).context(USAGE)?;
        let png = std::fs::read(file).with_context(|| format!("Failed to read {file}"))?;
        let chunks =
            inspect::inspect(&png).with_context(|| format!("{file} is not a readable PNG"))?;
        print!("{}", inspect::describe(&chunks));
        return Ok(());
    }

    let args = MuxArgs::parse(args)?;
    init_logging(args.verbose);
    let upload_to = args.upload.clone();
    let fields = args.fields.clone();
    let apng = async_std::task::block_on(run(args))?;

    if let Some(url) = upload_to {
        let mut upload = Upload::new("file", &apng);
        for (name, value) in fields {
            upload = upload.field(name, value);
        }
        upload.send(&mut HttpTransport::new(url.as_str()), |fraction| {
            log::info!("Uploaded {:.0}%", fraction * 100.0)
        })?;
        println!("uploaded to {url}");
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let verbosity = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Error
    };
    pretty_env_logger::formatted_builder()
        .filter_level(verbosity)
        .parse_default_env()
        .init();
}

async fn run(args: MuxArgs) -> anyhow::Result<Vec<u8>> {
    let config = args.load_config().await?;
    log::info!(
        "Muxing {} frames at {}x{}, {} fps",
        args.frames.len(),
        config.width,
        config.height,
        config.fps
    );
    let muxer = Muxer::new(config)?;

    let frame_count = args.frames.len();
    let frames = stream::iter(args.frames.clone()).then(|path| async move {
        let target: async_std::path::PathBuf = path.clone().into();
        async_std::fs::read(&target)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    });
    let apng = muxer.mux_stream(frame_count, frames).await?;

    let saved = save_as_file(&apng, args.output.as_deref()).await?;
    println!(
        "{frame_count} frames -> {} ({} bytes)",
        saved.display(),
        apng.len()
    );
    Ok(apng)
}

#[derive(Debug, Default)]
struct MuxArgs {
    verbose: bool,
    config: Option<PathBuf>,
    fps: Option<u32>,
    size: Option<(u32, u32)>,
    timeout_ms: Option<u64>,
    output: Option<PathBuf>,
    upload: Option<String>,
    fields: Vec<(String, String)>,
    frames: Vec<PathBuf>,
}

impl MuxArgs {
    fn parse(args: Vec<String>) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-v" => parsed.verbose = true,
                "-h" | "--help" => bail!(USAGE),
                "--config" => parsed.config = Some(value(&mut args, "--config")?.into()),
                "--fps" => {
                    parsed.fps = Some(
                        value(&mut args, "--fps")?
                            .parse()
                            .context("--fps expects a whole number")?,
                    )
                }
                "--size" => parsed.size = Some(parse_size(&value(&mut args, "--size")?)?),
                "--timeout-ms" => {
                    parsed.timeout_ms = Some(
                        value(&mut args, "--timeout-ms")?
                            .parse()
                            .context("--timeout-ms expects a whole number")?,
                    )
                }
                "-o" | "--output" => parsed.output = Some(value(&mut args, "-o")?.into()),
                "--upload" => parsed.upload = Some(value(&mut args, "--upload")?),
                "--field" => {
                    let field = value(&mut args, "--field")?;
                    let (name, value) = field
                        .split_once('=')
                        .with_context(|| format!("--field expects NAME=VALUE, got {field}"))?;
                    parsed.fields.push((name.to_owned(), value.to_owned()));
                }
                flag if flag.starts_with('-') => bail!("unknown option {flag}\n{USAGE}"),
                _ => parsed.frames.push(PathBuf::from(&arg)),
            }
        }
        Ok(parsed)
    }

    /// Defaults, then the config file, then flags. Without a size from either, the first
    /// frame's header decides it.
    async fn load_config(&self) -> anyhow::Result<EncoderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file: async_std::path::PathBuf = path.clone().into();
                let json = async_std::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                EncoderConfig::from_json(&json)
                    .with_context(|| format!("Invalid config in {}", path.display()))?
            }
            None => EncoderConfig::default(),
        };
        if let Some((width, height)) = self.size {
            config.width = width;
            config.height = height;
        } else if self.config.is_none() {
            if let Some(first) = self.frames.first() {
                let file: async_std::path::PathBuf = first.clone().into();
                let png = async_std::fs::read(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", first.display()))?;
                let (_, header) = read_header(&png)
                    .with_context(|| format!("{} has no readable header", first.display()))?;
                config.width = header.width;
                config.height = header.height;
            }
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.acquisition_timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{flag} expects a value"))
}

fn parse_size(size: &str) -> anyhow::Result<(u32, u32)> {
    let (width, height) = size
        .split_once('x')
        .with_context(|| format!("size should look like 480x360, got {size}"))?;
    Ok((
        width.parse().context("invalid width")?,
        height.parse().context("invalid height")?,
    ))
}
