use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use montage::{
    AudioChunk, DiskImageAccessor, EngineConfig, FileAccessors, FrameIndex, GetAudioContext,
    RenderContext, Resolution, TimelineObject, WavAudioAccessor,
};

#[derive(Parser, Debug)]
#[command(name = "montage", version)]
struct Cli {
    /// Engine config JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Mix an inclusive frame range to raw interleaved f32le.
    Mix(MixArgs),
    /// Split a clip in two and write the project back.
    Split(SplitArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Output width; the project resolution when omitted (or the config's, with --config).
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

#[derive(Parser, Debug)]
struct MixArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Last frame to mix; the project's last frame when omitted.
    #[arg(long)]
    end: Option<u64>,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SplitArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long)]
    layer: String,

    #[arg(long)]
    clip: String,

    #[arg(long)]
    frame: u64,

    /// Output project path; overwrites the input when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.log_filter);

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args, &config, cli.config.is_some()).await,
        Command::Mix(args) => cmd_mix(args, &config).await,
        Command::Split(args) => cmd_split(args),
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_project(path: &Path) -> anyhow::Result<TimelineObject> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open project '{}'", path.display()))?;
    let timeline = TimelineObject::from_json(&text).with_context(|| "parse project JSON")?;
    Ok(timeline)
}

fn project_root(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn accessors() -> FileAccessors {
    FileAccessors::new()
        .with_image(Arc::new(DiskImageAccessor))
        .with_audio(Arc::new(WavAudioAccessor))
}

async fn cmd_frame(args: FrameArgs, config: &EngineConfig, has_config: bool) -> anyhow::Result<()> {
    let timeline = read_project(&args.in_path)?;
    let project = timeline.project_info(project_root(&args.in_path));

    let base = if has_config {
        config.render.resolution()
    } else {
        timeline.resolution
    };
    let output = Resolution::new(
        args.width.unwrap_or(base.width),
        args.height.unwrap_or(base.height),
    );

    let ctx = RenderContext::new(FrameIndex(args.frame), project, accessors())
        .with_render_resolution(output)
        .with_clear(config.render.clear());
    let frame = montage::render_frame(&timeline, &ctx).await?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_mix(args: MixArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let timeline = read_project(&args.in_path)?;
    let end = match args.end {
        Some(end) => end,
        None => timeline.duration().saturating_sub(1),
    };
    anyhow::ensure!(
        args.start <= end,
        "start frame {} is after end frame {end}",
        args.start
    );

    let format = config.audio.format();
    let rate = format.sample_rate;
    let first = montage::frame_to_sample(args.start, timeline.fps, rate);
    let last = montage::frame_to_sample(end + 1, timeline.fps, rate);
    let total = usize::try_from(last - first).context("mix range too long")?;

    let request = GetAudioContext::new(
        format,
        timeline.fps,
        accessors(),
        timeline.project_info(project_root(&args.in_path)),
    );
    let mut out = AudioChunk::silent(format, total);
    let step = config.audio.chunk_frames;
    let mut offset = 0usize;
    while offset < total {
        let len = step.min(total - offset);
        let block = timeline
            .mix_audio(&request.window(first + offset as u64, len))
            .await?;
        out.mix_in(&block, offset)?;
        offset += len;
    }

    montage::write_f32le(&out, &args.out)?;
    eprintln!(
        "wrote {} ({} frames @ {} Hz, {} ch)",
        args.out.display(),
        out.len(),
        rate,
        format.channels
    );
    Ok(())
}

fn cmd_split(args: SplitArgs) -> anyhow::Result<()> {
    let mut timeline = read_project(&args.in_path)?;
    timeline
        .split_clip(&args.layer, &args.clip, FrameIndex(args.frame))
        .with_context(|| format!("split clip '{}' at frame {}", args.clip, args.frame))?;

    let out = args.out.unwrap_or(args.in_path);
    std::fs::write(&out, timeline.to_json()?)
        .with_context(|| format!("write project '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
