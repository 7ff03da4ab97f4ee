use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scenegl", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a scene file and list its nodes.
    Check(CheckArgs),
    /// Render a single frame of a scene as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Scene description file.
    scene: PathBuf,

    /// Dump the parsed graph as JSON instead of one line per node.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Scene description file.
    #[arg(long)]
    scene: PathBuf,

    /// Context configuration JSON. Defaults to a 256x256 offscreen surface.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Check(args) => cmd_check(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn read_scene(path: &Path) -> anyhow::Result<(String, scenegl::Scene)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read scene '{}'", path.display()))?;
    let scene = scenegl::Scene::parse(&text)
        .with_context(|| format!("parse scene '{}'", path.display()))?;
    Ok((text, scene))
}

fn read_config(path: &Path) -> anyhow::Result<scenegl::Config> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let cfg: scenegl::Config =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse config JSON")?;
    Ok(cfg)
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let (_, scene) = read_scene(&args.scene)?;

    if args.json {
        let out = serde_json::to_string_pretty(&scene).with_context(|| "serialize scene")?;
        println!("{out}");
        return Ok(());
    }

    let meta = scene.meta();
    if let Some(v) = &meta.version {
        println!("version:      {v}");
    }
    if let Some(d) = meta.duration {
        println!("duration:     {d}s");
    }
    if let Some(r) = meta.aspect_ratio {
        println!("aspect_ratio: {r}");
    }
    if let Some(r) = meta.framerate {
        println!("framerate:    {r}");
    }
    for node in scene.nodes() {
        let refs: Vec<String> = node
            .references()
            .map(|(name, r)| format!("{name}->{}", r.target.0))
            .collect();
        println!(
            "{:>4} {:<16} {}",
            node.index.0,
            node.kind.name(),
            refs.join(" ")
        );
    }
    eprintln!(
        "{} nodes, fingerprint {:016x}",
        scene.len(),
        scene.fingerprint()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (text, _) = read_scene(&args.scene)?;
    let cfg = match &args.config {
        Some(path) => read_config(path)?,
        None => scenegl::Config::offscreen(256, 256),
    };
    anyhow::ensure!(cfg.offscreen, "frame rendering needs an offscreen configuration");

    scenegl::runtime::init(scenegl::HostEnv::new());

    let size = cfg.size();
    let mut ctx = scenegl::RenderContext::new()?;
    ctx.configure(cfg)?;
    ctx.load_scene(&text)?;

    let capture = scenegl::CaptureBuffer::for_size(size.width, size.height);
    ctx.set_capture_buffer(capture.clone())?;
    ctx.draw(args.time)
        .with_context(|| format!("draw frame at t={}", args.time))?;
    let mut rgba = capture.to_vec()?;
    ctx.release();
    // Capture is premultiplied; PNG stores straight alpha.
    scenegl::unpremultiply_rgba8_in_place(&mut rgba);

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &rgba,
        size.width,
        size.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
