use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use agjenda::{
    Agenda, CancelToken, Encoding, GenerateOpts, Pacing, Rgba8, Session, SessionOutcome,
    SUGGESTED_FILE_NAME, TextShaper, encode_ffmpeg::WebmSink,
};

#[derive(Parser, Debug)]
#[command(name = "agjenda", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one agenda slide as a PNG.
    Preview(PreviewArgs),
    /// Capture the whole agenda as a WebM video (requires `ffmpeg` on PATH).
    Generate(GenerateArgs),
    /// Print the seed agenda as JSON.
    Seed,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input agenda JSON; the seed agenda when omitted.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Item index (0-based).
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// TrueType font file; auto-detected when omitted.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Input agenda JSON; the seed agenda when omitted.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Output WebM path; defaults to the suggested download name.
    #[arg(long)]
    out: Option<PathBuf>,

    /// TrueType font file; auto-detected when omitted.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Capture frames in real time at 30fps instead of as fast as possible.
    #[arg(long)]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Preview(args) => cmd_preview(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Seed => cmd_seed(),
    }
}

fn read_agenda_json(path: &Path) -> anyhow::Result<Agenda> {
    let f = File::open(path).with_context(|| format!("open agenda '{}'", path.display()))?;
    let r = BufReader::new(f);
    let agenda: Agenda = serde_json::from_reader(r).with_context(|| "parse agenda JSON")?;
    Ok(agenda)
}

fn load_agenda(path: Option<&Path>) -> anyhow::Result<Agenda> {
    match path {
        Some(p) => read_agenda_json(p),
        None => Ok(Agenda::seed()),
    }
}

fn make_shaper(font: Option<&Path>) -> anyhow::Result<TextShaper> {
    match font {
        Some(path) => {
            let mut shaper = TextShaper::new();
            shaper.register_font_file(path)?;
            Ok(shaper)
        }
        None => Ok(TextShaper::with_system_font()?),
    }
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let agenda = load_agenda(args.in_path.as_deref())?;
    let shaper = make_shaper(args.font.as_deref())?;

    let mut session = Session::new(agenda, shaper)?;
    session.select(args.index);
    let frame = session
        .preview()?
        .context("preview unavailable (capture in progress)")?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let opaque = frame.to_opaque_rgba8(Rgba8::rgb(0, 0, 0));
    image::save_buffer_with_format(
        &args.out,
        &opaque,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let agenda = load_agenda(args.in_path.as_deref())?;
    let shaper = make_shaper(args.font.as_deref())?;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(SUGGESTED_FILE_NAME));

    let mut session = Session::new(agenda, shaper)?;
    let mut sink = WebmSink::new(Rgba8::rgb(0, 0, 0))?;

    let opts = GenerateOpts {
        pacing: if args.realtime {
            Pacing::Realtime
        } else {
            Pacing::Unthrottled
        },
        encoding: Encoding::PREFERRED,
    };

    let mut last = None;
    let outcome = session.generate_with(
        &mut sink,
        opts,
        |pct| {
            if last != Some(pct) {
                eprintln!("progress {pct}%");
                last = Some(pct);
            }
        },
        &CancelToken::new(),
    )?;

    match outcome {
        SessionOutcome::Cancelled => {
            eprintln!("capture cancelled");
            Ok(())
        }
        SessionOutcome::Completed => {
            let recording = session
                .take_recording()
                .context("completed capture produced no recording (bug)")?;
            recording.save_as(&out)?;
            eprintln!(
                "wrote {} ({} frames, {} bytes)",
                out.display(),
                recording.frames(),
                recording.len_bytes()
            );
            Ok(())
        }
    }
}

fn cmd_seed() -> anyhow::Result<()> {
    let agenda = Agenda::seed();
    let json = serde_json::to_string_pretty(&agenda).context("serialize seed agenda")?;
    println!("{json}");
    Ok(())
}
