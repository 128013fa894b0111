mod demo;

use anyhow::{Context, Result};
use clap::Parser;
use fbdev_core::display::GammaTable;
use fbdev_core::input::{InputEvent, PollStatus};
use fbdev_core::logging::{LogCategory, LogConfig, LogLevel};
use fbdev_core::settings::{InputBackendKind, Settings};
use fbdev_core::types::LogicalFrame;
use fbdev_linux::FbdevBackend;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Number of gamma curves offered to the presenter
const GAMMA_LEVELS: usize = 5;

#[derive(Parser)]
#[command(name = "fbpresent", about = "Framebuffer presentation and raw input demo")]
struct Args {
    /// JSON settings file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Framebuffer device
    #[arg(long)]
    fb: Option<PathBuf>,

    /// Integer scale factor (default: largest that fits)
    #[arg(long)]
    scaling: Option<u32>,

    /// Swap red and blue offsets reported by the device
    #[arg(long, default_value_t = false)]
    bgra: bool,

    /// Present with positioned writes instead of a shared mapping
    #[arg(long, default_value_t = false)]
    nommap: bool,

    /// Do not touch the keyboard
    #[arg(long, default_value_t = false)]
    nokb: bool,

    /// Input backend: evdev, tty or none
    #[arg(long)]
    input: Option<String>,

    /// Gamma level, 0 is linear
    #[arg(long, default_value_t = 0)]
    gamma: usize,

    /// Stop after this many frames (0 runs until the quit key)
    #[arg(long, default_value_t = 0)]
    frames: u32,

    /// Frames per second
    #[arg(long, default_value_t = 35)]
    fps: u32,

    /// Print the effective settings as JSON and exit
    #[arg(long, default_value_t = false)]
    print_settings: bool,

    /// Global log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Per-category log level overrides, e.g. `keyboard=debug`
    #[arg(long = "log", value_name = "CATEGORY=LEVEL")]
    log_overrides: Vec<String>,
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    let level: LogLevel = args.log_level.parse().map_err(anyhow::Error::msg)?;
    config.set_global_level(level);

    for entry in &args.log_overrides {
        let (name, level) = entry
            .split_once('=')
            .with_context(|| format!("expected CATEGORY=LEVEL, got `{}`", entry))?;
        let category = LogCategory::parse(name)
            .with_context(|| format!("unknown log category `{}`", name))?;
        let level = LogLevel::parse(level)
            .with_context(|| format!("unknown log level `{}`", level))?;
        config.set_level(category, level);
    }

    // The categorized config does the filtering; let everything through here
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .init();
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(fb) = &args.fb {
        settings.display.framebuffer = fb.clone();
    }
    if args.scaling.is_some() {
        settings.display.scaling = args.scaling;
    }
    if args.bgra {
        settings.display.bgra = true;
    }
    if args.nommap {
        settings.display.use_mmap = false;
    }
    if args.nokb {
        settings.input.no_keyboard = true;
    }
    if let Some(name) = &args.input {
        settings.input.backend = InputBackendKind::parse(name)
            .with_context(|| format!("unknown input backend `{}`", name))?;
    }
    Ok(settings)
}

fn describe(event: &InputEvent) -> String {
    match *event {
        InputEvent::KeyDown { key, ch } if ch.is_ascii_graphic() => {
            format!("key down {:#04x} '{}'", key, ch as char)
        }
        InputEvent::KeyDown { key, .. } => format!("key down {:#04x}", key),
        InputEvent::KeyUp { key } => format!("key up {:#04x}", key),
        InputEvent::MouseMotion { dx } => format!("mouse dx {}", dx),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    configure_logging(&args)?;
    let settings = load_settings(&args)?;

    if args.print_settings {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let mut backend = FbdevBackend::init(&settings, GammaTable::power_curves(GAMMA_LEVELS))
        .context("framebuffer backend init failed")?;
    let geometry = *backend.geometry();
    let mut frame = LogicalFrame::new(geometry.logical_width, geometry.logical_height);

    let base = demo::base_palette();
    backend.set_palette(&base, args.gamma);
    let tic = Duration::from_secs(1) / args.fps.max(1);

    let mut events = Vec::new();
    let mut cursor_x = geometry.logical_width / 2;
    let mut flash = 0u32;
    let mut tick = 0u32;

    loop {
        let started = Instant::now();

        events.clear();
        if backend.poll(&mut events) == PollStatus::QuitRequested {
            log::info!("quit key pressed");
            break;
        }
        for event in &events {
            log::debug!("{}", describe(event));
            match *event {
                InputEvent::KeyDown { .. } => {
                    flash = demo::FLASH_FRAMES;
                }
                InputEvent::MouseMotion { dx } => {
                    cursor_x = (cursor_x as i64 + dx as i64)
                        .clamp(0, geometry.logical_width as i64 - 1)
                        as usize;
                }
                InputEvent::KeyUp { .. } => {}
            }
        }

        if flash > 0 {
            flash -= 1;
            let tint = if flash == 0 {
                base
            } else {
                demo::tinted(&base, [255, 0, 0], flash as u8)
            };
            backend.set_palette(&tint, args.gamma);
        }

        demo::draw_pattern(&mut frame, tick, cursor_x);
        backend.present(&frame)?;

        tick = tick.wrapping_add(1);
        if args.frames != 0 && tick >= args.frames {
            break;
        }
        if let Some(rest) = tic.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    backend.shutdown();
    Ok(())
}
