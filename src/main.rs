mod app;
mod braille;
mod ui;

use app::App;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hourglass_sand::animation::{Animation, EntropySource, RenderSink, ThreadRngEntropy};
use hourglass_sand::bitmap::PackedBitmap;
use hourglass_sand::config::AppConfig;
use hourglass_sand::engine::SandSimulation;
use hourglass_sand::layout::{LayoutPreset, LayoutSource};
use hourglass_sand::scheduler::{IntervalTimer, Scheduler};
use hourglass_sand::settings::{MAX_FPS, MAX_THRESHOLD, MIN_FPS, MIN_THRESHOLD};
use hourglass_sand::state::Gravity;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "hourglass-sand")]
#[command(about = "Falling-sand hourglass that flips itself when the sand settles")]
struct Args {
    // === Board ===
    /// Built-in layout (hourglass, pegboard)
    #[arg(short = 'l', long)]
    layout: Option<String>,

    /// Load the board from a text file ('#' wall, '=' barrier, 'o' sand, '.' blank)
    #[arg(long = "layout-file")]
    layout_file: Option<PathBuf>,

    /// Grain count for built-in layouts
    #[arg(short = 'n', long)]
    grains: Option<usize>,

    /// Fixed generator seed (random when omitted)
    #[arg(short = 's', long)]
    seed: Option<u32>,

    // === Dynamics ===
    /// Initial gravity direction (forward, backward)
    #[arg(long)]
    gravity: Option<String>,

    /// Static ticks tolerated before gravity reverses (1-255)
    #[arg(long)]
    threshold: Option<u32>,

    /// Ticks per second (1-60)
    #[arg(long)]
    fps: Option<u32>,

    // === Display ===
    /// Rotate the board so sand falls down the terminal
    #[arg(long)]
    portrait: bool,

    // === Files ===
    /// Read settings from this JSON file instead of the default location
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write the effective settings to a JSON file and continue
    #[arg(long = "save-config")]
    save_config: Option<PathBuf>,

    /// Write the starting board in text form and exit
    #[arg(long = "export-layout")]
    export_layout: Option<PathBuf>,

    /// Write log output to this file (the TUI does not log otherwise)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    // === Headless ===
    /// Run without the terminal UI and print a summary
    #[arg(long)]
    headless: bool,

    /// Ticks to run in headless mode
    #[arg(long, default_value = "1000")]
    ticks: u64,
}

fn parse_gravity(s: &str) -> Gravity {
    match s.to_lowercase().as_str() {
        "backward" | "back" | "left" | "-1" => Gravity::Backward,
        _ => Gravity::Forward,
    }
}

fn parse_layout(s: &str) -> LayoutPreset {
    LayoutPreset::parse(s).unwrap_or_else(|| {
        log::warn!("unknown layout {s:?}, using {}", LayoutPreset::default().name());
        LayoutPreset::default()
    })
}

fn init_logging(log_file: Option<&Path>, headless: bool) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // Stderr would draw over the alternate screen
        None if !headless => return Ok(()),
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }
    builder.init();
    Ok(())
}

/// Explicit `--config`, else the default location if present, else defaults
fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(AppConfig::load_from_file(path)?);
    }
    match AppConfig::default_path() {
        Some(path) if path.exists() => AppConfig::load_from_file(&path).or_else(|err| {
            log::warn!("ignoring {}: {err}", path.display());
            Ok(AppConfig::default())
        }),
        _ => Ok(AppConfig::default()),
    }
}

fn apply_args(config: &mut AppConfig, args: &Args) {
    if let Some(name) = &args.layout {
        config.layout = LayoutSource::Preset(parse_layout(name));
    }
    // A file wins over a preset name
    if let Some(path) = &args.layout_file {
        config.layout = LayoutSource::File(path.clone());
    }
    if args.grains.is_some() {
        config.grains = args.grains;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(gravity) = &args.gravity {
        config.simulation.gravity = parse_gravity(gravity);
    }
    if let Some(threshold) = args.threshold {
        config.simulation.stable_threshold = threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
    }
    if let Some(fps) = args.fps {
        config.timing.fps = fps.clamp(MIN_FPS, MAX_FPS);
    }
    if args.portrait {
        config.portrait = true;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), args.headless)?;

    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args);

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
    }

    if let Some(path) = &args.export_layout {
        let layout = config.layout.load(config.grains)?;
        layout.save(path)?;
        println!(
            "wrote {} ({} grains) to {}",
            config.layout.name(),
            layout.grains(),
            path.display()
        );
        return Ok(());
    }

    if args.headless {
        return run_headless(&config, args.ticks);
    }

    // Build before touching the terminal so layout errors print normally
    let mut app = App::new(config, Box::new(ThreadRngEntropy))?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Hashes every blitted frame so headless runs can be compared
#[derive(Default)]
struct FrameDigest {
    frames: u64,
    hasher: DefaultHasher,
}

impl RenderSink for FrameDigest {
    fn blit(&mut self, frame: &PackedBitmap) {
        self.frames += 1;
        frame.as_bytes().hash(&mut self.hasher);
    }
}

/// Drive the timer on a virtual clock: each expiry fires at its own
/// deadline, so no time is spent sleeping.
fn run_headless(config: &AppConfig, ticks: u64) -> Result<(), Box<dyn std::error::Error>> {
    let seed = config.seed.unwrap_or_else(|| ThreadRngEntropy.seed());
    let layout = config.layout.load(config.grains)?;
    log::info!(
        "headless run: {} with {} grains, seed {seed:#010x}, {ticks} ticks",
        config.layout.name(),
        layout.grains()
    );
    let simulation = SandSimulation::new(layout, seed, &config.simulation)?;

    let mut animation = Animation::new(simulation, FrameDigest::default(), &config.timing);
    let mut timer = IntervalTimer::new();
    animation.start(&mut timer);

    while animation.simulation().ticks() < ticks {
        let Some(due) = timer.deadline() else {
            break;
        };
        timer.fire_if_due(due, &mut animation);
    }
    timer.cancel();

    let (simulation, digest) = animation.into_parts();
    simulation.verify()?;
    println!(
        "seed={seed} ticks={} flips={} gravity={} frames={} digest={:016x}",
        simulation.ticks(),
        simulation.flips(),
        simulation.gravity().name(),
        digest.frames,
        digest.hasher.finish()
    );
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    // Redraw at ~60fps regardless of the tick rate
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    loop {
        // Render current state
        terminal.draw(|frame| ui::render(frame, app))?;

        // Wake early when the next tick is due sooner than the next redraw
        let timeout = app
            .timer
            .time_until_due(Instant::now())
            .map_or(FRAME_DURATION, |due| due.min(FRAME_DURATION));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only process Press events
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Handle Ctrl+C
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    KeyCode::Char('r') | KeyCode::Char('R') => app.reset(),
                    KeyCode::Char('l') => app.cycle_layout(true),
                    KeyCode::Char('L') => app.cycle_layout(false),
                    KeyCode::Char('g') | KeyCode::Char('G') => app.flip_gravity(),
                    KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_fps(1),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_fps(-1),
                    KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_portrait(),
                    KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_fullscreen(),
                    KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                        app.toggle_help()
                    }
                    KeyCode::Esc => {
                        if app.show_help {
                            app.toggle_help();
                        }
                    }
                    KeyCode::Char('j') | KeyCode::Char('J') => {
                        if app.show_help {
                            app.scroll_help_down(ui::HELP_CONTENT_LINES);
                        }
                    }
                    KeyCode::Char('k') | KeyCode::Char('K') => {
                        if app.show_help {
                            app.scroll_help_up();
                        }
                    }
                    _ => {}
                }
            }
        }

        // Run simulation tick
        app.on_clock(Instant::now());
    }
}
