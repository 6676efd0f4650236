use hourglass_sand::animation::{Animation, EntropySource, RenderSink};
use hourglass_sand::bitmap::{FrameView, PackedBitmap};
use hourglass_sand::config::AppConfig;
use hourglass_sand::engine::{SandSimulation, SimulationError};
use hourglass_sand::layout::{LayoutPreset, LayoutSource};
use hourglass_sand::scheduler::IntervalTimer;
use std::time::Instant;

/// Keeps a copy of the last blitted frame for the next redraw
#[derive(Debug, Clone, Default)]
pub struct TerminalSink {
    frame: Vec<u8>,
}

impl TerminalSink {
    pub fn new(frame: &PackedBitmap) -> Self {
        Self {
            frame: frame.as_bytes().to_vec(),
        }
    }

    pub fn view(&self) -> Option<FrameView<'_>> {
        FrameView::parse(&self.frame).ok()
    }
}

impl RenderSink for TerminalSink {
    fn blit(&mut self, frame: &PackedBitmap) {
        self.frame.clear();
        self.frame.extend_from_slice(frame.as_bytes());
    }
}

/// Main application state
pub struct App {
    pub animation: Animation<TerminalSink>,
    pub timer: IntervalTimer,
    pub config: AppConfig,
    pub seed: u32,
    entropy: Box<dyn EntropySource>,
    pub fullscreen_mode: bool,
    pub show_help: bool,
    pub help_scroll: u16,
    /// Last layout error, shown in the status box until the next reset
    pub status_message: Option<String>,
}

fn build_simulation(config: &AppConfig, seed: u32) -> Result<SandSimulation, SimulationError> {
    let layout = config.layout.load(config.grains)?;
    log::info!(
        "layout {}: {} grains on {}x{}, seed {seed:#010x}",
        config.layout.name(),
        layout.grains(),
        layout.grid().cols(),
        layout.grid().rows()
    );
    SandSimulation::new(layout, seed, &config.simulation)
}

impl App {
    pub fn new(
        config: AppConfig,
        mut entropy: Box<dyn EntropySource>,
    ) -> Result<Self, SimulationError> {
        let seed = config.seed.unwrap_or_else(|| entropy.seed());
        let simulation = build_simulation(&config, seed)?;
        let sink = TerminalSink::new(simulation.bitmap());
        let mut app = Self {
            animation: Animation::new(simulation, sink, &config.timing),
            timer: IntervalTimer::new(),
            config,
            seed,
            entropy,
            fullscreen_mode: false,
            show_help: false,
            help_scroll: 0,
            status_message: None,
        };
        app.animation.start(&mut app.timer);
        Ok(app)
    }

    /// Run the tick if the timer is due
    pub fn on_clock(&mut self, now: Instant) -> bool {
        self.timer.fire_if_due(now, &mut self.animation)
    }

    pub fn simulation(&self) -> &SandSimulation {
        self.animation.simulation()
    }

    pub fn is_paused(&self) -> bool {
        !self.animation.is_running()
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        if self.animation.is_running() {
            self.animation.stop(&mut self.timer);
        } else {
            self.animation.start(&mut self.timer);
        }
    }

    /// Rebuild the board with a fresh seed. A fixed seed from the config is
    /// reused so runs stay reproducible.
    pub fn reset(&mut self) {
        let seed = self.config.seed.unwrap_or_else(|| self.entropy.seed());
        match build_simulation(&self.config, seed) {
            Ok(simulation) => {
                self.seed = seed;
                self.animation.replace_simulation(simulation);
                self.status_message = None;
            }
            Err(err) => {
                log::warn!("reset failed, keeping current board: {err}");
                self.status_message = Some(err.to_string());
            }
        }
    }

    /// Switch to the next (or previous) built-in layout and reset.
    /// A file layout switches to the default preset.
    pub fn cycle_layout(&mut self, forward: bool) {
        let preset = match &self.config.layout {
            LayoutSource::Preset(preset) if forward => preset.next(),
            LayoutSource::Preset(preset) => preset.prev(),
            LayoutSource::File(_) => LayoutPreset::default(),
        };
        self.config.layout = LayoutSource::Preset(preset);
        self.config.grains = None;
        self.reset();
    }

    pub fn flip_gravity(&mut self) {
        self.animation.simulation_mut().flip_gravity();
        log::info!("gravity flipped by hand to {}", self.simulation().gravity().name());
    }

    pub fn adjust_fps(&mut self, delta: i32) {
        self.config.timing.adjust_fps(delta);
        self.animation.set_timing(&self.config.timing, &mut self.timer);
    }

    pub fn toggle_portrait(&mut self) {
        self.config.portrait = !self.config.portrait;
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    /// Scroll help content up
    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    /// Scroll help content down
    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hourglass_sand::animation::FixedSeed;
    use hourglass_sand::state::Gravity;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_app(seed: Option<u32>) -> App {
        let config = AppConfig {
            seed,
            grains: Some(200),
            ..Default::default()
        };
        App::new(config, Box::new(FixedSeed(77))).unwrap()
    }

    #[test]
    fn test_new_app_is_running_and_shows_initial_board() {
        let app = test_app(None);
        assert_eq!(app.seed, 77);
        assert!(!app.is_paused());
        assert!(app.timer.is_armed());

        let view = app.animation.sink().view().unwrap();
        assert_eq!((view.width(), view.height()), (136, 68));
    }

    #[test]
    fn test_clock_drives_ticks() {
        let mut app = test_app(None);
        let due = app.timer.deadline().unwrap();
        assert!(!app.on_clock(due - Duration::from_millis(1)));
        assert!(app.on_clock(due));
        assert_eq!(app.simulation().ticks(), 1);
    }

    #[test]
    fn test_pause_cancels_timer() {
        let mut app = test_app(None);
        app.toggle_pause();
        assert!(app.is_paused());
        assert!(!app.timer.is_armed());

        app.toggle_pause();
        assert!(!app.is_paused());
        assert!(app.timer.is_armed());
    }

    #[test]
    fn test_fixed_seed_survives_reset() {
        let mut app = test_app(Some(5));
        app.reset();
        assert_eq!(app.seed, 5);
        assert_eq!(app.simulation().ticks(), 0);
    }

    #[test]
    fn test_cycle_layout_uses_preset_defaults() {
        let mut app = test_app(None);
        app.cycle_layout(true);
        assert_eq!(
            app.config.layout,
            LayoutSource::Preset(LayoutPreset::Pegboard)
        );
        assert_eq!(
            app.simulation().particles().len(),
            LayoutPreset::Pegboard.default_grains()
        );
    }

    #[test]
    fn test_failed_reset_keeps_board() {
        let mut app = test_app(None);
        app.config.layout = LayoutSource::File(PathBuf::from("/nonexistent/board.txt"));
        app.reset();
        assert!(app.status_message.is_some());
        assert_eq!(app.simulation().particles().len(), 200);
    }

    #[test]
    fn test_fps_change_rearms_timer() {
        let mut app = test_app(None);
        app.adjust_fps(15);
        assert_eq!(app.config.timing.fps, 30);
        assert_eq!(app.timer.period(), Some(Duration::from_millis(33)));
    }

    #[test]
    fn test_manual_gravity_flip() {
        let mut app = test_app(None);
        app.flip_gravity();
        assert_eq!(app.simulation().gravity(), Gravity::Backward);
    }
}
