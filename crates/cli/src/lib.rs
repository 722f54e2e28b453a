use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{DocumentDimensions, FittingType, LayoutOptions, PinchPhase, Point, Size};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use viewer_core::{
    FittingRequest, GestureEvent, KeyHandling, KeyInput, PinchDirection, Viewport, ViewportConfig,
    WheelInput,
};
use viewport_scheduler::FrameClock;

#[derive(Debug, Parser)]
#[command(name = "viewport-replay")]
#[command(about = "Replay viewport input scripts and print the resulting state")]
pub struct Cli {
    /// TOML viewport configuration. Defaults to the environment.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a script and print the state after every step.
    Run {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Replay a script and print only the final state.
    Summary {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Print the effective configuration as TOML.
    PrintConfig,
    /// Print CLI version.
    Version,
}

/// Input script: a window size and the steps to replay against it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub window: Size,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Step {
    /// Load a document of vertically stacked pages.
    Load {
        pages: Vec<Size>,
        #[serde(default)]
        layout: Option<LayoutOptions>,
    },
    Resize {
        width: f64,
        height: f64,
    },
    SetZoom {
        zoom: f64,
    },
    ZoomIn,
    ZoomOut,
    Fit {
        fitting: FittingRequest,
    },
    GoToPage {
        page: usize,
    },
    ScrollTo {
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
    },
    Key {
        input: KeyInput,
    },
    Wheel {
        delta_y: f64,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        position: Point,
    },
    /// Two-finger pinch delivering one update per frame.
    Pinch {
        center: Point,
        ratios: Vec<f64>,
    },
    Presentation {
        enabled: bool,
    },
    BrowserZoom {
        zoom: f64,
    },
    SaveZoom,
    RestoreZoom,
    /// Let simulated time pass, firing due timers.
    Advance {
        ms: u64,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Load { .. } => "load",
            Step::Resize { .. } => "resize",
            Step::SetZoom { .. } => "set-zoom",
            Step::ZoomIn => "zoom-in",
            Step::ZoomOut => "zoom-out",
            Step::Fit { .. } => "fit",
            Step::GoToPage { .. } => "go-to-page",
            Step::ScrollTo { .. } => "scroll-to",
            Step::Key { .. } => "key",
            Step::Wheel { .. } => "wheel",
            Step::Pinch { .. } => "pinch",
            Step::Presentation { .. } => "presentation",
            Step::BrowserZoom { .. } => "browser-zoom",
            Step::SaveZoom => "save-zoom",
            Step::RestoreZoom => "restore-zoom",
            Step::Advance { .. } => "advance",
        }
    }
}

/// Viewport state after one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub step: usize,
    pub op: &'static str,
    pub zoom: f64,
    pub fitting_type: FittingType,
    pub position: Point,
    pub content_size: Size,
    pub page: Option<usize>,
    pub pinch_phase: PinchPhase,
    /// Viewport-changed notifications fired by this step
    pub notifications: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyHandling>,
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Run { script } => {
            let snapshots = replay_file(cli.config.as_deref(), &script)?;
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
            Ok(())
        }
        Commands::Summary { script } => {
            let snapshots = replay_file(cli.config.as_deref(), &script)?;
            let last = snapshots.last().context("script has no steps")?;
            println!("{}", serde_json::to_string_pretty(last)?);
            Ok(())
        }
        Commands::PrintConfig => {
            let config = load_config(cli.config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ViewportConfig> {
    match path {
        Some(path) => ViewportConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => ViewportConfig::from_env().context("invalid viewport configuration in environment"),
    }
}

fn replay_file(config: Option<&Path>, script: &Path) -> Result<Vec<StateSnapshot>> {
    let config = load_config(config)?;
    let contents = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let script: Script = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse script {}", script.display()))?;
    replay(config, script)
}

/// Replays `script` on a fresh viewport with simulated time.
pub fn replay(config: ViewportConfig, script: Script) -> Result<Vec<StateSnapshot>> {
    let mut session = Session::new(config, script.window)?;
    script
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            session
                .apply(step)
                .with_context(|| format!("step {} ({}) failed", index + 1, step.name()))?;
            Ok(session.snapshot(index + 1, step.name()))
        })
        .collect()
}

struct Session {
    viewport: Viewport,
    notifications: Rc<Cell<u32>>,
    clock: FrameClock,
    now: Instant,
    last_key: Option<KeyHandling>,
}

impl Session {
    fn new(config: ViewportConfig, window: Size) -> Result<Self> {
        let mut viewport = Viewport::from_config(config, window, None)?;
        let notifications = Rc::new(Cell::new(0));
        let counter = Rc::clone(&notifications);
        viewport.set_viewport_changed_callback(move || counter.set(counter.get() + 1));

        Ok(Self {
            viewport,
            notifications,
            clock: FrameClock::for_60fps(),
            now: Instant::now(),
            last_key: None,
        })
    }

    fn apply(&mut self, step: &Step) -> Result<()> {
        debug!(op = step.name(), "replaying step");
        self.notifications.set(0);
        self.last_key = None;

        match step {
            Step::Load { pages, layout } => {
                let mut dimensions = DocumentDimensions::stacked(pages);
                dimensions.layout_options = *layout;
                self.viewport.set_document_dimensions(dimensions)?;
            }
            Step::Resize { width, height } => self.viewport.resize(Size::new(*width, *height))?,
            Step::SetZoom { zoom } => self.viewport.set_zoom(*zoom),
            Step::ZoomIn => self.viewport.zoom_in(),
            Step::ZoomOut => self.viewport.zoom_out(),
            Step::Fit { fitting } => self.viewport.set_fitting_type(*fitting)?,
            Step::GoToPage { page } => self.viewport.go_to_page(*page)?,
            Step::ScrollTo { x, y } => self.viewport.scroll_to(*x, *y),
            Step::Key { input } => {
                self.last_key = Some(self.viewport.handle_directional_key(input)?);
            }
            Step::Wheel { delta_y, ctrl, position } => {
                let input = WheelInput { delta_y: *delta_y, ctrl_key: *ctrl, position: *position };
                self.viewport.handle_wheel(&input, self.now)?;
            }
            Step::Pinch { center, ratios } => self.pinch(*center, ratios)?,
            Step::Presentation { enabled } => self.viewport.set_presentation_mode(*enabled),
            Step::BrowserZoom { zoom } => self.viewport.browser_zoom_changed(*zoom),
            Step::SaveZoom => self.viewport.save_zoom_state(),
            Step::RestoreZoom => self.viewport.restore_zoom_state()?,
            Step::Advance { ms } => {
                self.now += Duration::from_millis(*ms);
                self.viewport.poll_timers(self.now)?;
            }
        }

        self.pump_frames();
        Ok(())
    }

    fn pinch(&mut self, center: Point, ratios: &[f64]) -> Result<()> {
        self.viewport.dispatch_gesture(GestureEvent::PinchStart { center })?;
        self.pump_frames();

        let mut previous = 1.0;
        for &ratio in ratios {
            let scale_ratio = ratio / previous;
            let direction = if scale_ratio > 1.0 { PinchDirection::In } else { PinchDirection::Out };
            self.viewport.dispatch_gesture(GestureEvent::PinchUpdate {
                scale_ratio,
                direction,
                start_scale_ratio: ratio,
                center,
            })?;
            self.pump_frames();
            previous = ratio;
        }

        self.viewport
            .dispatch_gesture(GestureEvent::PinchEnd { start_scale_ratio: previous, center })?;
        Ok(())
    }

    /// Runs animation frames until no pinch work is queued, advancing
    /// simulated time to each frame boundary.
    fn pump_frames(&mut self) {
        while self.viewport.needs_animation_frame() {
            if let Some(next) = self.clock.next_frame_at() {
                self.now = self.now.max(next);
            }
            if self.clock.tick(self.now) {
                self.viewport.on_animation_frame();
            }
        }
    }

    fn snapshot(&self, step: usize, op: &'static str) -> StateSnapshot {
        StateSnapshot {
            step,
            op,
            zoom: self.viewport.zoom(),
            fitting_type: self.viewport.fitting_type(),
            position: self.viewport.position(),
            content_size: self.viewport.content_size(),
            page: self.viewport.most_visible_page().ok(),
            pinch_phase: self.viewport.pinch_phase(),
            notifications: self.notifications.get(),
            key: self.last_key,
        }
    }
}
