//! App - owns the clock, the ensemble and the terminal loop

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use tracing::{info, warn};

use polyrhythm::render::{RecordingSurface, RenderLoop};
use polyrhythm::rhythm::{Ensemble, EnsembleConfig};
use polyrhythm::synth::{NoteEvent, NoteSink, SilentSink};
use polyrhythm::transport::{Clock, SystemTimeSource, TimeSource};

use super::audio::AudioEngine;
use super::ui::{self, Screen, View};

/// Side of the square scene rhythms are laid out in
const SCENE_EXTENT: f64 = 500.0;
const TEMPO_STEP: f64 = 5.0;

/// Launch settings, from the command line
#[derive(Debug, Clone)]
pub struct Settings {
    pub bpm: f64,
    pub seed: Option<u64>,
    pub min_rhythms: usize,
    pub latency: Duration,
    pub audio: bool,
}

/// Where rhythm notes go; scheduled beats are held back in interactive mode
struct AppSink {
    out: Box<dyn NoteSink>,
    interactive: bool,
}

impl AppSink {
    /// Bypass interactive muting
    fn play_now(&mut self, event: NoteEvent) {
        self.out.trigger(event);
    }
}

impl NoteSink for AppSink {
    fn trigger(&mut self, event: NoteEvent) {
        if !self.interactive {
            self.out.trigger(event);
        }
    }
}

pub struct App {
    ensemble: Ensemble,
    render_loop: RenderLoop,
    scene: RecordingSurface,
    sink: Rc<RefCell<AppSink>>,
    audio: Option<AudioEngine>,
    view: View,
    bpm: f64,
    message: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let (audio, source, out) = open_output(&settings);

        let sink = Rc::new(RefCell::new(AppSink {
            out,
            interactive: false,
        }));
        let clock = Clock::new(source);
        let config = EnsembleConfig::default().min_rhythms(settings.min_rhythms);
        let ensemble = match settings.seed {
            Some(seed) => Ensemble::with_seed(clock, sink.clone(), config, seed),
            None => Ensemble::new(clock, sink.clone(), config),
        };

        Self {
            ensemble,
            render_loop: RenderLoop::new(),
            scene: RecordingSurface::new(SCENE_EXTENT, SCENE_EXTENT),
            sink,
            audio,
            view: View::Kaleidoscope,
            bpm: settings.bpm,
            message: None,
            should_quit: false,
        }
    }

    /// Take over the terminal until the user quits
    pub fn run(mut self) -> EyreResult<()> {
        self.new_session();
        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal);
        ratatui::restore();
        self.ensemble.stop_session();
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.scene.clear();
            self.render_loop.frame(&mut self.ensemble, &mut self.scene);

            terminal.draw(|frame| ui::render(frame, &self.screen()))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    fn screen(&self) -> Screen<'_> {
        Screen {
            ensemble: &self.ensemble,
            scene: &self.scene.circles,
            extent: SCENE_EXTENT,
            view: self.view,
            interactive: self.sink.borrow().interactive,
            sample_rate: self.audio.as_ref().map(AudioEngine::sample_rate),
            late_notes: self.audio.as_ref().map_or(0, AudioEngine::late_notes),
            message: self.message.as_deref(),
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.new_session(),
            KeyCode::Char('s') => {
                self.ensemble.stop_session();
                self.message = Some("stopped".to_string());
            }
            KeyCode::Char('v') => self.view = self.view.toggle(),
            KeyCode::Char('i') => {
                let mut sink = self.sink.borrow_mut();
                sink.interactive = !sink.interactive;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_tempo(TEMPO_STEP),
            KeyCode::Char('-') => self.nudge_tempo(-TEMPO_STEP),
            KeyCode::Char(c @ '1'..='9') => {
                if let Some(digit) = c.to_digit(10) {
                    self.trigger_voice(digit as usize - 1);
                }
            }
            _ => {}
        }
    }

    fn new_session(&mut self) {
        self.message = match self.ensemble.start_random_session(self.bpm) {
            Ok(_) => None,
            Err(err) => {
                warn!(%err, "session not started");
                Some(err.to_string())
            }
        };
        self.bpm = self.ensemble.clock().tempo();
    }

    fn nudge_tempo(&mut self, delta: f64) {
        self.bpm = self.ensemble.clock().set_tempo(self.bpm + delta);
    }

    /// Sound one rhythm's note right away
    fn trigger_voice(&mut self, index: usize) {
        let Some(rhythm) = self.ensemble.rhythms().get(index) else {
            return;
        };
        let clock = self.ensemble.clock();
        let rhythm = rhythm.borrow();
        let event = NoteEvent {
            voice: rhythm.index(),
            note: rhythm.note(),
            duration: clock.subdivision_seconds(&self.ensemble.config().note_length),
            time: clock.source_now(),
        };
        self.sink.borrow_mut().play_now(event);
    }
}

type Output = (Option<AudioEngine>, Box<dyn TimeSource>, Box<dyn NoteSink>);

/// Audio device when there is one, otherwise silence on the system clock
fn open_output(settings: &Settings) -> Output {
    if !settings.audio {
        info!("audio disabled");
        return silent();
    }
    match AudioEngine::start(settings.latency) {
        Ok((engine, clock, producer)) => (Some(engine), Box::new(clock), Box::new(producer)),
        Err(err) => {
            warn!("running silent: {:#}", err);
            silent()
        }
    }
}

fn silent() -> Output {
    (None, Box::new(SystemTimeSource::new()), Box::new(SilentSink))
}
