use std::time::{Duration, Instant};

use upscaler_core::{update, AppState, Msg, Settings};

use super::effects::EffectRunner;
use super::render;

/// Root controller: owns the state, feeds messages through `update` and
/// hands the resulting effects to the runner.
pub struct Controller {
    state: AppState,
    runner: EffectRunner,
    printed: Vec<String>,
    echo: bool,
}

impl Controller {
    pub fn new(settings: Settings, runner: EffectRunner) -> Self {
        Self {
            state: AppState::with_settings(settings),
            runner,
            printed: Vec::new(),
            echo: true,
        }
    }

    /// Stops printing view changes to stdout.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        if was_dirty {
            self.render();
        }
        self.runner.enqueue(effects);
    }

    /// Pumps engine results until `done` holds. Returns `false` when
    /// `budget` ran out first.
    pub fn run_until(&mut self, budget: Duration, done: impl Fn(&AppState) -> bool) -> bool {
        let deadline = Instant::now() + budget;
        while !done(&self.state) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let msg = self
                .runner
                .next_msg(remaining.min(Duration::from_millis(250)))
                .unwrap_or(Msg::Tick);
            self.dispatch(msg);
        }
        true
    }

    /// Prints only the lines that changed since the last render.
    fn render(&mut self) {
        let lines = render::render(&self.state.view());
        if self.echo {
            for line in lines.iter().filter(|line| !self.printed.contains(line)) {
                println!("{line}");
            }
        }
        self.printed = lines;
    }
}
