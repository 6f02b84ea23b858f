// Finite State Machine driving the maze screens
use super::channels::{EventSink, StopHandle};
use super::match_image::TemplateStore;
use super::params::{ParamProvider, RunParams};
use super::states::{self, BotContext, State};
use super::types::{AutomationEvent, StateKind, StateSpec};
use crate::desktop::{DesktopError, DesktopResult, InputActuator, ScreenSource, WindowBinding};
use std::path::PathBuf;

/// Static settings for one bot instance
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Substring of the game window's title
    pub title: String,
    pub templates_dir: PathBuf,
    pub debug: bool,
}

pub struct MazeBot<S: ScreenSource, I: InputActuator> {
    config: BotConfig,
    screen: S,
    input: I,
    sink: EventSink,
    provider: Box<dyn ParamProvider>,
    params: RunParams,
    templates: TemplateStore,
    binding: Option<WindowBinding>,
    state: Option<Box<dyn State>>,
    stop: StopHandle,
}

impl<S: ScreenSource, I: InputActuator> MazeBot<S, I> {
    pub fn new(
        config: BotConfig,
        screen: S,
        input: I,
        sink: EventSink,
        provider: impl ParamProvider + 'static,
    ) -> Self {
        Self {
            config,
            screen,
            input,
            sink,
            provider: Box::new(provider),
            params: RunParams::default(),
            templates: TemplateStore::new(),
            binding: None,
            state: None,
            stop: StopHandle::new(),
        }
    }

    /// Share an existing stop flag, e.g. one the caller created before the
    /// bot thread started.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle other threads can use to stop the loop
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn current_state(&self) -> Option<StateKind> {
        self.state.as_ref().map(|s| s.kind())
    }

    pub fn refresh_params(&mut self) {
        self.params = RunParams::from_provider(self.provider.as_ref());
    }

    /// Clear any earlier stop request, bind the window, load templates and
    /// reset to Init.
    pub fn start(&mut self) -> DesktopResult<()> {
        self.stop.reset();
        self.refresh_params();

        let binding = self.screen.bind(&self.config.title)?;
        self.sink.log(format!(
            "[BOT] bound '{}' @ {},{} {}x{}",
            binding.title, binding.left, binding.top, binding.width, binding.height
        ));
        self.binding = Some(binding);

        match self.templates.load(&self.config.templates_dir) {
            Ok(count) => self.sink.log(format!(
                "[BOT] loaded {count} templates from {}",
                self.config.templates_dir.display()
            )),
            Err(e) => self.sink.error(format!("[BOT] {e}")),
        }

        self.set_state(StateSpec::to(StateKind::Init));
        Ok(())
    }

    pub(crate) fn set_state(&mut self, spec: StateSpec) {
        self.enter(states::instantiate(spec));
    }

    pub(crate) fn enter(&mut self, state: Box<dyn State>) {
        let kind = state.kind();
        let present = self.templates.warmup(state.prefetch());
        log::debug!(
            "Entering {kind}, {present}/{} templates present",
            state.prefetch().len()
        );
        if self.config.debug {
            self.sink.log(format!("[STATE] -> {kind}"));
        }
        self.sink.send(AutomationEvent::StateChanged(kind));
        self.state = Some(state);
    }

    /// Run one step of the current state and apply its transition. Returns
    /// the new state kind when the machine moved.
    pub fn step(&mut self) -> DesktopResult<Option<StateKind>> {
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };
        let Some(binding) = self.binding.as_mut() else {
            return Err(DesktopError::WindowNotFound {
                title: self.config.title.clone(),
            });
        };

        let mut ctx = BotContext {
            screen: &mut self.screen,
            input: &mut self.input,
            binding,
            templates: &self.templates,
            params: &self.params,
            sink: &self.sink,
            stop: &self.stop,
            title: &self.config.title,
            debug: self.config.debug,
        };
        let transition = state.step(&mut ctx)?;

        Ok(transition.map(|spec| {
            let kind = spec.kind;
            self.set_state(spec);
            kind
        }))
    }

    /// Loop until stopped. Starts the bot first when needed. Always reports
    /// `Stopped` on the way out.
    pub fn run(&mut self) -> DesktopResult<()> {
        let result = self.run_loop();
        if let Err(e) = &result {
            self.sink.error(format!("[BOT] {e}"));
        }
        self.sink.send(AutomationEvent::Stopped);
        result
    }

    fn run_loop(&mut self) -> DesktopResult<()> {
        if self.state.is_none() || self.binding.is_none() {
            self.start()?;
        }

        loop {
            self.refresh_params();
            if self.stop.is_stop_requested() {
                log::info!("Stop requested, leaving run loop");
                return Ok(());
            }
            if self.step()?.is_none() {
                std::thread::sleep(self.params.sleep_fast);
            }
        }
    }
}
