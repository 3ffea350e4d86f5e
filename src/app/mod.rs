use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::feed::Dataset;
use crate::search::Resolution;
use crate::ui::{self, ViewContext};

pub mod actions;
pub mod controller;
pub mod state;

pub use actions::{ActionOutcome, FeedAction};
pub use controller::FeedController;
pub use state::{AppState, Engagement, FocusPane, LoadPhase};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NextTheme,
    PreviousTheme,
    PickTheme(usize),
    StartQuery,
    ToggleLike,
}

pub struct App {
    pub config: Arc<AppConfig>,
    controller: FeedController,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
    ticks: usize,
}

impl App {
    pub fn new(config: Arc<AppConfig>, dataset: Arc<Dataset>) -> Result<Self> {
        let registry = Arc::new(config.theme_registry());
        dataset.report_unregistered(&registry);
        let controller = FeedController::new(
            registry,
            dataset,
            config.load_delay(),
            &config.default_theme,
        )
        .context("starting feed controller")?;
        Ok(Self {
            tick_rate: config.tick_rate(),
            config,
            controller,
            list_state: ListState::default(),
            should_quit: false,
            ticks: 0,
        })
    }

    pub fn controller(&self) -> &FeedController {
        &self.controller
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    let ctx = ViewContext {
                        state: self.controller.state(),
                        registry: self.controller.registry(),
                        display: &self.config.display,
                        now: OffsetDateTime::now_utc(),
                        tick: self.ticks,
                    };
                    ui::draw_app(frame, &ctx, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }

            // completions land between ticks; apply them before the next frame
            self.controller.poll();

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.controller.state().query.active {
            self.handle_query_key(key);
            return;
        }

        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectNext),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectPrevious),
            KeyCode::Tab | KeyCode::Right => Some(Action::NextTheme),
            KeyCode::BackTab | KeyCode::Left => Some(Action::PreviousTheme),
            KeyCode::Char(ch @ '1'..='9') => ch
                .to_digit(10)
                .map(|digit| Action::PickTheme(digit as usize - 1)),
            KeyCode::Char('/') => Some(Action::StartQuery),
            KeyCode::Char('l') | KeyCode::Char(' ') => Some(Action::ToggleLike),
            _ => None,
        };

        if let Some(action) = action {
            self.apply_action(action);
        }
    }

    fn handle_query_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.controller.state_mut().cancel_query();
                self.controller
                    .state_mut()
                    .set_status_message(Some("Search canceled"));
            }
            KeyCode::Enter => {
                if let Resolution::Matched { theme_id, .. } = self.controller.submit_query_input()
                {
                    tracing::info!(theme = %theme_id, "search switched feed");
                }
            }
            KeyCode::Backspace => self.controller.state_mut().query.pop(),
            KeyCode::Char(ch)
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                self.controller.state_mut().query.push(ch);
            }
            _ => {}
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.controller.state_mut().move_cursor(1),
            Action::SelectPrevious => self.controller.state_mut().move_cursor(-1),
            Action::NextTheme => {
                self.controller.dispatch(FeedAction::CycleTheme(1));
            }
            Action::PreviousTheme => {
                self.controller.dispatch(FeedAction::CycleTheme(-1));
            }
            Action::PickTheme(index) => {
                let Some(theme_id) = self
                    .controller
                    .registry()
                    .by_index(index)
                    .map(|theme| theme.id.clone())
                else {
                    return;
                };
                self.controller.dispatch(FeedAction::SelectTheme(theme_id));
            }
            Action::StartQuery => {
                let state = self.controller.state_mut();
                state.begin_query();
                state.set_status_message(None::<String>);
            }
            Action::ToggleLike => {
                if self.controller.toggle_like_selected().is_none() {
                    tracing::debug!("like ignored; no rendered post under cursor");
                }
            }
        }
    }

    fn on_tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if self.controller.poll() {
            let state = self.controller.state();
            tracing::debug!(
                theme = %state.selected_theme_id(),
                posts = state.len(),
                "feed committed"
            );
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
