use std::io;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, warn};

use crate::cli::handlers::Context;
use crate::io::store::{FileStore, KeyValueStore, Storage, StoreError};
use crate::io::watcher::{StoreEvent, StoreWatcher};
use crate::ops::duration::{format_short, step_preset};
use crate::ops::navigator::SessionNavigator;
use crate::ops::tree_ops;

use super::render::{self, CurrentView, PlayView};
use super::theme::Theme;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Elapsed seconds on the current task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timer {
    pub elapsed: u64,
    pub paused: bool,
}

impl Timer {
    pub fn restart(&mut self) {
        self.elapsed = 0;
        self.paused = false;
    }
}

/// State of the play screen
pub struct App<K> {
    pub nav: SessionNavigator<K>,
    pub timer: Timer,
    pub status: Option<String>,
    pub should_quit: bool,
    pub theme: Theme,
}

impl<K: KeyValueStore> App<K> {
    pub fn new(nav: SessionNavigator<K>) -> Self {
        App {
            nav,
            timer: Timer::default(),
            status: None,
            should_quit: false,
            theme: Theme::default(),
        }
    }

    /// Start a session, from a picked task or the first open one.
    pub fn begin(&mut self, start_from: Option<&str>) {
        let started = match start_from {
            Some(id) => self.nav.start_from(id).is_some(),
            None => self.nav.start().is_some(),
        };
        self.timer.restart();
        self.status = (!started).then(|| "Nothing left to do".to_string());
    }

    /// The timer only runs on an active, unpaused session.
    pub fn timer_running(&self) -> bool {
        self.nav.session().is_active() && !self.timer.paused
    }

    /// One second passed.
    pub fn tick(&mut self) {
        if self.timer_running() {
            self.timer.elapsed += 1;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.close();
            return;
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('c') => {
                self.complete(chrono::Local::now().naive_local());
            }
            KeyCode::Char('n') | KeyCode::Right => self.next(),
            KeyCode::Char('p') | KeyCode::Left => self.previous(),
            KeyCode::Char(' ') => self.toggle_pause(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_estimate(true),
            KeyCode::Char('-') => self.adjust_estimate(false),
            KeyCode::Char('q') | KeyCode::Esc => self.close(),
            _ => {}
        }
    }

    /// Finish the current task and move on. From idle, starts a new session.
    pub fn complete(&mut self, at: NaiveDateTime) {
        if !self.nav.session().is_active() {
            self.begin(None);
            return;
        }
        let Some(outcome) = self.nav.complete_current(self.timer.elapsed, at) else {
            return;
        };
        self.timer.paused = true;
        let mut message = format!("Done: {}", outcome.task.display_name());
        for a in &outcome.unlocked {
            message.push_str(&format!("  \u{2605} {}", a.title));
        }
        let more = self.nav.advance().is_some();
        self.timer.restart();
        if !more {
            message.push_str("; all tasks finished");
        }
        self.status = Some(message);
    }

    pub fn next(&mut self) {
        if !self.nav.session().is_active() {
            return;
        }
        if self.nav.advance().is_none() {
            self.status = Some("No more tasks".to_string());
        } else {
            self.status = None;
        }
        self.timer.restart();
    }

    pub fn previous(&mut self) {
        if !self.nav.can_retreat() {
            return;
        }
        self.nav.retreat();
        self.timer.restart();
        self.status = None;
    }

    pub fn toggle_pause(&mut self) {
        if self.nav.session().is_active() {
            self.timer.paused = !self.timer.paused;
        }
    }

    /// Move the current leaf's estimate to the neighbouring preset.
    pub fn adjust_estimate(&mut self, up: bool) {
        let Some(id) = self.nav.current().map(|t| t.id.clone()) else {
            return;
        };
        let Some(duration) = tree_ops::find(self.nav.tasks(), &id).map(|t| t.duration) else {
            return;
        };
        if let Some(next) = step_preset(duration, up) {
            self.nav.edit_tree(|tasks| tree_ops::set_duration(tasks, &id, next));
            self.status = Some(format!("Estimate: {}", format_short(next)));
        }
    }

    /// Leave the screen. Ends the session, which breaks the streak.
    pub fn close(&mut self) {
        self.nav.close();
        self.timer.paused = true;
        self.should_quit = true;
    }

    /// Pick up a write made by another process.
    pub fn reload(&mut self, event: StoreEvent) {
        let storage = self.nav.storage();
        match event {
            StoreEvent::Tasks => match storage.load_tree() {
                Ok(tasks) => {
                    debug!("task tree changed on disk");
                    self.nav.replace_tree(tasks);
                }
                Err(e) => warn!(error = %e, "could not reload tasks"),
            },
            StoreEvent::Statistics => match storage.load_stats() {
                Ok(stats) => self.nav.replace_stats(stats),
                Err(e) => warn!(error = %e, "could not reload statistics"),
            },
        }
    }

    pub fn view(&self) -> PlayView {
        let stats = self.nav.stats();
        let current = self.nav.session().active().and_then(|active| {
            let task = active.current()?;
            // Prefer the live node; the queued snapshot may be stale.
            let live = tree_ops::find(self.nav.tasks(), &task.id).unwrap_or(task);
            let mut breadcrumb: Vec<String> = tree_ops::ancestors(self.nav.tasks(), &task.id)
                .into_iter()
                .map(|a| a.display_name().to_string())
                .collect();
            breadcrumb.reverse();
            Some(CurrentView {
                breadcrumb,
                name: live.display_name().to_string(),
                status: live.status,
                elapsed: self.timer.elapsed,
                estimate: live.duration,
                paused: self.timer.paused,
                position: active.index() + 1,
                queued: active.queue().len(),
                has_image: live.image.is_some(),
            })
        });
        PlayView {
            current,
            total_completed: stats.total_completed,
            streak: stats.consecutive_completed,
            unlocked: stats.unlocked_achievements.len(),
            status: self.status.clone(),
            can_retreat: self.nav.can_retreat(),
        }
    }
}

/// Open the play screen on the data directory in `ctx`.
pub fn run(ctx: &Context, start_from: Option<&str>) -> Result<(), TuiError> {
    let storage = Storage::new(FileStore::open(&ctx.data_dir)?);
    let nav = SessionNavigator::load(storage)?;
    let mut app = App::new(nav);
    app.begin(start_from);

    let watcher = match StoreWatcher::start(&ctx.data_dir) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "file watching unavailable; external edits will not show");
            None
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Restore the terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop<K: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<K>,
    watcher: Option<&StoreWatcher>,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();
    loop {
        let view = app.view();
        terminal.draw(|frame| render::render(frame, &view, &app.theme))?;

        let timeout = TICK.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
        }

        if last_tick.elapsed() >= TICK {
            app.tick();
            last_tick = Instant::now();
        }

        if let Some(watcher) = watcher {
            for event in watcher.poll() {
                app.reload(event);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
