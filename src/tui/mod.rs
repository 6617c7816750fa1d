mod ui;
mod widgets;

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::catalog::{Catalog, SessionRef};
use crate::config::Config;
use crate::db::{Database, Stats};
use crate::models::{SessionStatus, Topic, TopicSummary};
use crate::notify::{Level, NotificationCenter};
use crate::progress::{ProgressSnapshot, ProgressStore};
use crate::recommend::QuickActions;
use crate::service::StudyService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Topics,
    TopicDetail,
    SessionDetail,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Topics,
            View::Topics => View::Dashboard,
            View::TopicDetail => View::Topics,
            View::SessionDetail => View::TopicDetail,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Topics,
            View::Topics => View::Dashboard,
            View::TopicDetail => View::Topics,
            View::SessionDetail => View::TopicDetail,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    // Keeps the cursor where it was when the list is rebuilt
    fn replace_items(&mut self, items: Vec<T>) {
        self.selected = match self.selected {
            _ if items.is_empty() => None,
            Some(i) => Some(i.min(items.len() - 1)),
            None => Some(0),
        };
        self.items = items;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App<'a> {
    service: StudyService<'a>,
    db: &'a Database,
    review_limit: usize,
    pub view: View,
    pub topics: StatefulList<TopicSummary>,
    pub selected_topic: Option<&'a Topic>,
    pub session_cursor: StatefulList<usize>,
    pub selected_session: Option<SessionRef<'a>>,
    pub snapshot: ProgressSnapshot,
    pub quick_actions: QuickActions,
    pub stats: Stats,
    pub notifications: NotificationCenter,
    // Unfinished attempts keyed by (topic id, session id)
    pub open_attempts: HashMap<(String, String), i64>,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(
        catalog: &'a Catalog,
        db: &'a Database,
        config: &Config,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let service = StudyService::new(catalog, db, config.pass_mark);
        let quick_actions = service.quick_actions(config.review_limit)?;
        let topics = service.topic_summaries()?;

        Ok(Self {
            service,
            db,
            review_limit: config.review_limit,
            view: View::Dashboard,
            topics: StatefulList::with_items(topics),
            selected_topic: None,
            session_cursor: StatefulList::with_items(Vec::new()),
            selected_session: None,
            snapshot: db.snapshot()?,
            quick_actions,
            stats: db.get_stats()?,
            notifications: NotificationCenter::new(config.notification_ttl()),
            open_attempts: load_open_attempts(db)?,
            should_quit: false,
        })
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.service.catalog()
    }

    pub fn status_of(&self, topic_id: &str, session_id: &str) -> SessionStatus {
        self.snapshot
            .status(topic_id, session_id)
            .unwrap_or(SessionStatus::NotStarted)
    }

    /// Rescans progress after anything that may have changed it.
    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.snapshot = self.db.snapshot()?;
        self.quick_actions = self.service.quick_actions(self.review_limit)?;
        self.stats = self.db.get_stats()?;
        self.topics.replace_items(self.service.topic_summaries()?);
        Ok(())
    }

    pub fn open_attempt_for(&self, r: SessionRef<'_>) -> Option<i64> {
        self.open_attempts
            .get(&(r.topic_id().to_string(), r.session_id().to_string()))
            .copied()
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifications.prune(now);
    }

    fn open_topic(&mut self, topic_id: &str) {
        if let Some(topic) = self.catalog().topic(topic_id) {
            self.selected_topic = Some(topic);
            self.session_cursor = StatefulList::with_items((0..topic.sessions.len()).collect());
            self.view = View::TopicDetail;
        }
    }

    fn open_selected_topic(&mut self) {
        if let Some(summary) = self.topics.selected_item() {
            let topic_id = summary.topic_id.clone();
            self.open_topic(&topic_id);
        }
    }

    fn open_selected_session(&mut self) {
        let Some(topic) = self.selected_topic else {
            return;
        };
        if let Some(&i) = self.session_cursor.selected_item() {
            if let Some(session) = topic.sessions.get(i) {
                self.selected_session = Some(SessionRef { topic, session });
                self.view = View::SessionDetail;
            }
        }
    }

    // Quick action: jump straight to the recommended session
    fn open_recommended(&mut self) {
        let Some(next) = self.quick_actions.next.clone() else {
            self.notifications
                .push(Level::Info, "Every session has been started", Instant::now());
            return;
        };
        self.open_topic(&next.topic_id);
        if let Some(topic) = self.selected_topic {
            if let Some(i) = topic.sessions.iter().position(|s| s.id == next.session_id) {
                self.session_cursor.selected = Some(i);
                self.open_selected_session();
            }
        }
    }

    fn back(&mut self) {
        match self.view {
            View::SessionDetail => {
                self.view = View::TopicDetail;
                self.selected_session = None;
            }
            View::TopicDetail => {
                self.view = View::Topics;
                self.selected_topic = None;
            }
            View::Topics => self.view = View::Dashboard,
            View::Dashboard => {}
        }
    }

    fn start_selected(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(r) = self.selected_session else {
            return Ok(());
        };
        if let Some(id) = self.open_attempt_for(r) {
            self.notifications.push(
                Level::Info,
                format!("Attempt #{} is already open, press f to finish", id),
                Instant::now(),
            );
            return Ok(());
        }
        match self
            .service
            .start_session(r.topic_id(), r.session_id(), &mut self.notifications)
        {
            Ok(id) => {
                self.open_attempts
                    .insert((r.topic_id().to_string(), r.session_id().to_string()), id);
            }
            Err(e) => self.report(e),
        }
        self.refresh_data()
    }

    fn finish_selected(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(r) = self.selected_session else {
            return Ok(());
        };
        let key = (r.topic_id().to_string(), r.session_id().to_string());
        let Some(id) = self.open_attempts.remove(&key) else {
            self.notifications.push(
                Level::Warning,
                "No attempt in progress, press s to start",
                Instant::now(),
            );
            return Ok(());
        };
        if let Err(e) = self.service.finish(id, &mut self.notifications) {
            self.report(e);
        }
        self.refresh_data()
    }

    fn mark_selected(&mut self, status: SessionStatus) -> Result<(), Box<dyn std::error::Error>> {
        let Some(r) = self.selected_session else {
            return Ok(());
        };
        if let Err(e) =
            self.service
                .set_status(r.topic_id(), r.session_id(), status, &mut self.notifications)
        {
            self.report(e);
        }
        self.refresh_data()
    }

    // Removes the toast shown in the help bar, then marks the rest as seen
    fn dismiss_latest(&mut self) {
        let latest = self
            .notifications
            .active(Instant::now())
            .filter(|n| !n.read)
            .last()
            .map(|n| n.id);
        match latest {
            Some(id) => {
                self.notifications.dismiss(id);
            }
            None => self.notifications.mark_all_read(),
        }
    }

    fn report(&mut self, e: crate::error::Error) {
        self.notifications
            .push(Level::Error, e.to_string(), Instant::now());
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => self.back(),

            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => match self.view {
                View::Dashboard => self.open_recommended(),
                View::Topics => self.open_selected_topic(),
                View::TopicDetail => self.open_selected_session(),
                View::SessionDetail => {}
            },

            KeyCode::Char('n') if self.view == View::Dashboard => self.open_recommended(),

            KeyCode::Tab | KeyCode::BackTab => {
                if matches!(self.view, View::Dashboard | View::Topics) {
                    self.view = if key == KeyCode::BackTab {
                        self.view.prev()
                    } else {
                        self.view.next()
                    };
                }
            }

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Topics => self.topics.next(),
                View::TopicDetail => self.session_cursor.next(),
                _ => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Topics => self.topics.previous(),
                View::TopicDetail => self.session_cursor.previous(),
                _ => {}
            },
            KeyCode::Char('g') => match self.view {
                View::Topics => self.topics.first(),
                View::TopicDetail => self.session_cursor.first(),
                _ => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Topics => self.topics.last(),
                View::TopicDetail => self.session_cursor.last(),
                _ => {}
            },

            KeyCode::Char('s') if self.view == View::SessionDetail => self.start_selected()?,
            KeyCode::Char('f') if self.view == View::SessionDetail => self.finish_selected()?,
            KeyCode::Char('c') if self.view == View::SessionDetail => {
                self.mark_selected(SessionStatus::Completed)?
            }
            KeyCode::Char('w') if self.view == View::SessionDetail => {
                self.mark_selected(SessionStatus::NeedsWork)?
            }

            KeyCode::Char('x') => self.dismiss_latest(),

            _ => {}
        }
        Ok(())
    }
}

// Latest unfinished attempt per session, including ones started from the CLI
fn load_open_attempts(
    db: &Database,
) -> Result<HashMap<(String, String), i64>, Box<dyn std::error::Error>> {
    let mut open = HashMap::new();
    // Newest first, so the first one seen per session wins
    for attempt in db.list_attempts(None)? {
        if attempt.is_open() {
            open.entry((attempt.topic_id, attempt.session_id))
                .or_insert(attempt.id);
        }
    }
    Ok(open)
}

pub fn run(
    catalog: &Catalog,
    db: &Database,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(catalog, db, config).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
