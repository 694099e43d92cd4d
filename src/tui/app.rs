use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use tracing::{debug, error, info, warn};

use crate::io::config_io::{load_config, resolve_paths};
use crate::io::feed::{FeedEvent, Journal, JournalFeed, instance_origin};
use crate::io::logging::init_logging;
use crate::io::signals;
use crate::io::state::{UiState, read_ui_state, write_ui_state};
use crate::model::{
    ALL_PROJECTS, Column, ColumnId, Comment, ProjectId, TaskDetail, TaskId, TaskReference,
    TaskSummary,
};
use crate::store::{CancelToken, DbContext, SqliteStore, Store, StoreError};

use super::board::Board;
use super::form::{
    ColumnFields, CommentFields, FormMsg, FormSession, ProjectFields, TaskFields, TextInput,
};
use super::input;
use super::keymap::KeyMap;
use super::mode::Mode;
use super::notice::Notices;
use super::picker::{PickerSession, RelationTypePicker};
use super::render;
use super::selection::Selection;
use super::sync::{SyncClient, should_refresh};
use super::theme::Theme;

/// Event poll timeout; also the tick period
const TICK_RATE: Duration = Duration::from_millis(250);

/// One unit of input to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Feed(FeedEvent),
    Tick,
}

/// What the loop should do after a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
}

/// Pending "discard unsaved changes?" question. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardContext {
    /// Mode to go back to when the user keeps editing
    pub source_mode: Mode,
    pub message: String,
}

/// What a delete confirmation will remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Task { id: TaskId, title: String },
    Column { id: ColumnId, name: String },
}

#[derive(Debug, Clone)]
pub struct CommentsView {
    pub task_id: TaskId,
    pub task_title: String,
    pub comments: Vec<Comment>,
    pub cursor: usize,
    /// Where Esc leaves to
    pub return_mode: Mode,
}

impl CommentsView {
    pub fn selected(&self) -> Option<&Comment> {
        self.comments.get(self.cursor)
    }
}

/// Read-only detail popup for one task
#[derive(Debug, Clone)]
pub struct TaskView {
    pub detail: TaskDetail,
    pub parents: Vec<TaskReference>,
    pub children: Vec<TaskReference>,
    pub scroll: u16,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub column_width: u16,
    pub timeout: Duration,
    /// Where UI state is saved; None disables persistence
    pub state_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            column_width: 32,
            timeout: Duration::from_secs(2),
            state_path: None,
        }
    }
}

/// Main application state
pub struct App {
    pub mode: Mode,
    pub board: Board,
    pub selection: Selection,
    pub task_form: Option<FormSession<TaskFields>>,
    pub project_form: Option<FormSession<ProjectFields>>,
    /// Shared by the inline prompts and the column form
    pub column_form: Option<FormSession<ColumnFields>>,
    pub comment_form: Option<FormSession<CommentFields>>,
    pub picker: Option<PickerSession>,
    pub relation_picker: Option<RelationTypePicker>,
    pub discard: Option<DiscardContext>,
    pub pending_delete: Option<DeleteTarget>,
    pub comments: Option<CommentsView>,
    pub task_view: Option<TaskView>,
    /// Query being typed in Search mode
    pub search_input: TextInput,
    pub help_scroll: u16,
    pub notices: Notices,
    pub sync: SyncClient,
    pub keymap: KeyMap,
    pub theme: Theme,
    pub settings: Settings,
    pub should_quit: bool,
    store: Box<dyn Store>,
    cancel: CancelToken,
}

impl App {
    pub fn new(
        store: Box<dyn Store>,
        sync: SyncClient,
        keymap: KeyMap,
        theme: Theme,
        settings: Settings,
        notice_ttl: Duration,
    ) -> Self {
        App {
            mode: Mode::Normal,
            board: Board::default(),
            selection: Selection::default(),
            task_form: None,
            project_form: None,
            column_form: None,
            comment_form: None,
            picker: None,
            relation_picker: None,
            discard: None,
            pending_delete: None,
            comments: None,
            task_view: None,
            search_input: TextInput::default(),
            help_scroll: 0,
            notices: Notices::new(notice_ttl),
            sync,
            keymap,
            theme,
            settings,
            should_quit: false,
            store,
            cancel: CancelToken::new(),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// A fresh bounded context for one store call
    pub fn ctx(&self) -> DbContext {
        DbContext::new(self.settings.timeout, &self.cancel)
    }

    /// Load everything for the first frame. Failures leave empty
    /// collections behind and raise an error notice.
    pub fn initialize(&mut self, project: Option<ProjectId>) {
        let ctx = self.ctx();
        if let Err(err) = self.board.load_lookups(self.store.as_ref(), &ctx) {
            self.report("Failed to load lookups", err);
        }
        if let Err(err) = self.board.load_projects(self.store.as_ref(), &ctx) {
            self.board.projects.clear();
            self.report("Failed to load projects", err);
        }
        let known = project.filter(|id| self.board.projects.iter().any(|p| p.id == *id));
        self.board.project_id = known
            .or_else(|| self.board.projects.first().map(|p| p.id))
            .unwrap_or(ALL_PROJECTS);
        if !self.reload_board() {
            self.board.clear();
        }
        info!(project = self.board.project_id, "board loaded");
    }

    /// Log a failed store call and tell the user. Cancellation ends the app.
    pub fn report(&mut self, what: &str, err: StoreError) {
        if matches!(err, StoreError::Cancelled) {
            info!("{what}: cancelled, shutting down");
            self.should_quit = true;
            return;
        }
        warn!(%err, "{what}");
        self.notices.error(format!("{what}: {err}"));
    }

    /// Full reload of the open project. The cache is left untouched when it
    /// fails.
    pub fn reload_board(&mut self) -> bool {
        let ctx = self.ctx();
        match self.board.reload(self.store.as_ref(), &ctx) {
            Ok(()) => {
                self.clamp_selection();
                true
            }
            Err(err) => {
                self.report("Failed to load board", err);
                false
            }
        }
    }

    pub fn reload_projects(&mut self) -> bool {
        let ctx = self.ctx();
        match self.board.load_projects(self.store.as_ref(), &ctx) {
            Ok(()) => true,
            Err(err) => {
                self.report("Failed to load projects", err);
                false
            }
        }
    }

    pub fn reload_tasks(&mut self) -> bool {
        let ctx = self.ctx();
        match self.board.reload_tasks(self.store.as_ref(), &ctx) {
            Ok(()) => {
                self.clamp_selection();
                true
            }
            Err(err) => {
                self.report("Failed to load tasks", err);
                false
            }
        }
    }

    /// Re-read one task's card after it changed. A filtered board is
    /// reloaded instead, since its neighbours' positions are not all known.
    pub fn refresh_summary(&mut self, id: TaskId) {
        if self.board.is_filtered() {
            self.reload_tasks();
            return;
        }
        let ctx = self.ctx();
        match self.store.get_task_summary(&ctx, id) {
            Ok(summary) => self.board.place(summary),
            Err(err) => self.report("Failed to reload task", err),
        }
    }

    pub fn switch_project(&mut self, id: ProjectId) {
        self.board.project_id = id;
        self.board.search = None;
        self.selection = Selection {
            size: self.selection.size,
            ..Selection::default()
        };
        if !self.reload_board() {
            self.board.clear();
        }
        info!(project = id, "switched project");
    }

    pub fn clamp_selection(&mut self) {
        let columns = self.board.columns.len();
        let column = self.selection.column.min(columns.saturating_sub(1));
        let tasks = self.board.tasks_in(column).len();
        self.selection.clamp(columns, tasks);
    }

    pub fn selected_column(&self) -> Option<&Column> {
        self.board.column(self.selection.column)
    }

    pub fn selected_task(&self) -> Option<&TaskSummary> {
        self.board
            .task_at(self.selection.column, self.selection.task)
    }

    /// Move the selection onto task `id` if it is on the board.
    pub fn select_task(&mut self, id: TaskId) {
        if let Some((column_id, index)) = self.board.locate(id)
            && let Some(column) = self.board.column_index(column_id)
        {
            self.selection
                .select_column(column, self.board.columns.len());
            self.selection.task = index;
        }
    }

    /// Feed one message through the controller.
    pub fn dispatch(&mut self, msg: Msg) -> Command {
        match msg {
            Msg::Key(key) => input::handle_key(self, key),
            Msg::Resize { width, .. } => {
                self.selection.resize(
                    width,
                    self.settings.column_width,
                    self.board.columns.len(),
                );
            }
            Msg::Feed(event) => self.handle_feed(event),
            Msg::Tick => self.tick(Instant::now()),
        }
        if !self.mode_is_consistent() {
            error!(mode = ?self.mode, "mode has no owning session");
        }
        if self.should_quit || self.cancel.is_cancelled() {
            Command::Quit
        } else {
            Command::None
        }
    }

    fn tick(&mut self, now: Instant) {
        self.notices.expire(now);
        match self.mode {
            Mode::TaskForm => {
                if let Some(s) = self.task_form.as_mut() {
                    s.update(FormMsg::Tick);
                }
            }
            Mode::ProjectForm => {
                if let Some(s) = self.project_form.as_mut() {
                    s.update(FormMsg::Tick);
                }
            }
            Mode::AddColumn | Mode::EditColumn | Mode::AddColumnForm | Mode::EditColumnForm => {
                if let Some(s) = self.column_form.as_mut() {
                    s.update(FormMsg::Tick);
                }
            }
            Mode::CommentForm | Mode::CommentEdit => {
                if let Some(s) = self.comment_form.as_mut() {
                    s.update(FormMsg::Tick);
                }
            }
            _ => {}
        }
        self.sync.listen(now);
    }

    /// A reload only replaces the board snapshot, so it is safe in any mode.
    fn handle_feed(&mut self, event: FeedEvent) {
        self.sync.observe(&event);
        match event {
            FeedEvent::Refresh {
                project_id,
                payload,
            } => {
                if !should_refresh(project_id, self.board.project_id) {
                    return;
                }
                debug!(project_id, %payload, "remote change");
                if project_id == ALL_PROJECTS {
                    self.reload_projects();
                }
                self.reload_board();
            }
            FeedEvent::Notice { level, message } => self.notices.push(level, message),
            FeedEvent::Connected | FeedEvent::ConnectionLost | FeedEvent::Reconnecting => {}
        }
    }

    /// Every mode that needs a session has one, and no overlay state
    /// outlives its mode.
    pub fn mode_is_consistent(&self) -> bool {
        let owned = match self.mode {
            Mode::Normal | Mode::HelpOverlay | Mode::Search => true,
            Mode::DeleteTaskConfirm => {
                matches!(self.pending_delete, Some(DeleteTarget::Task { .. }))
            }
            Mode::DeleteColumnConfirm => {
                matches!(self.pending_delete, Some(DeleteTarget::Column { .. }))
            }
            Mode::DiscardConfirm => self.discard.is_some(),
            Mode::AddColumn | Mode::EditColumn | Mode::AddColumnForm | Mode::EditColumnForm => {
                self.column_form.is_some()
            }
            Mode::TaskForm | Mode::TaskFormHelpOverlay => self.task_form.is_some(),
            Mode::ProjectForm => self.project_form.is_some(),
            Mode::CommentForm | Mode::CommentEdit => {
                self.comment_form.is_some() && self.comments.is_some()
            }
            Mode::CommentsView => self.comments.is_some(),
            Mode::LabelPicker
            | Mode::ParentPicker
            | Mode::ChildPicker
            | Mode::PriorityPicker
            | Mode::TypePicker
            | Mode::StatusPicker => self
                .picker
                .as_ref()
                .is_some_and(|p| p.kind.mode() == self.mode),
            Mode::RelationTypePicker => self.relation_picker.is_some() && self.picker.is_some(),
            Mode::ViewTask => self.task_view.is_some(),
        };
        let no_strays = (self.discard.is_none() || self.mode == Mode::DiscardConfirm)
            && (self.relation_picker.is_none() || self.mode == Mode::RelationTypePicker)
            && (self.picker.is_none()
                || self.mode.is_picker()
                || self.mode == Mode::RelationTypePicker)
            && (self.pending_delete.is_none()
                || matches!(
                    self.mode,
                    Mode::DeleteTaskConfirm | Mode::DeleteColumnConfirm
                ));
        owned && no_strays
    }
}

/// Options the binary passes in from the command line
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub project: Option<ProjectId>,
    /// Listen to the event feed (still publishes when false)
    pub feed: bool,
    pub log_file: Option<PathBuf>,
}

/// Restore the selection saved for the project that is open now
pub fn restore_ui_state(app: &mut App, state: &UiState) {
    if state.project_id != Some(app.board.project_id) {
        return;
    }
    app.selection.column = state.column;
    app.selection.offset = state.offset;
    app.clamp_selection();
    let tasks = app.board.tasks_in(app.selection.column).len();
    app.selection.task = state.task;
    app.selection.clamp_task(tasks);
}

/// Save UI state next to the database
pub fn save_ui_state(app: &App) {
    let Some(path) = &app.settings.state_path else {
        return;
    };
    let state = UiState {
        project_id: Some(app.board.project_id),
        column: app.selection.column,
        task: app.selection.task,
        offset: app.selection.offset,
    };
    if let Err(err) = write_ui_state(path, &state) {
        debug!(%err, path = %path.display(), "could not save UI state");
    }
}

/// Run the TUI application
pub fn run(options: LaunchOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(db) = options.db {
        config.store.path = Some(db);
    }
    if let Some(log) = options.log_file {
        config.log.path = Some(log);
    }
    let paths = resolve_paths(&config);

    if let Err(err) = init_logging(&paths.log, config.log.filter.as_deref()) {
        eprintln!("warning: logging disabled ({}): {}", paths.log.display(), err);
    }
    let keymap = KeyMap::from_config(&config.keys)?;

    let origin = instance_origin();
    let mut store = SqliteStore::open(&paths.db)?;
    let sync = if config.feed.enabled {
        store = store.with_journal(Journal::new(&paths.journal, &origin));
        if options.feed {
            SyncClient::new(Some(Box::new(JournalFeed::new(
                &paths.journal,
                &origin,
                &config.feed,
            ))))
        } else {
            SyncClient::disabled()
        }
    } else {
        SyncClient::disabled()
    };

    let settings = Settings {
        column_width: config.ui.column_width.max(1),
        timeout: Duration::from_millis(config.store.timeout_ms),
        state_path: Some(paths.state.clone()),
    };
    let mut app = App::new(
        Box::new(store),
        sync,
        keymap,
        Theme::from_config(&config.ui),
        settings,
        Duration::from_secs(config.ui.notice_ttl_secs),
    );

    let saved = read_ui_state(&paths.state);
    let project = options
        .project
        .or_else(|| saved.as_ref().and_then(|s| s.project_id));
    app.initialize(project);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let size = terminal.size()?;
    app.dispatch(Msg::Resize {
        width: size.width,
        height: size.height,
    });
    if let Some(state) = &saved {
        restore_ui_state(&mut app, state);
    }

    if let Err(err) = signals::install_shutdown_handler() {
        warn!(%err, "shutdown signals not handled");
    }
    let result = run_event_loop(&mut terminal, &mut app);

    save_ui_state(&app);
    info!("shutting down");

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Turn a received shutdown signal into cancellation, which the next
/// dispatch answers with Quit.
fn forward_shutdown(app: &App) {
    if signals::shutdown_requested() && !app.cancel_token().is_cancelled() {
        info!("shutdown signal received");
        app.cancel_token().cancel();
    }
}

fn run_event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut save_counter = 0u32;
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(TICK_RATE)? {
            let msg = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => Some(Msg::Key(key)),
                Event::Resize(width, height) => Some(Msg::Resize { width, height }),
                _ => None,
            };
            if let Some(msg) = msg {
                let is_key = matches!(msg, Msg::Key(_));
                if app.dispatch(msg) == Command::Quit {
                    break;
                }
                // Debounced state save: every ~5 key presses
                if is_key {
                    save_counter += 1;
                    if save_counter >= 5 {
                        save_ui_state(app);
                        save_counter = 0;
                    }
                }
            }
        }

        forward_shutdown(app);
        if last_tick.elapsed() >= TICK_RATE || app.cancel_token().is_cancelled() {
            last_tick = Instant::now();
            if app.dispatch(Msg::Tick) == Command::Quit {
                break;
            }
        }

        // subscribe → handle one → resubscribe
        let mut quit = false;
        while let Some(event) = app.sync.try_next(Instant::now()) {
            if app.dispatch(Msg::Feed(event)) == Command::Quit {
                quit = true;
                break;
            }
            app.sync.listen(Instant::now());
        }
        if quit {
            break;
        }
    }
    Ok(())
}
