// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use sendur_app::{
    AppCommand, AppState, Density, Lead, LeadField, LoadSource, SelectAllState, SortDirection,
    SortState,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{error, info, warn};

pub const APP_TITLE: &str = "Sendur Lead Contact Automation";

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const SORT_MARK_ASC: &str = "▲";
const SORT_MARK_DESC: &str = "▼";

/// A read-all result as handed to the event loop: the body to cache and the
/// decoded collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadsPayload {
    pub raw: String,
    pub leads: Vec<Lead>,
}

/// Everything the event loop needs from outside. The default `spawn_*`
/// methods run the blocking calls inline and report over `tx`; a real runtime
/// overrides them to keep the loop drawing while the network works.
pub trait AppRuntime {
    fn load_cached_leads(&mut self) -> Option<Vec<Lead>>;
    fn cache_leads(&mut self, raw: &str) -> Result<()>;
    fn fetch_leads(&mut self) -> Result<LeadsPayload>;
    /// Posts `leads` for approval and returns a one-line summary.
    fn send_selection(&mut self, request_id: u64, leads: &[Lead]) -> Result<String>;

    fn spawn_fetch_leads(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let event = match self.fetch_leads() {
            Ok(LeadsPayload { raw, leads }) => InternalEvent::LeadsFetched { raw, leads },
            Err(error) => InternalEvent::FetchFailed {
                error: format!("{error:#}"),
                cancelled: false,
            },
        };
        tx.send(event)
            .map_err(|_| anyhow!("load event channel closed"))?;
        Ok(())
    }

    fn spawn_send_selection(
        &mut self,
        request_id: u64,
        leads: Vec<Lead>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let event = match self.send_selection(request_id, &leads) {
            Ok(summary) => InternalEvent::SendCompleted {
                request_id,
                summary,
            },
            Err(error) => InternalEvent::SendFailed {
                request_id,
                error: format!("{error:#}"),
            },
        };
        tx.send(event)
            .map_err(|_| anyhow!("send event channel closed"))?;
        Ok(())
    }

    fn cancel_fetch(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    LeadsFetched { raw: String, leads: Vec<Lead> },
    FetchFailed { error: String, cancelled: bool },
    SendCompleted { request_id: u64, summary: String },
    SendFailed { request_id: u64, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    MoveColumn(isize),
    SortCursorColumn,
    SortColumn(usize),
    ToggleRow,
    ToggleAll,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    ToggleDensity,
    Send,
    TogglePreview,
    ToggleHelp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    cursor_row: usize,
    cursor_col: usize,
    help_visible: bool,
    preview_visible: bool,
    loading: bool,
    loading_status_token: u64,
    status_token: u64,
    last_send_id: u64,
    sends_in_flight: usize,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    start_loading(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(false) => {}
            Ok(true) => match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            },
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Mount: a cached collection is used as is; only a miss goes to the network.
fn start_loading<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Some(leads) = runtime.load_cached_leads() {
        info!(count = leads.len(), "loaded leads from session cache");
        state.dispatch(AppCommand::LoadLeads {
            leads,
            source: LoadSource::Cache,
            at: OffsetDateTime::now_utc(),
        });
        return;
    }

    view_data.loading = true;
    state.dispatch(AppCommand::SetStatus("loading leads".to_owned()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    view_data.loading_status_token = view_data.status_token;
    if let Err(error) = runtime.spawn_fetch_leads(internal_tx.clone()) {
        error!(error = %format!("{error:#}"), "lead fetch could not start");
        finish_loading(state, view_data);
    }
}

/// Drops the loading status unless something newer replaced it meanwhile.
fn finish_loading(state: &mut AppState, view_data: &mut ViewData) {
    view_data.loading = false;
    if view_data.status_token == view_data.loading_status_token {
        state.dispatch(AppCommand::ClearStatus);
    }
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::LeadsFetched { raw, leads } => {
                if let Err(error) = runtime.cache_leads(&raw) {
                    warn!(error = %format!("{error:#}"), "leads not stored in session cache");
                }
                info!(count = leads.len(), "loaded leads from datastore");
                state.dispatch(AppCommand::LoadLeads {
                    leads,
                    source: LoadSource::Network,
                    at: OffsetDateTime::now_utc(),
                });
                finish_loading(state, view_data);
            }
            InternalEvent::FetchFailed { error, cancelled } => {
                if cancelled {
                    info!(%error, "lead fetch cancelled");
                } else {
                    error!(%error, "failed to load leads");
                }
                finish_loading(state, view_data);
            }
            InternalEvent::SendCompleted {
                request_id,
                summary,
            } => {
                view_data.sends_in_flight = view_data.sends_in_flight.saturating_sub(1);
                info!(request_id, %summary, "approval request finished");
                emit_status(state, view_data, tx, summary);
            }
            InternalEvent::SendFailed { request_id, error } => {
                view_data.sends_in_flight = view_data.sends_in_flight.saturating_sub(1);
                error!(request_id, %error, "failed to send selected leads");
            }
        }
    }
    clamp_cursor(state, view_data);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }

    if is_quit_key(key) {
        if view_data.loading {
            runtime.cancel_fetch();
        }
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }
    if view_data.preview_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('v')) {
            view_data.preview_visible = false;
        }
        return false;
    }

    if let Some(command) = table_command_for_key(key) {
        apply_table_command(state, runtime, view_data, internal_tx, command);
    }
    false
}

fn is_quit_key(key: KeyEvent) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => true,
        (KeyCode::Char('c'), modifiers) => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(TableCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(TableCommand::MoveRow(-1)),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(TableCommand::MoveColumn(-1)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(TableCommand::MoveColumn(1)),
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(TableCommand::SortCursorColumn),
        (KeyCode::Char(digit @ '1'..='7'), _) => {
            Some(TableCommand::SortColumn(digit as usize - '1' as usize))
        }
        (KeyCode::Char(' '), _) => Some(TableCommand::ToggleRow),
        (KeyCode::Char('a'), KeyModifiers::NONE) => Some(TableCommand::ToggleAll),
        (KeyCode::Char('n'), KeyModifiers::NONE) | (KeyCode::PageDown, _) => {
            Some(TableCommand::NextPage)
        }
        (KeyCode::Char('p'), KeyModifiers::NONE) | (KeyCode::PageUp, _) => {
            Some(TableCommand::PrevPage)
        }
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(TableCommand::FirstPage),
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(TableCommand::LastPage),
        (KeyCode::Char('r'), KeyModifiers::NONE) => Some(TableCommand::CyclePageSize),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(TableCommand::ToggleDensity),
        (KeyCode::Char('x'), KeyModifiers::NONE) | (KeyCode::Enter, _) => {
            Some(TableCommand::Send)
        }
        (KeyCode::Char('v'), KeyModifiers::NONE) => Some(TableCommand::TogglePreview),
        (KeyCode::Char('?'), _) => Some(TableCommand::ToggleHelp),
        _ => None,
    }
}

fn apply_table_command<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: TableCommand,
) {
    match command {
        TableCommand::MoveRow(delta) => {
            let rows = state.visible_rows().len();
            view_data.cursor_row = shift_index(view_data.cursor_row, delta, rows);
        }
        TableCommand::MoveColumn(delta) => {
            view_data.cursor_col =
                shift_index(view_data.cursor_col, delta, LeadField::COLUMNS.len());
        }
        TableCommand::SortCursorColumn => {
            let column = view_data.cursor_col;
            request_sort(state, view_data, internal_tx, column);
        }
        TableCommand::SortColumn(column) => {
            let column = column.min(LeadField::COLUMNS.len() - 1);
            view_data.cursor_col = column;
            request_sort(state, view_data, internal_tx, column);
        }
        TableCommand::ToggleRow => {
            let Some(lead) = state
                .visible_rows()
                .get(view_data.cursor_row)
                .map(|lead| (*lead).clone())
            else {
                return;
            };
            state.dispatch(AppCommand::ToggleLead(lead));
        }
        TableCommand::ToggleAll => {
            let on = state.select_all_state() != SelectAllState::Checked;
            state.dispatch(AppCommand::SelectAll(on));
        }
        TableCommand::NextPage => {
            state.dispatch(AppCommand::NextPage);
        }
        TableCommand::PrevPage => {
            state.dispatch(AppCommand::PrevPage);
        }
        TableCommand::FirstPage => {
            state.dispatch(AppCommand::FirstPage);
        }
        TableCommand::LastPage => {
            state.dispatch(AppCommand::LastPage);
        }
        TableCommand::CyclePageSize => {
            state.dispatch(AppCommand::CyclePageSize);
            let size = state.pagination().page_size();
            emit_status(state, view_data, internal_tx, format!("rows per page: {size}"));
        }
        TableCommand::ToggleDensity => {
            state.dispatch(AppCommand::ToggleDensity);
            let label = state.density().label();
            emit_status(state, view_data, internal_tx, format!("density: {label}"));
        }
        TableCommand::Send => send_selection(state, runtime, view_data, internal_tx),
        TableCommand::TogglePreview => {
            view_data.preview_visible = !view_data.preview_visible;
        }
        TableCommand::ToggleHelp => {
            view_data.help_visible = !view_data.help_visible;
        }
    }
    clamp_cursor(state, view_data);
}

fn request_sort(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    column: usize,
) {
    let Some(field) = LeadField::COLUMNS.get(column).copied() else {
        return;
    };
    state.dispatch(AppCommand::RequestSort(field));
    let sort = state.sort();
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("sorted by {} {}", sort.field.label(), sort_mark(sort.direction)),
    );
}

/// Fire-and-forget: every press with a non-empty selection starts its own
/// request, even while an earlier one is still out.
fn send_selection<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.selection().is_empty() {
        return;
    }
    let leads = state.selection().leads().to_vec();
    view_data.last_send_id = view_data.last_send_id.saturating_add(1);
    let request_id = view_data.last_send_id;
    view_data.sends_in_flight += 1;
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("sending {} leads", leads.len()),
    );

    if let Err(error) = runtime.spawn_send_selection(request_id, leads, internal_tx.clone()) {
        view_data.sends_in_flight = view_data.sends_in_flight.saturating_sub(1);
        error!(request_id, error = %format!("{error:#}"), "send could not start");
    }
}

fn shift_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len - 1;
    current.saturating_add_signed(delta).min(max)
}

fn clamp_cursor(state: &AppState, view_data: &mut ViewData) {
    let rows = state.visible_rows().len();
    view_data.cursor_row = view_data.cursor_row.min(rows.saturating_sub(1));
}

const fn sort_mark(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => SORT_MARK_ASC,
        SortDirection::Desc => SORT_MARK_DESC,
    }
}

const fn select_all_checkbox(state: SelectAllState) -> &'static str {
    match state {
        SelectAllState::Unchecked => "[ ]",
        SelectAllState::Indeterminate => "[-]",
        SelectAllState::Checked => "[x]",
    }
}

const fn row_checkbox(selected: bool) -> &'static str {
    if selected { "[x]" } else { "[ ]" }
}

/// Blank line under each row in normal density, none when dense.
const fn row_margin(density: Density) -> u16 {
    match density {
        Density::Normal => 1,
        Density::Dense => 0,
    }
}

fn header_label(field: LeadField, sort: SortState) -> String {
    if sort.field == field {
        format!("{} {}", field.label(), sort_mark(sort.direction))
    } else {
        field.label().to_owned()
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state, view_data))
        .block(Block::default().title(APP_TITLE).borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    render_table(frame, layout[1], state, view_data);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, layout[2]);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if view_data.preview_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let preview = Paragraph::new(selection_preview_text(state))
            .block(Block::default().title("selected leads").borders(Borders::ALL));
        frame.render_widget(preview, area);
    }

    if view_data.help_visible {
        let area = centered_rect(64, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let sort = state.sort();
    let margin = row_margin(state.density());

    let mut header_cells = vec![Cell::from(select_all_checkbox(state.select_all_state()))];
    header_cells.extend(LeadField::COLUMNS.iter().enumerate().map(|(index, field)| {
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if index == view_data.cursor_col {
            style = style.fg(Color::Cyan);
        }
        Cell::from(header_label(*field, sort)).style(style)
    }));
    let header = Row::new(header_cells).bottom_margin(1);

    let visible = state.visible_rows();
    let mut table_state = TableState::default();
    if !visible.is_empty() {
        table_state.select(Some(view_data.cursor_row));
    }

    let mut rows = visible
        .into_iter()
        .enumerate()
        .map(|(index, lead)| {
            let mut cells = vec![Cell::from(row_checkbox(state.is_selected(lead)))];
            cells.extend(
                LeadField::COLUMNS
                    .iter()
                    .map(|field| Cell::from(lead.display(*field))),
            );
            let mut row = Row::new(cells).bottom_margin(margin);
            if index == view_data.cursor_row {
                row = row.style(Style::default().bg(Color::DarkGray));
            }
            row
        })
        .collect::<Vec<_>>();
    rows.extend((0..state.padding_rows()).map(|_| Row::new([Cell::from("")]).bottom_margin(margin)));

    let widths = [
        Constraint::Length(3),
        Constraint::Min(18),
        Constraint::Length(15),
        Constraint::Min(18),
        Constraint::Length(12),
        Constraint::Min(14),
        Constraint::Min(20),
        Constraint::Length(14),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(toolbar_text(state))
                .borders(Borders::ALL),
        );
    // The selected row keeps the cursor in view when a page is taller than
    // the terminal.
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn header_text(state: &AppState, view_data: &ViewData) -> String {
    match state.loaded() {
        Some(stamp) => format!(
            "{} leads | loaded from {} at {}",
            state.total(),
            stamp.source.label(),
            format_clock(stamp.at)
        ),
        None if view_data.loading => "loading leads...".to_owned(),
        None => "no leads loaded".to_owned(),
    }
}

fn format_clock(at: OffsetDateTime) -> String {
    format!("{:02}:{:02}:{:02} UTC", at.hour(), at.minute(), at.second())
}

fn toolbar_text(state: &AppState) -> String {
    match state.selection().len() {
        0 => "Select".to_owned(),
        selected => format!("{selected} selected | x send"),
    }
}

fn footer_text(state: &AppState) -> String {
    let pagination = state.pagination();
    let total = state.total();
    format!(
        "rows per page: {} | {} | page {}/{} | {}",
        pagination.page_size(),
        pagination.range_label(total),
        pagination.page() + 1,
        pagination.page_count(total).max(1),
        state.density().label()
    )
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible || view_data.preview_visible {
        return String::new();
    }

    let hints = "j/k rows | h/l s 1-7 sort | space a select | n/p g/G page | r rows | d density | x send | v view | ? help | q quit";
    let mut parts = Vec::new();
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    if view_data.sends_in_flight > 0 {
        parts.push(format!("{} in flight", view_data.sends_in_flight));
    }
    parts.push(hints.to_owned());
    parts.join(" | ")
}

fn selection_preview_text(state: &AppState) -> String {
    serde_json::to_string_pretty(state.selection().leads())
        .unwrap_or_else(|error| format!("selection cannot be shown: {error}"))
}

fn help_overlay_text() -> &'static str {
    "rows: j/k or up/down | columns: h/l or left/right\n\
sort: s sorts the cursor column | 1-7 sort by column number | again flips direction\n\
select: space toggles row | a selects all or none\n\
pages: n/p or pgdn/pgup | g/G first/last | r cycles rows per page\n\
view: d density | v selected leads as JSON\n\
send: x or enter posts the selection for approval\n\
quit: q or ctrl+c | ? or esc closes this help"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
