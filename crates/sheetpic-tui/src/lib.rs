// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs};
use sheetpic_app::{
    AppCommand, AppEvent, AppState, DialogOutcome, Dialogs, ExtractMode, FileFilter, OpenRequest,
    RunPhase, SaveRequest, StatusTone, TaskOutcome, ToolKind, ToolTask,
};
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

const PATH_SEPARATOR: char = ';';
const EMPTY_SHEETS_TEXT: &str = "No sheets found.";

/// Starts tool tasks off the UI thread.
///
/// Implementations report progress and the final outcome through `tx`.
pub trait AppRuntime {
    fn spawn_task(&mut self, task: ToolTask, tx: Sender<InternalEvent>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Progress { tool: ToolKind, phase: RunPhase },
    Finished(TaskOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Open,
    OpenMany,
    Save,
}

impl PromptKind {
    const fn hint(self) -> &'static str {
        match self {
            Self::Open => "enter a path",
            Self::OpenMany => "enter paths separated by ;",
            Self::Save => "enter the output path",
        }
    }
}

/// A file dialog waiting for an answer from the prompt overlay.
#[derive(Debug)]
pub struct DialogPrompt {
    pub kind: PromptKind,
    pub title: String,
    pub initial: String,
    pub filter: FileFilter,
    reply: oneshot::Sender<DialogOutcome<Vec<PathBuf>>>,
}

impl DialogPrompt {
    fn answer(self, outcome: DialogOutcome<Vec<PathBuf>>) {
        if self.reply.send(outcome).is_err() {
            debug!(title = %self.title, "dialog answered after its task ended");
        }
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    Task(TaskEvent),
    Dialog(DialogPrompt),
}

/// [`Dialogs`] backed by the in-terminal prompt overlay.
///
/// Each request is queued onto the UI channel and resolved when the user
/// submits or dismisses the prompt. A closed channel reads as a cancel.
#[derive(Debug, Clone)]
pub struct PromptDialogs {
    tx: Sender<InternalEvent>,
}

impl PromptDialogs {
    pub fn new(tx: Sender<InternalEvent>) -> Self {
        Self { tx }
    }

    async fn ask(
        &self,
        kind: PromptKind,
        title: String,
        initial: String,
        filter: FileFilter,
    ) -> DialogOutcome<Vec<PathBuf>> {
        let (reply, response) = oneshot::channel();
        let prompt = DialogPrompt {
            kind,
            title,
            initial,
            filter,
            reply,
        };
        if self.tx.send(InternalEvent::Dialog(prompt)).is_err() {
            warn!("prompt channel closed; treating dialog as cancelled");
            return DialogOutcome::Cancelled;
        }
        response.await.unwrap_or(DialogOutcome::Cancelled)
    }
}

fn first_path(outcome: DialogOutcome<Vec<PathBuf>>) -> DialogOutcome<PathBuf> {
    match outcome {
        DialogOutcome::Picked(paths) => match paths.into_iter().next() {
            Some(path) => DialogOutcome::Picked(path),
            None => DialogOutcome::Cancelled,
        },
        DialogOutcome::Cancelled => DialogOutcome::Cancelled,
    }
}

impl Dialogs for PromptDialogs {
    async fn pick_file(&self, request: OpenRequest) -> DialogOutcome<PathBuf> {
        let outcome = self
            .ask(PromptKind::Open, request.title, String::new(), request.filter)
            .await;
        first_path(outcome)
    }

    async fn pick_files(&self, request: OpenRequest) -> DialogOutcome<Vec<PathBuf>> {
        self.ask(
            PromptKind::OpenMany,
            request.title,
            String::new(),
            request.filter,
        )
        .await
    }

    async fn save_file(&self, request: SaveRequest) -> DialogOutcome<PathBuf> {
        let initial = request.default_path().display().to_string();
        let outcome = self
            .ask(PromptKind::Save, request.title, initial, request.filter)
            .await;
        first_path(outcome)
    }
}

#[derive(Debug)]
struct PromptUiState {
    prompt: DialogPrompt,
    input: String,
    hint: Option<String>,
}

#[derive(Debug, Default)]
struct ViewData {
    sheet_cursor: usize,
    editing_keyword: bool,
    help_visible: bool,
    prompt: Option<PromptUiState>,
    queued_prompts: VecDeque<DialogPrompt>,
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    internal_tx: Sender<InternalEvent>,
    internal_rx: Receiver<InternalEvent>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(100)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
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
            }
        }
    }

    close_prompts(&mut view_data);
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Channel carrying task progress and dialog prompts into [`run_app`].
pub fn internal_channel() -> (Sender<InternalEvent>, Receiver<InternalEvent>) {
    mpsc::channel()
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::Task(TaskEvent::Progress { tool, phase }) => {
                let events = state.dispatch(AppCommand::Progress { tool, phase });
                apply_view_events(state, view_data, &events);
            }
            InternalEvent::Task(TaskEvent::Finished(outcome)) => {
                debug!(
                    tool = outcome.tool().as_str(),
                    outcome = outcome.kind(),
                    "task finished"
                );
                let events = state.dispatch(AppCommand::Complete(outcome));
                apply_view_events(state, view_data, &events);
            }
            InternalEvent::Dialog(prompt) => open_prompt(view_data, prompt),
        }
    }
}

fn open_prompt(view_data: &mut ViewData, prompt: DialogPrompt) {
    if view_data.prompt.is_some() {
        view_data.queued_prompts.push_back(prompt);
        return;
    }
    view_data.editing_keyword = false;
    view_data.prompt = Some(PromptUiState {
        input: prompt.initial.clone(),
        prompt,
        hint: None,
    });
}

fn advance_prompt_queue(view_data: &mut ViewData) {
    if let Some(next) = view_data.queued_prompts.pop_front() {
        open_prompt(view_data, next);
    }
}

fn close_prompts(view_data: &mut ViewData) {
    if let Some(active) = view_data.prompt.take() {
        active.prompt.answer(DialogOutcome::Cancelled);
    }
    while let Some(queued) = view_data.queued_prompts.pop_front() {
        queued.answer(DialogOutcome::Cancelled);
    }
}

fn dispatch<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let mut pending = VecDeque::from(state.dispatch(command));
    while let Some(event) = pending.pop_front() {
        if let AppEvent::TaskRequested(task) = event {
            let name = task.name();
            if let Err(error) = runtime.spawn_task(task.clone(), internal_tx.clone()) {
                warn!(task = name, %error, "failed to start task");
                let outcome = task.failed(format!("could not start task: {error}"));
                pending.extend(state.dispatch(AppCommand::Complete(outcome)));
            }
        } else {
            apply_view_events(state, view_data, std::slice::from_ref(&event));
        }
    }
}

fn apply_view_events(state: &AppState, view_data: &mut ViewData, events: &[AppEvent]) {
    for event in events {
        match event {
            AppEvent::SheetsLoaded(_) => view_data.sheet_cursor = 0,
            AppEvent::SelectionChanged => {
                let len = state.extract.selection.len();
                if view_data.sheet_cursor >= len {
                    view_data.sheet_cursor = len.saturating_sub(1);
                }
            }
            AppEvent::ModeChanged(ExtractMode::Selection) | AppEvent::ToolChanged(_) => {
                view_data.editing_keyword = false;
            }
            _ => {}
        }
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.prompt.is_some() {
        handle_prompt_key(view_data, key);
        return false;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.editing_keyword {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => view_data.editing_keyword = false,
            KeyCode::Backspace => {
                dispatch(state, runtime, view_data, internal_tx, AppCommand::PopKeywordChar);
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                dispatch(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    AppCommand::PushKeywordChar(ch),
                );
            }
            _ => {}
        }
        return false;
    }

    let command = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        KeyCode::Tab => Some(AppCommand::NextTool),
        KeyCode::BackTab => Some(AppCommand::PrevTool),
        KeyCode::Char('1') => Some(AppCommand::SwitchTool(ToolKind::Extract)),
        KeyCode::Char('2') => Some(AppCommand::SwitchTool(ToolKind::Merge)),
        KeyCode::Char('3') => Some(AppCommand::SwitchTool(ToolKind::Macros)),
        KeyCode::Char('o') => Some(AppCommand::SelectSource),
        KeyCode::Char('r') | KeyCode::Enter => Some(AppCommand::Run),
        _ if state.active == ToolKind::Extract => extract_key_command(state, view_data, key),
        _ => None,
    };

    if let Some(command) = command {
        dispatch(state, runtime, view_data, internal_tx, command);
    }
    false
}

fn extract_key_command(
    state: &AppState,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Option<AppCommand> {
    let extract = &state.extract;
    match key.code {
        KeyCode::Char('m') => Some(AppCommand::ToggleMode),
        KeyCode::Char('i') | KeyCode::Char('/') if extract.keyword_visible() => {
            view_data.editing_keyword = true;
            None
        }
        KeyCode::Char('j') | KeyCode::Down if extract.selection_visible() => {
            if view_data.sheet_cursor + 1 < extract.selection.len() {
                view_data.sheet_cursor += 1;
            }
            None
        }
        KeyCode::Char('k') | KeyCode::Up if extract.selection_visible() => {
            view_data.sheet_cursor = view_data.sheet_cursor.saturating_sub(1);
            None
        }
        KeyCode::Char(' ') if extract.selection_visible() => {
            Some(AppCommand::ToggleSheet(view_data.sheet_cursor))
        }
        KeyCode::Char('a') if extract.selection_visible() => Some(AppCommand::CheckAllSheets),
        KeyCode::Char('n') if extract.selection_visible() => Some(AppCommand::ClearCheckedSheets),
        _ => None,
    }
}

fn handle_prompt_key(view_data: &mut ViewData, key: KeyEvent) {
    let Some(active) = view_data.prompt.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            if let Some(active) = view_data.prompt.take() {
                active.prompt.answer(DialogOutcome::Cancelled);
            }
            advance_prompt_queue(view_data);
        }
        KeyCode::Enter => {
            match parse_prompt_input(active.prompt.kind, &active.input, active.prompt.filter) {
                Ok(paths) => {
                    if let Some(active) = view_data.prompt.take() {
                        active.prompt.answer(DialogOutcome::Picked(paths));
                    }
                    advance_prompt_queue(view_data);
                }
                Err(hint) => active.hint = Some(hint),
            }
        }
        KeyCode::Backspace => {
            active.input.pop();
            active.hint = None;
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            active.input.clear();
            active.hint = None;
        }
        KeyCode::Char(ch) => {
            active.input.push(ch);
            active.hint = None;
        }
        _ => {}
    }
}

/// Validates what the user typed into a file prompt.
///
/// Open prompts require every path to match the filter. Save prompts gain
/// the filter's extension when none was typed.
fn parse_prompt_input(
    kind: PromptKind,
    input: &str,
    filter: FileFilter,
) -> Result<Vec<PathBuf>, String> {
    let entries: Vec<&str> = match kind {
        PromptKind::OpenMany => input
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect(),
        PromptKind::Open | PromptKind::Save => {
            let trimmed = input.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed]
            }
        }
    };
    if entries.is_empty() {
        return Err(format!("{}, or press esc to cancel", kind.hint()));
    }

    let mut paths = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut path = PathBuf::from(entry);
        if kind == PromptKind::Save && path.extension().is_none() {
            if let Some(extension) = filter.extensions.first() {
                path.set_extension(extension);
            }
        }
        if !filter.accepts(&path) {
            return Err(format!(
                "{entry} is not a {} file (.{})",
                filter.name,
                filter.extensions.join(", .")
            ));
        }
        paths.push(path);
    }
    Ok(paths)
}

fn tab_title(tool: ToolKind, state: &AppState) -> String {
    if state.phase(tool).is_idle() {
        tool.label().to_owned()
    } else {
        format!("{} *", tool.label())
    }
}

fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Muted => Color::Gray,
        StatusTone::Success => Color::Green,
        StatusTone::Error => Color::Red,
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let selected = ToolKind::ALL
        .iter()
        .position(|tool| *tool == state.active)
        .unwrap_or(0);
    let titles = ToolKind::ALL
        .iter()
        .map(|tool| tab_title(*tool, state))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("sheetpic").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let body = Paragraph::new(render_tool_text(state, view_data)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(state.active.label()),
    );
    frame.render_widget(body, layout[1]);

    let status = state.status(state.active);
    let status_widget = Paragraph::new(status.message.clone())
        .style(Style::default().fg(tone_color(status.tone)))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    let hints = Paragraph::new(hint_text(state, view_data))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, layout[3]);

    if let Some(active) = &view_data.prompt {
        let area = centered_rect(70, 30, frame.area());
        frame.render_widget(Clear, area);
        let prompt = Paragraph::new(render_prompt_text(active)).block(
            Block::default()
                .title(active.prompt.title.clone())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(prompt, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn display_path(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "(none)".to_owned(), |path| path.display().to_string())
}

fn run_line(state: &AppState, tool: ToolKind) -> String {
    let phase = state.phase(tool);
    if !phase.is_idle() {
        return format!("run: busy ({})", phase.label());
    }
    if state.can_run(tool) {
        "run: ready (r)".to_owned()
    } else {
        "run: disabled".to_owned()
    }
}

fn render_tool_text(state: &AppState, view_data: &ViewData) -> String {
    match state.active {
        ToolKind::Extract => render_extract_text(state, view_data),
        ToolKind::Merge => render_merge_text(state),
        ToolKind::Macros => render_macros_text(state),
    }
}

fn render_extract_text(state: &AppState, view_data: &ViewData) -> String {
    let extract = &state.extract;
    let mut lines = vec![format!("file: {}", display_path(extract.file_path.as_ref()))];

    let radio = |mode: ExtractMode| if extract.mode == mode { "(x)" } else { "( )" };
    lines.push(format!(
        "mode: {} keyword  {} selection",
        radio(ExtractMode::Keyword),
        radio(ExtractMode::Selection)
    ));
    lines.push(String::new());

    if extract.keyword_visible() {
        let cursor = if view_data.editing_keyword { "_" } else { "" };
        lines.push(format!("keyword: {}{cursor}", extract.keyword));
    }

    if extract.selection_visible() {
        lines.push(format!(
            "sheets ({} of {} checked):",
            extract.selection.checked_count(),
            extract.selection.len()
        ));
        if extract.file_path.is_none() {
            lines.push("  choose a workbook with o".to_owned());
        } else if extract.selection.is_empty() {
            lines.push(format!("  {EMPTY_SHEETS_TEXT}"));
        } else {
            for (index, sheet) in extract.selection.sheets().iter().enumerate() {
                let pointer = if index == view_data.sheet_cursor { ">" } else { " " };
                let mark = if extract.selection.is_checked(index) {
                    "[x]"
                } else {
                    "[ ]"
                };
                lines.push(format!("{pointer} {mark} {sheet}"));
            }
        }
    }

    lines.push(String::new());
    lines.push(run_line(state, ToolKind::Extract));
    lines.join("\n")
}

fn render_merge_text(state: &AppState) -> String {
    let mut lines = vec![format!("workbooks ({}):", state.merge.paths.len())];
    if state.merge.paths.is_empty() {
        lines.push("  choose workbooks with o".to_owned());
    }
    for (index, path) in state.merge.paths.iter().enumerate() {
        lines.push(format!("  {}. {}", index + 1, path.display()));
    }
    lines.push(String::new());
    lines.push(run_line(state, ToolKind::Merge));
    lines.join("\n")
}

fn render_macros_text(state: &AppState) -> String {
    [
        format!("file: {}", display_path(state.macros.file_path.as_ref())),
        String::new(),
        run_line(state, ToolKind::Macros),
    ]
    .join("\n")
}

fn render_prompt_text(active: &PromptUiState) -> String {
    let filter = &active.prompt.filter;
    let mut lines = vec![
        format!(
            "{} (.{})",
            filter.name,
            filter.extensions.join(", .")
        ),
        String::new(),
        format!("> {}_", active.input),
        String::new(),
    ];
    match &active.hint {
        Some(hint) => lines.push(hint.clone()),
        None => lines.push(format!("{} | enter ok | esc cancel", active.prompt.kind.hint())),
    }
    lines.join("\n")
}

fn hint_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.prompt.is_some() || view_data.help_visible {
        return String::new();
    }
    if view_data.editing_keyword {
        return "type keyword | enter/esc done".to_owned();
    }
    let mut hints = vec!["tab/1-3 tool", "o open", "r run"];
    if state.active == ToolKind::Extract {
        hints.push("m mode");
        if state.extract.keyword_visible() {
            hints.push("i keyword");
        } else {
            hints.push("j/k space a/n sheets");
        }
    }
    hints.extend(["? help", "q quit"]);
    hints.join(" | ")
}

fn help_overlay_text() -> &'static str {
    "global: tab/shift+tab or 1/2/3 switch tool | o choose file(s) | r or enter run | q quit\n\
extract: m toggle keyword/selection | i edit keyword (enter/esc done)\n\
extract sheets: j/k move | space toggle | a check all | n clear\n\
prompt: type path | ; separates merge paths | ctrl+u clear | enter ok | esc cancel\n\
help: ? or esc close"
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

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, DialogPrompt, EMPTY_SHEETS_TEXT, InternalEvent, PromptDialogs, PromptKind,
        TaskEvent, ViewData, handle_key_event, help_overlay_text, hint_text, internal_channel,
        parse_prompt_input, process_internal_events, render_extract_text, render_merge_text,
        render_prompt_text, run_line,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use sheetpic_app::{
        AppState, DialogOutcome, Dialogs, ExtractMode, FileFilter, LoadedWorkbook, OpenRequest,
        RunOutcome, RunPhase, SaveRequest, StatusTone, TaskOutcome, ToolKind, ToolTask,
    };
    use std::path::PathBuf;
    use std::sync::mpsc::{Receiver, Sender};

    #[derive(Debug, Default)]
    struct TestRuntime {
        spawned: Vec<ToolTask>,
        fail_spawn: bool,
    }

    impl AppRuntime for TestRuntime {
        fn spawn_task(&mut self, task: ToolTask, _tx: Sender<InternalEvent>) -> anyhow::Result<()> {
            if self.fail_spawn {
                anyhow::bail!("runtime is shutting down");
            }
            self.spawned.push(task);
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        codes: &[KeyCode],
    ) -> bool {
        let mut quit = false;
        for code in codes {
            quit = handle_key_event(state, runtime, view_data, tx, key(*code));
        }
        quit
    }

    fn loaded_state(sheets: &[&str]) -> AppState {
        let mut state = AppState::default();
        state.extract.file_path = Some(PathBuf::from("/books/q1.xlsx"));
        state
            .extract
            .selection
            .replace(sheets.iter().map(|sheet| (*sheet).to_owned()).collect());
        state
    }

    type PromptReply = tokio::sync::oneshot::Receiver<DialogOutcome<Vec<PathBuf>>>;

    fn prompt(kind: PromptKind) -> (DialogPrompt, PromptReply) {
        let (reply, response) = tokio::sync::oneshot::channel();
        let prompt = DialogPrompt {
            kind,
            title: "Choose".to_owned(),
            initial: String::new(),
            filter: FileFilter::WORKBOOK,
            reply,
        };
        (prompt, response)
    }

    fn drain(state: &mut AppState, view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
        process_internal_events(state, view_data, rx);
    }

    #[test]
    fn tab_and_number_keys_switch_tools() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Tab]);
        assert_eq!(state.active, ToolKind::Merge);
        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::BackTab, KeyCode::BackTab]);
        assert_eq!(state.active, ToolKind::Macros);
        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('1')]);
        assert_eq!(state.active, ToolKind::Extract);
    }

    #[test]
    fn q_quits_outside_text_entry_only() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        let codes = [KeyCode::Char('i'), KeyCode::Char('q')];
        let quit = press(&mut state, &mut runtime, &mut view_data, &tx, &codes);
        assert!(!quit);
        assert_eq!(state.extract.keyword, "q");

        let codes = [KeyCode::Esc, KeyCode::Char('q')];
        let quit = press(&mut state, &mut runtime, &mut view_data, &tx, &codes);
        assert!(quit);
    }

    #[test]
    fn keyword_editing_pushes_and_pops_characters() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Char('/'),
                KeyCode::Char('Q'),
                KeyCode::Char('1'),
                KeyCode::Char('x'),
                KeyCode::Backspace,
                KeyCode::Enter,
            ],
        );
        assert_eq!(state.extract.keyword, "Q1");
        assert!(!view_data.editing_keyword);
        assert_eq!(state.active, ToolKind::Extract);
    }

    #[test]
    fn open_key_requests_source_task_for_active_tool() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('2'), KeyCode::Char('o')]);
        assert_eq!(runtime.spawned, vec![ToolTask::SelectMergeSources]);
        assert_eq!(state.merge.phase, RunPhase::ChoosingSource);

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('o')]);
        assert_eq!(runtime.spawned.len(), 1, "busy tool ignores a second open");
    }

    #[test]
    fn failed_spawn_returns_tool_to_idle_with_error() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime {
            fail_spawn: true,
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('o')]);
        assert!(state.extract.phase.is_idle());
        assert_eq!(state.extract.status.tone, StatusTone::Error);
        assert!(state.extract.status.message.contains("runtime is shutting down"));
    }

    #[test]
    fn run_without_workbook_reports_validation_error() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('r')]);
        assert!(runtime.spawned.is_empty());
        assert_eq!(state.extract.status.message, "Select an Excel file first.");
    }

    #[test]
    fn checklist_keys_move_cursor_and_toggle() {
        let mut state = loaded_state(&["Jan", "Feb", "Mar"]);
        state.extract.mode = ExtractMode::Selection;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            &[
                KeyCode::Char('j'),
                KeyCode::Char('j'),
                KeyCode::Char('j'),
                KeyCode::Char(' '),
                KeyCode::Char('k'),
            ],
        );
        assert_eq!(view_data.sheet_cursor, 1);
        assert_eq!(state.extract.selection.checked_sheets(), vec!["Mar"]);

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('a')]);
        assert_eq!(state.extract.selection.checked_count(), 3);
        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('n')]);
        assert_eq!(state.extract.selection.checked_count(), 0);
    }

    #[test]
    fn mode_toggle_hides_keyword_editor() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('m')]);
        assert_eq!(state.extract.mode, ExtractMode::Selection);
        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Char('i')]);
        assert!(!view_data.editing_keyword);
    }

    #[test]
    fn finished_source_task_resets_cursor() {
        let mut state = loaded_state(&["A", "B", "C"]);
        let mut view_data = ViewData {
            sheet_cursor: 2,
            ..ViewData::default()
        };
        let (tx, rx) = internal_channel();

        tx.send(InternalEvent::Task(TaskEvent::Finished(TaskOutcome::ExtractSource(
            RunOutcome::Completed(LoadedWorkbook {
                path: PathBuf::from("/books/q2.xlsx"),
                sheets: vec!["Only".to_owned()],
            }),
        ))))
        .expect("send");
        drain(&mut state, &mut view_data, &rx);

        assert_eq!(view_data.sheet_cursor, 0);
        assert_eq!(state.extract.file_path, Some(PathBuf::from("/books/q2.xlsx")));
    }

    #[test]
    fn progress_events_update_phase_and_status() {
        let mut state = AppState::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        tx.send(InternalEvent::Task(TaskEvent::Progress {
            tool: ToolKind::Merge,
            phase: RunPhase::Invoking,
        }))
        .expect("send");
        drain(&mut state, &mut view_data, &rx);

        assert_eq!(state.merge.phase, RunPhase::Invoking);
        assert_eq!(state.merge.status.message, "Merging...");
        assert!(run_line(&state, ToolKind::Merge).contains("busy"));
    }

    #[test]
    fn prompt_enter_answers_with_typed_path() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();
        let (dialog, mut response) = prompt(PromptKind::Open);
        tx.send(InternalEvent::Dialog(dialog)).expect("send");
        drain(&mut state, &mut view_data, &rx);

        let mut codes: Vec<KeyCode> = "a.xlsx".chars().map(KeyCode::Char).collect();
        codes.push(KeyCode::Enter);
        let quit = press(&mut state, &mut runtime, &mut view_data, &tx, &codes);

        assert!(!quit);
        assert!(view_data.prompt.is_none());
        assert_eq!(
            response.try_recv().expect("answered"),
            DialogOutcome::Picked(vec![PathBuf::from("a.xlsx")])
        );
        assert_eq!(state.active, ToolKind::Extract);
    }

    #[test]
    fn prompt_rejects_wrong_extension_in_place() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();
        let (dialog, mut response) = prompt(PromptKind::Open);
        tx.send(InternalEvent::Dialog(dialog)).expect("send");
        drain(&mut state, &mut view_data, &rx);

        let mut codes: Vec<KeyCode> = "notes.txt".chars().map(KeyCode::Char).collect();
        codes.push(KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, &tx, &codes);

        let active = view_data.prompt.as_ref().expect("prompt stays open");
        assert!(active.hint.as_deref().is_some_and(|hint| hint.contains("notes.txt")));
        assert!(render_prompt_text(active).contains("not a Excel file"));
        assert!(response.try_recv().is_err());

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Esc]);
        assert_eq!(response.try_recv().expect("answered"), DialogOutcome::Cancelled);
    }

    #[test]
    fn queued_prompts_open_in_order() {
        let mut state = AppState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();
        let (first, mut first_response) = prompt(PromptKind::Open);
        let (mut second, _second_response) = prompt(PromptKind::Save);
        second.title = "Save".to_owned();
        tx.send(InternalEvent::Dialog(first)).expect("send");
        tx.send(InternalEvent::Dialog(second)).expect("send");
        drain(&mut state, &mut view_data, &rx);
        assert_eq!(view_data.queued_prompts.len(), 1);

        press(&mut state, &mut runtime, &mut view_data, &tx, &[KeyCode::Esc]);
        assert_eq!(first_response.try_recv().expect("answered"), DialogOutcome::Cancelled);
        let active = view_data.prompt.as_ref().expect("second prompt");
        assert_eq!(active.prompt.title, "Save");
    }

    #[test]
    fn prompt_input_parsing_rules() {
        assert_eq!(
            parse_prompt_input(PromptKind::OpenMany, " c.xlsx ; a.xlsx;;b.XLSX ", FileFilter::WORKBOOK),
            Ok(vec![
                PathBuf::from("c.xlsx"),
                PathBuf::from("a.xlsx"),
                PathBuf::from("b.XLSX"),
            ])
        );
        assert!(parse_prompt_input(PromptKind::Open, "   ", FileFilter::WORKBOOK).is_err());
        assert!(parse_prompt_input(PromptKind::OpenMany, ";", FileFilter::WORKBOOK).is_err());
        assert_eq!(
            parse_prompt_input(PromptKind::Save, "/out/result", FileFilter::WORKBOOK),
            Ok(vec![PathBuf::from("/out/result.xlsx")])
        );
        assert!(parse_prompt_input(PromptKind::Save, "/out/result.csv", FileFilter::WORKBOOK).is_err());
        assert!(parse_prompt_input(PromptKind::Open, "m.xlsm", FileFilter::MACRO_WORKBOOK).is_ok());
    }

    #[test]
    fn extract_text_shows_checklist_and_empty_state() {
        let mut state = loaded_state(&["Jan", "Feb"]);
        state.extract.mode = ExtractMode::Selection;
        state.extract.selection.toggle(1);
        let view_data = ViewData::default();

        let text = render_extract_text(&state, &view_data);
        assert!(text.contains("> [ ] Jan"));
        assert!(text.contains("  [x] Feb"));
        assert!(text.contains("(1 of 2 checked)"));
        assert!(!text.contains("keyword:"));
        assert!(text.contains("run: ready"));

        let mut empty = loaded_state(&[]);
        empty.extract.mode = ExtractMode::Selection;
        assert!(render_extract_text(&empty, &view_data).contains(EMPTY_SHEETS_TEXT));
    }

    #[test]
    fn keyword_mode_hides_checklist() {
        let state = loaded_state(&["Jan"]);
        let view_data = ViewData {
            editing_keyword: true,
            ..ViewData::default()
        };
        let text = render_extract_text(&state, &view_data);
        assert!(text.contains("keyword: _"));
        assert!(!text.contains("[ ] Jan"));
        assert!(text.contains("run: ready"));
    }

    #[test]
    fn merge_text_lists_paths_in_order() {
        let mut state = AppState::default();
        state.merge.paths = vec![PathBuf::from("b.xlsx"), PathBuf::from("a.xlsx")];
        let text = render_merge_text(&state);
        let b = text.find("1. b.xlsx").expect("first path");
        let a = text.find("2. a.xlsx").expect("second path");
        assert!(b < a);
        assert!(text.contains("run: ready"));
    }

    #[test]
    fn hints_follow_context() {
        let mut state = AppState::default();
        let mut view_data = ViewData::default();
        assert!(hint_text(&state, &view_data).contains("i keyword"));
        state.extract.mode = ExtractMode::Selection;
        assert!(hint_text(&state, &view_data).contains("space"));
        view_data.help_visible = true;
        assert!(hint_text(&state, &view_data).is_empty());
        assert!(help_overlay_text().contains("; separates merge paths"));
    }

    #[tokio::test]
    async fn prompt_dialogs_round_trip_through_channel() {
        let (tx, rx) = internal_channel();
        let dialogs = PromptDialogs::new(tx);

        let answer = tokio::spawn(async move {
            let event = tokio::task::spawn_blocking(move || rx.recv())
                .await
                .expect("join")
                .expect("prompt");
            let InternalEvent::Dialog(prompt) = event else {
                panic!("expected a dialog prompt");
            };
            assert_eq!(prompt.kind, PromptKind::Save);
            assert_eq!(prompt.initial, "/books/merged.xlsx");
            prompt.answer(DialogOutcome::Picked(vec![PathBuf::from("/books/out.xlsx")]));
        });

        let picked = dialogs
            .save_file(SaveRequest {
                title: "Save merged workbook".to_owned(),
                directory: Some(PathBuf::from("/books")),
                file_name: "merged.xlsx".to_owned(),
                filter: FileFilter::WORKBOOK,
            })
            .await;
        answer.await.expect("answer task");
        assert_eq!(picked, DialogOutcome::Picked(PathBuf::from("/books/out.xlsx")));
    }

    #[tokio::test]
    async fn prompt_dialogs_cancel_when_ui_is_gone() {
        let (tx, rx) = internal_channel();
        drop(rx);
        let dialogs = PromptDialogs::new(tx);
        let outcome = dialogs
            .pick_file(OpenRequest {
                title: "Open".to_owned(),
                filter: FileFilter::WORKBOOK,
            })
            .await;
        assert_eq!(outcome, DialogOutcome::Cancelled);
    }
}
