// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{
    ExtractMode, ExtractTool, MacroTool, MergeTool, RunOutcome, RunPhase, StatusEntry, TaskOutcome,
    ToolKind, ToolTask,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub active: ToolKind,
    pub extract: ExtractTool,
    pub merge: MergeTool,
    pub macros: MacroTool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    SwitchTool(ToolKind),
    NextTool,
    PrevTool,
    SetMode(ExtractMode),
    ToggleMode,
    SetKeyword(String),
    PushKeywordChar(char),
    PopKeywordChar,
    ToggleSheet(usize),
    CheckAllSheets,
    ClearCheckedSheets,
    SelectSource,
    Run,
    Progress { tool: ToolKind, phase: RunPhase },
    Complete(TaskOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ToolChanged(ToolKind),
    ModeChanged(ExtractMode),
    KeywordChanged(String),
    SelectionChanged,
    SheetsLoaded(usize),
    PhaseChanged { tool: ToolKind, phase: RunPhase },
    StatusUpdated { tool: ToolKind, status: StatusEntry },
    TaskRequested(ToolTask),
}

impl AppState {
    pub fn new(active: ToolKind, mode: ExtractMode) -> Self {
        Self {
            active,
            extract: ExtractTool::with_mode(mode),
            ..Self::default()
        }
    }

    pub fn status(&self, tool: ToolKind) -> &StatusEntry {
        match tool {
            ToolKind::Extract => &self.extract.status,
            ToolKind::Merge => &self.merge.status,
            ToolKind::Macros => &self.macros.status,
        }
    }

    pub fn phase(&self, tool: ToolKind) -> RunPhase {
        match tool {
            ToolKind::Extract => self.extract.phase,
            ToolKind::Merge => self.merge.phase,
            ToolKind::Macros => self.macros.phase,
        }
    }

    pub fn can_run(&self, tool: ToolKind) -> bool {
        match tool {
            ToolKind::Extract => self.extract.can_run(),
            ToolKind::Merge => self.merge.can_run(),
            ToolKind::Macros => self.macros.can_run(),
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::SwitchTool(tool) => {
                self.active = tool;
                vec![AppEvent::ToolChanged(tool)]
            }
            AppCommand::NextTool => self.rotate_tool(1),
            AppCommand::PrevTool => self.rotate_tool(-1),
            AppCommand::SetMode(mode) => {
                self.extract.mode = mode;
                vec![AppEvent::ModeChanged(mode)]
            }
            AppCommand::ToggleMode => {
                self.extract.mode = self.extract.mode.toggled();
                vec![AppEvent::ModeChanged(self.extract.mode)]
            }
            AppCommand::SetKeyword(keyword) => {
                self.extract.keyword = keyword;
                vec![AppEvent::KeywordChanged(self.extract.keyword.clone())]
            }
            AppCommand::PushKeywordChar(ch) => {
                self.extract.keyword.push(ch);
                vec![AppEvent::KeywordChanged(self.extract.keyword.clone())]
            }
            AppCommand::PopKeywordChar => {
                if self.extract.keyword.pop().is_none() {
                    return Vec::new();
                }
                vec![AppEvent::KeywordChanged(self.extract.keyword.clone())]
            }
            AppCommand::ToggleSheet(index) => {
                if self.extract.selection.toggle(index) {
                    vec![AppEvent::SelectionChanged]
                } else {
                    Vec::new()
                }
            }
            AppCommand::CheckAllSheets => {
                self.extract.selection.check_all();
                vec![AppEvent::SelectionChanged]
            }
            AppCommand::ClearCheckedSheets => {
                self.extract.selection.clear_checks();
                vec![AppEvent::SelectionChanged]
            }
            AppCommand::SelectSource => self.select_source(self.active),
            AppCommand::Run => self.run(self.active),
            AppCommand::Progress { tool, phase } => self.progress(tool, phase),
            AppCommand::Complete(outcome) => self.complete(outcome),
        }
    }

    fn rotate_tool(&mut self, delta: isize) -> Vec<AppEvent> {
        let tools = ToolKind::ALL;
        let current = tools
            .iter()
            .position(|tool| *tool == self.active)
            .unwrap_or(0) as isize;
        let len = tools.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active = tools[next];
        vec![AppEvent::ToolChanged(self.active)]
    }

    fn select_source(&mut self, tool: ToolKind) -> Vec<AppEvent> {
        if !self.phase(tool).is_idle() {
            debug!(tool = tool.as_str(), "source selection ignored while busy");
            return Vec::new();
        }
        let task = match tool {
            ToolKind::Extract => ToolTask::SelectExtractSource,
            ToolKind::Merge => ToolTask::SelectMergeSources,
            ToolKind::Macros => ToolTask::SelectMacroSource,
        };
        let mut events = self.set_phase(tool, RunPhase::ChoosingSource);
        events.push(self.set_status(tool, StatusEntry::muted("Choosing a file...")));
        events.push(AppEvent::TaskRequested(task));
        events
    }

    fn run(&mut self, tool: ToolKind) -> Vec<AppEvent> {
        if !self.phase(tool).is_idle() {
            debug!(tool = tool.as_str(), "run ignored while busy");
            return Vec::new();
        }
        let planned = match tool {
            ToolKind::Extract => self.extract.plan().map(ToolTask::Extract),
            ToolKind::Merge => self.merge.plan().map(ToolTask::Merge),
            ToolKind::Macros => self.macros.plan().map(ToolTask::RemoveMacros),
        };
        match planned {
            Ok(task) => {
                let mut events = self.set_phase(tool, RunPhase::ChoosingOutput);
                events.push(self.set_status(tool, StatusEntry::muted("Choosing a destination...")));
                events.push(AppEvent::TaskRequested(task));
                events
            }
            Err(error) => {
                debug!(tool = tool.as_str(), %error, "run rejected by validation");
                vec![self.set_status(tool, StatusEntry::error(error.to_string()))]
            }
        }
    }

    fn progress(&mut self, tool: ToolKind, phase: RunPhase) -> Vec<AppEvent> {
        debug!(tool = tool.as_str(), phase = phase.label(), "phase changed");
        let message = match (tool, phase) {
            (_, RunPhase::LoadingSheets) => "Loading sheets...",
            (ToolKind::Extract, RunPhase::Invoking) => "Extracting...",
            (ToolKind::Merge, RunPhase::Invoking) => "Merging...",
            (ToolKind::Macros, RunPhase::Invoking) => "Removing macros...",
            _ => return self.set_phase(tool, phase),
        };
        let mut events = self.set_phase(tool, phase);
        events.push(self.set_status(tool, StatusEntry::muted(message)));
        events
    }

    fn complete(&mut self, outcome: TaskOutcome) -> Vec<AppEvent> {
        let tool = outcome.tool();
        let mut events = Vec::new();
        let status = match outcome {
            TaskOutcome::ExtractSource(outcome) => {
                let loaded = matches!(outcome, RunOutcome::Completed(_));
                let status = self.extract.apply_source(outcome);
                if loaded {
                    events.push(AppEvent::SheetsLoaded(self.extract.selection.len()));
                    events.push(AppEvent::SelectionChanged);
                }
                status
            }
            TaskOutcome::MergeSources(outcome) => self.merge.apply_sources(outcome),
            TaskOutcome::MacroSource(outcome) => self.macros.apply_source(outcome),
            TaskOutcome::Extracted(outcome) => self.extract.apply_run(outcome),
            TaskOutcome::Merged(outcome) => self.merge.apply_run(outcome),
            TaskOutcome::MacrosRemoved(outcome) => self.macros.apply_run(outcome),
        };
        events.extend(self.set_phase(tool, RunPhase::Idle));
        events.push(self.set_status(tool, status));
        events
    }

    fn set_phase(&mut self, tool: ToolKind, phase: RunPhase) -> Vec<AppEvent> {
        let slot = match tool {
            ToolKind::Extract => &mut self.extract.phase,
            ToolKind::Merge => &mut self.merge.phase,
            ToolKind::Macros => &mut self.macros.phase,
        };
        if *slot == phase {
            return Vec::new();
        }
        *slot = phase;
        vec![AppEvent::PhaseChanged { tool, phase }]
    }

    fn set_status(&mut self, tool: ToolKind, status: StatusEntry) -> AppEvent {
        let slot = match tool {
            ToolKind::Extract => &mut self.extract.status,
            ToolKind::Merge => &mut self.merge.status,
            ToolKind::Macros => &mut self.macros.status,
        };
        *slot = status.clone();
        AppEvent::StatusUpdated { tool, status }
    }
}
