// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{FileFilter, RunPhase, ToolKind};

/// Failure reported by the workbook engine. The message is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The external component that reads and writes workbooks.
pub trait WorkbookEngine: Send + Sync {
    fn load_sheets(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;

    fn extract_by_keyword(
        &self,
        path: &Path,
        keyword: &str,
        output: &Path,
    ) -> impl Future<Output = Result<usize, EngineError>> + Send;

    fn extract_by_selection(
        &self,
        path: &Path,
        sheets: &[String],
        output: &Path,
    ) -> impl Future<Output = Result<usize, EngineError>> + Send;

    fn merge_workbooks(
        &self,
        paths: &[PathBuf],
        output: &Path,
    ) -> impl Future<Output = Result<usize, EngineError>> + Send;

    fn remove_macro(
        &self,
        path: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub title: String,
    pub filter: FileFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub title: String,
    pub directory: Option<PathBuf>,
    pub file_name: String,
    pub filter: FileFilter,
}

impl SaveRequest {
    /// The path a user gets by accepting the dialog without edits.
    pub fn default_path(&self) -> PathBuf {
        match &self.directory {
            Some(directory) => directory.join(&self.file_name),
            None => PathBuf::from(&self.file_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome<T> {
    Picked(T),
    Cancelled,
}

/// Modal file pickers. Cancellation is a distinct outcome, never an empty value.
pub trait Dialogs: Send + Sync {
    fn pick_file(&self, request: OpenRequest) -> impl Future<Output = DialogOutcome<PathBuf>> + Send;

    fn pick_files(
        &self,
        request: OpenRequest,
    ) -> impl Future<Output = DialogOutcome<Vec<PathBuf>>> + Send;

    fn save_file(&self, request: SaveRequest) -> impl Future<Output = DialogOutcome<PathBuf>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    Completed(T),
    Cancelled,
    Failed(String),
}

impl<T> RunOutcome<T> {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

impl<T> From<Result<T, EngineError>> for RunOutcome<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) => Self::Failed(error.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractParameter {
    Keyword(String),
    Sheets(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractPlan {
    pub source: PathBuf,
    pub parameter: ExtractParameter,
    pub save: SaveRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub paths: Vec<PathBuf>,
    pub save: SaveRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroPlan {
    pub source: PathBuf,
    pub save: SaveRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedWorkbook {
    pub path: PathBuf,
    pub sheets: Vec<String>,
}

/// One asynchronous action requested by the state layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolTask {
    SelectExtractSource,
    SelectMergeSources,
    SelectMacroSource,
    Extract(ExtractPlan),
    Merge(MergePlan),
    RemoveMacros(MacroPlan),
}

impl ToolTask {
    pub const fn tool(&self) -> ToolKind {
        match self {
            Self::SelectExtractSource | Self::Extract(_) => ToolKind::Extract,
            Self::SelectMergeSources | Self::Merge(_) => ToolKind::Merge,
            Self::SelectMacroSource | Self::RemoveMacros(_) => ToolKind::Macros,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectExtractSource => "select_extract_source",
            Self::SelectMergeSources => "select_merge_sources",
            Self::SelectMacroSource => "select_macro_source",
            Self::Extract(_) => "extract",
            Self::Merge(_) => "merge",
            Self::RemoveMacros(_) => "remove_macros",
        }
    }

    /// The outcome to report when the task could not be started at all.
    pub fn failed(&self, message: impl Into<String>) -> TaskOutcome {
        let message = message.into();
        match self {
            Self::SelectExtractSource => TaskOutcome::ExtractSource(RunOutcome::Failed(message)),
            Self::SelectMergeSources => TaskOutcome::MergeSources(RunOutcome::Failed(message)),
            Self::SelectMacroSource => TaskOutcome::MacroSource(RunOutcome::Failed(message)),
            Self::Extract(_) => TaskOutcome::Extracted(RunOutcome::Failed(message)),
            Self::Merge(_) => TaskOutcome::Merged(RunOutcome::Failed(message)),
            Self::RemoveMacros(_) => TaskOutcome::MacrosRemoved(RunOutcome::Failed(message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    ExtractSource(RunOutcome<LoadedWorkbook>),
    MergeSources(RunOutcome<Vec<PathBuf>>),
    MacroSource(RunOutcome<PathBuf>),
    Extracted(RunOutcome<usize>),
    Merged(RunOutcome<usize>),
    MacrosRemoved(RunOutcome<()>),
}

impl TaskOutcome {
    pub const fn tool(&self) -> ToolKind {
        match self {
            Self::ExtractSource(_) | Self::Extracted(_) => ToolKind::Extract,
            Self::MergeSources(_) | Self::Merged(_) => ToolKind::Merge,
            Self::MacroSource(_) | Self::MacrosRemoved(_) => ToolKind::Macros,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ExtractSource(outcome) => outcome.kind(),
            Self::MergeSources(outcome) => outcome.kind(),
            Self::MacroSource(outcome) => outcome.kind(),
            Self::Extracted(outcome) => outcome.kind(),
            Self::Merged(outcome) => outcome.kind(),
            Self::MacrosRemoved(outcome) => outcome.kind(),
        }
    }
}

/// Drives one task to completion. `progress` observes phase changes that
/// happen after the task started.
pub async fn run_task<E, D, F>(task: ToolTask, engine: &E, dialogs: &D, mut progress: F) -> TaskOutcome
where
    E: WorkbookEngine,
    D: Dialogs,
    F: FnMut(RunPhase) + Send,
{
    let tool = task.tool();
    let name = task.name();
    debug!(tool = tool.as_str(), task = name, "task started");

    let outcome = match task {
        ToolTask::SelectExtractSource => {
            TaskOutcome::ExtractSource(select_extract_source(engine, dialogs, &mut progress).await)
        }
        ToolTask::SelectMergeSources => TaskOutcome::MergeSources(select_merge_sources(dialogs).await),
        ToolTask::SelectMacroSource => TaskOutcome::MacroSource(select_macro_source(dialogs).await),
        ToolTask::Extract(plan) => {
            TaskOutcome::Extracted(run_extract(plan, engine, dialogs, &mut progress).await)
        }
        ToolTask::Merge(plan) => {
            TaskOutcome::Merged(run_merge(plan, engine, dialogs, &mut progress).await)
        }
        ToolTask::RemoveMacros(plan) => {
            TaskOutcome::MacrosRemoved(run_macro_removal(plan, engine, dialogs, &mut progress).await)
        }
    };

    match &outcome {
        TaskOutcome::ExtractSource(RunOutcome::Failed(error))
        | TaskOutcome::MergeSources(RunOutcome::Failed(error))
        | TaskOutcome::MacroSource(RunOutcome::Failed(error))
        | TaskOutcome::Extracted(RunOutcome::Failed(error))
        | TaskOutcome::Merged(RunOutcome::Failed(error))
        | TaskOutcome::MacrosRemoved(RunOutcome::Failed(error)) => {
            warn!(tool = tool.as_str(), task = name, %error, "task failed");
        }
        other => {
            info!(tool = tool.as_str(), task = name, outcome = other.kind(), "task finished");
        }
    }
    outcome
}

pub async fn select_extract_source<E, D, F>(
    engine: &E,
    dialogs: &D,
    progress: &mut F,
) -> RunOutcome<LoadedWorkbook>
where
    E: WorkbookEngine,
    D: Dialogs,
    F: FnMut(RunPhase) + Send,
{
    let request = OpenRequest {
        title: "Select a workbook".to_owned(),
        filter: FileFilter::WORKBOOK,
    };
    let path = match dialogs.pick_file(request).await {
        DialogOutcome::Picked(path) => path,
        DialogOutcome::Cancelled => return RunOutcome::Cancelled,
    };

    progress(RunPhase::LoadingSheets);
    match engine.load_sheets(&path).await {
        Ok(sheets) => RunOutcome::Completed(LoadedWorkbook { path, sheets }),
        Err(error) => RunOutcome::Failed(error.message),
    }
}

pub async fn select_merge_sources<D: Dialogs>(dialogs: &D) -> RunOutcome<Vec<PathBuf>> {
    let request = OpenRequest {
        title: "Select workbooks to merge".to_owned(),
        filter: FileFilter::WORKBOOK,
    };
    match dialogs.pick_files(request).await {
        DialogOutcome::Picked(paths) if paths.is_empty() => RunOutcome::Cancelled,
        DialogOutcome::Picked(paths) => RunOutcome::Completed(paths),
        DialogOutcome::Cancelled => RunOutcome::Cancelled,
    }
}

pub async fn select_macro_source<D: Dialogs>(dialogs: &D) -> RunOutcome<PathBuf> {
    let request = OpenRequest {
        title: "Select a macro-enabled workbook".to_owned(),
        filter: FileFilter::MACRO_WORKBOOK,
    };
    match dialogs.pick_file(request).await {
        DialogOutcome::Picked(path) => RunOutcome::Completed(path),
        DialogOutcome::Cancelled => RunOutcome::Cancelled,
    }
}

pub async fn run_extract<E, D, F>(
    plan: ExtractPlan,
    engine: &E,
    dialogs: &D,
    progress: &mut F,
) -> RunOutcome<usize>
where
    E: WorkbookEngine,
    D: Dialogs,
    F: FnMut(RunPhase) + Send,
{
    let output = match dialogs.save_file(plan.save).await {
        DialogOutcome::Picked(output) => output,
        DialogOutcome::Cancelled => return RunOutcome::Cancelled,
    };

    progress(RunPhase::Invoking);
    let result = match &plan.parameter {
        ExtractParameter::Keyword(keyword) => {
            engine
                .extract_by_keyword(&plan.source, keyword, &output)
                .await
        }
        ExtractParameter::Sheets(sheets) => {
            engine
                .extract_by_selection(&plan.source, sheets, &output)
                .await
        }
    };
    result.into()
}

pub async fn run_merge<E, D, F>(
    plan: MergePlan,
    engine: &E,
    dialogs: &D,
    progress: &mut F,
) -> RunOutcome<usize>
where
    E: WorkbookEngine,
    D: Dialogs,
    F: FnMut(RunPhase) + Send,
{
    let output = match dialogs.save_file(plan.save).await {
        DialogOutcome::Picked(output) => output,
        DialogOutcome::Cancelled => return RunOutcome::Cancelled,
    };

    progress(RunPhase::Invoking);
    engine.merge_workbooks(&plan.paths, &output).await.into()
}

pub async fn run_macro_removal<E, D, F>(
    plan: MacroPlan,
    engine: &E,
    dialogs: &D,
    progress: &mut F,
) -> RunOutcome<()>
where
    E: WorkbookEngine,
    D: Dialogs,
    F: FnMut(RunPhase) + Send,
{
    let output = match dialogs.save_file(plan.save).await {
        DialogOutcome::Picked(output) => output,
        DialogOutcome::Cancelled => return RunOutcome::Cancelled,
    };

    progress(RunPhase::Invoking);
    engine.remove_macro(&plan.source, &output).await.into()
}

#[cfg(test)]
mod tests {
    use super::{EngineError, RunOutcome, SaveRequest};
    use crate::FileFilter;
    use std::path::PathBuf;

    #[test]
    fn engine_error_maps_to_failed_with_verbatim_message() {
        let outcome: RunOutcome<usize> = Err(EngineError::new("sheet not found: Q5")).into();
        assert_eq!(outcome, RunOutcome::Failed("sheet not found: Q5".to_owned()));
    }

    #[test]
    fn save_request_default_path_joins_directory() {
        let mut request = SaveRequest {
            title: "Save".to_owned(),
            directory: Some(PathBuf::from("/books")),
            file_name: "merged.xlsx".to_owned(),
            filter: FileFilter::WORKBOOK,
        };
        assert_eq!(request.default_path(), PathBuf::from("/books/merged.xlsx"));

        request.directory = None;
        assert_eq!(request.default_path(), PathBuf::from("merged.xlsx"));
    }
}
