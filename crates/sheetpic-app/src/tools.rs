// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::path::PathBuf;

use thiserror::Error;

use crate::naming::{
    MERGED_FILE_NAME, keyword_output_name, macros_removed_output_name, selection_output_name,
    source_directory,
};
use crate::{
    ExtractMode, ExtractParameter, ExtractPlan, FileFilter, LoadedWorkbook, MacroPlan, MergePlan,
    RunOutcome, RunPhase, SaveRequest, SheetSelection, StatusEntry,
};

pub const MIN_MERGE_FILES: usize = 2;

/// Problems caught before any engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select an Excel file first.")]
    MissingWorkbook,
    #[error("Enter a keyword.")]
    EmptyKeyword,
    #[error("Select at least one sheet to extract.")]
    NoSheetsChecked,
    #[error("Select at least two workbooks to merge.")]
    TooFewMergeFiles,
    #[error("Select a macro-enabled workbook first.")]
    MissingMacroWorkbook,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractTool {
    pub file_path: Option<PathBuf>,
    pub selection: SheetSelection,
    pub mode: ExtractMode,
    pub keyword: String,
    pub status: StatusEntry,
    pub phase: RunPhase,
}

impl Default for ExtractTool {
    fn default() -> Self {
        Self::with_mode(ExtractMode::Keyword)
    }
}

impl ExtractTool {
    pub fn with_mode(mode: ExtractMode) -> Self {
        Self {
            file_path: None,
            selection: SheetSelection::default(),
            mode,
            keyword: String::new(),
            status: StatusEntry::muted("Select an Excel file to begin."),
            phase: RunPhase::Idle,
        }
    }

    pub fn can_run(&self) -> bool {
        self.file_path.is_some() && self.phase.is_idle()
    }

    pub fn keyword_visible(&self) -> bool {
        self.mode == ExtractMode::Keyword
    }

    pub fn selection_visible(&self) -> bool {
        self.mode == ExtractMode::Selection
    }

    /// Resolves the active mode's parameter and the save dialog defaults.
    pub fn plan(&self) -> Result<ExtractPlan, ValidationError> {
        let source = self
            .file_path
            .clone()
            .ok_or(ValidationError::MissingWorkbook)?;

        let (parameter, file_name) = match self.mode {
            ExtractMode::Keyword => {
                let keyword = self.keyword.trim();
                if keyword.is_empty() {
                    return Err(ValidationError::EmptyKeyword);
                }
                (
                    ExtractParameter::Keyword(keyword.to_owned()),
                    keyword_output_name(&self.keyword),
                )
            }
            ExtractMode::Selection => {
                let sheets = self.selection.checked_sheets();
                if sheets.is_empty() {
                    return Err(ValidationError::NoSheetsChecked);
                }
                (
                    ExtractParameter::Sheets(sheets),
                    selection_output_name(&source),
                )
            }
        };

        Ok(ExtractPlan {
            save: SaveRequest {
                title: "Save extracted workbook".to_owned(),
                directory: source_directory(&source),
                file_name,
                filter: FileFilter::WORKBOOK,
            },
            source,
            parameter,
        })
    }

    pub(crate) fn apply_source(&mut self, outcome: RunOutcome<LoadedWorkbook>) -> StatusEntry {
        match outcome {
            RunOutcome::Completed(loaded) => {
                self.file_path = Some(loaded.path);
                self.selection.replace(loaded.sheets);
                StatusEntry::success("Ready. Choose an extraction method and run.")
            }
            RunOutcome::Cancelled => StatusEntry::muted("File selection cancelled."),
            RunOutcome::Failed(error) => StatusEntry::error(format!("Error: {error}")),
        }
    }

    pub(crate) fn apply_run(&self, outcome: RunOutcome<usize>) -> StatusEntry {
        match outcome {
            RunOutcome::Completed(count) => {
                StatusEntry::success(format!("Done: extracted {count} sheet(s)."))
            }
            RunOutcome::Cancelled => StatusEntry::muted("Output destination cancelled."),
            RunOutcome::Failed(error) => StatusEntry::error(format!("Error: {error}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTool {
    pub paths: Vec<PathBuf>,
    pub status: StatusEntry,
    pub phase: RunPhase,
}

impl Default for MergeTool {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            status: StatusEntry::muted("Select two or more workbooks to merge."),
            phase: RunPhase::Idle,
        }
    }
}

impl MergeTool {
    pub fn can_run(&self) -> bool {
        self.paths.len() >= MIN_MERGE_FILES && self.phase.is_idle()
    }

    pub fn plan(&self) -> Result<MergePlan, ValidationError> {
        if self.paths.len() < MIN_MERGE_FILES {
            return Err(ValidationError::TooFewMergeFiles);
        }
        let directory = self.paths.first().and_then(|path| source_directory(path));
        Ok(MergePlan {
            paths: self.paths.clone(),
            save: SaveRequest {
                title: "Save merged workbook".to_owned(),
                directory,
                file_name: MERGED_FILE_NAME.to_owned(),
                filter: FileFilter::WORKBOOK,
            },
        })
    }

    pub(crate) fn apply_sources(&mut self, outcome: RunOutcome<Vec<PathBuf>>) -> StatusEntry {
        match outcome {
            RunOutcome::Completed(paths) => {
                self.paths = paths;
                if self.paths.len() < MIN_MERGE_FILES {
                    StatusEntry::muted(format!(
                        "{} workbook selected; select at least {MIN_MERGE_FILES} to merge.",
                        self.paths.len()
                    ))
                } else {
                    StatusEntry::success(format!(
                        "{} workbooks selected. Ready to merge.",
                        self.paths.len()
                    ))
                }
            }
            RunOutcome::Cancelled => StatusEntry::muted("File selection cancelled."),
            RunOutcome::Failed(error) => StatusEntry::error(format!("Error: {error}")),
        }
    }

    pub(crate) fn apply_run(&self, outcome: RunOutcome<usize>) -> StatusEntry {
        match outcome {
            RunOutcome::Completed(count) => {
                StatusEntry::success(format!("Done: merged {count} sheet(s)."))
            }
            RunOutcome::Cancelled => StatusEntry::muted("Output destination cancelled."),
            RunOutcome::Failed(error) => StatusEntry::error(format!("Error: {error}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroTool {
    pub file_path: Option<PathBuf>,
    pub status: StatusEntry,
    pub phase: RunPhase,
}

impl Default for MacroTool {
    fn default() -> Self {
        Self {
            file_path: None,
            status: StatusEntry::muted("Select a macro-enabled workbook (.xlsm)."),
            phase: RunPhase::Idle,
        }
    }
}

impl MacroTool {
    pub fn can_run(&self) -> bool {
        self.file_path.is_some() && self.phase.is_idle()
    }

    pub fn plan(&self) -> Result<MacroPlan, ValidationError> {
        let source = self
            .file_path
            .clone()
            .ok_or(ValidationError::MissingMacroWorkbook)?;
        Ok(MacroPlan {
            save: SaveRequest {
                title: "Save workbook without macros".to_owned(),
                directory: source_directory(&source),
                file_name: macros_removed_output_name(&source),
                filter: FileFilter::WORKBOOK,
            },
            source,
        })
    }

    pub(crate) fn apply_source(&mut self, outcome: RunOutcome<PathBuf>) -> StatusEntry {
        match outcome {
            RunOutcome::Completed(path) => {
                self.file_path = Some(path);
                StatusEntry::success("Ready. Run to save a copy without macros.")
            }
            RunOutcome::Cancelled => StatusEntry::muted("File selection cancelled."),
            RunOutcome::Failed(error) => StatusEntry::error(format!("Error: {error}")),
        }
    }

    pub(crate) fn apply_run(&self, outcome: RunOutcome<()>) -> StatusEntry {
        match outcome {
            RunOutcome::Completed(()) => StatusEntry::success("Done: macros removed."),
            RunOutcome::Cancelled => StatusEntry::muted("Output destination cancelled."),
            RunOutcome::Failed(error) => StatusEntry::error(format!("Error: {error}")),
        }
    }
}
