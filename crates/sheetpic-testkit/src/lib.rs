// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use sheetpic_app::{
    DialogOutcome, Dialogs, EngineError, OpenRequest, SaveRequest, WorkbookEngine,
};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const MONTH_SHEETS: [&str; 3] = ["Jan", "Feb", "Mar"];

pub fn month_sheets() -> Vec<String> {
    MONTH_SHEETS.iter().map(|name| (*name).to_owned()).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    LoadSheets {
        path: PathBuf,
    },
    ExtractByKeyword {
        path: PathBuf,
        keyword: String,
        output: PathBuf,
    },
    ExtractBySelection {
        path: PathBuf,
        sheets: Vec<String>,
        output: PathBuf,
    },
    MergeWorkbooks {
        paths: Vec<PathBuf>,
        output: PathBuf,
    },
    RemoveMacro {
        path: PathBuf,
        output: PathBuf,
    },
}

/// Engine fake that records every call and answers from fixed replies.
#[derive(Debug)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    sheets: Result<Vec<String>, String>,
    count: Result<usize, String>,
    macro_result: Result<(), String>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sheets: Ok(month_sheets()),
            count: Ok(1),
            macro_result: Ok(()),
        }
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheets(mut self, sheets: Vec<String>) -> Self {
        self.sheets = Ok(sheets);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Ok(count);
        self
    }

    pub fn failing_load(mut self, message: &str) -> Self {
        self.sheets = Err(message.to_owned());
        self
    }

    /// Makes every write command fail with `message`.
    pub fn failing_writes(mut self, message: &str) -> Self {
        self.count = Err(message.to_owned());
        self.macro_result = Err(message.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: EngineCall) {
        lock(&self.calls).push(call);
    }
}

impl WorkbookEngine for RecordingEngine {
    async fn load_sheets(&self, path: &Path) -> Result<Vec<String>, EngineError> {
        self.record(EngineCall::LoadSheets {
            path: path.to_path_buf(),
        });
        self.sheets.clone().map_err(EngineError::new)
    }

    async fn extract_by_keyword(
        &self,
        path: &Path,
        keyword: &str,
        output: &Path,
    ) -> Result<usize, EngineError> {
        self.record(EngineCall::ExtractByKeyword {
            path: path.to_path_buf(),
            keyword: keyword.to_owned(),
            output: output.to_path_buf(),
        });
        self.count.clone().map_err(EngineError::new)
    }

    async fn extract_by_selection(
        &self,
        path: &Path,
        sheets: &[String],
        output: &Path,
    ) -> Result<usize, EngineError> {
        self.record(EngineCall::ExtractBySelection {
            path: path.to_path_buf(),
            sheets: sheets.to_vec(),
            output: output.to_path_buf(),
        });
        self.count.clone().map_err(EngineError::new)
    }

    async fn merge_workbooks(&self, paths: &[PathBuf], output: &Path) -> Result<usize, EngineError> {
        self.record(EngineCall::MergeWorkbooks {
            paths: paths.to_vec(),
            output: output.to_path_buf(),
        });
        self.count.clone().map_err(EngineError::new)
    }

    async fn remove_macro(&self, path: &Path, output: &Path) -> Result<(), EngineError> {
        self.record(EngineCall::RemoveMacro {
            path: path.to_path_buf(),
            output: output.to_path_buf(),
        });
        self.macro_result.clone().map_err(EngineError::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogReply {
    Open(PathBuf),
    OpenMany(Vec<PathBuf>),
    SaveDefault,
    Save(PathBuf),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogRequest {
    Open(OpenRequest),
    OpenMany(OpenRequest),
    Save(SaveRequest),
}

/// Dialog fake that replays scripted replies in order. An exhausted script
/// cancels.
#[derive(Debug, Default)]
pub struct ScriptedDialogs {
    replies: Mutex<VecDeque<DialogReply>>,
    requests: Mutex<Vec<DialogRequest>>,
}

impl ScriptedDialogs {
    pub fn new(replies: impl IntoIterator<Item = DialogReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DialogRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }

    fn next_reply(&self, request: DialogRequest) -> DialogReply {
        lock(&self.requests).push(request);
        lock(&self.replies)
            .pop_front()
            .unwrap_or(DialogReply::Cancel)
    }
}

impl Dialogs for ScriptedDialogs {
    async fn pick_file(&self, request: OpenRequest) -> DialogOutcome<PathBuf> {
        match self.next_reply(DialogRequest::Open(request)) {
            DialogReply::Open(path) | DialogReply::Save(path) => DialogOutcome::Picked(path),
            DialogReply::OpenMany(mut paths) if !paths.is_empty() => {
                DialogOutcome::Picked(paths.remove(0))
            }
            _ => DialogOutcome::Cancelled,
        }
    }

    async fn pick_files(&self, request: OpenRequest) -> DialogOutcome<Vec<PathBuf>> {
        match self.next_reply(DialogRequest::OpenMany(request)) {
            DialogReply::OpenMany(paths) => DialogOutcome::Picked(paths),
            DialogReply::Open(path) => DialogOutcome::Picked(vec![path]),
            _ => DialogOutcome::Cancelled,
        }
    }

    async fn save_file(&self, request: SaveRequest) -> DialogOutcome<PathBuf> {
        let default_path = request.default_path();
        match self.next_reply(DialogRequest::Save(request)) {
            DialogReply::SaveDefault => DialogOutcome::Picked(default_path),
            DialogReply::Save(path) => DialogOutcome::Picked(path),
            _ => DialogOutcome::Cancelled,
        }
    }
}

/// Writes an executable shell script that stands in for the engine binary.
#[cfg(unix)]
pub fn write_engine_script(dir: &Path, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-engine.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("write engine script {}", path.display()))?;
    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions)
        .with_context(|| format!("mark {} executable", path.display()))?;
    Ok(path)
}
