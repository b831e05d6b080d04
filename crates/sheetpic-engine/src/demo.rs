// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sheetpic_app::{EngineError, FileFilter, WorkbookEngine};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const DEMO_SHEETS: [&str; 5] = ["Summary", "Jan", "Feb", "Mar", "Notes"];

/// In-memory stand-in for the engine, used by `--demo`.
///
/// Every workbook holds [`DEMO_SHEETS`]; nothing touches the filesystem.
#[derive(Debug, Default)]
pub struct DemoEngine {
    written: Mutex<Vec<PathBuf>>,
}

impl DemoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<PathBuf> {
        match self.written.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, output: &Path) {
        debug!(output = %output.display(), "demo engine wrote workbook");
        match self.written.lock() {
            Ok(mut guard) => guard.push(output.to_path_buf()),
            Err(poisoned) => poisoned.into_inner().push(output.to_path_buf()),
        }
    }

    fn open(path: &Path) -> Result<Vec<String>, EngineError> {
        if FileFilter::WORKBOOK.accepts(path) || FileFilter::MACRO_WORKBOOK.accepts(path) {
            Ok(DEMO_SHEETS.iter().map(|name| (*name).to_owned()).collect())
        } else {
            Err(EngineError::new(format!(
                "unsupported workbook format: {}",
                path.display()
            )))
        }
    }
}

impl WorkbookEngine for DemoEngine {
    async fn load_sheets(&self, path: &Path) -> Result<Vec<String>, EngineError> {
        Self::open(path)
    }

    async fn extract_by_keyword(
        &self,
        path: &Path,
        keyword: &str,
        output: &Path,
    ) -> Result<usize, EngineError> {
        let count = Self::open(path)?
            .iter()
            .filter(|name| name.contains(keyword))
            .count();
        if count == 0 {
            return Err(EngineError::new("no sheets matched the keyword"));
        }
        self.record(output);
        Ok(count)
    }

    async fn extract_by_selection(
        &self,
        path: &Path,
        sheets: &[String],
        output: &Path,
    ) -> Result<usize, EngineError> {
        if sheets.is_empty() {
            return Err(EngineError::new("no sheets selected"));
        }
        let available = Self::open(path)?;
        let count = available
            .iter()
            .filter(|name| sheets.contains(name))
            .count();
        if count == 0 {
            return Err(EngineError::new("none of the selected sheets were found"));
        }
        self.record(output);
        Ok(count)
    }

    async fn merge_workbooks(&self, paths: &[PathBuf], output: &Path) -> Result<usize, EngineError> {
        if paths.len() < 2 {
            return Err(EngineError::new("merging needs at least two workbooks"));
        }
        let mut total = 0;
        for path in paths {
            total += Self::open(path)?.len();
        }
        self.record(output);
        Ok(total)
    }

    async fn remove_macro(&self, path: &Path, output: &Path) -> Result<(), EngineError> {
        if !FileFilter::MACRO_WORKBOOK.accepts(path) {
            return Err(EngineError::new(format!(
                "not a macro-enabled workbook: {}",
                path.display()
            )));
        }
        self.record(output);
        Ok(())
    }
}
