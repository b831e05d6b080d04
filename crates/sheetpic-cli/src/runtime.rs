// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use sheetpic_app::{Dialogs, EngineError, ToolTask, WorkbookEngine, run_task};
use sheetpic_engine::{CommandEngine, DemoEngine};
use sheetpic_tui::{InternalEvent, PromptDialogs, TaskEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// The engine chosen at startup.
#[derive(Debug)]
pub enum Engine {
    Command(CommandEngine),
    Demo(DemoEngine),
}

impl Engine {
    pub fn describe(&self) -> String {
        match self {
            Self::Command(engine) => engine.program().display().to_string(),
            Self::Demo(_) => "demo".to_owned(),
        }
    }
}

impl WorkbookEngine for Engine {
    async fn load_sheets(&self, path: &Path) -> Result<Vec<String>, EngineError> {
        match self {
            Self::Command(engine) => engine.load_sheets(path).await,
            Self::Demo(engine) => engine.load_sheets(path).await,
        }
    }

    async fn extract_by_keyword(
        &self,
        path: &Path,
        keyword: &str,
        output: &Path,
    ) -> Result<usize, EngineError> {
        match self {
            Self::Command(engine) => engine.extract_by_keyword(path, keyword, output).await,
            Self::Demo(engine) => engine.extract_by_keyword(path, keyword, output).await,
        }
    }

    async fn extract_by_selection(
        &self,
        path: &Path,
        sheets: &[String],
        output: &Path,
    ) -> Result<usize, EngineError> {
        match self {
            Self::Command(engine) => engine.extract_by_selection(path, sheets, output).await,
            Self::Demo(engine) => engine.extract_by_selection(path, sheets, output).await,
        }
    }

    async fn merge_workbooks(&self, paths: &[PathBuf], output: &Path) -> Result<usize, EngineError> {
        match self {
            Self::Command(engine) => engine.merge_workbooks(paths, output).await,
            Self::Demo(engine) => engine.merge_workbooks(paths, output).await,
        }
    }

    async fn remove_macro(&self, path: &Path, output: &Path) -> Result<(), EngineError> {
        match self {
            Self::Command(engine) => engine.remove_macro(path, output).await,
            Self::Demo(engine) => engine.remove_macro(path, output).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogBackend {
    Prompt,
    #[cfg(feature = "native-dialogs")]
    Native,
}

/// Runs tool tasks on a tokio runtime and reports back to the UI thread.
pub struct TaskRuntime {
    handle: Handle,
    engine: Arc<Engine>,
    dialogs: DialogBackend,
}

impl TaskRuntime {
    pub fn new(handle: Handle, engine: Engine, dialogs: DialogBackend) -> Self {
        Self {
            handle,
            engine: Arc::new(engine),
            dialogs,
        }
    }
}

impl sheetpic_tui::AppRuntime for TaskRuntime {
    fn spawn_task(&mut self, task: ToolTask, tx: Sender<InternalEvent>) -> Result<()> {
        info!(
            tool = task.tool().as_str(),
            task = task.name(),
            "task requested"
        );
        let engine = Arc::clone(&self.engine);
        match self.dialogs {
            DialogBackend::Prompt => {
                let dialogs = PromptDialogs::new(tx.clone());
                self.handle.spawn(drive(task, engine, dialogs, tx));
            }
            #[cfg(feature = "native-dialogs")]
            DialogBackend::Native => {
                self.handle
                    .spawn(drive(task, engine, crate::native::NativeDialogs, tx));
            }
        }
        Ok(())
    }
}

/// Runs one task to completion, forwarding progress and the outcome.
pub async fn drive<E, D>(task: ToolTask, engine: Arc<E>, dialogs: D, tx: Sender<InternalEvent>)
where
    E: WorkbookEngine,
    D: Dialogs,
{
    let tool = task.tool();
    let progress_tx = tx.clone();
    let outcome = run_task(task, engine.as_ref(), &dialogs, move |phase| {
        if progress_tx
            .send(InternalEvent::Task(TaskEvent::Progress { tool, phase }))
            .is_err()
        {
            debug!(tool = tool.as_str(), "ui closed before progress was delivered");
        }
    })
    .await;

    if tx
        .send(InternalEvent::Task(TaskEvent::Finished(outcome)))
        .is_err()
    {
        debug!(tool = tool.as_str(), "ui closed before task finished");
    }
}
