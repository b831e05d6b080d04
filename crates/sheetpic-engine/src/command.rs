// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use serde::de::DeserializeOwned;
use sheetpic_app::{EngineError, WorkbookEngine};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const LOAD_SHEETS: &str = "load_sheets";
pub const EXTRACT_BY_KEYWORD: &str = "extract_by_keyword";
pub const EXTRACT_BY_SELECTION: &str = "extract_by_selection";
pub const MERGE_WORKBOOKS: &str = "merge_workbooks";
pub const REMOVE_MACRO: &str = "remove_macro";

#[derive(Debug, Serialize)]
struct PathRequest<'a> {
    path: &'a Path,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeywordRequest<'a> {
    path: &'a Path,
    keyword: &'a str,
    output_path: &'a Path,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectionRequest<'a> {
    path: &'a Path,
    sheets: &'a [String],
    output_path: &'a Path,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequest<'a> {
    paths: &'a [PathBuf],
    output_path: &'a Path,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MacroRequest<'a> {
    path: &'a Path,
    output_path: &'a Path,
}

/// Runs an external engine executable once per command.
///
/// The request goes to stdin as one JSON object. A zero exit status means
/// stdout holds the JSON reply; otherwise stderr holds the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn invoke<T, R>(&self, command: &str, request: &R) -> Result<T, EngineError>
    where
        T: DeserializeOwned,
        R: Serialize + Sync,
    {
        let payload = serde_json::to_vec(request)
            .map_err(|error| EngineError::new(format!("encode {command} request: {error}")))?;

        debug!(program = %self.program.display(), command, "spawning engine");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                EngineError::new(format!(
                    "start engine {}: {error}",
                    self.program.display()
                ))
            })?;

        // Stdin is fed while stdout and stderr drain so neither side blocks on a full pipe.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The engine may exit without reading stdin; stderr carries its error.
                if let Err(error) = stdin.write_all(&payload).await {
                    debug!(command, %error, "engine closed stdin early");
                }
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|error| {
            EngineError::new(format!("wait for engine during {command}: {error}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            warn!(command, status = %output.status, "engine reported failure");
            if message.is_empty() {
                return Err(EngineError::new(format!(
                    "engine exited with {} during {command}",
                    output.status
                )));
            }
            return Err(EngineError::new(message));
        }

        info!(command, "engine finished");
        parse_reply(command, &output.stdout)
    }
}

fn parse_reply<T: DeserializeOwned>(command: &str, stdout: &[u8]) -> Result<T, EngineError> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    let body = if trimmed.is_empty() { "null" } else { trimmed };
    serde_json::from_str(body).map_err(|error| {
        EngineError::new(format!("engine returned malformed {command} reply: {error}"))
    })
}

impl WorkbookEngine for CommandEngine {
    async fn load_sheets(&self, path: &Path) -> Result<Vec<String>, EngineError> {
        self.invoke(LOAD_SHEETS, &PathRequest { path }).await
    }

    async fn extract_by_keyword(
        &self,
        path: &Path,
        keyword: &str,
        output: &Path,
    ) -> Result<usize, EngineError> {
        let request = KeywordRequest {
            path,
            keyword,
            output_path: output,
        };
        self.invoke(EXTRACT_BY_KEYWORD, &request).await
    }

    async fn extract_by_selection(
        &self,
        path: &Path,
        sheets: &[String],
        output: &Path,
    ) -> Result<usize, EngineError> {
        let request = SelectionRequest {
            path,
            sheets,
            output_path: output,
        };
        self.invoke(EXTRACT_BY_SELECTION, &request).await
    }

    async fn merge_workbooks(&self, paths: &[PathBuf], output: &Path) -> Result<usize, EngineError> {
        let request = MergeRequest {
            paths,
            output_path: output,
        };
        self.invoke(MERGE_WORKBOOKS, &request).await
    }

    async fn remove_macro(&self, path: &Path, output: &Path) -> Result<(), EngineError> {
        let request = MacroRequest {
            path,
            output_path: output,
        };
        self.invoke(REMOVE_MACRO, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::{KeywordRequest, MergeRequest, parse_reply};
    use anyhow::Result;
    use std::path::{Path, PathBuf};

    #[test]
    fn requests_use_camel_case_keys() -> Result<()> {
        let request = KeywordRequest {
            path: Path::new("/in/book.xlsx"),
            keyword: "Q1",
            output_path: Path::new("/out/extracted_Q1.xlsx"),
        };
        let value = serde_json::to_value(&request)?;
        assert_eq!(
            value,
            serde_json::json!({
                "path": "/in/book.xlsx",
                "keyword": "Q1",
                "outputPath": "/out/extracted_Q1.xlsx",
            })
        );

        let paths = vec![PathBuf::from("a.xlsx"), PathBuf::from("b.xlsx")];
        let merge = serde_json::to_value(MergeRequest {
            paths: &paths,
            output_path: Path::new("merged.xlsx"),
        })?;
        assert_eq!(merge["paths"], serde_json::json!(["a.xlsx", "b.xlsx"]));
        Ok(())
    }

    #[test]
    fn empty_reply_decodes_as_unit() {
        let reply: std::result::Result<(), _> = parse_reply("remove_macro", b"  \n");
        assert!(reply.is_ok());
    }

    #[test]
    fn malformed_reply_names_the_command() {
        let reply: std::result::Result<usize, _> = parse_reply("merge_workbooks", b"three");
        let error = reply.expect_err("non-numeric count should fail");
        assert!(error.message().contains("merge_workbooks"));
    }

    #[test]
    fn negative_count_is_rejected() {
        let reply: std::result::Result<usize, _> = parse_reply("extract_by_keyword", b"-1");
        assert!(reply.is_err());
    }
}
