// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Extract,
    Merge,
    Macros,
}

impl ToolKind {
    pub const ALL: [Self; 3] = [Self::Extract, Self::Merge, Self::Macros];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Merge => "merge",
            Self::Macros => "remove macros",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Merge => "merge",
            Self::Macros => "macros",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    #[default]
    Keyword,
    Selection,
}

impl ExtractMode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Keyword => Self::Selection,
            Self::Selection => Self::Keyword,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTone {
    #[default]
    Muted,
    Success,
    Error,
}

/// Latest message for one tool. Every status-producing event replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusEntry {
    pub message: String,
    pub tone: StatusTone,
}

impl StatusEntry {
    pub fn muted(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: StatusTone::Muted,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: StatusTone::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: StatusTone::Error,
        }
    }
}

/// Where a tool is in its current asynchronous action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    ChoosingSource,
    LoadingSheets,
    ChoosingOutput,
    Invoking,
}

impl RunPhase {
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ChoosingSource => "choosing source",
            Self::LoadingSheets => "loading sheets",
            Self::ChoosingOutput => "choosing output",
            Self::Invoking => "running",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

impl FileFilter {
    pub const WORKBOOK: Self = Self {
        name: "Excel",
        extensions: &["xlsx"],
    };

    pub const MACRO_WORKBOOK: Self = Self {
        name: "Excel (macro-enabled)",
        extensions: &["xlsm"],
    };

    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}
