// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sheetpic_app::{DialogOutcome, Dialogs, FileFilter, OpenRequest, SaveRequest};
use std::path::PathBuf;

/// Platform file dialogs through `rfd`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDialogs;

fn dialog(title: &str, filter: FileFilter) -> rfd::AsyncFileDialog {
    rfd::AsyncFileDialog::new()
        .set_title(title)
        .add_filter(filter.name, filter.extensions)
}

impl Dialogs for NativeDialogs {
    async fn pick_file(&self, request: OpenRequest) -> DialogOutcome<PathBuf> {
        match dialog(&request.title, request.filter).pick_file().await {
            Some(handle) => DialogOutcome::Picked(handle.path().to_path_buf()),
            None => DialogOutcome::Cancelled,
        }
    }

    async fn pick_files(&self, request: OpenRequest) -> DialogOutcome<Vec<PathBuf>> {
        match dialog(&request.title, request.filter).pick_files().await {
            Some(handles) if !handles.is_empty() => DialogOutcome::Picked(
                handles
                    .iter()
                    .map(|handle| handle.path().to_path_buf())
                    .collect(),
            ),
            _ => DialogOutcome::Cancelled,
        }
    }

    async fn save_file(&self, request: SaveRequest) -> DialogOutcome<PathBuf> {
        let mut builder = dialog(&request.title, request.filter).set_file_name(&request.file_name);
        if let Some(directory) = &request.directory {
            builder = builder.set_directory(directory);
        }
        match builder.save_file().await {
            Some(handle) => DialogOutcome::Picked(handle.path().to_path_buf()),
            None => DialogOutcome::Cancelled,
        }
    }
}
