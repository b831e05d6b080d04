// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod command;
mod demo;

pub use command::{
    CommandEngine, EXTRACT_BY_KEYWORD, EXTRACT_BY_SELECTION, LOAD_SHEETS, MERGE_WORKBOOKS,
    REMOVE_MACRO,
};
pub use demo::{DEMO_SHEETS, DemoEngine};
