// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod model;
pub mod naming;
pub mod orchestrator;
pub mod selection;
pub mod state;
pub mod tools;

pub use model::*;
pub use orchestrator::*;
pub use selection::*;
pub use state::*;
pub use tools::*;
