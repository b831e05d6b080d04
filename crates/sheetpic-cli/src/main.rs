// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
#[cfg(feature = "native-dialogs")]
mod native;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::{DialogBackend, Engine, TaskRuntime};
use sheetpic_app::AppState;
use sheetpic_engine::{CommandEngine, DemoEngine};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `sheetpic --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    if options.print_log_path {
        println!("{}", log_path.display());
        return Ok(());
    }

    let engine = if options.demo {
        Engine::Demo(DemoEngine::new())
    } else {
        let program = config.engine_program().ok_or_else(|| {
            anyhow!(
                "no engine configured; set [engine].program in {} or run with --demo",
                options.config_path.display()
            )
        })?;
        let resolved = resolve_program(program, env::var_os("PATH")).with_context(|| {
            format!(
                "check [engine].program in {}",
                options.config_path.display()
            )
        })?;
        Engine::Command(CommandEngine::new(resolved, config.engine_args().to_vec()))
    };
    let dialogs = dialog_backend(config.native_dialogs())?;
    if options.check_only {
        return Ok(());
    }

    logging::init(config.log_level(), &log_path)?;
    info!(
        engine = %engine.describe(),
        dialogs = ?dialogs,
        config = %options.config_path.display(),
        "starting sheetpic"
    );

    let async_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    let mut state = AppState::new(config.default_tool(), config.default_mode());
    let mut task_runtime = TaskRuntime::new(async_runtime.handle().clone(), engine, dialogs);
    let (internal_tx, internal_rx) = sheetpic_tui::internal_channel();
    let result = sheetpic_tui::run_app(&mut state, &mut task_runtime, internal_tx, internal_rx);

    async_runtime.shutdown_timeout(Duration::from_millis(500));
    info!("sheetpic exited");
    result
}

#[cfg(feature = "native-dialogs")]
fn dialog_backend(native: bool) -> Result<DialogBackend> {
    Ok(if native {
        DialogBackend::Native
    } else {
        DialogBackend::Prompt
    })
}

#[cfg(not(feature = "native-dialogs"))]
fn dialog_backend(native: bool) -> Result<DialogBackend> {
    if native {
        bail!(
            "[dialogs].native = true needs a build with the native-dialogs feature; set it to false to use the terminal prompt"
        );
    }
    Ok(DialogBackend::Prompt)
}

/// Finds the engine executable the way a shell would.
fn resolve_program(program: &str, path_var: Option<OsString>) -> Result<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        bail!("engine program {} does not exist", candidate.display());
    }

    if let Some(path_var) = path_var {
        for dir in env::split_paths(&path_var) {
            let full = dir.join(program);
            if full.is_file() {
                return Ok(full);
            }
        }
    }
    bail!("engine program {program:?} was not found on PATH")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_log_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_log_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-log-path" => {
                options.print_log_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("sheetpic: extract, merge, and de-macro Excel workbooks");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-log-path         Print resolved log file path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Use the built-in demo engine");
    println!("  --check                  Validate config and engine, then exit");
    println!("  --help                   Show this help");
}
