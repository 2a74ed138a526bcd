// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::{env, path::PathBuf};

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::infra::t;

pub mod commands;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> String {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        if let Some(lang) = args.get(pos + 1) {
            return lang.clone();
        }
    }
    // Fallback to system language detection
    sys_locale::get_locale().unwrap_or_else(|| "en".to_string())
}

fn build_cli(locale: &str) -> Command {
    Command::new("suite-runner")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about", locale = locale).to_string())
                .arg(
                    Arg::new("suite")
                        .short('s')
                        .long("suite")
                        .help(t!("arg_suite", locale = locale).to_string())
                        .value_name("SUITE")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("env")
                        .short('e')
                        .long("env")
                        .help(t!("arg_env", locale = locale).to_string())
                        .value_name("ENVIRONMENT")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .help(t!("arg_tag", locale = locale).to_string())
                        .value_name("TAG")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("priority")
                        .long("priority")
                        .help(t!("arg_priority", locale = locale).to_string())
                        .value_name("PRIORITY")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("max-duration")
                        .long("max-duration")
                        .help(t!("arg_max_duration", locale = locale).to_string())
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(u64))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .default_value(DEFAULT_CONFIG_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .help(t!("arg_report", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help("Create a default config file without launching the interactive wizard.")
                        .action(ArgAction::SetTrue),
                ),
        )
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let language = pre_parse_language();
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let suite = run_matches
                .get_one::<String>("suite")
                .cloned()
                .unwrap(); // Required
            let environment = run_matches.get_one::<String>("env").cloned();
            let tags: Vec<String> = run_matches
                .get_many::<String>("tag")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let priority = run_matches.get_one::<String>("priority").cloned();
            let max_duration = run_matches.get_one::<u64>("max-duration").copied();
            let config = run_matches
                .get_one::<PathBuf>("config")
                .unwrap() // Has default
                .clone();
            let report = run_matches.get_flag("report");
            let html = run_matches.get_one::<PathBuf>("html").cloned();

            commands::run::execute(
                suite,
                environment,
                tags,
                priority,
                max_duration,
                config,
                report,
                html,
            )
            .await?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");

            // Show language detection message if it was auto-detected
            if env::args().all(|arg| arg != "--lang") {
                println!(
                    "{}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(&language, non_interactive)?;
        }
        _ => {
            // This case handles when no subcommand is given.
            // Clap will have already printed help info.
        }
    }
    Ok(())
}
