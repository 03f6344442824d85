// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::{CacheBackend, Config};
use runtime::LeadRuntime;
use sendur_app::AppState;
use sendur_store::{FileSessionCache, MemorySessionCache, SessionCache};
use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_NAME: &str = "sendur.log";

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
            "load config {}; run `sendur --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let client = sendur_api::Client::new(&config.base_url(), config.timeouts()?).with_context(
        || {
            format!(
                "invalid [api] config in {}; fix base_url/request_timeout/abort_timeout values",
                options.config_path.display()
            )
        },
    )?;
    if options.check_only {
        return Ok(());
    }

    setup_logging(config.log_filter(), &log_path(&options.config_path));
    let cache = open_session_cache(&config)?;
    info!(
        base_url = client.base_url(),
        cache = config.cache_backend().as_str(),
        "starting sendur"
    );

    let mut state = AppState::new(config.sort(), config.page_size(), config.density());
    let mut runtime = LeadRuntime::new(client, cache);
    sendur_tui::run_app(&mut state, &mut runtime)
}

fn open_session_cache(config: &Config) -> Result<Box<dyn SessionCache>> {
    match config.cache_backend() {
        CacheBackend::Memory => Ok(Box::new(MemorySessionCache::new())),
        CacheBackend::File => {
            let root = sendur_store::session_cache_root()?;
            let removed = sendur_store::evict_stale_sessions(&root, config.session_ttl())?;
            if removed > 0 {
                info!(removed, "evicted stale session caches");
            }
            let session_id = sendur_store::default_session_id();
            let cache = FileSessionCache::open(&root, &session_id).with_context(|| {
                format!(
                    "open session cache {session_id:?} -- set {} to a plain name to pick another session",
                    sendur_store::SESSION_ENV
                )
            })?;
            Ok(Box::new(cache))
        }
    }
}

/// The log lives beside the config file in use, so `--config` moves both.
fn log_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(LOG_FILE_NAME)
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Logs only ever go to a file: the TUI owns the terminal, so without a file
/// there is no logging at all. `RUST_LOG` wins over `[log].filter`.
fn setup_logging(default_filter: &str, path: &Path) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file = match open_log_file(path) {
        Ok(file) => file,
        Err(error) => {
            eprintln!("logging disabled: {error:#}");
            return;
        }
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
    if let Err(error) = installed {
        eprintln!("logging disabled: {error}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
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
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("sendur: review and approve lead outreach emails");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and API settings, then exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, LOG_FILE_NAME, log_path, open_log_file, parse_cli_args};
    use anyhow::Result;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/sendur-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/sendur.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/sendur.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--demo"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument \"--demo\""));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn log_file_follows_the_config_path() {
        assert_eq!(
            log_path(Path::new("/custom/sendur.toml")),
            PathBuf::from("/custom").join(LOG_FILE_NAME)
        );
        assert_eq!(
            log_path(Path::new("sendur.toml")),
            PathBuf::from(".").join(LOG_FILE_NAME)
        );
    }

    #[test]
    fn open_log_file_creates_missing_directories_and_truncates() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = log_path(&temp.path().join("nested").join("config.toml"));

        {
            let _file = open_log_file(&path)?;
        }
        fs::write(&path, "previous run")?;
        let _file = open_log_file(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "");
        Ok(())
    }

    #[test]
    fn open_log_file_reports_unusable_paths() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "")?;
        let error = open_log_file(&blocker.join(LOG_FILE_NAME))
            .expect_err("a file cannot hold the log directory");
        assert!(format!("{error:#}").contains("create log directory"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
