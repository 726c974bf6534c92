use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use e4l_core::SessionEvent;
use e4l_core::eligibility;
use e4l_core::model::Questionnaire;
use services::{ApiConfig, AppServices, Clock, SessionRuntime, SessionStore};
use storage::repository::{SessionDocumentRepository, Storage};

mod telemetry;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str, command: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag, command } => write!(f, "{command} requires {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum InputError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, line: usize, source: serde_json::Error },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            InputError::Parse { path, line, source } => {
                write!(f, "{}:{line}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InputError::Read { source, .. } => Some(source),
            InputError::Parse { source, .. } => Some(source),
        }
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- replay --events <file> [--catalog <file>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- show   [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- reset  [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- submit [--db <sqlite_url>] [--api <url>] [--timeout <secs>] [--kid]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://e4l.sqlite3");
    eprintln!("  --api http://localhost:8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  E4L_DB_URL, E4L_API_URL, E4L_API_TIMEOUT_SECS, E4L_LOG (or RUST_LOG)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Replay,
    Show,
    Reset,
    Submit,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "replay" => Some(Self::Replay),
            "show" => Some(Self::Show),
            "reset" => Some(Self::Reset),
            "submit" => Some(Self::Submit),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::Show => "show",
            Self::Reset => "reset",
            Self::Submit => "submit",
        }
    }
}

struct Args {
    db_url: String,
    api: ApiConfig,
    events: Option<PathBuf>,
    catalog: Option<PathBuf>,
    kid: bool,
}

impl Args {
    fn parse(command: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("E4L_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://e4l.sqlite3".into(), normalize_sqlite_url);
        let mut api = ApiConfig::from_env();
        let mut events = None;
        let mut catalog = None;
        let mut kid = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--api" => api.base_url = require_value(args, "--api")?,
                "--timeout" => {
                    let value = require_value(args, "--timeout")?;
                    let secs: u64 = value
                        .parse()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or_else(|| ArgsError::InvalidTimeout { raw: value.clone() })?;
                    api.timeout = Duration::from_secs(secs);
                }
                "--events" => events = Some(PathBuf::from(require_value(args, "--events")?)),
                "--catalog" => catalog = Some(PathBuf::from(require_value(args, "--catalog")?)),
                "--kid" => kid = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::Replay && events.is_none() {
            return Err(ArgsError::MissingFlag {
                flag: "--events",
                command: command.name(),
            });
        }

        Ok(Self {
            db_url,
            api,
            events,
            catalog,
            kid,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Accepts either a JSON array of events or one event per line.
fn read_events(path: &Path) -> Result<Vec<SessionEvent>, InputError> {
    let raw = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        });
    }

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| InputError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

fn read_catalog(path: &Path) -> Result<Questionnaire, InputError> {
    let raw = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        line: source.line(),
        source,
    })
}

async fn replay(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(events_path) = args.events.as_deref() else {
        return Err(ArgsError::MissingFlag {
            flag: "--events",
            command: "replay",
        }
        .into());
    };
    let events = read_events(events_path)?;
    let catalog = args.catalog.as_deref().map(read_catalog).transpose()?;

    let store = SessionStore::open(Arc::clone(&storage.sessions), Clock::default()).await;
    let (mut runtime, _queue) = SessionRuntime::new(store);
    let mut changed = 0;
    for event in events.iter().cloned() {
        if runtime.dispatch(event).await {
            changed += 1;
        }
    }
    tracing::info!(events = events.len(), changed, "replay finished");

    let state = runtime.state();
    println!("{}", serde_json::to_string_pretty(&state.session)?);
    if let Some(result) = &state.energy.result {
        println!("energy: {}", result.total_score);
    }
    if let Some(session_id) = &state.submission.session_id {
        println!("session id: {session_id}");
    }
    if let Some(breach) = state.value_limit.message() {
        println!("blocked: {breach}");
    }
    if let Some(catalog) = catalog {
        for (index, question) in catalog.questions().iter().enumerate() {
            let ready = eligibility::can_advance(state, &catalog, index);
            let score = state
                .energy
                .result
                .as_ref()
                .and_then(|result| result.score_for(&question.name))
                .map(|score| format!(" ({score})"))
                .unwrap_or_default();
            println!(
                "[{}] {}: {}{score}",
                index,
                question.name,
                if ready { "ok" } else { "incomplete" }
            );
        }
    }
    Ok(())
}

async fn show(storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
    match storage.sessions.load_session().await? {
        Some(document) => {
            println!("saved at {}", document.saved_at.to_rfc3339());
            println!("{}", serde_json::to_string_pretty(&document.session)?);
        }
        None => println!("no saved session"),
    }
    Ok(())
}

async fn submit(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let app = AppServices::new_sqlite(&args.db_url, Clock::default(), &args.api).await?;
    let mut flow = app.into_flow();
    flow.load(args.kid).await?;
    flow.submit().await?;
    flow.settle().await;

    let state = flow.state();
    match (&state.submission.session_id, state.submission.status.error()) {
        (_, Some(err)) => return Err(err.clone().into()),
        (Some(session_id), None) => println!("session id: {session_id}"),
        (None, None) => println!("submission did not complete"),
    }
    if let Some(err) = state.seminar.status.error() {
        eprintln!("seminar code could not be checked: {err}");
    } else if let Some(verdict) = &state.seminar.verdict {
        println!(
            "seminar code: {}",
            if verdict.is_valid { "valid" } else { "invalid" }
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let log_filter = std::env::var("E4L_LOG").unwrap_or_else(|_| "warn".into());
    telemetry::init(&log_filter)?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;

    match cmd {
        Command::Replay => {
            let storage = Storage::sqlite(&parsed.db_url).await?;
            replay(&storage, &parsed).await
        }
        Command::Show => {
            let storage = Storage::sqlite(&parsed.db_url).await?;
            show(&storage).await
        }
        Command::Reset => {
            let storage = Storage::sqlite(&parsed.db_url).await?;
            storage.sessions.clear_session().await?;
            println!("saved session removed");
            Ok(())
        }
        Command::Submit => submit(&parsed).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(command: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(command, &mut iter)
    }

    #[test]
    fn replay_requires_events() {
        assert!(matches!(
            parse(Command::Replay, &[]),
            Err(ArgsError::MissingFlag { flag: "--events", .. })
        ));
        let args = parse(Command::Replay, &["--events", "events.jsonl", "--db", "sqlite::memory:"])
            .unwrap();
        assert_eq!(args.events.as_deref(), Some(Path::new("events.jsonl")));
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(matches!(
            parse(Command::Show, &["--verbose"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(Command::Submit, &["--timeout", "0"]),
            Err(ArgsError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            parse(Command::Show, &["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }

    #[test]
    fn relative_db_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/e4l.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/e4l.sqlite3"));
    }

    #[test]
    fn reads_event_lines() {
        let dir = std::env::temp_dir().join(format!("e4l-events-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("events.jsonl");
        std::fs::write(
            &path,
            "{\"type\": \"select_answer\", \"answer_id\": 1}\n\n{\"type\": \"restart_session\"}\n",
        )
        .unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], SessionEvent::RestartSession);

        std::fs::write(&path, "{\"type\": \"select_answer\"}\n").unwrap();
        assert!(matches!(
            read_events(&path),
            Err(InputError::Parse { line: 1, .. })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
