//! `legit shell`: an interactive session with a background poll loop.

use std::io::Write;
use std::sync::Arc;

use legit_core::config::LegitConfig;
use legit_core::events::SessionEvent;
use legit_core::store::MemoryStore;
use legit_core::types::{EnrichedCommit, Oid};
use legit_core::{EditorSession, SaveOutcome, SessionSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::render;

const HELP: &str = "\
Commands:
  log                    list commits, newest first (* = checked out)
  show                   print the draft and the editor state
  diff [oid]             diff of the checked-out (or given) commit against its parent
  checkout <oid|head>    check out a commit by OID prefix
  edit <text>            replace the draft
  append <text>          append to the draft
  save                   write the draft to the branch tip
  external <text>        commit <text> directly to the store, as another writer
  help                   show this list
  quit                   leave the shell";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    Log,
    Show,
    Diff(Option<String>),
    Checkout(String),
    Edit(String),
    Append(String),
    Save,
    External(String),
    Help,
    Quit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = |name: &str| {
            if rest.is_empty() {
                Err(format!("usage: {} <{}>", word, name))
            } else {
                Ok(rest.to_string())
            }
        };

        match word {
            "" => Ok(Self::Empty),
            "log" => Ok(Self::Log),
            "show" => Ok(Self::Show),
            "diff" => Ok(Self::Diff((!rest.is_empty()).then(|| rest.to_string()))),
            "checkout" | "co" => argument("oid|head").map(Self::Checkout),
            // An empty replacement is a valid draft.
            "edit" => Ok(Self::Edit(rest.to_string())),
            "append" => argument("text").map(Self::Append),
            "save" => Ok(Self::Save),
            "external" => argument("text").map(Self::External),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command '{}', try 'help'", other)),
        }
    }
}

/// Handle the shell command. Returns `false` if the session could not start.
pub fn handle_shell(config: &LegitConfig, content: &str) -> bool {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            return false;
        }
    };
    runtime.block_on(run_shell(config, content))
}

async fn run_shell(config: &LegitConfig, content: &str) -> bool {
    let store = Arc::new(MemoryStore::new(config.paths()));
    store.seed(&config.branch, "Initial commit", content);

    let session = Arc::new(
        EditorSession::new(Arc::clone(&store), config).with_handler(|event: SessionEvent| {
            if let Some(line) = render::event_line(&event) {
                println!("  * {}", line);
            }
        }),
    );
    let poll_loop = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run().await }
    });

    println!(
        "Editing {} on branch '{}' (polling every {} ms). Type 'help' for commands.",
        config.file, config.branch, config.poll_interval_ms
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("legit> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        };

        match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => execute(&session, &store, config, command).await,
            Err(message) => eprintln!("{}", message),
        }
    }

    session.cancel();
    poll_loop.await.is_ok()
}

async fn execute(
    session: &EditorSession<MemoryStore>,
    store: &MemoryStore,
    config: &LegitConfig,
    command: ShellCommand,
) {
    match command {
        ShellCommand::Empty | ShellCommand::Quit => {}
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Log => {
            let snapshot = session.snapshot().await;
            if snapshot.history.is_empty() {
                println!("(no history yet)");
            }
            for line in render::history_lines(&snapshot) {
                println!("{}", line);
            }
        }
        ShellCommand::Show => {
            let snapshot = session.snapshot().await;
            println!("{}", render::status_line(&snapshot));
            println!("---");
            println!("{}", snapshot.draft);
            println!("---");
        }
        ShellCommand::Diff(target) => {
            let snapshot = session.snapshot().await;
            let entry = match target {
                Some(prefix) => resolve(&snapshot, &prefix).and_then(|oid| find(&snapshot, &oid)),
                None => snapshot
                    .selection
                    .oid()
                    .or(snapshot.head.as_ref())
                    .ok_or_else(|| "nothing checked out".to_string())
                    .and_then(|oid| find(&snapshot, oid)),
            };
            match entry {
                Ok(entry) => {
                    let segments = entry.diff();
                    println!("{} {}", entry.oid().short(), entry.record.summary());
                    println!("{}", render::diff_text(&segments));
                    println!("({})", render::stats_line(&segments));
                }
                Err(message) => eprintln!("{}", message),
            }
        }
        ShellCommand::Checkout(target) => {
            let snapshot = session.snapshot().await;
            match resolve(&snapshot, &target) {
                Ok(oid) => {
                    if let Err(e) = session.checkout(&oid).await {
                        eprintln!("{}", e);
                    }
                }
                Err(message) => eprintln!("{}", message),
            }
        }
        ShellCommand::Edit(text) => {
            if !session.edit(&text).await {
                eprintln!("read-only: check out the head to edit");
            }
        }
        ShellCommand::Append(text) => {
            if !session.append(&text).await {
                eprintln!("read-only: check out the head to edit");
            }
        }
        ShellCommand::Save => match session.save().await {
            Ok(SaveOutcome::Saved) => {}
            Ok(SaveOutcome::Rejected) => eprintln!("not at head, nothing written"),
            Err(e) => eprintln!("{}", e),
        },
        ShellCommand::External(text) => {
            let oid = store.commit(&config.branch, "External edit", &text);
            println!("committed {} outside the session", oid.short());
        }
    }
}

/// Resolve `head` or an OID prefix against the published history.
fn resolve(snapshot: &SessionSnapshot, target: &str) -> Result<Oid, String> {
    if target == "head" {
        return snapshot
            .head
            .clone()
            .ok_or_else(|| "no head yet".to_string());
    }
    let matches: Vec<&Oid> = snapshot
        .history
        .iter()
        .map(EnrichedCommit::oid)
        .filter(|oid| oid.as_str().starts_with(target))
        .collect();
    match matches.as_slice() {
        [oid] => Ok((*oid).clone()),
        [] => Err(format!("no commit matches '{}'", target)),
        _ => Err(format!("'{}' is ambiguous ({} commits)", target, matches.len())),
    }
}

fn find<'a>(snapshot: &'a SessionSnapshot, oid: &Oid) -> Result<&'a EnrichedCommit, String> {
    snapshot
        .history
        .iter()
        .find(|entry| entry.oid() == oid)
        .ok_or_else(|| format!("commit {} is not in the history", oid.short()))
}

#[cfg(test)]
mod tests {
    use legit_core::types::Selection;

    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse("  "), Ok(ShellCommand::Empty));
        assert_eq!(ShellCommand::parse("log"), Ok(ShellCommand::Log));
        assert_eq!(ShellCommand::parse("diff"), Ok(ShellCommand::Diff(None)));
        assert_eq!(
            ShellCommand::parse("diff abc12"),
            Ok(ShellCommand::Diff(Some("abc12".to_string())))
        );
        assert_eq!(
            ShellCommand::parse("append  two words "),
            Ok(ShellCommand::Append("two words".to_string()))
        );
        assert_eq!(ShellCommand::parse("edit"), Ok(ShellCommand::Edit(String::new())));
        assert_eq!(ShellCommand::parse("q"), Ok(ShellCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(ShellCommand::parse("checkout").is_err());
        assert!(ShellCommand::parse("external").is_err());
        assert!(ShellCommand::parse("frobnicate").is_err());
    }

    #[tokio::test]
    async fn test_resolve_prefixes() {
        let config = LegitConfig::default();
        let store = Arc::new(MemoryStore::new(config.paths()));
        let root = store.seed("main", "Initial commit", "Hello World");
        let head = store.commit("main", "Second", "Hello World!!");
        let session = EditorSession::new(Arc::clone(&store), &config);
        session.poll_once().await;
        let snapshot = session.snapshot().await;

        assert_eq!(resolve(&snapshot, "head"), Ok(head.clone()));
        assert_eq!(resolve(&snapshot, root.short()), Ok(root.clone()));
        assert_eq!(resolve(&snapshot, head.as_str()), Ok(head));
        assert!(resolve(&snapshot, "").is_err());
        assert!(resolve(&snapshot, "not-an-oid").is_err());
        assert_eq!(snapshot.selection, Selection::Commit(snapshot.head.clone().unwrap()));
    }
}
