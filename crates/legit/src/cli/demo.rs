//! `legit demo`: a scripted walkthrough against an in-memory store.

use std::sync::Arc;

use legit_core::config::LegitConfig;
use legit_core::events::SessionEvent;
use legit_core::store::MemoryStore;
use legit_core::{EditorSession, LegitError, SaveOutcome};

use super::render;

/// Handle the demo command.
pub fn handle_demo(config: &LegitConfig) -> bool {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            return false;
        }
    };
    match runtime.block_on(run_demo(config)) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Demo failed: {}", e);
            false
        }
    }
}

async fn run_demo(config: &LegitConfig) -> Result<(), LegitError> {
    let store = Arc::new(MemoryStore::new(config.paths()));
    let session = EditorSession::new(Arc::clone(&store), config).with_handler(|event: SessionEvent| {
        if let Some(line) = render::event_line(&event) {
            println!("    * {}", line);
        }
    });

    step("Bootstrap: seed one commit and poll");
    let root = store.seed(&config.branch, "Initial commit", "Hello World");
    session.poll_once().await;
    print_state(&session).await;

    step("Edit the draft and save");
    session.edit("Hello World!!").await;
    session.save().await?;
    let snapshot = session.snapshot().await;
    if let Some(entry) = snapshot.history.first() {
        println!("  diff of {}: {}", entry.oid().short(), render::diff_text(&entry.diff()));
    }
    print_state(&session).await;

    step("Browse the root commit");
    session.checkout(&root).await?;
    let accepted = session.append(" (ignored)").await;
    println!("  edit accepted: {}", accepted);
    print_state(&session).await;

    step("Save while viewing the root");
    let writes = store.write_count();
    let outcome = session.save().await?;
    println!(
        "  rejected: {}, writes before {} after {}",
        outcome == SaveOutcome::Rejected,
        writes,
        store.write_count()
    );

    step("Another writer advances the branch");
    let head = session.snapshot().await.head;
    if let Some(head) = head {
        session.checkout(&head).await?;
    }
    store.commit(&config.branch, "External edit", "Hello from elsewhere");
    session.poll_once().await;
    print_state(&session).await;

    Ok(())
}

fn step(title: &str) {
    println!();
    println!("== {} ==", title);
}

async fn print_state(session: &EditorSession<MemoryStore>) {
    let snapshot = session.snapshot().await;
    for line in render::history_lines(&snapshot) {
        println!("  {}", line);
    }
    println!("  {}", render::status_line(&snapshot));
    println!("  draft: {:?}", snapshot.draft);
}
