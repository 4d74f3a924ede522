use std::process::ExitCode;
use std::sync::Arc;

use nanodash::chat::{
    ChatSession, FileSelected, NavigationListener, PageChanged, TerminalRenderer,
    TranscriptPrinter,
};
use nanodash::command::Command;
use nanodash::settings::SettingsStore;
use nanodash_backend::create_backend;
use nanodash_storage::{JsonFileStore, KeyValueStore, MemoryStore};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let settings = SettingsStore::load();
    let state_path = settings.state_file_path();
    let store: Arc<dyn KeyValueStore> = match JsonFileStore::open(&state_path) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            tracing::warn!(
                path = ?state_path,
                error = %error,
                "state file unavailable, the session id will not survive a restart"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let backend = match create_backend(settings.to_backend_config()) {
        Ok(backend) => backend,
        Err(error) => {
            tracing::error!(error = %error, "failed to create dashboard backend");
            return ExitCode::FAILURE;
        }
    };

    let mut session = ChatSession::new(backend, store);
    let mut printer = TranscriptPrinter::new();
    let renderer = TerminalRenderer;

    session.load_history().await;
    print_updates(&mut printer, &session, &renderer);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(error) => {
                        tracing::error!(error = %error, "failed to read from stdin");
                        return ExitCode::FAILURE;
                    }
                };

                match Command::parse(&line) {
                    Command::Quit => break,
                    Command::NewChat => {
                        session.new_chat().await;
                    }
                    Command::SelectFile(path) => session.on_file_selected(&FileSelected { path }),
                    Command::ChangePage(page) => session.on_page_changed(&PageChanged::new(page)),
                    Command::ClearContext => session.clear_context(),
                    Command::History => printer.reprint(),
                    Command::Send(message) => {
                        if !session.send(&message) && session.is_sending() {
                            println!("   (still waiting for the previous reply)");
                        }
                    }
                }
            }
            Some(event) = session.next_event(), if session.is_sending() => {
                session.apply_event(event);
            }
        }

        print_updates(&mut printer, &session, &renderer);
    }

    ExitCode::SUCCESS
}

fn print_updates(printer: &mut TranscriptPrinter, session: &ChatSession, renderer: &TerminalRenderer) {
    for line in printer.render_updates(&session.snapshot(), renderer) {
        println!("{line}");
    }
}
