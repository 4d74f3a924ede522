use crate::chat::message::{Message, Role, TranscriptGeneration};

/// Read-only view of a chat session handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSnapshot {
    pub generation: TranscriptGeneration,
    pub messages: Vec<Message>,
    pub sending: bool,
    pub progress_text: String,
    pub session_id: Option<String>,
    pub context_file: Option<String>,
}

/// Turns message markdown into markup that is safe to display.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str) -> String;
}

/// Renders markdown source as escaped HTML text without interpreting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl MarkdownRenderer for PlainTextRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut html = String::with_capacity(markdown.len());
        for ch in markdown.chars() {
            match ch {
                '&' => html.push_str("&amp;"),
                '<' => html.push_str("&lt;"),
                '>' => html.push_str("&gt;"),
                '"' => html.push_str("&quot;"),
                '\'' => html.push_str("&#39;"),
                '\n' => html.push_str("<br>"),
                _ => html.push(ch),
            }
        }
        html
    }
}

/// Renders markdown source for a terminal, dropping control characters other than newlines
/// and tabs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRenderer;

impl MarkdownRenderer for TerminalRenderer {
    fn render(&self, markdown: &str) -> String {
        markdown
            .chars()
            .filter(|ch| !ch.is_control() || matches!(ch, '\n' | '\t'))
            .collect()
    }
}

/// Incremental line output for a scrolling terminal.
///
/// Remembers how much of the transcript has been printed so each call returns only new lines;
/// a new generation (new chat, history load) reprints from the top.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    generation: Option<TranscriptGeneration>,
    printed: usize,
    last_progress: String,
    context_file: Option<String>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next update print the whole transcript again.
    pub fn reprint(&mut self) {
        self.generation = None;
    }

    pub fn render_updates<R: MarkdownRenderer>(
        &mut self,
        snapshot: &TranscriptSnapshot,
        renderer: &R,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        if self.generation != Some(snapshot.generation) {
            self.generation = Some(snapshot.generation);
            self.printed = 0;
            self.last_progress.clear();
            lines.push(match &snapshot.session_id {
                Some(id) => format!("-- session {id} --"),
                None => "-- new session --".to_string(),
            });
        }

        if snapshot.context_file != self.context_file {
            self.context_file.clone_from(&snapshot.context_file);
            lines.push(match &snapshot.context_file {
                Some(file) => format!("-- context: {file} --"),
                None => "-- context cleared --".to_string(),
            });
        }

        for message in snapshot.messages.iter().skip(self.printed) {
            lines.push(format!(
                "{}> {}",
                speaker(message.role),
                renderer.render(&message.content)
            ));
        }
        self.printed = snapshot.messages.len();

        if snapshot.sending
            && !snapshot.progress_text.is_empty()
            && snapshot.progress_text != self.last_progress
        {
            lines.push(format!("   ... {}", renderer.render(&snapshot.progress_text)));
        }
        self.last_progress.clone_from(&snapshot.progress_text);
        lines
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "bot",
    }
}
