use crate::args::OutputFormat;
use corex_types::{Event, EventPayload};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

/// Render one event to stdout per the selected `OutputFormat`. `Ndjson`
/// emits the wire protocol's data line (§6.1) verbatim; `Text` renders a
/// short human summary, colored when stdout is a terminal.
pub fn render(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Ndjson => {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        }
        OutputFormat::Text => render_text(event),
    }
}

fn render_text(event: &Event) {
    let colored = std::io::stdout().is_terminal();
    let line = match &event.payload {
        EventPayload::Status { message } => format!("· {message}"),
        EventPayload::Thinking { text } => paint(colored, &format!("… {text}"), |s| s.dimmed().to_string()),
        EventPayload::Content { text } => text.clone(),
        EventPayload::ToolCall { tool_name, .. } => paint(colored, &format!("→ calling `{tool_name}`"), |s| s.cyan().to_string()),
        EventPayload::ToolResult { tool_name, status, error, .. } => match status {
            corex_types::ToolOutcome::Success => paint(colored, &format!("✓ `{tool_name}` succeeded"), |s| s.green().to_string()),
            corex_types::ToolOutcome::Error => paint(
                colored,
                &format!("✗ `{tool_name}` failed: {}", error.as_deref().unwrap_or("unknown error")),
                |s| s.red().to_string(),
            ),
        },
        EventPayload::PlanCreated { plan } => format!("plan created ({} tasks) for: {}", plan.tasks.len(), plan.goal),
        EventPayload::PlanRevised { plan } => format!("plan revised ({} tasks)", plan.tasks.len()),
        EventPayload::TaskStart { title, .. } => paint(colored, &format!("▶ {title}"), |s| s.bold().to_string()),
        EventPayload::TaskComplete { title, .. } => paint(colored, &format!("✓ {title}"), |s| s.green().to_string()),
        EventPayload::TaskFailed { title, .. } => paint(colored, &format!("✗ {title}"), |s| s.red().to_string()),
        EventPayload::ProgressUpdate { completed, total } => format!("progress: {completed}/{total}"),
        EventPayload::ReasoningDecision { action, reason } => paint(colored, &format!("  routed to {action}: {reason}"), |s| s.dimmed().to_string()),
        EventPayload::ConfirmRequired { operation, description, .. } => {
            paint(colored, &format!("? confirm '{operation}': {description}"), |s| s.yellow().to_string())
        }
        EventPayload::Error { kind, message } => paint(colored, &format!("error [{kind}]: {message}"), |s| s.red().bold().to_string()),
        EventPayload::Done { status, .. } => paint(colored, &format!("done: {status:?}"), |s| s.bold().to_string()),
        EventPayload::Ping => return,
    };
    println!("{line}");
}

fn paint(colored: bool, text: &str, apply: impl Fn(&str) -> String) -> String {
    if colored {
        apply(text)
    } else {
        text.to_string()
    }
}
