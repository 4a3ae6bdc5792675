//! CLI output formatting

use crate::{
    core::{LoadError, LoadErrors},
    execution::{DispatchEvent, DispatchRequest},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar for a dispatch run, drawn on stderr
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(template) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(template.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a single load error for display
pub fn format_load_error(error: &LoadError) -> String {
    let kind = match error {
        LoadError::ParseError { .. } => "ParseError",
        LoadError::MissingField { .. } => "MissingField",
        LoadError::DuplicateLabel { .. } => "DuplicateLabel",
        LoadError::EmptyCommandList { .. } => "EmptyCommandList",
        LoadError::NoAgentConstraint { .. } => "NoAgentConstraint",
    };
    format!("{} {}", style(format!("[{}]", kind)).red(), error)
}

/// Format every load error, one per line
pub fn format_load_errors(errors: &LoadErrors) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", format_load_error(e)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a dispatch request as a short block
pub fn format_request(request: &DispatchRequest) -> String {
    let constraints = request
        .constraints
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");

    let mut flags = vec![request.container.pull_policy.as_str().to_string()];
    if request.container.privileged {
        flags.push("privileged".to_string());
    }
    if request.retry_automatic {
        flags.push("auto-retry".to_string());
    }

    let mut out = format!(
        "{} {}\n    image: {} ({})\n    agents: {}",
        style(format!("{:>3}.", request.sequence + 1)).dim(),
        style(&request.label).bold(),
        style(&request.container.image).cyan(),
        flags.join(", "),
        constraints
    );
    if !request.container.mounts.is_empty() {
        out.push_str(&format!("\n    mounts: {}", request.container.mounts.join(", ")));
    }
    for command in &request.commands {
        out.push_str(&format!("\n    $ {}", command));
    }
    out
}

/// Format a dispatch event for display
pub fn format_dispatch_event(event: &DispatchEvent) -> String {
    match event {
        DispatchEvent::RunStarted {
            run_id,
            total,
            strategy,
        } => format!(
            "{} Dispatching {} step(s) {} ({})",
            ROCKET,
            style(total).cyan(),
            style(strategy).dim(),
            style(&run_id.to_string()[..8]).dim()
        ),
        DispatchEvent::RequestStarted { label, .. } => {
            format!("{} {}", INFO, style(label).cyan())
        }
        DispatchEvent::RequestDispatched { label, .. } => {
            format!("{} {}", CHECK, style(label).green())
        }
        DispatchEvent::RequestFailed { label, error, .. } => {
            format!("{} {}: {}", CROSS, style(label).red(), style(error).dim())
        }
        DispatchEvent::RunFinished {
            dispatched, failed, ..
        } => {
            if *failed == 0 {
                format!("{} {} step(s) dispatched", CHECK, style(dispatched).green())
            } else {
                format!(
                    "{} {} dispatched, {} failed",
                    CROSS,
                    style(dispatched).green(),
                    style(failed).red()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::load;

    #[test]
    fn test_format_load_error_names_kind() {
        let error = LoadError::NoAgentConstraint {
            index: 3,
            label: "deploy".to_string(),
        };
        let text = console::strip_ansi_codes(&format_load_error(&error)).to_string();
        assert!(text.starts_with("[NoAgentConstraint] Step 3"));
    }

    #[test]
    fn test_format_request_lists_commands() {
        let yaml = r#"
steps:
  - label: "build"
    commands: ["make", "make install"]
    agents: { os: linux }
    plugins:
      - docker: { image: "gcc", privileged: true }
"#;
        let pipeline = load(yaml).unwrap();
        let request = DispatchRequest::from_step(&pipeline.steps()[0], 0);
        let text = console::strip_ansi_codes(&format_request(&request)).to_string();

        assert!(text.contains("image: gcc (if-absent, privileged)"));
        assert!(text.contains("agents: os=linux"));
        assert!(text.contains("$ make install"));
    }
}
