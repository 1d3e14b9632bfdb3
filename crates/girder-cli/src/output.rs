//! Shared output layer: pretty for humans, compact text for pipes, stable
//! JSON for scripts.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--json`
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. user config `output`
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use girder_core::error::{Coded, Notice};
use serde::Serialize;
use std::io::{self, Write};

pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Pretty,
    Text,
    Json,
}

impl OutputMode {
    /// Map the resolved config string onto a mode. Unknown values fall back
    /// to text, which is safe for pipes.
    pub fn from_resolved(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Text,
        }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A structured error with an optional suggestion and machine code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
            kind: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
            kind: None,
        }
    }
}

impl From<&Notice> for CliError {
    fn from(notice: &Notice) -> Self {
        let kind = serde_json::to_value(notice.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        Self {
            message: notice.message.clone(),
            suggestion: notice.hint.map(str::to_string),
            error_code: Some(notice.code.to_string()),
            kind,
        }
    }
}

/// Render `value` as JSON, or hand the writer to `human_fn` for pretty and
/// text modes.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            human_fn(value, &mut out)?;
        }
    }
    Ok(())
}

/// Like [`render`] with separate text and pretty renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

pub fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(suggestion) = &error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render an error to stderr.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(mode, error, &mut out)
}

/// Render a coded library error to stderr and turn it into an `anyhow`
/// error for the exit status.
pub fn fail<E: Coded + ?Sized>(mode: OutputMode, err: &E) -> anyhow::Error {
    let notice = Notice::from_error(err);
    if let Err(render_err) = render_error(mode, &CliError::from(&notice)) {
        tracing::warn!(error = %render_err, "failed to render error");
    }
    anyhow::anyhow!("{notice}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::error::ErrorCode;
    use std::fmt;

    #[derive(Debug)]
    struct Gone;

    impl fmt::Display for Gone {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("content p-1 not found")
        }
    }

    impl Coded for Gone {
        fn code(&self) -> ErrorCode {
            ErrorCode::ContentNotFound
        }
    }

    #[test]
    fn resolved_strings_map_to_modes() {
        assert_eq!(OutputMode::from_resolved("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_resolved("pretty"), OutputMode::Pretty);
        assert_eq!(OutputMode::from_resolved("text"), OutputMode::Text);
        assert_eq!(OutputMode::from_resolved("???"), OutputMode::Text);
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Pretty.is_json());
    }

    #[test]
    fn notice_becomes_cli_error_with_kind() {
        let err = CliError::from(&Notice::from_error(&Gone));
        assert_eq!(err.error_code.as_deref(), Some("E2001"));
        assert_eq!(err.kind.as_deref(), Some("not_found"));
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn json_error_is_wrapped() {
        let mut buf = Vec::new();
        write_error(
            OutputMode::Json,
            &CliError::with_details("bad", "fix it", "E2004"),
            &mut buf,
        )
        .expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["error"]["error_code"], "E2004");
        assert_eq!(value["error"]["suggestion"], "fix it");
    }

    #[test]
    fn text_error_shows_code_and_suggestion() {
        let mut buf = Vec::new();
        write_error(
            OutputMode::Text,
            &CliError::with_details("bad", "fix it", "E2004"),
            &mut buf,
        )
        .expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("error[E2004]: bad"));
        assert!(text.contains("suggestion: fix it"));

        let mut plain = Vec::new();
        write_error(OutputMode::Pretty, &CliError::new("oops"), &mut plain).expect("write");
        assert_eq!(String::from_utf8(plain).expect("utf8"), "error: oops\n");
    }

    #[test]
    fn pretty_helpers_align() {
        let mut buf = Vec::new();
        pretty_section(&mut buf, "Post").expect("section");
        pretty_kv(&mut buf, "likes", "3").expect("kv");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Post\n----"));
        assert!(text.contains("likes:       3"));
    }
}
