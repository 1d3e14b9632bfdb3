use crate::output::CliError;
use girder_core::command::CommandId;
use girder_core::model::ContentId;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_ACTOR_LEN: usize = 64;
pub const MAX_ID_LEN: usize = 96;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(
            format!("invalid {} '{}': {}", self.field, self.value, self.reason),
            self.suggestion.clone(),
            self.code,
        )
    }
}

pub fn validate_title(s: &str) -> Result<(), ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            "title",
            s,
            "must not be empty",
            "provide a non-empty --title",
            "invalid_title",
        ));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            s,
            format!("must be <= {MAX_TITLE_LEN} characters"),
            "shorten the title",
            "invalid_title",
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "title",
            s,
            "must not contain control characters",
            "remove control characters from the title",
            "invalid_title",
        ));
    }
    Ok(())
}

/// Content ids are `<prefix>-<hex>` for local drafts; feeds seeded elsewhere
/// may use any short token of letters, digits, `-`, `_` and `.`.
pub fn validate_content_id(s: &str) -> Result<ContentId, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::new(
            "content_id",
            s,
            "must not be empty",
            "use an id from `gd list`, like p-1a2b3c4d5e6f",
            "invalid_content_id",
        ));
    }
    if value.len() > MAX_ID_LEN
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::new(
            "content_id",
            s,
            "must be letters, digits, '-', '_' or '.'",
            "copy the id exactly as `gd list` prints it",
            "invalid_content_id",
        ));
    }
    Ok(ContentId::new(value))
}

pub fn validate_command_id(s: &str) -> Result<CommandId, ValidationError> {
    s.parse::<CommandId>().map_err(|_| {
        ValidationError::new(
            "command_id",
            s,
            "must look like cmd-<n>",
            "run `gd ledger list` to see command ids",
            "invalid_command_id",
        )
    })
}

pub fn validate_actor(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().count() > MAX_ACTOR_LEN {
        return Err(ValidationError::new(
            "actor",
            s,
            format!("must be 1..={MAX_ACTOR_LEN} characters"),
            "use a short handle like ana or site-lead",
            "invalid_actor",
        ));
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::new(
            "actor",
            s,
            "must not contain whitespace",
            "use dashes instead of spaces",
            "invalid_actor",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles() {
        assert!(validate_title("Crane lift plan").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
        assert!(validate_title("bad\u{7}bell").is_err());
    }

    #[test]
    fn content_ids() {
        assert_eq!(
            validate_content_id(" p-1a2b3c ").expect("ok"),
            ContentId::new("p-1a2b3c")
        );
        assert!(validate_content_id("c-seed-0").is_ok());
        assert!(validate_content_id("").is_err());
        assert!(validate_content_id("p 1").is_err());
        assert!(validate_content_id("p/../../etc").is_err());
    }

    #[test]
    fn command_ids() {
        assert_eq!(validate_command_id("cmd-7").expect("ok"), CommandId::new(7));
        assert_eq!(validate_command_id("7").expect("ok"), CommandId::new(7));
        let err = validate_command_id("seven").unwrap_err();
        assert_eq!(err.code, "invalid_command_id");
    }

    #[test]
    fn actors() {
        assert!(validate_actor("ana").is_ok());
        assert!(validate_actor("").is_err());
        assert!(validate_actor("ana maria").is_err());
        assert!(validate_actor(&"a".repeat(MAX_ACTOR_LEN + 1)).is_err());
    }

    #[test]
    fn cli_error_carries_code() {
        let err = validate_content_id("").unwrap_err().to_cli_error();
        assert_eq!(err.error_code.as_deref(), Some("invalid_content_id"));
        assert!(err.message.contains("content_id"));
    }
}
