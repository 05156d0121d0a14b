//! Domain error types
//!
//! User-facing failures of the teach pipeline. The `Display` text of each
//! variant is what the invoker sees, so keep messages complete sentences.

use thiserror::Error;

/// Errors surfaced by the question normalizer and the teach pipeline
#[derive(Debug, Error)]
pub enum DialogueError {
    /// The question carries inline content that cannot be matched
    #[error("Questions may not contain images or other rich content.")]
    InvalidQuestionKind,

    #[error("The question contains invalid or unsupported regular expression syntax.")]
    IllegalRegexp,

    #[error("Too many arguments. Wrap a question or answer containing spaces in quotes.")]
    TooManyArguments,

    #[error("Missing question or answer. Please check the command syntax.")]
    MissingQuestionOrAnswer,

    #[error("Options {0} cannot be used together.")]
    OptionsConflict(String),

    #[error("Invalid value for option {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("Unknown option {0}.")]
    UnknownOption(String),

    #[error("Insufficient authority to use option {0}.")]
    InsufficientAuthority(String),

    #[error("You do not have permission to {operation} dialogue {ids}.")]
    PermissionDenied { operation: String, ids: String },

    #[error("At most {0} dialogues can be addressed at once.")]
    TooManyTargets(usize),

    #[error("Dialogue {0} not found.")]
    NotFound(String),

    /// A collaborator (store, identity, assets) failed
    #[error("An error occurred while trying to {operation}.")]
    Upstream {
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DialogueError {
    pub fn upstream(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Upstream {
            operation: operation.into(),
            source,
        }
    }

    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure was caused by the invoker's input
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Upstream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_render() {
        let err = DialogueError::OptionsConflict("-d, -e".into());
        assert_eq!(err.to_string(), "Options -d, -e cannot be used together.");

        let err = DialogueError::PermissionDenied {
            operation: "modify".into(),
            ids: "1, 2".into(),
        };
        assert_eq!(
            err.to_string(),
            "You do not have permission to modify dialogue 1, 2."
        );
    }

    #[test]
    fn test_upstream_is_not_user_error() {
        let err = DialogueError::upstream("create", anyhow::anyhow!("disk full"));
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "An error occurred while trying to create.");
        assert!(DialogueError::IllegalRegexp.is_user_error());
    }
}
