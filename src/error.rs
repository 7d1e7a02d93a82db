use thiserror::Error;

/// Failures that are the invoker's business rather than ours.
///
/// Anything else bubbling out of a command is treated as an internal error:
/// logged in full and answered with a short apology.
#[derive(Debug, Error)]
pub enum CogError {
    #[error("No match found for `{0}`.")]
    NoMatch(String),

    #[error("Too many matches for `{needle}`, be more specific:\n{}", .matches.join("\n"))]
    MoreThanOneMatch {
        needle: String,
        matches: Vec<String>,
    },

    #[error("{0}")]
    InvalidCommandArgs(String),

    #[error("{0}")]
    InvalidPerms(String),

    #[error("Failed to parse the sheet: {0}")]
    SheetParsing(String),

    #[error("No more targets could be found.")]
    NoMoreTargets,

    #[error("Remote request failed with status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

impl CogError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidCommandArgs(msg.into())
    }

    pub fn invalid_perms(msg: impl Into<String>) -> Self {
        Self::InvalidPerms(msg.into())
    }

    /// Whether the message is fit to show the invoking user as is.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::SheetParsing(_) | Self::Remote { .. } | Self::MissingConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_matches_lists_candidates() {
        let err = CogError::MoreThanOneMatch {
            needle: "tu".to_owned(),
            matches: vec!["Tun".to_owned(), "Nurundere".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "Too many matches for `tu`, be more specific:\nTun\nNurundere"
        );
    }

    #[test]
    fn internal_errors_are_hidden() {
        assert!(CogError::NoMoreTargets.is_user_facing());
        assert!(!CogError::MissingConfig("CATTLE_SHEET_ID".to_owned()).is_user_facing());
        assert!(!CogError::Remote {
            status: 404,
            body: String::new()
        }
        .is_user_facing());
    }
}
