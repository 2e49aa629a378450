//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("chromedriver failed to start: {0}")]
    DriverStartup(String),

    #[error("chromedriver health check failed after {0} attempts")]
    DriverHealthCheck(usize),

    #[error("WebDriver error: {error} - {message}")]
    WebDriver { error: String, message: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Unexpected page structure: {0}")]
    Structure(String),

    #[error("No visible dialog after choosing menu option '{0}'")]
    NoDialog(String),

    #[error("Unknown theme '{0}', expected 'light' or 'dark'")]
    UnknownTheme(String),

    #[error("No alert is open")]
    NoAlert,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether a later attempt at the same query may succeed once the page
    /// has finished rendering.
    pub fn is_transient(&self) -> bool {
        match self {
            E2eError::ElementNotFound(_) | E2eError::NoDialog(_) | E2eError::NoAlert => true,
            E2eError::WebDriver { error, .. } => matches!(
                error.as_str(),
                "stale element reference"
                    | "element not interactable"
                    | "element click intercepted"
            ),
            _ => false,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(E2eError::ElementNotFound("#menu".into()).is_transient());
        assert!(E2eError::NoAlert.is_transient());
        assert!(E2eError::WebDriver {
            error: "stale element reference".into(),
            message: String::new(),
        }
        .is_transient());

        assert!(!E2eError::Structure("8 items".into()).is_transient());
        assert!(!E2eError::Timeout("dialog".into()).is_transient());
        assert!(!E2eError::WebDriver {
            error: "invalid session id".into(),
            message: String::new(),
        }
        .is_transient());
    }
}
