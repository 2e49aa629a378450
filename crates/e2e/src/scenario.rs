//! Declarative YAML scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::theme::Theme;

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Window size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 800,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Dialog id meaning "this entry must not open a dialog"
pub const NO_DIALOG: &str = "none";

/// A single step in a scenario.
///
/// Selectors use the shorthand understood by [`crate::browser::By::parse`]:
/// `#id`, `.class`, `tag`, `[name="value"]`, XPath starting with `./` or
/// `//`, and anything else as CSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL; relative paths resolve against the base URL
    Navigate {
        #[serde(default)]
        url: Option<String>,
    },

    SetTheme {
        theme: Theme,
    },

    ToggleTheme,

    /// Choose the first menu entry containing `option`.
    ///
    /// `dialog` names the modal id the entry must open, or `none` when it
    /// must open nothing.
    ChooseMenu {
        option: String,
        #[serde(default)]
        dialog: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        in_dialog: bool,
    },

    /// Type text into an element
    Type {
        selector: String,
        text: String,
        #[serde(default)]
        in_dialog: bool,
    },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        in_dialog: bool,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        attribute: Option<AttributeAssertion>,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Close the open dialog through its Close button
    CloseDialog,

    AcceptAlert {
        #[serde(default)]
        text_contains: Option<String>,
    },

    /// Load the example records from the Load File dialog
    LoadExampleRecords {
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        first_contains: Option<String>,
    },

    ExpectWindows {
        count: usize,
    },

    /// Close every window except the main one
    CloseOtherWindows,

    /// Wait for a fixed amount of time (use sparingly)
    Sleep {
        ms: u64,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeAssertion {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
}

impl Step {
    /// Short label used in step results and logs
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate:{}", url.as_deref().unwrap_or("/")),
            Step::SetTheme { theme } => format!("set_theme:{}", theme),
            Step::ToggleTheme => "toggle_theme".to_string(),
            Step::ChooseMenu { option, .. } => format!("choose_menu:{}", option),
            Step::Click { selector, .. } => format!("click:{}", selector),
            Step::Type { selector, .. } => format!("type:{}", selector),
            Step::Assert { selector, .. } => format!("assert:{}", selector),
            Step::CloseDialog => "close_dialog".to_string(),
            Step::AcceptAlert { .. } => "accept_alert".to_string(),
            Step::LoadExampleRecords { .. } => "load_example_records".to_string(),
            Step::ExpectWindows { count } => format!("expect_windows:{}", count),
            Step::CloseOtherWindows => "close_other_windows".to_string(),
            Step::Sleep { ms } => format!("sleep:{}ms", ms),
            Step::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, ordered by file name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}
