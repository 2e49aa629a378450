//! Light/dark theme toggle
//!
//! The active theme lives in the `data-bs-theme` attribute of `<body>`. The
//! footer carries two toggle buttons, only one of which is shown at a time:
//! clicking the shown one switches the theme and swaps their visibility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::browser::{Browser, By, ElementRef};
use crate::error::{E2eError, E2eResult};
use crate::wait::Settle;

/// Attribute on `<body>` holding the active theme
pub const THEME_ATTRIBUTE: &str = "data-bs-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn other(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(E2eError::UnknownTheme(other.to_string())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme currently applied to the page, if the attribute is set
pub async fn current_theme(page: &dyn Browser) -> E2eResult<Option<Theme>> {
    let body = page.find(&By::tag("body")).await?;
    page.attribute(&body, THEME_ATTRIBUTE)
        .await?
        .map(|value| value.parse())
        .transpose()
}

/// The toggle button currently shown in the footer.
///
/// Fails with [`E2eError::Structure`] unless the footer has exactly two
/// buttons with exactly one of them displayed.
pub async fn toggle_control(page: &dyn Browser) -> E2eResult<ElementRef> {
    let footer = page.find(&By::tag("footer")).await?;
    let buttons = page.find_all_in(&footer, &By::tag("button")).await?;
    if buttons.len() != 2 {
        return Err(E2eError::Structure(format!(
            "theme toggle has {} buttons, expected 2",
            buttons.len()
        )));
    }

    let first = page.is_displayed(&buttons[0]).await?;
    let second = page.is_displayed(&buttons[1]).await?;
    match (first, second) {
        (true, false) => Ok(buttons[0].clone()),
        (false, true) => Ok(buttons[1].clone()),
        (true, true) => Err(E2eError::Structure(
            "both theme toggle buttons are visible".to_string(),
        )),
        (false, false) => Err(E2eError::Structure(
            "neither theme toggle button is visible".to_string(),
        )),
    }
}

/// Click whichever toggle button is shown, switching the theme.
pub async fn toggle_theme(page: &dyn Browser, settle: Settle) -> E2eResult<()> {
    let before = current_theme(page).await?;
    let button = toggle_control(page).await?;
    page.click(&button).await?;

    match before {
        Some(theme) => {
            wait_for_theme(page, theme.other(), settle).await?;
        }
        None => settle.pause().await,
    }
    Ok(())
}

/// Make `theme` the active theme.
///
/// Returns `false` without touching the toggle when the theme is already
/// active, `true` when a click was needed.
pub async fn set_theme(page: &dyn Browser, theme: Theme, settle: Settle) -> E2eResult<bool> {
    if current_theme(page).await? == Some(theme) {
        debug!("Theme is already {}", theme);
        return Ok(false);
    }

    let button = toggle_control(page).await?;
    page.click(&button).await?;
    wait_for_theme(page, theme, settle).await?;

    info!("Theme set to {}", theme);
    Ok(true)
}

async fn wait_for_theme(page: &dyn Browser, theme: Theme, settle: Settle) -> E2eResult<()> {
    settle
        .wait_for(&format!("theme {}", theme), move || async move {
            Ok((current_theme(page).await? == Some(theme)).then_some(()))
        })
        .await?;
    Ok(())
}
