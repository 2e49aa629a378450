//! PAM E2E Test Framework
//!
//! This crate drives the PAM password manager UI through a browser and
//! provides:
//! - Helpers for the light/dark theme toggle and the main menu
//! - Page objects for the PAM dialogs, record editor and help window
//! - A WebDriver client and chromedriver process management
//! - Declarative YAML scenarios and a runner that reports JSON results
//! - An in-memory page for exercising all of the above without a browser
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                  │
//! │    ├── start_driver() -> DriverHandle (chromedriver)         │
//! │    ├── WebDriverSession::start() -> impl Browser            │
//! │    └── execute(page, scenario) -> ScenarioResult            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Helpers (over &dyn Browser)                                │
//! │    ├── theme: set_theme, toggle_theme                       │
//! │    ├── menu: choose_menu_option -> Option<dialog>           │
//! │    ├── dom: parent, children, inner_html                    │
//! │    └── pam: Dialog, RecordEditor, load_example_records      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags, viewport                    │
//! │    └── steps: navigate | set_theme | choose_menu | click    │
//! │               | type | assert | close_dialog | ...          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod dom;
pub mod driver;
pub mod error;
pub mod menu;
pub mod mock;
pub mod pam;
pub mod runner;
pub mod scenario;
pub mod theme;
pub mod wait;
pub mod webdriver;

pub use browser::{Browser, By, ElementRef};
pub use error::{E2eError, E2eResult};
pub use menu::{choose_menu_option, MenuOption};
pub use runner::TestRunner;
pub use scenario::{Scenario, Step};
pub use theme::{set_theme, Theme};
pub use wait::Settle;
