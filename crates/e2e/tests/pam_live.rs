//! Checks against a running PAM instance in a real Chrome.
//!
//! Needs chromedriver (`CHROMEDRIVER`, default on `PATH`) and PAM served at
//! `PAM_URL` (default http://localhost:8081/). Marked ignored; run with
//! `cargo test -p pam-e2e --test pam_live -- --ignored --test-threads=1`.

use std::path::PathBuf;
use std::time::Duration;

use pam_e2e::driver::{driver_available, DriverConfig, DriverHandle};
use pam_e2e::menu::{self, MenuOption};
use pam_e2e::pam::{self, RecordEditor};
use pam_e2e::theme::{self, Theme};
use pam_e2e::webdriver::{BrowserOptions, WebDriverSession};
use pam_e2e::{Browser, By, Settle};

struct Live {
    session: WebDriverSession,
    _driver: DriverHandle,
}

fn pam_url() -> String {
    std::env::var("PAM_URL").unwrap_or_else(|_| pam::DEFAULT_URL.to_string())
}

fn settle() -> Settle {
    Settle::poll()
}

/// Start chromedriver and a browser on PAM, or explain why not
async fn live() -> Option<Live> {
    let binary = PathBuf::from(std::env::var("CHROMEDRIVER").unwrap_or_else(|_| "chromedriver".into()));
    if !driver_available(&binary) {
        eprintln!("Skipping: {} not available", binary.display());
        return None;
    }

    let url = pam_url();
    if reqwest::get(&url).await.is_err() {
        eprintln!("Skipping: PAM not reachable at {}", url);
        return None;
    }

    let driver = DriverHandle::spawn(DriverConfig {
        binary_path: binary,
        ..Default::default()
    })
    .await
    .expect("chromedriver starts");

    let options = BrowserOptions::from_env();
    let session = WebDriverSession::start(driver.base_url(), &options)
        .await
        .expect("browser session starts");
    session.goto(&url).await.expect("PAM loads");

    Some(Live {
        session,
        _driver: driver,
    })
}

async fn finish(live: Live) {
    tokio::time::sleep(Duration::from_millis(250)).await;
    live.session.quit().await.expect("session ends");
}

#[tokio::test]
#[ignore]
async fn chrome_loads_pam() {
    let Some(live) = live().await else { return };
    let page = &live.session;

    let menu = page.find(&By::id(menu::MENU_TRIGGER_ID)).await.unwrap();
    assert!(page.is_displayed(&menu).await.unwrap());
    assert!(theme::current_theme(page).await.unwrap().is_some());

    finish(live).await;
}

#[tokio::test]
#[ignore]
async fn menu_entries_match_their_dialogs() {
    let Some(live) = live().await else { return };
    let page = &live.session;

    for wanted in [Theme::Light, Theme::Dark] {
        theme::set_theme(page, wanted, settle()).await.unwrap();

        for option in MenuOption::ALL {
            if option.dialog_id().is_none() {
                continue;
            }
            let dialog = pam::open_dialog(page, option, settle()).await.unwrap();
            dialog.close().await.unwrap();
        }
    }

    finish(live).await;
}

#[tokio::test]
#[ignore]
async fn theme_toggle_round_trip() {
    let Some(live) = live().await else { return };
    let page = &live.session;

    theme::set_theme(page, Theme::Dark, settle()).await.unwrap();
    assert!(!theme::set_theme(page, Theme::Dark, settle()).await.unwrap());
    assert!(theme::set_theme(page, Theme::Light, settle()).await.unwrap());
    assert_eq!(theme::current_theme(page).await.unwrap(), Some(Theme::Light));

    finish(live).await;
}

#[tokio::test]
#[ignore]
async fn new_record_field_types() {
    let Some(live) = live().await else { return };
    let page = &live.session;
    theme::set_theme(page, Theme::Light, settle()).await.unwrap();

    let editor = RecordEditor::open(page, settle()).await.unwrap();
    editor.set_title("Test Record").await.unwrap();
    let kinds = editor.field_types().await.unwrap();
    assert_eq!(kinds.len(), 17, "field types: {:?}", kinds);

    let index = editor.add_field("password").await.unwrap();
    editor.set_field_value(index, "hunter2").await.unwrap();
    editor.delete_field(index).await.unwrap();
    assert_eq!(editor.field_count().await.unwrap(), index);
    editor.close().await.unwrap();

    finish(live).await;
}

#[tokio::test]
#[ignore]
async fn example_records_load() {
    let Some(live) = live().await else { return };
    let page = &live.session;

    let titles = pam::load_example_records(page, settle()).await.unwrap();
    assert_eq!(titles.len(), 7);
    assert!(titles[0].contains("Amazon"));

    finish(live).await;
}

#[tokio::test]
#[ignore]
async fn help_opens_second_window() {
    let Some(live) = live().await else { return };
    let page = &live.session;

    let help = pam::open_help_window(page, settle()).await.unwrap();
    assert_eq!(page.window_handles().await.unwrap().len(), 2);
    help.close(page).await.unwrap();
    assert_eq!(page.window_handles().await.unwrap().len(), 1);

    finish(live).await;
}
