//! Main menu resolver
//!
//! The PAM menu is a dropdown `div` holding the `#menu` trigger and a `ul`
//! of eight `.dropdown-item` entries. Most entries open a Bootstrap modal;
//! Print and Help open no dialog.

use tracing::{debug, info, warn};

use crate::browser::{Browser, By, ElementRef};
use crate::dom;
use crate::error::{E2eError, E2eResult};
use crate::wait::Settle;

/// Id of the button that opens the menu
pub const MENU_TRIGGER_ID: &str = "menu";

/// Class shared by every menu entry
pub const MENU_ITEM_CLASS: &str = "dropdown-item";

/// Class of the dialog box inside each modal container
pub const MODAL_DIALOG_CLASS: &str = "modal-dialog";

/// Trigger and items section
pub const EXPECTED_DROPDOWN_CHILDREN: usize = 2;

pub const EXPECTED_MENU_ITEMS: usize = 8;

/// The entries of the PAM menu, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuOption {
    About,
    Preferences,
    NewRecord,
    ClearRecords,
    LoadFile,
    SaveFile,
    Print,
    Help,
}

impl MenuOption {
    pub const ALL: [MenuOption; EXPECTED_MENU_ITEMS] = [
        MenuOption::About,
        MenuOption::Preferences,
        MenuOption::NewRecord,
        MenuOption::ClearRecords,
        MenuOption::LoadFile,
        MenuOption::SaveFile,
        MenuOption::Print,
        MenuOption::Help,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuOption::About => "About",
            MenuOption::Preferences => "Preferences",
            MenuOption::NewRecord => "New Record",
            MenuOption::ClearRecords => "Clear Records",
            MenuOption::LoadFile => "Load File",
            MenuOption::SaveFile => "Save File",
            MenuOption::Print => "Print",
            MenuOption::Help => "Help",
        }
    }

    /// Id of the modal this entry opens (its `data-bs-target`)
    pub fn dialog_id(&self) -> Option<&'static str> {
        match self {
            MenuOption::About => Some("menuAboutDlg"),
            MenuOption::Preferences => Some("menuPrefsDlg"),
            MenuOption::NewRecord => Some("menuNewDlg"),
            MenuOption::ClearRecords => Some("menuClearDlg"),
            MenuOption::LoadFile => Some("menuLoadDlg"),
            MenuOption::SaveFile => Some("menuSaveDlg"),
            MenuOption::Print | MenuOption::Help => None,
        }
    }

    /// Index among the dropdown entries
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|option| option == self)
            .unwrap_or_default()
    }

    /// First option whose label contains `needle`, the same rule the
    /// resolver applies to the rendered entries.
    pub fn from_label(needle: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.label().contains(needle))
    }

    /// Option whose label appears in a rendered entry text
    pub fn for_entry_text(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| text.contains(option.label()))
    }
}

/// One rendered menu entry
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub element: ElementRef,
    pub label: String,
}

/// Open the menu and return its entries.
///
/// The dropdown shape is checked before the trigger is clicked.
pub async fn open_menu(page: &dyn Browser, settle: Settle) -> E2eResult<Vec<MenuItem>> {
    let trigger = page.find(&By::id(MENU_TRIGGER_ID)).await?;
    let dropdown = dom::parent(page, &trigger).await?;
    let children = dom::children(page, &dropdown).await?;
    if children.len() != EXPECTED_DROPDOWN_CHILDREN {
        return Err(E2eError::Structure(format!(
            "menu dropdown has {} children, expected {}",
            children.len(),
            EXPECTED_DROPDOWN_CHILDREN
        )));
    }
    page.click(&trigger).await?;

    let section = &children[1];
    settle
        .wait_for("menu dropdown", move || async move {
            Ok(page.is_displayed(section).await?.then_some(()))
        })
        .await?;

    let elements = page.find_all_in(section, &By::class(MENU_ITEM_CLASS)).await?;
    if elements.len() != EXPECTED_MENU_ITEMS {
        return Err(E2eError::Structure(format!(
            "menu has {} entries, expected {}",
            elements.len(),
            EXPECTED_MENU_ITEMS
        )));
    }

    let mut items = Vec::with_capacity(elements.len());
    for element in elements {
        let label = page.text(&element).await?;
        items.push(MenuItem { element, label });
    }
    Ok(items)
}

/// Container of the modal dialog currently shown, if any
pub async fn visible_modal(page: &dyn Browser) -> E2eResult<Option<ElementRef>> {
    let dialogs = page.find_all(&By::class(MODAL_DIALOG_CLASS)).await?;
    let shown = dom::displayed(page, &dialogs).await?;
    if shown.len() > 1 {
        warn!("{} modal dialogs are visible at once", shown.len());
    }
    match shown.last() {
        Some(dialog) => Ok(Some(dom::parent(page, dialog).await?)),
        None => Ok(None),
    }
}

/// Open the menu, pick the first entry whose text contains `option`, and
/// return the dialog it brings up.
///
/// Always returns `Ok(None)` for entries that open no dialog (Print, Help),
/// even if a modal left over from an earlier step is still visible.
/// Any other entry that leaves no dialog visible fails with
/// [`E2eError::NoDialog`].
pub async fn choose_menu_option(
    page: &dyn Browser,
    option: &str,
    settle: Settle,
) -> E2eResult<Option<ElementRef>> {
    let items = open_menu(page, settle).await?;
    let item = items
        .iter()
        .find(|item| item.label.contains(option))
        .ok_or_else(|| E2eError::ElementNotFound(format!("menu entry containing '{}'", option)))?;

    debug!("Choosing menu entry '{}'", item.label.trim());
    page.click(&item.element).await?;

    let expects_dialog = MenuOption::for_entry_text(&item.label)
        .map(|known| known.dialog_id().is_some())
        .unwrap_or(true);

    if !expects_dialog {
        settle.pause().await;
        if visible_modal(page).await?.is_some() {
            warn!("A modal is still visible after choosing '{}'", item.label.trim());
        }
        return Ok(None);
    }

    let modal = settle
        .wait_for(&format!("dialog for '{}'", option), move || async move {
            visible_modal(page).await
        })
        .await?
        .ok_or_else(|| E2eError::NoDialog(option.to_string()))?;

    info!("Menu entry '{}' opened its dialog", option);
    Ok(Some(modal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPage;
    use std::time::Duration;
    use test_case::test_case;

    #[test]
    fn test_option_lookup() {
        assert_eq!(MenuOption::from_label("About"), Some(MenuOption::About));
        assert_eq!(MenuOption::from_label("Record"), Some(MenuOption::NewRecord));
        assert_eq!(MenuOption::from_label("Nope"), None);
        assert_eq!(MenuOption::for_entry_text("\u{a0}Save File"), Some(MenuOption::SaveFile));
        assert_eq!(MenuOption::Help.position(), 7);
        assert_eq!(MenuOption::Print.position(), 6);
    }

    #[tokio::test]
    async fn test_open_menu_lists_eight_entries() {
        let page = MockPage::pam();
        let items = open_menu(&page, Settle::poll()).await.unwrap();

        assert_eq!(items.len(), EXPECTED_MENU_ITEMS);
        for (item, option) in items.iter().zip(MenuOption::ALL) {
            assert!(
                item.label.contains(option.label()),
                "entry {} is '{}', expected '{}'",
                option.position(),
                item.label,
                option.label()
            );
        }
    }

    #[test_case(MenuOption::About ; "about")]
    #[test_case(MenuOption::Preferences ; "preferences")]
    #[test_case(MenuOption::NewRecord ; "new record")]
    #[test_case(MenuOption::ClearRecords ; "clear records")]
    #[test_case(MenuOption::LoadFile ; "load file")]
    #[test_case(MenuOption::SaveFile ; "save file")]
    #[test_case(MenuOption::Print ; "print")]
    #[test_case(MenuOption::Help ; "help")]
    #[tokio::test]
    async fn test_each_entry_opens_its_dialog(option: MenuOption) {
        let page = MockPage::pam();
        let modal = choose_menu_option(&page, option.label(), Settle::poll())
            .await
            .unwrap();

        let dialogs = page.find_all(&By::class(MODAL_DIALOG_CLASS)).await.unwrap();
        let shown = crate::dom::displayed(&page, &dialogs).await.unwrap();

        match option.dialog_id() {
            Some(id) => {
                let modal = modal.expect("dialog");
                assert_eq!(page.attribute(&modal, "id").await.unwrap().as_deref(), Some(id));
                assert_eq!(shown.len(), 1);
            }
            None => {
                assert!(modal.is_none());
                assert!(shown.is_empty());
                assert_eq!(page.window_handles().await.unwrap().len(), 2);
            }
        }
    }

    #[tokio::test]
    async fn test_fixed_settle_resolves_dialog() {
        let page = MockPage::pam();
        let modal = choose_menu_option(&page, "About", Settle::Fixed(Duration::from_millis(1)))
            .await
            .unwrap()
            .expect("about dialog");

        let close = page.find_in(&modal, &By::class("x-fld-record-close")).await.unwrap();
        assert!(page.text(&close).await.unwrap().contains("Close"));
    }

    #[tokio::test]
    async fn test_help_opens_window_instead_of_dialog() {
        let page = MockPage::pam();
        assert_eq!(page.window_handles().await.unwrap().len(), 1);

        let modal = choose_menu_option(&page, "Help", Settle::poll()).await.unwrap();

        assert!(modal.is_none());
        assert_eq!(page.window_handles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_entry_is_not_found() {
        let page = MockPage::pam();
        let err = choose_menu_option(&page, "Export", Settle::poll()).await.unwrap_err();
        assert!(matches!(err, E2eError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_menu_shape_drift_is_a_structure_error() {
        let page = MockPage::pam();
        let help = page.node(&By::attr("title", "app help")).unwrap();
        page.detach(help);

        let err = choose_menu_option(&page, "About", Settle::poll()).await.unwrap_err();
        assert!(matches!(err, E2eError::Structure(ref msg) if msg.contains("7 entries")));
    }

    #[tokio::test]
    async fn test_dropdown_shape_is_checked_before_any_click() {
        let page = MockPage::pam();
        let dropdown = page.node(&By::class("dropdown")).unwrap();
        page.append(dropdown, crate::mock::El::new("div").class("dropdown-backdrop"));

        let err = choose_menu_option(&page, "About", Settle::poll()).await.unwrap_err();

        assert!(matches!(err, E2eError::Structure(ref msg) if msg.contains("3 children")));
        assert_eq!(page.click_count(), 0);
        assert_eq!(visible_modal(&page).await.unwrap(), None);
    }

    #[test_case("Print" ; "print")]
    #[test_case("Help" ; "help")]
    #[tokio::test]
    async fn test_dialog_free_entry_ignores_leftover_modal(option: &str) {
        let page = MockPage::pam();
        let about = page.node(&By::id("menuAboutDlg")).unwrap();
        page.set_displayed(about, true);

        let modal = choose_menu_option(&page, option, Settle::poll()).await.unwrap();

        assert!(modal.is_none());
        assert!(visible_modal(&page).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_dialog_is_reported() {
        let page = MockPage::pam();
        let about = page.node(&By::id("menuAboutDlg")).unwrap();
        page.detach(about);

        let err = choose_menu_option(
            &page,
            "About",
            Settle::Poll {
                timeout: Duration::from_millis(20),
                interval: Duration::from_millis(5),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::Timeout(_)));

        let page = MockPage::pam();
        let about = page.node(&By::id("menuAboutDlg")).unwrap();
        page.detach(about);
        let err = choose_menu_option(&page, "About", Settle::Fixed(Duration::from_millis(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::NoDialog(ref o) if o == "About"));
    }
}
