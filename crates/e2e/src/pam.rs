//! Page objects for the PAM application
//!
//! Thin wrappers over the menu resolver for the dialogs the suite drives:
//! the generic modal, the New Record editor, the example-records loader and
//! the help window.

use tracing::{debug, info};

use crate::browser::{Browser, By, ElementRef};
use crate::dom;
use crate::error::{E2eError, E2eResult};
use crate::menu::{self, MenuOption};
use crate::wait::Settle;

/// Where a locally served PAM listens
pub const DEFAULT_URL: &str = "http://localhost:8081/";

pub const CLOSE_BUTTON_CLASS: &str = "x-fld-record-close";
pub const SAVE_BUTTON_CLASS: &str = "x-fld-record-save";
pub const CLEAR_BUTTON_CLASS: &str = "x-fld-record-clear";
pub const LOAD_BUTTON_CLASS: &str = "x-fld-record-load";

pub const RECORD_TITLE_CLASS: &str = "x-record-title";
pub const NEW_FIELD_TYPE_ID: &str = "x-new-field-type";
pub const FIELD_FORM_CLASS: &str = "x-fld-form";
pub const FIELD_VALUE_CLASS: &str = "x-fld-value";
pub const DELETE_ICON_CLASS: &str = "bi-trash3-fill";
pub const RECORD_BUTTON_CLASS: &str = "accordion-button";

pub const LOAD_EXAMPLES_TEXT: &str = "Load Example Records";
pub const LOAD_EXAMPLES_PROMPT: &str = "Do you really want to";

/// A modal dialog on screen
pub struct Dialog<'a> {
    page: &'a dyn Browser,
    element: ElementRef,
    id: String,
    settle: Settle,
}

impl<'a> Dialog<'a> {
    /// Wrap the modal container `element`
    pub async fn new(page: &'a dyn Browser, element: ElementRef, settle: Settle) -> E2eResult<Self> {
        let id = page.attribute(&element, "id").await?.unwrap_or_default();
        Ok(Self {
            page,
            element,
            id,
            settle,
        })
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn find(&self, by: &By) -> E2eResult<ElementRef> {
        self.page.find_in(&self.element, by).await
    }

    pub async fn find_all(&self, by: &By) -> E2eResult<Vec<ElementRef>> {
        self.page.find_all_in(&self.element, by).await
    }

    /// Button carrying `class`
    pub async fn button(&self, class: &str) -> E2eResult<ElementRef> {
        self.find(&By::class(class)).await
    }

    pub async fn buttons(&self) -> E2eResult<Vec<ElementRef>> {
        self.find_all(&By::tag("button")).await
    }

    /// First button whose text contains `needle`
    pub async fn button_with_text(&self, needle: &str) -> E2eResult<ElementRef> {
        let buttons = self.buttons().await?;
        dom::first_containing(self.page, &buttons, needle)
            .await?
            .ok_or_else(|| {
                E2eError::ElementNotFound(format!("button containing '{}' in #{}", needle, self.id))
            })
    }

    pub async fn title(&self) -> E2eResult<String> {
        let title = self.find(&By::class("modal-title")).await?;
        self.page.text(&title).await
    }

    pub async fn is_open(&self) -> E2eResult<bool> {
        self.page.is_displayed(&self.element).await
    }

    /// Click the Close button and wait for the dialog to go away
    pub async fn close(&self) -> E2eResult<()> {
        let close = self.button(CLOSE_BUTTON_CLASS).await?;
        let text = self.page.text(&close).await?;
        if !text.contains("Close") {
            return Err(E2eError::AssertionFailed(format!(
                "#{} close button reads '{}'",
                self.id, text
            )));
        }
        self.page.click(&close).await?;
        self.wait_closed().await
    }

    /// Click the button carrying `class` and wait for the dialog to go away
    pub async fn submit(&self, class: &str) -> E2eResult<()> {
        let button = self.button(class).await?;
        self.page.click(&button).await?;
        self.wait_closed().await
    }

    async fn wait_closed(&self) -> E2eResult<()> {
        let page = self.page;
        let element = &self.element;
        let closed = self
            .settle
            .wait_for(&format!("#{} to close", self.id), move || async move {
                Ok((!page.is_displayed(element).await?).then_some(()))
            })
            .await?;
        if closed.is_none() {
            debug!("#{} still visible after settling", self.id);
        }
        Ok(())
    }
}

/// Choose `option` from the menu and return its dialog, checking that the
/// dialog that came up is the one the option targets.
pub async fn open_dialog(
    page: &dyn Browser,
    option: MenuOption,
    settle: Settle,
) -> E2eResult<Dialog<'_>> {
    let expected = option
        .dialog_id()
        .ok_or_else(|| E2eError::NoDialog(option.label().to_string()))?;

    let element = menu::choose_menu_option(page, option.label(), settle)
        .await?
        .ok_or_else(|| E2eError::NoDialog(option.label().to_string()))?;

    let dialog = Dialog::new(page, element, settle).await?;
    if dialog.id() != expected {
        return Err(E2eError::AssertionFailed(format!(
            "'{}' opened #{}, expected #{}",
            option.label(),
            dialog.id(),
            expected
        )));
    }
    Ok(dialog)
}

/// The New Record dialog
pub struct RecordEditor<'a> {
    dialog: Dialog<'a>,
}

impl<'a> RecordEditor<'a> {
    pub async fn open(page: &'a dyn Browser, settle: Settle) -> E2eResult<Self> {
        let dialog = open_dialog(page, MenuOption::NewRecord, settle).await?;
        Ok(Self { dialog })
    }

    pub fn dialog(&self) -> &Dialog<'a> {
        &self.dialog
    }

    pub async fn set_title(&self, title: &str) -> E2eResult<()> {
        let input = self.dialog.find(&By::class(RECORD_TITLE_CLASS)).await?;
        self.dialog.page.send_keys(&input, title).await
    }

    pub async fn title(&self) -> E2eResult<String> {
        let input = self.dialog.find(&By::class(RECORD_TITLE_CLASS)).await?;
        let value = self.dialog.page.property(&input, "value").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Open the field type dropdown and return its entries
    async fn field_type_items(&self) -> E2eResult<Vec<ElementRef>> {
        let page = self.dialog.page;
        let trigger = self.dialog.find(&By::id(NEW_FIELD_TYPE_ID)).await?;
        let dropdown = dom::parent(page, &trigger).await?;
        let items = page
            .find_all_in(&dropdown, &By::class(menu::MENU_ITEM_CLASS))
            .await?;
        let Some(first) = items.first() else {
            return Err(E2eError::ElementNotFound(format!(
                "field types under #{}",
                NEW_FIELD_TYPE_ID
            )));
        };

        if !page.is_displayed(first).await? {
            page.click(&trigger).await?;
            self.dialog
                .settle
                .wait_for("field type dropdown", move || async move {
                    Ok(page.is_displayed(first).await?.then_some(()))
                })
                .await?;
        }
        Ok(items)
    }

    /// Names of the field types offered by the dropdown
    pub async fn field_types(&self) -> E2eResult<Vec<String>> {
        let page = self.dialog.page;
        let mut kinds = Vec::new();
        for item in self.field_type_items().await? {
            if let Some(kind) = page.attribute(&item, "value").await? {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    /// Add a field of type `kind`, returning its index
    pub async fn add_field(&self, kind: &str) -> E2eResult<usize> {
        let page = self.dialog.page;
        let before = self.field_count().await?;

        let mut chosen = None;
        for item in self.field_type_items().await? {
            if page.attribute(&item, "value").await?.as_deref() == Some(kind) {
                chosen = Some(item);
                break;
            }
        }
        let item = chosen.ok_or_else(|| E2eError::ElementNotFound(format!("field type '{}'", kind)))?;
        page.click(&item).await?;

        self.wait_for_field_count(before + 1).await?;
        debug!("Added '{}' field", kind);
        Ok(before)
    }

    async fn fields(&self) -> E2eResult<Vec<ElementRef>> {
        self.dialog.find_all(&By::class(FIELD_FORM_CLASS)).await
    }

    pub async fn field_count(&self) -> E2eResult<usize> {
        Ok(self.fields().await?.len())
    }

    async fn field(&self, index: usize) -> E2eResult<ElementRef> {
        self.fields()
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| E2eError::ElementNotFound(format!("field #{}", index)))
    }

    pub async fn set_field_value(&self, index: usize, value: &str) -> E2eResult<()> {
        let page = self.dialog.page;
        let form = self.field(index).await?;
        let input = page.find_in(&form, &By::class(FIELD_VALUE_CLASS)).await?;
        page.send_keys(&input, value).await
    }

    pub async fn field_value(&self, index: usize) -> E2eResult<String> {
        let page = self.dialog.page;
        let form = self.field(index).await?;
        let input = page.find_in(&form, &By::class(FIELD_VALUE_CLASS)).await?;
        let value = page.property(&input, "value").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Click the trash icon's button on field `index`
    pub async fn delete_field(&self, index: usize) -> E2eResult<()> {
        let page = self.dialog.page;
        let before = self.field_count().await?;
        let form = self.field(index).await?;
        let icon = page.find_in(&form, &By::class(DELETE_ICON_CLASS)).await?;
        let button = dom::parent(page, &icon).await?;
        page.click(&button).await?;

        self.wait_for_field_count(before.saturating_sub(1)).await
    }

    async fn wait_for_field_count(&self, expected: usize) -> E2eResult<()> {
        self.dialog
            .settle
            .wait_for(&format!("{} record fields", expected), move || async move {
                Ok((self.field_count().await? == expected).then_some(()))
            })
            .await?;
        Ok(())
    }

    pub async fn save(&self) -> E2eResult<()> {
        self.dialog.submit(SAVE_BUTTON_CLASS).await
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.dialog.close().await
    }
}

/// Titles of the records in the accordion
pub async fn record_titles(page: &dyn Browser) -> E2eResult<Vec<String>> {
    let mut titles = Vec::new();
    for button in page.find_all(&By::class(RECORD_BUTTON_CLASS)).await? {
        titles.push(page.text(&button).await?);
    }
    Ok(titles)
}

/// Load the built-in example records through the Load File dialog and
/// return the resulting record titles.
pub async fn load_example_records(page: &dyn Browser, settle: Settle) -> E2eResult<Vec<String>> {
    let dialog = open_dialog(page, MenuOption::LoadFile, settle).await?;
    let button = dialog.button_with_text(LOAD_EXAMPLES_TEXT).await?;
    page.click(&button).await?;

    let prompt = settle
        .wait_for("load confirmation", move || async move {
            page.alert_text().await.map(Some)
        })
        .await?
        .ok_or(E2eError::NoAlert)?;
    if !prompt.contains(LOAD_EXAMPLES_PROMPT) {
        return Err(E2eError::AssertionFailed(format!(
            "unexpected load confirmation: '{}'",
            prompt
        )));
    }
    page.accept_alert().await?;

    let titles = settle
        .wait_for("example records", move || async move {
            let titles = record_titles(page).await?;
            Ok((!titles.is_empty()).then_some(titles))
        })
        .await?
        .unwrap_or_default();

    info!("Loaded {} example records", titles.len());
    Ok(titles)
}

/// The help page opened from the menu, alongside the main window
#[derive(Debug, Clone)]
pub struct HelpWindow {
    pub main: String,
    pub help: String,
}

impl HelpWindow {
    pub async fn close(&self, page: &dyn Browser) -> E2eResult<()> {
        close_window_and_return(page, &self.help, &self.main).await
    }
}

/// Choose Help and wait for the help window to appear
pub async fn open_help_window(page: &dyn Browser, settle: Settle) -> E2eResult<HelpWindow> {
    let main = page.window_handle().await?;
    if let Some(modal) = menu::choose_menu_option(page, MenuOption::Help.label(), settle).await? {
        return Err(E2eError::AssertionFailed(format!(
            "Help opened a dialog ({})",
            modal
        )));
    }

    let main_ref = &main;
    let help = settle
        .wait_for("help window", move || async move {
            let handles = page.window_handles().await?;
            Ok(handles.into_iter().find(|handle| handle != main_ref))
        })
        .await?
        .ok_or_else(|| E2eError::AssertionFailed("Help opened no window".to_string()))?;

    debug!("Help window {} opened from {}", help, main);
    Ok(HelpWindow { main, help })
}

/// Switch to `window`, close it, and switch back to `return_to`
pub async fn close_window_and_return(
    page: &dyn Browser,
    window: &str,
    return_to: &str,
) -> E2eResult<()> {
    page.switch_to_window(window).await?;
    page.close_window().await?;
    page.switch_to_window(return_to).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPage, PAM_EXAMPLE_RECORDS, PAM_FIELD_TYPES};
    use std::time::Duration;

    fn settle() -> Settle {
        Settle::poll()
    }

    #[tokio::test]
    async fn test_about_dialog_closes() {
        let page = MockPage::pam();
        let dialog = open_dialog(&page, MenuOption::About, settle()).await.unwrap();

        assert_eq!(dialog.id(), "menuAboutDlg");
        assert_eq!(dialog.title().await.unwrap(), "About");
        assert!(dialog.is_open().await.unwrap());

        dialog.close().await.unwrap();
        assert!(!dialog.is_open().await.unwrap());
        assert_eq!(menu::visible_modal(&page).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dialog_buttons() {
        let page = MockPage::pam();
        let dialog = open_dialog(&page, MenuOption::ClearRecords, settle()).await.unwrap();

        let clear = dialog.button(CLEAR_BUTTON_CLASS).await.unwrap();
        assert_eq!(page.text(&clear).await.unwrap(), "Clear");
        assert_eq!(dialog.buttons().await.unwrap().len(), 2);
        assert!(matches!(
            dialog.button_with_text("Export").await,
            Err(E2eError::ElementNotFound(_))
        ));

        dialog.submit(CLEAR_BUTTON_CLASS).await.unwrap();
        assert!(!dialog.is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_open_dialog_rejects_dialog_free_entries() {
        let page = MockPage::pam();
        let err = open_dialog(&page, MenuOption::Print, settle()).await.err().unwrap();
        assert!(matches!(err, E2eError::NoDialog(ref o) if o == "Print"));
    }

    #[tokio::test]
    async fn test_record_editor_fields() {
        let page = MockPage::pam();
        let editor = RecordEditor::open(&page, settle()).await.unwrap();

        let kinds = editor.field_types().await.unwrap();
        assert_eq!(kinds.len(), PAM_FIELD_TYPES.len());
        assert_eq!(kinds[0], "account");

        editor.set_title("Bank").await.unwrap();
        assert_eq!(editor.title().await.unwrap(), "Bank");

        assert_eq!(editor.add_field("login").await.unwrap(), 0);
        assert_eq!(editor.add_field("password").await.unwrap(), 1);
        editor.set_field_value(1, "hunter2").await.unwrap();
        assert_eq!(editor.field_value(1).await.unwrap(), "hunter2");

        editor.delete_field(0).await.unwrap();
        assert_eq!(editor.field_count().await.unwrap(), 1);
        assert_eq!(editor.field_value(0).await.unwrap(), "hunter2");

        editor.save().await.unwrap();
        assert!(!editor.dialog().is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_field_type() {
        let page = MockPage::pam();
        let editor = RecordEditor::open(&page, settle()).await.unwrap();
        let err = editor.add_field("fax").await.unwrap_err();
        assert!(matches!(err, E2eError::ElementNotFound(ref what) if what.contains("fax")));
    }

    #[tokio::test]
    async fn test_load_example_records() {
        let page = MockPage::pam();
        assert!(record_titles(&page).await.unwrap().is_empty());

        let titles = load_example_records(&page, settle()).await.unwrap();

        assert_eq!(titles.len(), PAM_EXAMPLE_RECORDS.len());
        assert!(titles[0].contains("Amazon"));
        assert_eq!(menu::visible_modal(&page).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_example_records_with_fixed_settle() {
        let page = MockPage::pam();
        let titles = load_example_records(&page, Settle::Fixed(Duration::from_millis(1)))
            .await
            .unwrap();
        assert_eq!(titles.len(), 7);
    }

    #[tokio::test]
    async fn test_help_window_round_trip() {
        let page = MockPage::pam();
        let help = open_help_window(&page, settle()).await.unwrap();

        assert_ne!(help.main, help.help);
        assert_eq!(page.window_handles().await.unwrap().len(), 2);

        help.close(&page).await.unwrap();
        assert_eq!(page.window_handles().await.unwrap(), vec![help.main.clone()]);
        assert_eq!(page.window_handle().await.unwrap(), help.main);
    }
}
