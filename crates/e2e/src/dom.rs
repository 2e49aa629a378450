//! DOM relationship helpers
//!
//! WebDriver has no parent/child navigation, so these go through
//! tree-relative XPath queries.

use crate::browser::{Browser, By, ElementRef};
use crate::error::E2eResult;

/// Structural parent of `element`
pub async fn parent(page: &dyn Browser, element: &ElementRef) -> E2eResult<ElementRef> {
    page.find_in(element, &By::xpath("./..")).await
}

/// Direct structural children of `element`, in document order
pub async fn children(page: &dyn Browser, element: &ElementRef) -> E2eResult<Vec<ElementRef>> {
    page.find_all_in(element, &By::xpath("./child::*")).await
}

/// Raw markup inside `element`
pub async fn inner_html(page: &dyn Browser, element: &ElementRef) -> E2eResult<String> {
    let html = page.property(element, "innerHTML").await?;
    Ok(html.as_str().unwrap_or_default().to_string())
}

/// First of `elements` whose rendered text contains `needle`
pub async fn first_containing(
    page: &dyn Browser,
    elements: &[ElementRef],
    needle: &str,
) -> E2eResult<Option<ElementRef>> {
    for element in elements {
        if page.text(element).await?.contains(needle) {
            return Ok(Some(element.clone()));
        }
    }
    Ok(None)
}

/// The subset of `elements` currently displayed
pub async fn displayed(page: &dyn Browser, elements: &[ElementRef]) -> E2eResult<Vec<ElementRef>> {
    let mut shown = Vec::new();
    for element in elements {
        if page.is_displayed(element).await? {
            shown.push(element.clone());
        }
    }
    Ok(shown)
}
