//! Page annotation: numbers the interactive elements and renders them as text.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PageError;
use crate::page::{PageDriver, evaluate_as};
use crate::scripts::PageScript;

/// Text view of the page the planner reasons over.
///
/// Each line is `[id] <tag attrs> text`; `id` is the handle actions refer to
/// until the next annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub element_count: u32,
    pub text: String,
}

/// Rebuild the handle table and return the snapshot
pub async fn annotate(page: &dyn PageDriver) -> Result<DomSnapshot, PageError> {
    let snapshot: DomSnapshot =
        evaluate_as(page, PageScript::Annotate, serde_json::json!({})).await?;
    debug!(
        url = %snapshot.url,
        elements = snapshot.element_count,
        "Annotated page"
    );
    Ok(snapshot)
}
