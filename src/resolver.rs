use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::{ActionError, NotFoundDiagnostics};
use crate::page::{PageDriver, evaluate_as};
use crate::scripts::PageScript;
use crate::types::{ElementHandle, UniqueElementId};

/// A handle that was bound to a live element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub handle: ElementHandle,
    pub uid: UniqueElementId,
    pub tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum HandleBinding {
    Assigned { uid: String },
    NoTable,
    UnknownHandle { table_size: u64 },
    Detached,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum LiveQuery {
    Found {
        tag: String,
    },
    Missing {
        attribute_count: u64,
        ready_state: String,
        body_child_count: u64,
    },
}

/// Maps snapshot handles to durable identity tokens and proves the element
/// is still in the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementResolver;

impl ElementResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve(
        &self,
        page: &dyn PageDriver,
        handle: ElementHandle,
    ) -> Result<ResolvedElement, ActionError> {
        let binding: HandleBinding = evaluate_as(
            page,
            PageScript::ResolveHandle,
            json!({ "numeric_id": handle.0 }),
        )
        .await?;

        let uid = match binding {
            HandleBinding::Assigned { uid } => uid,
            HandleBinding::NoTable => {
                return Err(self
                    .not_found(page, handle, "the page has not been annotated yet")
                    .await);
            }
            HandleBinding::UnknownHandle { table_size } => {
                let reason = format!(
                    "no element is registered under this id (last snapshot has {table_size} element(s))"
                );
                return Err(self.not_found(page, handle, &reason).await);
            }
            HandleBinding::Detached => {
                return Err(self
                    .not_found(
                        page,
                        handle,
                        "the element was removed from the page since the last snapshot",
                    )
                    .await);
            }
        };

        let query: LiveQuery =
            evaluate_as(page, PageScript::QueryUnique, json!({ "uid": uid })).await?;
        match query {
            LiveQuery::Found { tag } => {
                debug!("Resolved element {} to <{}> {}", handle, tag, uid);
                Ok(ResolvedElement {
                    handle,
                    uid: UniqueElementId(uid),
                    tag,
                })
            }
            LiveQuery::Missing {
                attribute_count,
                ready_state,
                body_child_count,
            } => Err(ActionError::ElementNotFound {
                element_id: handle,
                reason: format!("no live element carries identity {uid}"),
                diagnostics: NotFoundDiagnostics {
                    attribute_count,
                    ready_state,
                    body_child_count,
                },
            }),
        }
    }

    /// Build a not-found error, collecting diagnostics with a throwaway query
    async fn not_found(
        &self,
        page: &dyn PageDriver,
        handle: ElementHandle,
        reason: &str,
    ) -> ActionError {
        let diagnostics = match evaluate_as::<LiveQuery>(
            page,
            PageScript::QueryUnique,
            json!({ "uid": "" }),
        )
        .await
        {
            Ok(LiveQuery::Missing {
                attribute_count,
                ready_state,
                body_child_count,
            }) => NotFoundDiagnostics {
                attribute_count,
                ready_state,
                body_child_count,
            },
            _ => NotFoundDiagnostics {
                ready_state: "unknown".to_string(),
                ..NotFoundDiagnostics::default()
            },
        };
        ActionError::ElementNotFound {
            element_id: handle,
            reason: reason.to_string(),
            diagnostics,
        }
    }
}
