use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PageError;
use crate::scripts::PageScript;

/// Where a tab currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabLocation {
    pub url: String,
    pub ready_state: String,
}

/// The page RPC boundary.
///
/// Everything the engines know about the DOM comes back through
/// [`PageDriver::evaluate`]; the browser is never touched any other way.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Stable identifier of the tab this driver controls
    fn tab_id(&self) -> &str;

    /// Run an injected script with a single JSON argument
    async fn evaluate(&self, script: PageScript, args: Value) -> Result<Value, PageError>;

    /// Start a top-level navigation and wait for the browser to accept it
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn location(&self) -> Result<TabLocation, PageError>;

    async fn user_agent(&self) -> Result<String, PageError>;
}

/// Evaluate `script` and decode its result into `T`
pub async fn evaluate_as<T: DeserializeOwned>(
    page: &dyn PageDriver,
    script: PageScript,
    args: Value,
) -> Result<T, PageError> {
    let value = page.evaluate(script, args).await?;
    serde_json::from_value(value).map_err(|e| PageError::Decode {
        script: script.name(),
        message: e.to_string(),
    })
}
