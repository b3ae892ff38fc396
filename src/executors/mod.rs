//! One executor per action kind.
//!
//! Executors absorb sub-step failures into an [`OperationContext`] and only
//! raise once every method for their action is exhausted.

pub mod click;
pub mod context;
pub mod navigate;
pub mod set_value;
pub mod wait;

use std::sync::Arc;

use crate::config::Config;
use crate::coordinates::CoordinateEngine;
use crate::cursor::CursorSimulator;
use crate::resolver::ElementResolver;
use crate::scroll::ScrollEngine;
use crate::stability::{StabilityMonitor, StabilityWaiter};

pub use click::{ClickMethod, ClickOutcome};
pub use context::{OperationContext, Step, StepStatus};
pub use navigate::NavigateOutcome;
pub use set_value::{SetValueMethod, SetValueOutcome};
pub use wait::WaitOutcome;

/// The shared engines every executor draws on
#[derive(Clone)]
pub struct ExecutionEngines {
    pub resolver: ElementResolver,
    pub scroll: ScrollEngine,
    pub coordinates: CoordinateEngine,
    pub stability: Arc<dyn StabilityWaiter>,
    pub cursor: CursorSimulator,
}

impl ExecutionEngines {
    pub fn from_config(config: &Config) -> Self {
        let scroll = ScrollEngine::new(config.scroll);
        Self {
            resolver: ElementResolver::new(),
            coordinates: CoordinateEngine::new(config.coordinates, scroll.clone()),
            scroll,
            stability: Arc::new(StabilityMonitor::new(config.stability.clone())),
            cursor: CursorSimulator::new(config.cursor_enabled),
        }
    }

    /// Replace the stability waiter, e.g. with a push-based implementation
    pub fn with_stability(mut self, stability: Arc<dyn StabilityWaiter>) -> Self {
        self.stability = stability;
        self
    }
}
