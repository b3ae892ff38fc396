use std::fmt;

/// Sub-steps an executor may go through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Scroll,
    CoordinateResolution,
    CursorMovement,
    Focus,
    PrimaryMethod,
    BackupMethod,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Scroll => "scroll",
            Step::CoordinateResolution => "coordinate resolution",
            Step::CursorMovement => "cursor movement",
            Step::Focus => "focus",
            Step::PrimaryMethod => "primary method",
            Step::BackupMethod => "backup method",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    NotAttempted,
    Succeeded(String),
    Partial(String),
    Failed(String),
    Skipped(String),
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (word, detail) = match self {
            StepStatus::NotAttempted => return f.write_str("not attempted"),
            StepStatus::Succeeded(d) => ("succeeded", d),
            StepStatus::Partial(d) => ("partial", d),
            StepStatus::Failed(d) => ("failed", d),
            StepStatus::Skipped(d) => ("skipped", d),
        };
        if detail.is_empty() {
            f.write_str(word)
        } else {
            write!(f, "{word} ({detail})")
        }
    }
}

/// Records what happened in each sub-step of one action so a failure can be
/// explained step by step. Lives for one executor call.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    steps: Vec<(Step, StepStatus)>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status of `step`, replacing an earlier record
    pub fn record(&mut self, step: Step, status: StepStatus) {
        match self.steps.iter_mut().find(|(s, _)| *s == step) {
            Some(entry) => entry.1 = status,
            None => self.steps.push((step, status)),
        }
    }

    pub fn succeeded(&mut self, step: Step, detail: impl Into<String>) {
        self.record(step, StepStatus::Succeeded(detail.into()));
    }

    pub fn partial(&mut self, step: Step, detail: impl Into<String>) {
        self.record(step, StepStatus::Partial(detail.into()));
    }

    pub fn failed(&mut self, step: Step, detail: impl Into<String>) {
        self.record(step, StepStatus::Failed(detail.into()));
    }

    pub fn skipped(&mut self, step: Step, detail: impl Into<String>) {
        self.record(step, StepStatus::Skipped(detail.into()));
    }

    pub fn status(&self, step: Step) -> StepStatus {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, status)| status.clone())
            .unwrap_or_default()
    }

    /// `headline` followed by the status of each listed step, in order
    pub fn narrative(&self, headline: &str, steps: &[Step]) -> String {
        let parts: Vec<String> = steps
            .iter()
            .map(|step| format!("{}: {}", step.label(), self.status(*step)))
            .collect();
        format!("{}. Steps: {}", headline, parts.join("; "))
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;
