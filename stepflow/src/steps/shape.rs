//! Step shape enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven shapes a step can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepShape {
    /// Terminal step: `(in, token) -> outcome`.
    Handler,
    /// `(in, token, next) -> outcome`.
    Linear,
    /// `(in, token, divert, next) -> outcome`; divert enters an open branch.
    If,
    /// `(in, token, on_true, on_false) -> outcome`; both sides are open branches.
    IfElse,
    /// `(in, token, cases, default) -> outcome`; keyed open branches.
    Switch,
    /// Terminal `(in, token, left, right) -> outcome`; both sides are terminal pipelines.
    Fork,
    /// Terminal `(in, token, branches, default) -> outcome`; keyed terminal pipelines.
    MultiFork,
}

impl StepShape {
    /// Returns true for shapes that end a pipeline.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Handler | Self::Fork | Self::MultiFork)
    }

    /// Returns true for shapes that reference sub-pipelines.
    #[must_use]
    pub fn is_branching(self) -> bool {
        !matches!(self, Self::Handler | Self::Linear)
    }

    /// Returns true for branching shapes whose branches rejoin the main chain.
    #[must_use]
    pub fn rejoins(self) -> bool {
        matches!(self, Self::If | Self::IfElse | Self::Switch)
    }

    /// Returns the snake_case name of the shape.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handler => "handler",
            Self::Linear => "linear",
            Self::If => "if",
            Self::IfElse => "if_else",
            Self::Switch => "switch",
            Self::Fork => "fork",
            Self::MultiFork => "multi_fork",
        }
    }
}

impl fmt::Display for StepShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
