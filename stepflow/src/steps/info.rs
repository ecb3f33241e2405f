//! Serializable descriptions of built steps.

use super::StepShape;
use serde::Serialize;
use std::any::{type_name, TypeId};

/// Description of one step of a built pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    /// The step name, unique within its pipeline.
    pub name: String,
    /// The step shape.
    pub shape: StepShape,
    /// Rust type name of the step's input.
    pub input_type: &'static str,
    /// Rust type name of the step's core function.
    pub signature: &'static str,
    /// Sub-pipelines referenced by this step, in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchInfo>,
    #[serde(skip)]
    pub(crate) fn_type: TypeId,
}

impl StepInfo {
    pub(crate) fn new<T: 'static, F: 'static>(
        name: &str,
        shape: StepShape,
        branches: Vec<BranchInfo>,
    ) -> Self {
        Self {
            name: name.to_string(),
            shape,
            input_type: type_name::<T>(),
            signature: type_name::<F>(),
            branches,
            fn_type: TypeId::of::<F>(),
        }
    }

    /// Returns true if the step's core function has type `F`.
    #[must_use]
    pub fn has_signature<F: 'static>(&self) -> bool {
        self.fn_type == TypeId::of::<F>()
    }
}

/// Where a branch sits on its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchRole {
    /// The true path of an If step.
    Divert,
    /// The true side of an IfElse step.
    OnTrue,
    /// The false side of an IfElse step.
    OnFalse,
    /// The left branch of a Fork step.
    Left,
    /// The right branch of a Fork step.
    Right,
    /// A keyed case of a Switch or MultiFork step.
    Case,
    /// The default of a Switch or MultiFork step.
    Default,
}

/// How a branch pipeline is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BranchSource {
    /// Looked up by name in the space at compile time.
    Named {
        /// The referenced pipeline.
        pipeline: String,
    },
    /// Built by a factory the first time it is resolved.
    Inline,
}

/// Description of one branch reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    /// Position of the branch on its step.
    pub role: BranchRole,
    /// Debug rendering of the case key, for keyed branches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// How the branch pipeline is obtained.
    #[serde(flatten)]
    pub source: BranchSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_branch_info_json() {
        let named = BranchInfo {
            role: BranchRole::Case,
            key: Some("\"vip\"".to_string()),
            source: BranchSource::Named {
                pipeline: "vip_flow".to_string(),
            },
        };
        let inline = BranchInfo {
            role: BranchRole::Default,
            key: None,
            source: BranchSource::Inline,
        };

        assert_eq!(
            serde_json::to_value(&named).unwrap(),
            serde_json::json!({
                "role": "case",
                "key": "\"vip\"",
                "source": "named",
                "pipeline": "vip_flow"
            })
        );
        assert_eq!(
            serde_json::to_value(&inline).unwrap(),
            serde_json::json!({"role": "default", "source": "inline"})
        );
    }

    #[test]
    fn test_step_info_signature_check() {
        let info = StepInfo::new::<i32, fn(i32) -> i32>("double", StepShape::Linear, Vec::new());
        assert!(info.has_signature::<fn(i32) -> i32>());
        assert!(!info.has_signature::<fn(i64) -> i64>());
        assert_eq!(info.input_type, "i32");
    }
}
