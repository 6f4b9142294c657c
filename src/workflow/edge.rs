//! Transitions between executors.
//!
//! An executor leaves either through a single unconditional edge or through
//! a switch group: an ordered list of guarded cases plus an optional default.

use std::{fmt, sync::Arc};

use crate::{
    Payload,
    workflow::{conditions::Condition, node::ExecutorId},
};

/// Label of a graph edge, identifying which rule produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Unconditional edge.
    Direct,
    /// The n-th case of the source's switch group.
    Case(usize),
    /// Fallback of the source's switch group.
    Default,
}

impl fmt::Display for Route {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Route::Direct => write!(f, "source"),
            Route::Case(i) => write!(f, "case {}", i),
            Route::Default => write!(f, "default"),
        }
    }
}

/// One entry of a switch group as declared by the builder.
#[derive(Clone)]
pub enum SwitchCase {
    Case {
        condition: Arc<dyn Condition>,
        target: ExecutorId,
    },
    Default {
        target: ExecutorId,
    },
}

impl SwitchCase {
    /// Routes to `target` when `condition` holds.
    pub fn when(
        condition: impl Condition + 'static,
        target: impl Into<ExecutorId>,
    ) -> Self {
        SwitchCase::Case {
            condition: Arc::new(condition),
            target: target.into(),
        }
    }

    /// Routes to `target` when no case holds.
    pub fn otherwise(target: impl Into<ExecutorId>) -> Self {
        SwitchCase::Default {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            SwitchCase::Case {
                target,
                ..
            } => target,
            SwitchCase::Default {
                target,
            } => target,
        }
    }
}

impl fmt::Debug for SwitchCase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            SwitchCase::Case {
                target,
                ..
            } => write!(f, "Case(-> {})", target),
            SwitchCase::Default {
                target,
            } => write!(f, "Default(-> {})", target),
        }
    }
}

/// Conditions of a switch group in declaration order. Targets live on the
/// graph edges labelled with the matching [`Route`].
#[derive(Clone)]
pub struct SwitchGroup {
    conditions: Vec<Arc<dyn Condition>>,
    has_default: bool,
}

impl SwitchGroup {
    pub(crate) fn new(
        conditions: Vec<Arc<dyn Condition>>,
        has_default: bool,
    ) -> Self {
        Self {
            conditions,
            has_default,
        }
    }

    /// First case whose condition holds, else the default, else `None`.
    pub fn select(
        &self,
        output: &Payload,
    ) -> Option<Route> {
        self.conditions
            .iter()
            .position(|condition| condition.evaluate(output))
            .map(Route::Case)
            .or(self.has_default.then_some(Route::Default))
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }
}
