//! Routing predicates.
//!
//! A condition inspects the output of an executor and decides whether a
//! switch case applies. Conditions are pure: an output that cannot be
//! interpreted in the expected shape simply does not match, so that the
//! default of the switch group can absorb it.

mod field;
mod models;
mod schema;
mod structured;

pub use field::FieldCondition;
pub use models::{Comparison, ComparisonOperator, ConditionValue, LogicalOperator};
pub use schema::SchemaCondition;
pub use structured::StructuredCondition;

use crate::Payload;

pub trait Condition: Send + Sync {
    fn evaluate(
        &self,
        output: &Payload,
    ) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&Payload) -> bool + Send + Sync,
{
    fn evaluate(
        &self,
        output: &Payload,
    ) -> bool {
        self(output)
    }
}
