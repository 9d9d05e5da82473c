mod joins;
mod physical;

pub use joins::{HashJoinRule, JoinAssocRule, JoinCommuteRule};
pub use physical::PhysicalConversionRule;
