//! Knowledge-graph relationship maintenance: correlation/option math and the Dream
//! worker's dispatch policy. Edge/node storage, base-weight aggregation, and degree
//! upkeep live in `store::edges`/`store::nodes` — this module only decides *what*
//! an assessment should write, not how it's persisted.

pub mod correlation;
pub mod dispatch;
