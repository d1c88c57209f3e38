//! Dissociation query engine
//!
//! Every resolver computes its set difference inside the store, in a single
//! statement, and returns study identifiers in ascending order.

pub mod diagnostics;
pub mod materialize;
pub mod spatial;
pub mod terms;

pub use diagnostics::{run_probes, DiagnosticFailure, DiagnosticReport};
pub use materialize::{materialize, Record};
pub use spatial::{LocationDissociation, LocationLookup, SpatialResolver, DISTANCE_THRESHOLD};
pub use terms::{MatchType, TermCount, TermDissociation, TermLookup, TermResolver};

use rusqlite::{Params, Statement};

use crate::Result;

/// Maximum number of identifiers returned by a resolver
pub const RESULT_CAP: usize = 50;

/// Split a full identifier list into its size and the capped prefix
pub fn truncate_ids(mut ids: Vec<i64>) -> (usize, Vec<i64>) {
    let count = ids.len();
    ids.truncate(RESULT_CAP);
    (count, ids)
}

pub(crate) fn collect_ids<P: Params>(stmt: &mut Statement<'_>, params: P) -> Result<Vec<i64>> {
    let ids = stmt
        .query_map(params, |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ids() {
        let (count, ids) = truncate_ids((0..120).collect());
        assert_eq!(count, 120);
        assert_eq!(ids.len(), RESULT_CAP);

        let (count, ids) = truncate_ids(vec![3, 9]);
        assert_eq!((count, ids), (2, vec![3, 9]));
    }
}
