//! Spatial dissociation
//!
//! Two policies decide whether a study "has" a location:
//! - exact voxel: some coordinate equals the point in all three components
//! - proximity: some coordinate lies strictly closer than the threshold
//!
//! There is no automatic escalation from one policy to the other.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::{collect_ids, truncate_ids};
use crate::location::Location;
use crate::Result;

/// Radius (in coordinate units) of the proximity policy
pub const DISTANCE_THRESHOLD: f64 = 5.0;

const NEAR_SQUARED: f64 = DISTANCE_THRESHOLD * DISTANCE_THRESHOLD;

// Squared distances are compared so the predicate stays exact for integer
// voxels; `<` keeps the boundary excluded.
const NEAR_DIFFERENCE: &str = r#"
SELECT study_id FROM coordinates
WHERE (x - ?1) * (x - ?1) + (y - ?2) * (y - ?2) + (z - ?3) * (z - ?3) < ?7
EXCEPT
SELECT study_id FROM coordinates
WHERE (x - ?4) * (x - ?4) + (y - ?5) * (y - ?5) + (z - ?6) * (z - ?6) < ?7
ORDER BY study_id
"#;

const NEAR_LOOKUP: &str = r#"
SELECT DISTINCT study_id FROM coordinates
WHERE (x - ?1) * (x - ?1) + (y - ?2) * (y - ?2) + (z - ?3) * (z - ?3) < ?4
ORDER BY study_id
"#;

const VOXEL_NOT_IN: &str = r#"
SELECT DISTINCT study_id
FROM coordinates
WHERE x = ?1 AND y = ?2 AND z = ?3
  AND study_id NOT IN (
      SELECT study_id FROM coordinates
      WHERE x = ?4 AND y = ?5 AND z = ?6
  )
ORDER BY study_id
"#;

/// Studies near `location_a` but not near `location_b`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDissociation {
    pub location_a: String,
    pub location_b: String,
    pub distance_threshold: f64,
    pub count: usize,
    pub studies: Vec<i64>,
}

/// Studies near a single location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationLookup {
    pub location: String,
    pub distance_threshold: f64,
    pub count: usize,
    pub studies: Vec<i64>,
}

/// Resolver over the coordinates relation
pub struct SpatialResolver<'a> {
    conn: &'a Connection,
}

impl<'a> SpatialResolver<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Proximity dissociation, bounded to the result cap
    pub fn dissociate(&self, a: &Location, b: &Location) -> Result<LocationDissociation> {
        let (count, studies) = truncate_ids(self.near_difference(a, b)?);
        Ok(LocationDissociation {
            location_a: a.to_string(),
            location_b: b.to_string(),
            distance_threshold: DISTANCE_THRESHOLD,
            count,
            studies,
        })
    }

    /// `{any coordinate near a} \ {any coordinate near b}` in one statement
    pub fn near_difference(&self, a: &Location, b: &Location) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(NEAR_DIFFERENCE)?;
        collect_ids(
            &mut stmt,
            params![a.x, a.y, a.z, b.x, b.y, b.z, NEAR_SQUARED],
        )
    }

    /// Exact-voxel dissociation using `NOT IN`
    pub fn voxel_difference(&self, a: &Location, b: &Location) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(VOXEL_NOT_IN)?;
        collect_ids(&mut stmt, params![a.x, a.y, a.z, b.x, b.y, b.z])
    }

    /// Studies with any coordinate near `location`, bounded to the result cap
    pub fn lookup(&self, location: &Location) -> Result<LocationLookup> {
        let ids = {
            let mut stmt = self.conn.prepare_cached(NEAR_LOOKUP)?;
            collect_ids(
                &mut stmt,
                params![location.x, location.y, location.z, NEAR_SQUARED],
            )?
        };

        let (count, studies) = truncate_ids(ids);
        Ok(LocationLookup {
            location: location.to_string(),
            distance_threshold: DISTANCE_THRESHOLD,
            count,
            studies,
        })
    }
}
