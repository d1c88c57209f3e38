//! Term dissociation
//!
//! Finds studies annotated with one term but not another. Matching starts
//! with exact string equality; when that yields nothing, the same difference
//! is recomputed with substring containment, because annotation terms are
//! often prefixed or decorated and an exact miss is usually a false negative.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::{collect_ids, truncate_ids};
use crate::Result;

const EXACT_DIFFERENCE: &str = r#"
SELECT study_id FROM annotations_terms WHERE term = ?1
EXCEPT
SELECT study_id FROM annotations_terms WHERE term = ?2
ORDER BY study_id
"#;

const FUZZY_DIFFERENCE: &str = r#"
SELECT study_id FROM annotations_terms WHERE term LIKE ?1 ESCAPE '\'
EXCEPT
SELECT study_id FROM annotations_terms WHERE term LIKE ?2 ESCAPE '\'
ORDER BY study_id
"#;

const EXACT_NOT_IN: &str = r#"
SELECT DISTINCT study_id
FROM annotations_terms
WHERE term = ?1
  AND study_id NOT IN (
      SELECT study_id FROM annotations_terms WHERE term = ?2
  )
ORDER BY study_id
"#;

const EXACT_LOOKUP: &str =
    "SELECT DISTINCT study_id FROM annotations_terms WHERE term = ?1 ORDER BY study_id";

const FUZZY_LOOKUP: &str = r"
SELECT DISTINCT study_id FROM annotations_terms
WHERE term LIKE ?1 ESCAPE '\'
ORDER BY study_id
";

/// How a term was matched against the annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    #[serde(rename = "exact")]
    Exact,
    #[serde(rename = "fuzzy (LIKE)")]
    Fuzzy,
}

/// Studies with `term_a` but not `term_b`, bounded to the result cap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermDissociation {
    pub term_a: String,
    pub term_b: String,
    pub match_type: MatchType,
    pub dissociation: String,
    /// Size of the full difference, before truncation
    pub count: usize,
    pub studies: Vec<i64>,
}

/// Studies annotated with a single term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermLookup {
    pub term: String,
    pub match_type: MatchType,
    pub count: usize,
    pub studies: Vec<i64>,
}

/// A term and the number of annotations carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: i64,
}

/// Resolver over the term annotations relation
pub struct TermResolver<'a> {
    conn: &'a Connection,
}

impl<'a> TermResolver<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Dissociate `term_a` from `term_b`, exact first, then fuzzy.
    pub fn dissociate(&self, term_a: &str, term_b: &str) -> Result<TermDissociation> {
        let (match_type, ids) = match self.exact_difference(term_a, term_b)? {
            ids if !ids.is_empty() => (MatchType::Exact, ids),
            _ => {
                tracing::debug!(
                    "No exact match for '{}' \\ '{}', retrying with LIKE",
                    term_a,
                    term_b
                );
                (MatchType::Fuzzy, self.fuzzy_difference(term_a, term_b)?)
            }
        };

        let (count, studies) = truncate_ids(ids);
        Ok(TermDissociation {
            term_a: term_a.to_string(),
            term_b: term_b.to_string(),
            match_type,
            dissociation: format!("{} \\ {}", term_a, term_b),
            count,
            studies,
        })
    }

    /// `{term = a} \ {term = b}` computed by the store in one statement
    pub fn exact_difference(&self, term_a: &str, term_b: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(EXACT_DIFFERENCE)?;
        collect_ids(&mut stmt, params![term_a, term_b])
    }

    /// Substring-containment variant of [`Self::exact_difference`]
    pub fn fuzzy_difference(&self, term_a: &str, term_b: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(FUZZY_DIFFERENCE)?;
        collect_ids(
            &mut stmt,
            params![contains_pattern(term_a), contains_pattern(term_b)],
        )
    }

    /// Exact difference expressed with `NOT IN`, used by the materialized
    /// variant of the endpoint
    pub fn exact_difference_not_in(&self, term_a: &str, term_b: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(EXACT_NOT_IN)?;
        collect_ids(&mut stmt, params![term_a, term_b])
    }

    /// Studies carrying `term`, with the same exact-then-fuzzy strategy
    pub fn lookup(&self, term: &str) -> Result<TermLookup> {
        let exact = {
            let mut stmt = self.conn.prepare_cached(EXACT_LOOKUP)?;
            collect_ids(&mut stmt, params![term])?
        };

        let (match_type, ids) = if exact.is_empty() {
            let mut stmt = self.conn.prepare_cached(FUZZY_LOOKUP)?;
            (MatchType::Fuzzy, collect_ids(&mut stmt, params![contains_pattern(term)])?)
        } else {
            (MatchType::Exact, exact)
        };

        let (count, studies) = truncate_ids(ids);
        Ok(TermLookup {
            term: term.to_string(),
            match_type,
            count,
            studies,
        })
    }

    /// Distinct terms in alphabetical order
    pub fn distinct_terms(&self, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT term FROM annotations_terms ORDER BY term LIMIT ?1",
        )?;
        let terms = stmt
            .query_map([limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(terms)
    }

    /// Terms containing `keyword`, most frequently used first
    pub fn search_terms(&self, keyword: &str, limit: usize) -> Result<Vec<TermCount>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT term, COUNT(*) AS n
            FROM annotations_terms
            WHERE term LIKE ?1 ESCAPE '\'
            GROUP BY term
            ORDER BY n DESC, term
            LIMIT ?2
            "#,
        )?;
        let terms = stmt
            .query_map(params![contains_pattern(keyword), limit as i64], |row| {
                Ok(TermCount {
                    term: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(terms)
    }
}

/// `%term%` with LIKE wildcards in the input escaped, so the pattern means
/// plain substring containment
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
