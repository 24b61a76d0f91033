use serde::{Deserialize, Serialize};
use std::fmt;

/// One record of a depth lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRow {
    #[serde(rename = "MinDepth")]
    pub min_depth: f64,
    #[serde(rename = "MaxDepth")]
    pub max_depth: f64,
    #[serde(rename = "Min_Score")]
    pub min_score: f64,
    #[serde(rename = "Max_Score")]
    pub max_score: f64,
    #[serde(rename = "Fish_Stage")]
    pub category: String,
}

impl RangeRow {
    pub fn new(
        min_depth: f64,
        max_depth: f64,
        min_score: f64,
        max_score: f64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            min_depth,
            max_depth,
            min_score,
            max_score,
            category: category.into(),
        }
    }
}

/// Closed depth interval `[min_depth, max_depth]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthInterval {
    pub min_depth: f64,
    pub max_depth: f64,
}

impl DepthInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.min_depth <= value && value <= self.max_depth
    }

    pub fn is_degenerate(&self) -> bool {
        self.min_depth == self.max_depth
    }

    /// Linear position of `value` within the interval
    pub fn position(&self, value: f64) -> f64 {
        (value - self.min_depth) / (self.max_depth - self.min_depth)
    }
}

/// Score bounds associated with a depth interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min_score: f64,
    pub max_score: f64,
}

impl ScoreRange {
    pub fn interpolate(&self, t: f64) -> f64 {
        self.min_score + t * (self.max_score - self.min_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeEntry {
    pub interval: DepthInterval,
    pub scores: ScoreRange,
}

/// Depth intervals mapped to score bounds for a single fish stage.
///
/// Entries keep insertion order, which is also lookup order: when intervals
/// overlap the earliest inserted one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeTable {
    category: String,
    entries: Vec<RangeEntry>,
}

impl RangeTable {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            entries: Vec::new(),
        }
    }

    /// Insert or replace the scores for `interval`.
    ///
    /// A replaced key keeps its original position. Returns the previous scores.
    pub fn insert(&mut self, interval: DepthInterval, scores: ScoreRange) -> Option<ScoreRange> {
        match self.entries.iter_mut().find(|e| e.interval == interval) {
            Some(existing) => Some(std::mem::replace(&mut existing.scores, scores)),
            None => {
                self.entries.push(RangeEntry { interval, scores });
                None
            }
        }
    }

    /// First entry whose interval contains `value`
    pub fn lookup(&self, value: f64) -> Option<&RangeEntry> {
        self.entries.iter().find(|e| e.interval.contains(value))
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for RangeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "({}, {}): [{}, {}]",
                entry.interval.min_depth,
                entry.interval.max_depth,
                entry.scores.min_score,
                entry.scores.max_score
            )?;
        }
        write!(f, "}}")
    }
}

/// Build the range table for `target_category` from lookup rows.
///
/// Category matching is exact and case-sensitive. Rows are not validated.
pub fn build_range_table<I>(rows: I, target_category: &str) -> RangeTable
where
    I: IntoIterator<Item = RangeRow>,
{
    let result: Result<RangeTable, std::convert::Infallible> =
        try_build_range_table(rows.into_iter().map(Ok), target_category);
    match result {
        Ok(table) => table,
        Err(never) => match never {},
    }
}

/// Like [`build_range_table`] for fallible row sources; the first source
/// error is returned unchanged.
pub fn try_build_range_table<I, E>(rows: I, target_category: &str) -> Result<RangeTable, E>
where
    I: IntoIterator<Item = Result<RangeRow, E>>,
{
    log::debug!("Building range table for fish stage '{}'", target_category);

    let mut table = RangeTable::new(target_category);
    let mut skipped = 0usize;

    for row in rows {
        let row = row?;
        if row.category != target_category {
            skipped += 1;
            continue;
        }

        let interval = DepthInterval {
            min_depth: row.min_depth,
            max_depth: row.max_depth,
        };
        let scores = ScoreRange {
            min_score: row.min_score,
            max_score: row.max_score,
        };
        if let Some(previous) = table.insert(interval, scores) {
            log::warn!(
                "Duplicate depth range ({}, {}) for '{}': scores [{}, {}] replaced by [{}, {}]",
                interval.min_depth,
                interval.max_depth,
                target_category,
                previous.min_score,
                previous.max_score,
                scores.min_score,
                scores.max_score
            );
        }
    }

    log::debug!("Skipped {} rows of other fish stages", skipped);
    log::debug!("Range Dictionary: {}", table);

    if table.is_empty() {
        log::warn!("No lookup rows match fish stage '{}'", target_category);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<RangeRow> {
        vec![
            RangeRow::new(0.0, 1.0, 0.0, 0.5, "MWFs"),
            RangeRow::new(1.0, 3.0, 0.5, 1.0, "MWFs"),
            RangeRow::new(0.0, 2.0, 0.0, 1.0, "MWFj"),
            RangeRow::new(3.0, 6.0, 1.0, 0.2, "mwfs"),
        ]
    }

    #[test]
    fn test_filters_by_exact_category() {
        let table = build_range_table(rows(), "MWFs");
        assert_eq!(table.len(), 2);
        assert_eq!(table.category(), "MWFs");
        assert!(table
            .entries()
            .iter()
            .all(|e| e.interval.max_depth <= 3.0));
    }

    #[test]
    fn test_no_trimming_of_category() {
        let table = build_range_table(rows(), "MWFs ");
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_key_overwrites_in_place() {
        let mut input = rows();
        input.push(RangeRow::new(0.0, 1.0, 0.2, 0.9, "MWFs"));
        let table = build_range_table(input, "MWFs");

        assert_eq!(table.len(), 2);
        let first = table.entries()[0];
        assert_eq!(first.interval, DepthInterval { min_depth: 0.0, max_depth: 1.0 });
        assert_eq!(first.scores, ScoreRange { min_score: 0.2, max_score: 0.9 });
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let mut table = RangeTable::new("MWFs");
        table.insert(
            DepthInterval { min_depth: 0.0, max_depth: 4.0 },
            ScoreRange { min_score: 0.0, max_score: 1.0 },
        );
        table.insert(
            DepthInterval { min_depth: 2.0, max_depth: 6.0 },
            ScoreRange { min_score: 1.0, max_score: 0.0 },
        );

        let hit = table.lookup(3.0).unwrap();
        assert_eq!(hit.interval.max_depth, 4.0);
        assert_eq!(table.lookup(5.0).unwrap().interval.min_depth, 2.0);
        assert!(table.lookup(6.5).is_none());
        assert!(table.lookup(f64::NAN).is_none());
    }

    #[test]
    fn test_source_error_propagates() {
        let source: Vec<Result<RangeRow, String>> = vec![
            Ok(RangeRow::new(0.0, 1.0, 0.0, 1.0, "MWFs")),
            Err("cursor failed".to_string()),
        ];
        let err = try_build_range_table(source, "MWFs").unwrap_err();
        assert_eq!(err, "cursor failed");
    }

    #[test]
    fn test_display() {
        let table = build_range_table(rows(), "MWFs");
        assert_eq!(table.to_string(), "{(0, 1): [0, 0.5], (1, 3): [0.5, 1]}");
    }
}
