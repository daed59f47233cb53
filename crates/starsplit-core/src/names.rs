//! Synthetic column naming.
//!
//! While the fact table is rewritten its columns are addressed as `c<i>` (source column
//! `i`) and `p<i>` (surrogate key of dimension `i`), which keeps arbitrary header text out
//! of the query layer.

use std::collections::HashMap;

/// Bijection between synthetic `c<i>` names and the source table's column names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameMapping {
    originals: Vec<String>,
    by_original: HashMap<String, usize>,
}

impl NameMapping {
    pub fn from_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let originals: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut by_original = HashMap::with_capacity(originals.len());
        for (idx, name) in originals.iter().enumerate() {
            // Headers may repeat; reverse lookup resolves to the first column.
            by_original.entry(name.clone()).or_insert(idx);
        }
        Self {
            originals,
            by_original,
        }
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// `c<idx>`.
    pub fn synthetic_for_index(idx: usize) -> String {
        format!("c{idx}")
    }

    /// Original name behind a `c<i>` name.
    pub fn original(&self, synthetic: &str) -> Option<&str> {
        let idx = parse_index(synthetic, 'c')?;
        self.original_at(idx)
    }

    pub fn original_at(&self, idx: usize) -> Option<&str> {
        self.originals.get(idx).map(String::as_str)
    }

    pub fn synthetic(&self, original: &str) -> Option<String> {
        self.by_original
            .get(original)
            .map(|idx| Self::synthetic_for_index(*idx))
    }

    pub fn synthetic_names(&self) -> Vec<String> {
        (0..self.len()).map(Self::synthetic_for_index).collect()
    }
}

/// Name of the surrogate key linking the fact table to dimension `group_no`.
pub fn key_name(group_no: usize) -> String {
    format!("p{group_no}")
}

fn parse_index(name: &str, prefix: char) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_both_directions() {
        let names = NameMapping::from_columns(["city", "zip", "amount"]);
        assert_eq!(names.len(), 3);
        assert_eq!(names.original("c1"), Some("zip"));
        assert_eq!(names.synthetic("amount").as_deref(), Some("c2"));
        assert_eq!(names.synthetic_names(), vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn rejects_malformed_synthetic_names() {
        let names = NameMapping::from_columns(["a"]);
        assert_eq!(names.original("c"), None);
        assert_eq!(names.original("c+0"), None);
        assert_eq!(names.original("p0"), None);
        assert_eq!(names.original("c7"), None);
    }

    #[test]
    fn repeated_headers_resolve_to_first_column() {
        let names = NameMapping::from_columns(["x", "y", "x"]);
        assert_eq!(names.synthetic("x").as_deref(), Some("c0"));
        assert_eq!(names.original("c2"), Some("x"));
    }
}
