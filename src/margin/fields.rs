//! Statically declared column writes and the derived-field dependency
//! contract.
//!
//! The predecessor system assembled UPDATE column lists from request
//! dictionaries at runtime. Here every request-field → storage-column
//! mapping lives in typed code: column names are compile-time constants,
//! so a bad mapping is a review-time defect instead of an injection vector.

/// Value bound into a column update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// A single column write. `value: None` writes an explicit NULL, which is
/// how stale derived fields are invalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWrite {
    pub column: &'static str,
    pub value: Option<FieldValue>,
}

impl ColumnWrite {
    pub fn number(column: &'static str, value: f64) -> Self {
        Self {
            column,
            value: Some(FieldValue::Number(value)),
        }
    }

    pub fn text(column: &'static str, value: String) -> Self {
        Self {
            column,
            value: Some(FieldValue::Text(value)),
        }
    }

    pub fn null(column: &'static str) -> Self {
        Self {
            column,
            value: None,
        }
    }
}

/// Push a numeric write when the request supplied the field.
pub fn push_number(writes: &mut Vec<ColumnWrite>, column: &'static str, value: Option<f64>) {
    if let Some(v) = value {
        writes.push(ColumnWrite::number(column, v));
    }
}

/// Push a text write when the request supplied the field.
pub fn push_text(writes: &mut Vec<ColumnWrite>, column: &'static str, value: Option<&String>) {
    if let Some(v) = value {
        writes.push(ColumnWrite::text(column, v.clone()));
    }
}

/// A derived column and the raw columns it is computed from. Writing any
/// of the inputs makes the derived value stale; the save must NULL it in
/// the same transaction.
#[derive(Debug)]
pub struct Dependency {
    pub derived: &'static str,
    pub inputs: &'static [&'static str],
}

/// Input sets of the four sigma-alt outputs. New derived fields must be
/// registered here or their invalidation silently never happens.
pub const SIGMA_ALT_DEPENDENCIES: &[Dependency] = &[
    Dependency {
        derived: "SIGMA_S_ALT_1_PZ",
        inputs: &["SIGMA_S_1_PZ", "SIGMA_S_S1_PZ", "M1_PZ"],
    },
    Dependency {
        derived: "SIGMA_S_ALT_2_PZ",
        inputs: &["SIGMA_S_2_PZ", "SIGMA_S_S2_PZ", "M1_PZ"],
    },
    Dependency {
        derived: "SIGMA_S_ALT_1_MRZ",
        inputs: &["SIGMA_S_1_MRZ", "SIGMA_S_S1_MRZ", "M1_MRZ"],
    },
    Dependency {
        derived: "SIGMA_S_ALT_2_MRZ",
        inputs: &["SIGMA_S_2_MRZ", "SIGMA_S_S2_MRZ", "M1_MRZ"],
    },
];

/// Derived columns that become stale once `touched` columns are written.
pub fn invalidated_by(touched: &[&str]) -> Vec<&'static str> {
    SIGMA_ALT_DEPENDENCIES
        .iter()
        .filter(|dep| dep.inputs.iter().any(|input| touched.contains(input)))
        .map(|dep| dep.derived)
        .collect()
}

/// Append NULL writes for every derived column invalidated by the writes
/// already collected. Returns how many columns were invalidated.
pub fn append_invalidations(writes: &mut Vec<ColumnWrite>) -> usize {
    let touched: Vec<&str> = writes.iter().map(|w| w.column).collect();
    let stale = invalidated_by(&touched);
    let count = stale.len();
    for column in stale {
        writes.push(ColumnWrite::null(column));
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_input_invalidates_only_its_dependents() {
        let stale = invalidated_by(&["SIGMA_S_1_PZ"]);
        assert_eq!(stale, vec!["SIGMA_S_ALT_1_PZ"]);
    }

    #[test]
    fn test_m1_invalidates_both_outputs_of_its_scenario() {
        let stale = invalidated_by(&["M1_MRZ"]);
        assert_eq!(stale, vec!["SIGMA_S_ALT_1_MRZ", "SIGMA_S_ALT_2_MRZ"]);
    }

    #[test]
    fn test_full_stress_save_invalidates_all_four() {
        let touched = [
            "SIGMA_S_1_PZ",
            "SIGMA_S_2_PZ",
            "SIGMA_S_S1_PZ",
            "SIGMA_S_S2_PZ",
            "SIGMA_S_1_MRZ",
            "SIGMA_S_2_MRZ",
            "SIGMA_S_S1_MRZ",
            "SIGMA_S_S2_MRZ",
        ];
        let stale = invalidated_by(&touched);
        assert_eq!(stale.len(), 4);
    }

    #[test]
    fn test_unrelated_columns_invalidate_nothing() {
        assert!(invalidated_by(&["SIGMA_DOP", "HCLPF", "K1_PZ"]).is_empty());
    }

    #[test]
    fn test_append_invalidations_extends_writes() {
        let mut writes = vec![ColumnWrite::number("M1_PZ", 2.5)];
        let count = append_invalidations(&mut writes);
        assert_eq!(count, 2);
        assert!(writes.contains(&ColumnWrite::null("SIGMA_S_ALT_1_PZ")));
        assert!(writes.contains(&ColumnWrite::null("SIGMA_S_ALT_2_PZ")));
    }
}
