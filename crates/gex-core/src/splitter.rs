//! Multi-statement splitting
//!
//! A submission is split on `;` into trimmed statements. Blank segments
//! from leading, trailing, or doubled delimiters are dropped. There is no
//! escaping, so a statement cannot contain a literal `;`.

use crate::{Query, QueryBatch};

/// Statement delimiter
pub const DELIMITER: char = ';';

/// Split a raw submission into an ordered batch of queries
pub fn split(raw: &str) -> QueryBatch {
    raw.split(DELIMITER).filter_map(Query::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts(batch: &QueryBatch) -> Vec<&str> {
        batch.iter().map(Query::as_str).collect()
    }

    #[test]
    fn test_split_drops_empty_segments() {
        let batch = split("g.V();;g.E()");
        assert_eq!(texts(&batch), vec!["g.V()", "g.E()"]);
    }

    #[test]
    fn test_split_trims() {
        let batch = split("  g.V().count()  ");
        assert_eq!(texts(&batch), vec!["g.V().count()"]);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split("").is_empty());
        assert!(split(" ; ;\n;\t").is_empty());
    }

    #[test]
    fn test_split_preserves_order() {
        let batch = split(";g.addV('person').property('id','1'); g.V('1') ;g.V().drop();");
        assert_eq!(
            texts(&batch),
            vec!["g.addV('person').property('id','1')", "g.V('1')", "g.V().drop()"]
        );
    }

    #[test]
    fn test_split_has_no_escaping() {
        // The delimiter inside a string literal still splits
        let batch = split("g.V().has('name','a;b')");
        assert_eq!(texts(&batch), vec!["g.V().has('name','a", "b')"]);
    }

    proptest! {
        #[test]
        fn prop_split_never_yields_blank(raw in ".{0,200}") {
            for query in &split(&raw) {
                prop_assert!(!query.as_str().trim().is_empty());
                prop_assert_eq!(query.as_str(), query.as_str().trim());
                prop_assert!(!query.as_str().contains(DELIMITER));
            }
        }

        #[test]
        fn prop_split_is_idempotent(raw in "[a-z() .;\\t]{0,120}") {
            let batch = split(&raw);
            prop_assert_eq!(split(&batch.to_raw()), batch);
        }
    }
}
