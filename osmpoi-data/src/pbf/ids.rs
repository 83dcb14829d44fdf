use log::warn;
use osmpoi_core::ElementKind;

/// Convert a decoded raw id into the unsigned id space used by the store.
///
/// Negative ids never appear in published extracts; they are skipped with a
/// warning rather than stored.
pub(super) fn element_id(kind: ElementKind, raw_id: i64) -> Option<u64> {
    match u64::try_from(raw_id) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Skipped OSM element: kind={kind}, raw_id={raw_id} (negative identifiers are unsupported)");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(0))]
    #[case(42, Some(42))]
    #[case(i64::MAX, Some(9_223_372_036_854_775_807))]
    #[case(-1, None)]
    fn keeps_only_non_negative_ids(#[case] raw: i64, #[case] expected: Option<u64>) {
        assert_eq!(element_id(ElementKind::Way, raw), expected);
    }
}
