//! Orders filtered records by the chosen sort key.

use std::cmp::Ordering;

use crate::{
    query::{SortField, SortKey, SortOrder},
    record::Record,
};

/// Return a new ordering of `records` by `key`, leaving `records` untouched.
///
/// The sort is stable: records with equal keys keep the order they had in
/// `records`, in both directions.
pub fn sort_records<'a>(records: &[&'a Record], key: SortKey) -> Vec<&'a Record> {
    let mut sorted = records.to_vec();

    sorted.sort_by(|a, b| {
        let ordering = compare_by_field(a, b, key.field);

        match key.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    sorted
}

fn compare_by_field(a: &Record, b: &Record, field: SortField) -> Ordering {
    match field {
        SortField::Date => a.occurred_at.cmp(&b.occurred_at),
        SortField::Amount => a
            .amount
            .partial_cmp(&b.amount)
            .unwrap_or(Ordering::Equal),
        SortField::Name => a
            .description
            .to_lowercase()
            .cmp(&b.description.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        pipeline::sort::sort_records,
        query::{SortField, SortKey, SortOrder},
        record::Record,
    };

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|record| record.id.to_string()).collect()
    }

    #[test]
    fn sorts_by_date_and_amount() {
        let records = vec![
            Record::new("1", "a", 100.0, datetime!(2024-01-02 0:00 UTC)),
            Record::new("2", "b", 50.0, datetime!(2024-01-01 0:00 UTC)),
        ];
        let refs: Vec<&Record> = records.iter().collect();

        let newest_first = sort_records(&refs, SortKey::NEWEST_FIRST);
        let cheapest_first =
            sort_records(&refs, SortKey::new(SortField::Amount, SortOrder::Ascending));

        assert_eq!(ids(&newest_first), ["1", "2"]);
        assert_eq!(ids(&cheapest_first), ["2", "1"]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let when = datetime!(2024-01-01 0:00 UTC);
        let records = vec![
            Record::new("1", "banana", 1.0, when),
            Record::new("2", "Apple", 1.0, when),
            Record::new("3", "cherry", 1.0, when),
        ];
        let refs: Vec<&Record> = records.iter().collect();

        let a_to_z = sort_records(&refs, SortKey::new(SortField::Name, SortOrder::Ascending));
        let z_to_a = sort_records(&refs, SortKey::new(SortField::Name, SortOrder::Descending));

        assert_eq!(ids(&a_to_z), ["2", "1", "3"]);
        assert_eq!(ids(&z_to_a), ["3", "1", "2"]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let when = datetime!(2024-01-01 0:00 UTC);
        let records = vec![
            Record::new("1", "x", 5.0, when),
            Record::new("2", "y", 5.0, when),
            Record::new("3", "z", 9.0, when),
        ];
        let refs: Vec<&Record> = records.iter().collect();

        let got = sort_records(&refs, SortKey::new(SortField::Amount, SortOrder::Descending));

        assert_eq!(ids(&got), ["3", "1", "2"]);
    }

    #[test]
    fn input_is_left_untouched() {
        let when = datetime!(2024-01-01 0:00 UTC);
        let records = vec![Record::new("1", "b", 1.0, when), Record::new("2", "a", 1.0, when)];
        let refs: Vec<&Record> = records.iter().collect();

        let _ = sort_records(&refs, SortKey::new(SortField::Name, SortOrder::Ascending));

        assert_eq!(ids(&refs), ["1", "2"]);
    }
}
