use crate::record::Record;

use std::collections::BTreeSet;

/// Run-scoped accumulator shared by the stream and recovery phases.
///
/// Records are appended in arrival order and sorted only by
/// [`finalize`](Self::finalize). The seen set grows with every stored record
/// and is never shrunk.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    seen: BTreeSet<i32>,
    max_streamed: i32,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record received from the stream-all exchange.
    ///
    /// Stream records are stored unconditionally, even if their sequence was
    /// already seen. They also raise the maximum sequence used for gap
    /// detection.
    pub fn push_streamed(&mut self, record: Record) {
        self.seen.insert(record.sequence);
        self.max_streamed = self.max_streamed.max(record.sequence);
        self.records.push(record);
    }

    /// Stores a record obtained through a resend exchange.
    ///
    /// Returns `false` and drops the record if its sequence was already seen.
    pub fn insert_recovered(&mut self, record: Record) -> bool {
        if !self.seen.insert(record.sequence) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Whether `sequence` has been stored by either phase.
    pub fn contains(&self, sequence: i32) -> bool {
        self.seen.contains(&sequence)
    }

    /// Highest sequence delivered by the stream phase, or 0 if none was.
    pub fn max_sequence(&self) -> i32 {
        self.max_streamed
    }

    /// Sequences in `1..=max_sequence` not yet seen, ascending.
    pub fn missing_sequences(&self) -> Vec<i32> {
        missing_sequences(&self.seen, self.max_streamed)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored records in arrival order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the store and returns its records sorted by sequence.
    ///
    /// The sort is stable, so duplicate sequences delivered by the stream
    /// keep their arrival order.
    pub fn finalize(self) -> Vec<Record> {
        let mut records = self.records;
        records.sort_by_key(|r| r.sequence);
        records
    }
}

/// Computes `[1, max] \ seen` in ascending order.
pub fn missing_sequences(seen: &BTreeSet<i32>, max: i32) -> Vec<i32> {
    (1..=max).filter(|seq| !seen.contains(seq)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(sequence: i32) -> Record {
        Record::new("AAPL", b'B', 10, 100, sequence)
    }

    #[test]
    fn test_empty_store_has_no_gaps() {
        let store = RecordStore::new();
        assert_eq!(store.max_sequence(), 0);
        assert!(store.missing_sequences().is_empty());
        assert!(store.finalize().is_empty());
    }

    #[test]
    fn test_missing_sequences_matches_set_difference() {
        for max in 0..=12 {
            // every subset of 1..=max via bitmask
            for mask in 0u32..(1u32 << max) {
                let has = |s: &i32| mask & (1u32 << (s - 1)) != 0;
                let seen: BTreeSet<i32> = (1..=max).filter(has).collect();
                let expected: Vec<i32> = (1..=max).filter(|s| !has(s)).collect();
                assert_eq!(missing_sequences(&seen, max), expected);
            }
        }
    }

    #[test]
    fn test_missing_ignores_out_of_range_seen_values() {
        let seen: BTreeSet<i32> = [-3, 0, 2, 9].into_iter().collect();
        assert_eq!(missing_sequences(&seen, 4), vec![1, 3, 4]);
    }

    #[test]
    fn test_stream_and_recovery_merge_sorted() {
        let mut store = RecordStore::new();
        for seq in [5, 1, 4, 2] {
            store.push_streamed(rec(seq));
        }
        assert_eq!(store.max_sequence(), 5);
        assert_eq!(store.missing_sequences(), vec![3]);

        assert!(store.insert_recovered(rec(3)));
        assert!(store.missing_sequences().is_empty());

        let sequences: Vec<i32> = store.finalize().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_recovered_duplicate_is_not_restored() {
        let mut store = RecordStore::new();
        store.push_streamed(rec(1));
        assert!(!store.insert_recovered(rec(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_recovery_does_not_raise_max() {
        let mut store = RecordStore::new();
        store.push_streamed(rec(2));
        store.insert_recovered(rec(9));
        assert_eq!(store.max_sequence(), 2);
        assert_eq!(store.missing_sequences(), vec![1]);
    }

    #[test]
    fn test_stream_duplicates_are_kept_in_arrival_order() {
        let mut store = RecordStore::new();
        store.push_streamed(Record::new("AAPL", b'B', 1, 1, 2));
        store.push_streamed(Record::new("MSFT", b'S', 1, 1, 1));
        store.push_streamed(Record::new("AMZN", b'B', 1, 1, 2));
        let out = store.finalize();
        assert_eq!(out[0].sequence, 1);
        assert_eq!(&out[1].symbol, b"AAPL");
        assert_eq!(&out[2].symbol, b"AMZN");
    }
}
