use ssz_derive::{Decode, Encode};

/// Persisted performance counters of one validator.
///
/// `missed_atts` counts consecutive checkpoints with a balance decrease and resets on the first
/// non-decrease, `missed_atts_total` only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct ValidatorRecord {
    pub idx: u64,
    pub balance: u64,
    pub missed_atts: u64,
    pub missed_atts_total: u64,
}

impl ValidatorRecord {
    /// Record for a validator seen for the first time.
    pub fn new(idx: u64, balance: u64) -> Self {
        Self {
            idx,
            balance,
            missed_atts: 0,
            missed_atts_total: 0,
        }
    }

    /// Applies a freshly observed balance and returns the updated record.
    ///
    /// A decrease is counted as a missed attestation. Counters saturate instead of wrapping.
    pub fn observe_balance(self, balance: u64) -> Self {
        if balance < self.balance {
            Self {
                balance,
                missed_atts: self.missed_atts.saturating_add(1),
                missed_atts_total: self.missed_atts_total.saturating_add(1),
                ..self
            }
        } else {
            Self {
                balance,
                missed_atts: 0,
                ..self
            }
        }
    }

    pub fn missed_attestation(&self, previous: &ValidatorRecord) -> bool {
        self.missed_atts_total > previous.missed_atts_total
    }
}

#[cfg(test)]
mod tests {
    use ssz::{Decode, Encode};

    use super::*;

    #[test]
    fn test_balance_increase_resets_streak() {
        let record = ValidatorRecord {
            idx: 1,
            balance: 32_000_136_946,
            missed_atts: 3,
            missed_atts_total: 5,
        };

        let updated = record.observe_balance(34_000_136_946);

        assert_eq!(
            updated,
            ValidatorRecord {
                idx: 1,
                balance: 34_000_136_946,
                missed_atts: 0,
                missed_atts_total: 5,
            }
        );
        assert!(!updated.missed_attestation(&record));
    }

    #[test]
    fn test_equal_balance_is_not_a_miss() {
        let record = ValidatorRecord {
            missed_atts: 2,
            missed_atts_total: 2,
            ..ValidatorRecord::new(7, 32_000_000_000)
        };

        let updated = record.observe_balance(32_000_000_000);

        assert_eq!(updated.missed_atts, 0);
        assert_eq!(updated.missed_atts_total, 2);
    }

    #[test]
    fn test_consecutive_decreases_accumulate() {
        let mut record = ValidatorRecord::new(1, 34_000_136_946);

        for (step, balance) in [33_000_000_000, 32_500_000_000, 32_000_000_000]
            .into_iter()
            .enumerate()
        {
            let previous = record;
            record = record.observe_balance(balance);
            assert!(record.missed_attestation(&previous));
            assert_eq!(record.missed_atts, step as u64 + 1);
            assert_eq!(record.missed_atts_total, step as u64 + 1);
        }
    }

    #[test]
    fn test_counters_saturate() {
        let record = ValidatorRecord {
            idx: 1,
            balance: 10,
            missed_atts: u64::MAX,
            missed_atts_total: u64::MAX,
        };

        let updated = record.observe_balance(9);

        assert_eq!(updated.missed_atts, u64::MAX);
        assert_eq!(updated.missed_atts_total, u64::MAX);
    }

    #[test]
    fn test_ssz_layout_is_fixed_width() {
        let record = ValidatorRecord {
            idx: 1,
            balance: 32_000_136_946,
            missed_atts: 1,
            missed_atts_total: 4,
        };

        let bytes = record.as_ssz_bytes();

        assert_eq!(bytes.len(), 32);
        assert_eq!(
            ValidatorRecord::from_ssz_bytes(&bytes).expect("valid bytes"),
            record
        );
    }
}
