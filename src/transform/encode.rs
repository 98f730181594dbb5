//! One-hot encoding with an explicit slot for unseen categories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder whose vocabulary is fixed at fit time.
///
/// Output width is `vocabulary.len() + 1`; the trailing slot is set for any
/// category that was not seen during fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder<T: Ord> {
    vocabulary: Vec<T>,
}

impl<T: Ord + Clone> OneHotEncoder<T> {
    /// Build the vocabulary from the categories present in `values`.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let vocabulary = values
            .into_iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &[T] {
        &self.vocabulary
    }

    /// Encoded width, including the unknown slot.
    pub fn width(&self) -> usize {
        self.vocabulary.len() + 1
    }

    /// Slot for `value`; unseen values map to the last slot.
    pub fn slot(&self, value: &T) -> usize {
        self.vocabulary
            .binary_search(value)
            .unwrap_or(self.vocabulary.len())
    }

    pub fn is_known(&self, value: &T) -> bool {
        self.vocabulary.binary_search(value).is_ok()
    }

    /// Append the one-hot encoding of `value` to `out`.
    pub fn encode_into(&self, value: &T, out: &mut Vec<f64>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        out[start + self.slot(value)] = 1.0;
    }

    pub fn encode(&self, value: &T) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        self.encode_into(value, &mut out);
        out
    }
}
