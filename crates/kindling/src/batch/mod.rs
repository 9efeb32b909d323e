//! # Batches
//!
//! A [`Batch`] is one unit of training data expressed as a nested container of
//! leaf values. The shape of the nesting is what the [`TransferEngine`] preserves
//! when it moves tensor leaves to a device.

mod transfer;

use std::collections::BTreeMap;

pub use transfer::TransferEngine;

/// A non-tensor, non-string leaf value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// An arbitrarily nested batch value.
///
/// The variants form a closed set. [`Batch::List`] and [`Batch::Tuple`] are both
/// ordered sequences but are treated differently during transfer: a `List` is an
/// opaque leaf whose contents are never moved, a `Tuple` is recursed into.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch<T> {
    /// A tensor leaf, the only leaf that is ever moved to a device
    Tensor(T),

    /// An absent value
    None,

    /// A scalar leaf
    Scalar(Scalar),

    /// A string leaf
    Str(String),

    /// A bare ordered sequence, passed through transfer untouched
    List(Vec<Batch<T>>),

    /// Any other ordered compound value, transferred element by element
    Tuple(Vec<Batch<T>>),

    /// A mapping of key to batch, transferred entry by entry
    Map(BTreeMap<String, Batch<T>>),
}

impl<T> Batch<T> {
    /// Build a mapping batch from `(key, value)` pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Batch<T>)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Self::Tensor(_))
    }

    pub fn as_tensor(&self) -> Option<&T> {
        match self {
            Self::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    pub fn into_tensor(self) -> Option<T> {
        match self {
            Self::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    /// Look up `key` in a mapping batch
    pub fn get(&self, key: &str) -> Option<&Batch<T>> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Element `index` of a list or tuple batch
    pub fn index(&self, index: usize) -> Option<&Batch<T>> {
        match self {
            Self::List(items) | Self::Tuple(items) => items.get(index),
            _ => None,
        }
    }

    /// Every tensor leaf in depth-first order, including those inside lists
    pub fn tensors(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_tensors(&mut out);
        out
    }

    fn collect_tensors<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Tensor(tensor) => out.push(tensor),
            Self::List(items) | Self::Tuple(items) => {
                items.iter().for_each(|item| item.collect_tensors(out))
            }
            Self::Map(entries) => entries.values().for_each(|item| item.collect_tensors(out)),
            Self::None | Self::Scalar(_) | Self::Str(_) => {}
        }
    }

    /// Whether `other` has the same container nesting: same variants, same
    /// keys and same lengths. Leaf payloads are not compared.
    pub fn same_structure<U>(&self, other: &Batch<U>) -> bool {
        match (self, other) {
            (Self::Tensor(_), Batch::Tensor(_)) => true,
            (Self::None, Batch::None) => true,
            (Self::Scalar(_), Batch::Scalar(_)) => true,
            (Self::Str(_), Batch::Str(_)) => true,
            (Self::List(a), Batch::List(b)) | (Self::Tuple(a), Batch::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
            }
            (Self::Map(a), Batch::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_structure(vb))
            }
            _ => false,
        }
    }
}

impl<T> From<Scalar> for Batch<T> {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl<T> From<String> for Batch<T> {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T> From<&str> for Batch<T> {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl<T> From<Option<Batch<T>>> for Batch<T> {
    fn from(value: Option<Batch<T>>) -> Self {
        value.unwrap_or(Self::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_tensor::MockTensor;

    fn sample() -> Batch<MockTensor> {
        Batch::map([
            ("input_ids", Batch::Tensor(MockTensor::new(vec![2, 8], 1))),
            ("label", Batch::Scalar(Scalar::Int(3))),
            ("source", Batch::str("shard-0")),
            (
                "extra",
                Batch::List(vec![Batch::Tensor(MockTensor::new(vec![4], 2)), Batch::None]),
            ),
        ])
    }

    #[test]
    fn test_get_and_index() {
        let batch = sample();

        assert!(batch.get("input_ids").unwrap().is_tensor());
        assert_eq!(batch.get("label"), Some(&Batch::Scalar(Scalar::Int(3))));
        assert!(batch.get("missing").is_none());
        assert_eq!(batch.get("extra").unwrap().index(1), Some(&Batch::None));
        assert!(batch.index(0).is_none());
    }

    #[test]
    fn test_tensors_visits_lists() {
        let values: Vec<i32> = sample().tensors().iter().map(|t| t.value).collect();
        // BTreeMap orders keys: extra, input_ids, label, source
        assert_eq!(values, vec![2, 1]);
    }

    #[test]
    fn test_same_structure_ignores_leaf_payloads() {
        let a = sample();
        let mut b = sample();
        if let Batch::Map(entries) = &mut b {
            entries.insert("label".into(), Batch::Scalar(Scalar::Float(0.5)));
        }
        assert!(a.same_structure(&b));
    }

    #[test]
    fn test_same_structure_detects_changes() {
        let a = sample();

        let renamed: Batch<MockTensor> = Batch::map([("other", Batch::None)]);
        assert!(!a.same_structure(&renamed));

        let list = Batch::<MockTensor>::List(vec![Batch::None]);
        let tuple = Batch::<MockTensor>::Tuple(vec![Batch::None]);
        assert!(!list.same_structure(&tuple));

        let longer = Batch::<MockTensor>::List(vec![Batch::None, Batch::None]);
        assert!(!list.same_structure(&longer));
    }

    #[test]
    fn test_from_conversions() {
        let absent: Batch<MockTensor> = None.into();
        assert_eq!(absent, Batch::None);

        let text: Batch<MockTensor> = "hello".into();
        assert_eq!(text, Batch::Str("hello".into()));
    }
}
