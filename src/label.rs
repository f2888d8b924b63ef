use crate::error::GenerateError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_LABELS: usize = 26 * 26;

/// Two-letter program label, `AA` through `ZZ`. Ordering follows allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label([u8; 2]);

impl Label {
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= MAX_LABELS {
            return None;
        }
        Some(Self([b'A' + (index / 26) as u8, b'A' + (index % 26) as u8]))
    }

    pub fn from_letters(first: char, second: char) -> Option<Self> {
        if first.is_ascii_uppercase() && second.is_ascii_uppercase() {
            Some(Self([first as u8, second as u8]))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        (self.0[0] - b'A') as usize * 26 + (self.0[1] - b'A') as usize
    }

    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII uppercase by construction.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid label {0:?}")]
pub struct InvalidLabel(pub String);

impl FromStr for Label {
    type Err = InvalidLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => {
                Label::from_letters(a, b).ok_or_else(|| InvalidLabel(s.to_string()))
            }
            _ => Err(InvalidLabel(s.to_string())),
        }
    }
}

/// Hands out labels for one generation pass. Labels are never reused; a new
/// pass starts from a fresh allocator.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next_index: usize,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_label(&mut self) -> Result<Label, GenerateError> {
        let label = Label::from_index(self.next_index)
            .ok_or(GenerateError::CapacityExceeded { max: MAX_LABELS })?;
        self.next_index += 1;
        Ok(label)
    }

    pub fn allocated(&self) -> usize {
        self.next_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn labels_follow_fixed_sequence() {
        let mut labels = LabelAllocator::new();
        let first: Vec<String> = (0..28)
            .map(|_| labels.next_label().unwrap().to_string())
            .collect();
        assert_eq!(first[0], "AA");
        assert_eq!(first[1], "AB");
        assert_eq!(first[25], "AZ");
        assert_eq!(first[26], "BA");
        assert_eq!(first[27], "BB");
    }

    #[test]
    fn allocator_fails_after_zz() {
        let mut labels = LabelAllocator::new();
        let mut last = None;
        for _ in 0..MAX_LABELS {
            last = Some(labels.next_label().unwrap());
        }
        assert_eq!(last.unwrap().as_str(), "ZZ");
        assert_eq!(
            labels.next_label(),
            Err(GenerateError::CapacityExceeded { max: 676 })
        );
        assert_eq!(labels.allocated(), MAX_LABELS);
    }

    #[test]
    fn parses_only_two_uppercase_letters() {
        assert_eq!("QX".parse::<Label>().unwrap().to_string(), "QX");
        assert!("qx".parse::<Label>().is_err());
        assert!("A".parse::<Label>().is_err());
        assert!("ABC".parse::<Label>().is_err());
    }

    proptest! {
        #[test]
        fn index_round_trips(index in 0usize..MAX_LABELS) {
            let label = Label::from_index(index).unwrap();
            prop_assert_eq!(label.index(), index);
            prop_assert_eq!(label.as_str().parse::<Label>().unwrap(), label);
        }
    }
}
