//! Candidate readings of one field within one frame

/// Distinct sanitized readings in first-seen order, with how often each was seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    entries: Vec<(String, usize)>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reading; empty readings carry nothing and are ignored
    pub fn insert(&mut self, value: impl Into<String>) {
        self.insert_n(value, 1);
    }

    fn insert_n(&mut self, value: impl Into<String>, count: usize) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(v, _)| *v == value) {
            Some((_, seen)) => *seen += count,
            None => self.entries.push((value, count)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(v, _)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|(v, _)| v == value)
    }

    /// Most frequent reading, first seen on ties
    pub fn most_common(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(v, _)| v.as_str())
    }

    /// Split every reading at `separator` into a left and a right set,
    /// keeping counts. The left side is the text before the first separator,
    /// the right side the text after the last one.
    pub fn split(&self, separator: char) -> (CandidateSet, CandidateSet) {
        let mut left = CandidateSet::new();
        let mut right = CandidateSet::new();
        for (value, count) in &self.entries {
            let head = value.split(separator).next().unwrap_or_default();
            let tail = value.rsplit(separator).next().unwrap_or_default();
            left.insert_n(head, *count);
            right.insert_n(tail, *count);
        }
        (left, right)
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates_and_skips_empty() {
        let set: CandidateSet = ["52", "", "52", "5"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["52", "5"]);
        assert!(set.contains("5"));
        assert!(!set.contains(""));
    }

    #[test]
    fn test_most_common() {
        let set: CandidateSet = ["a", "b", "b", "a", "c"].into_iter().collect();
        assert_eq!(set.most_common(), Some("a"));

        let set: CandidateSet = ["a", "b", "b"].into_iter().collect();
        assert_eq!(set.most_common(), Some("b"));

        assert_eq!(CandidateSet::new().most_common(), None);
    }

    #[test]
    fn test_split() {
        let set: CandidateSet = ["120/80", "120/85", "/90"].into_iter().collect();
        let (left, right) = set.split('/');
        assert_eq!(left.iter().collect::<Vec<_>>(), vec!["120"]);
        assert_eq!(right.iter().collect::<Vec<_>>(), vec!["80", "85", "90"]);
    }
}
