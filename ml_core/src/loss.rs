use std::collections::{BTreeMap, btree_map};

/// Named scalar loss components produced by a model for one batch.
///
/// Components are always kept sorted by name, so iterating a `LossDict`
/// yields the same order on every worker that produced the same names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossDict {
    losses: BTreeMap<String, f32>,
}

impl LossDict {
    /// Creates an empty `LossDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a loss component, returning the previous value for `name` if any.
    pub fn insert(&mut self, name: impl Into<String>, value: f32) -> Option<f32> {
        self.losses.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.losses.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    /// The component names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.losses.keys().map(String::as_str)
    }

    /// The component values, ordered by name.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.losses.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.losses.iter().map(|(name, &value)| (name.as_str(), value))
    }

    /// The sum of every component, this is the quantity being minimized.
    pub fn total(&self) -> f32 {
        self.values().sum()
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for LossDict {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        Self {
            losses: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for LossDict {
    type Item = (String, f32);
    type IntoIter = btree_map::IntoIter<String, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.losses.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_sorted_by_name() {
        let losses: LossDict = [("loss_rpn", 1.0), ("loss_box", 2.0), ("loss_cls", 3.0)]
            .into_iter()
            .collect();

        let names: Vec<_> = losses.names().collect();
        assert_eq!(names, ["loss_box", "loss_cls", "loss_rpn"]);

        let values: Vec<_> = losses.values().collect();
        assert_eq!(values, [2.0, 3.0, 1.0]);
    }

    #[test]
    fn total_sums_every_component() {
        let mut losses = LossDict::new();
        losses.insert("a", 0.25);
        losses.insert("b", 0.5);

        assert_eq!(losses.total(), 0.75);
        assert_eq!(LossDict::new().total(), 0.0);
    }

    #[test]
    fn insert_replaces_existing_component() {
        let mut losses = LossDict::new();
        assert_eq!(losses.insert("a", 1.0), None);
        assert_eq!(losses.insert("a", 2.0), Some(1.0));
        assert_eq!(losses.len(), 1);
        assert_eq!(losses.get("a"), Some(2.0));
    }
}
