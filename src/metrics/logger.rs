use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use super::SmoothedValue;

const DEFAULT_DELIMITER: &str = "  ";

/// A set of named `SmoothedValue`s, created on their first update.
///
/// Its `Display` renders every meter as `name: median (global_avg)`.
#[derive(Debug, Clone)]
pub struct MetricLogger {
    meters: BTreeMap<String, SmoothedValue>,
    delimiter: String,
}

/// A snapshot of a meter, suited for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterSummary {
    pub median: f32,
    pub avg: f32,
    pub global_avg: f32,
    pub count: u64,
}

impl Default for MetricLogger {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl MetricLogger {
    /// Creates a new `MetricLogger`.
    ///
    /// # Arguments
    /// * `delimiter` - The separator placed between meters when displayed.
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            meters: BTreeMap::new(),
            delimiter: delimiter.into(),
        }
    }

    pub fn update(&mut self, name: &str, value: f32) {
        match self.meters.get_mut(name) {
            Some(meter) => meter.update(value),
            None => {
                let mut meter = SmoothedValue::default();
                meter.update(value);
                self.meters.insert(name.to_string(), meter);
            }
        }
    }

    pub fn update_all<'a, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        for (name, value) in values {
            self.update(name, value);
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn get(&self, name: &str) -> Option<&SmoothedValue> {
        self.meters.get(name)
    }

    /// The meter names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.meters.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    pub fn summary(&self) -> BTreeMap<String, MeterSummary> {
        self.meters
            .iter()
            .map(|(name, meter)| {
                let summary = MeterSummary {
                    median: meter.median(),
                    avg: meter.avg(),
                    global_avg: meter.global_avg(),
                    count: meter.count(),
                };

                (name.clone(), summary)
            })
            .collect()
    }
}

impl fmt::Display for MetricLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, meter)) in self.meters.iter().enumerate() {
            if i > 0 {
                f.write_str(&self.delimiter)?;
            }

            write!(f, "{name}: {:.4} ({:.4})", meter.median(), meter.global_avg())?;
        }

        Ok(())
    }
}
