use std::collections::VecDeque;

const DEFAULT_WINDOW_SIZE: usize = 20;

/// Tracks a series of values, providing smoothed statistics over a sliding
/// window as well as over the whole series.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    window: VecDeque<f32>,
    window_size: usize,
    total: f64,
    count: u64,
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl SmoothedValue {
    /// Creates a new `SmoothedValue` averaging over the last `window_size` values.
    ///
    /// # Panics
    /// If `window_size` is zero.
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "window_size must be > 0");

        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            total: 0.0,
            count: 0,
        }
    }

    pub fn update(&mut self, value: f32) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }

        self.window.push_back(value);
        self.total += value as f64;
        self.count += 1;
    }

    /// The median of the window. For an even amount of values the lower of
    /// the two middle ones is returned.
    pub fn median(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<_> = self.window.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        sorted[(sorted.len() - 1) / 2]
    }

    /// The mean of the window.
    pub fn avg(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }

        self.window.iter().sum::<f32>() / self.window.len() as f32
    }

    /// The mean of every value seen.
    pub fn global_avg(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }

        (self.total / self.count as f64) as f32
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_statistics_forget_old_values() {
        let mut value = SmoothedValue::new(3);
        for x in [100.0, 1.0, 2.0, 3.0] {
            value.update(x);
        }

        assert_eq!(value.median(), 2.0);
        assert_eq!(value.avg(), 2.0);
        assert_eq!(value.global_avg(), 26.5);
        assert_eq!(value.count(), 4);
        assert_eq!(value.total(), 106.0);
    }

    #[test]
    fn even_window_takes_lower_median() {
        let mut value = SmoothedValue::new(4);
        for x in [4.0, 1.0, 3.0, 2.0] {
            value.update(x);
        }

        assert_eq!(value.median(), 2.0);
    }

    #[test]
    fn empty_value_reports_zeroes() {
        let value = SmoothedValue::default();

        assert_eq!(value.median(), 0.0);
        assert_eq!(value.avg(), 0.0);
        assert_eq!(value.global_avg(), 0.0);
    }
}
