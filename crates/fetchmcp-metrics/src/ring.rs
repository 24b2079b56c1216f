//! A bounded ring buffer of request durations with quantile support.
//!
//! A `VecDeque` capped at a fixed capacity, with exact sorting for
//! quantile computation since the buffer (default 1024 entries) is
//! never large enough to need approximation.

use std::collections::VecDeque;

pub struct DurationRing {
    data: VecDeque<u64>,
    capacity: usize,
}

impl DurationRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value_ms: u64) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value_ms);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns the requested quantiles (fractions in `[0, 1]`) computed
    /// from the current contents. Empty buffers report all zeros.
    pub fn quantiles(&self, fractions: &[f64; 3]) -> (u64, u64, u64) {
        if self.data.is_empty() {
            return (0, 0, 0);
        }
        let mut sorted: Vec<u64> = self.data.iter().copied().collect();
        sorted.sort_unstable();
        let pick = |frac: f64| -> u64 {
            let idx = ((frac * (sorted.len() - 1) as f64).round() as usize).min(sorted.len() - 1);
            sorted[idx]
        };
        (pick(fractions[0]), pick(fractions[1]), pick(fractions[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let mut ring = DurationRing::new(3);
        ring.push(1);
        ring.push(2);
        ring.push(3);
        ring.push(4);
        let (p50, _, _) = ring.quantiles(&[0.5, 0.95, 0.99]);
        assert!(p50 >= 2, "oldest sample (1) should have been evicted");
    }

    #[test]
    fn quantiles_of_single_value_all_equal() {
        let mut ring = DurationRing::new(10);
        ring.push(42);
        assert_eq!(ring.quantiles(&[0.5, 0.95, 0.99]), (42, 42, 42));
    }
}
