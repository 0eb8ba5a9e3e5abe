use std::collections::VecDeque;

/// A bounded FIFO buffer of prices. Pushing into a full window evicts the oldest value.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl PriceWindow {
    /// Creates an empty window. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    /// Rearranges the ring buffer so the values are one contiguous slice, oldest first.
    pub fn as_slice(&mut self) -> &[f64] {
        self.values.make_contiguous()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut window = PriceWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_eq!(window.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(window.as_slice(), &[2.0, 3.0, 4.0]);
        assert_eq!(window.last(), Some(4.0));
    }

    #[test]
    fn zero_capacity_holds_one_value() {
        let mut window = PriceWindow::new(0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.to_vec(), vec![2.0]);
    }
}
