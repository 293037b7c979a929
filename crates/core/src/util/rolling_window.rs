use std::collections::VecDeque;

/// Bounded FIFO over the most recent `capacity` values. Pushing past
/// capacity evicts the oldest entry; iteration runs oldest to newest.
#[derive(Clone, Debug)]
pub struct RollingWindow<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends a value, returning the evicted entry when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_arrival_order_and_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());

        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(window.len(), window.capacity());
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut window = RollingWindow::new(5);
        for i in 0..100 {
            window.push(i);
            assert!(window.len() <= 5);
        }
        assert_eq!(
            window.iter().copied().collect::<Vec<_>>(),
            vec![95, 96, 97, 98, 99]
        );
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_is_rejected() {
        let _ = RollingWindow::<u8>::new(0);
    }
}
