use std::collections::VecDeque;

/// FIFO that evicts its oldest entry once `capacity` is reached.
///
/// `None` capacity never evicts. Owned by a single task, so no locking.
pub struct FifoDropOldestQueue<T> {
    buf: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T> FifoDropOldestQueue<T> {
    /// # Panics
    ///
    /// If `capacity` is `Some(0)`.
    pub fn new(capacity: Option<usize>) -> Self {
        assert!(capacity.is_none_or(|c| c > 0));

        Self {
            buf: VecDeque::new(),
            capacity,
        }
    }

    /// Push to the back, returning the evicted front entry if the queue was full.
    pub fn push_overwrite(&mut self, value: T) -> Option<T> {
        let evicted = match self.capacity {
            Some(capacity) if self.buf.len() >= capacity => self.buf.pop_front(),
            _ => None,
        };
        self.buf.push_back(value);
        evicted
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.buf.drain(..)
    }

    /// Drop everything, returning how many entries were held.
    pub fn clear(&mut self) -> usize {
        let len = self.buf.len();
        self.buf.clear();
        len
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
