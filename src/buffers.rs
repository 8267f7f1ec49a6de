use crate::sensors::Sample;

/// Fixed-capacity circular buffer holding the most recent N samples seen
/// before a trigger.
///
/// Implemented as an arena of N slots plus a write cursor and an occupancy
/// count; once full, `push` silently overwrites the oldest slot. That
/// eviction is intentional information loss (older context is no longer
/// relevant), never an error. Chronological order is recovered from
/// cursor + occupancy, independent of physical slot order.
#[derive(Debug)]
pub struct PreEventRing {
    slots: Vec<Sample>,
    head: usize,
    count: usize,
}

impl PreEventRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be nonzero");
        PreEventRing {
            slots: vec![Sample::new(0, 0.0, 0.0, 0.0); capacity],
            head: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// O(1), always succeeds. Overwrites the oldest sample once full.
    pub fn push(&mut self, sample: Sample) {
        self.slots[self.head] = sample;
        self.head = (self.head + 1) % self.slots.len();
        if self.count < self.slots.len() {
            self.count += 1;
        }
    }

    /// Lazy oldest-to-newest view of the retained samples. Restartable:
    /// the returned iterator borrows the ring without consuming it.
    pub fn snapshot_chronological(&self) -> impl Iterator<Item = &Sample> + Clone {
        let capacity = self.slots.len();
        let start = (self.head + capacity - self.count) % capacity;
        (0..self.count).map(move |i| &self.slots[(start + i) % capacity])
    }

    /// Clears occupancy without erasing storage. Used after a completed
    /// capture so stale pre-event data cannot leak into the next episode.
    pub fn reset(&mut self) {
        self.head = 0;
        self.count = 0;
    }
}

/// Fixed-capacity linear buffer collecting samples from the trigger until
/// the capture window closes. Append-only within one episode; cleared when
/// a new episode opens.
#[derive(Debug)]
pub struct PostEventBuffer {
    slots: Vec<Sample>,
    capacity: usize,
}

impl PostEventBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "post buffer capacity must be nonzero");
        PostEventBuffer {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The episode is complete once the buffer reaches capacity.
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn push(&mut self, sample: Sample) {
        debug_assert!(!self.is_full(), "push into full post buffer");
        if !self.is_full() {
            self.slots.push(sample);
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.slots
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
