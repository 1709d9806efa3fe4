//! Ordered buffer for chunks produced before the consumer attaches.

use std::collections::VecDeque;

/// An unbounded FIFO queue of pending chunks.
///
/// Used by push-model stream sources whose backend can emit before anyone is
/// listening: the producer parks fragments here and the consumer drains them,
/// oldest first, once it attaches. Ownership of a chunk transfers to the
/// caller on [`pop`](ChunkQueue::pop); the queue keeps nothing behind.
///
/// `push` never blocks and there is no capacity bound; the producer is
/// expected to be finite and comparatively slow.
#[derive(Debug)]
pub struct ChunkQueue<T> {
    chunks: VecDeque<T>,
}

impl<T> ChunkQueue<T> {
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
        }
    }

    /// Append a chunk at the tail. O(1), never blocks.
    pub fn push(&mut self, chunk: T) {
        self.chunks.push_back(chunk);
    }

    /// Remove and return the oldest chunk, or `None` when empty. O(1).
    pub fn pop(&mut self) -> Option<T> {
        self.chunks.pop_front()
    }

    /// Number of chunks pushed and not yet popped.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl<T> Default for ChunkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = ChunkQueue::new();
        queue.push("a");
        queue.push("b");
        queue.push("c");

        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), Some("b"));
        assert_eq!(queue.pop(), Some("c"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let mut queue: ChunkQueue<String> = ChunkQueue::new();
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_len_tracks_pushes_and_pops() {
        let mut queue = ChunkQueue::new();
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 5);

        queue.pop();
        queue.pop();
        assert_eq!(queue.len(), 3);

        queue.push(5);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_interleaved_push_pop() {
        let mut queue = ChunkQueue::new();
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.pop(), Some(1));
        queue.push(3);
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
    }
}
