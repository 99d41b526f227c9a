#![allow(clippy::len_without_is_empty)]
use std::ops::Index;

use rand::{seq::SliceRandom, Rng};

use crate::error::{Error, Result};

/// An append-only growable buffer supporting uniform random draws
///
/// Used as the set of previously experienced `(state, action)` pairs in Dyna-style planning.
#[derive(Debug, Default, Clone)]
pub struct DefaultBuf<T> {
    buffer: Vec<T>,
}

impl<T> DefaultBuf<T> {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Returns the buffer length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Append an element and return its position
    pub fn append(&mut self, item: T) -> usize {
        self.buffer.push(item);
        self.buffer.len() - 1
    }

    /// Draw an element uniformly at random
    ///
    /// **Errors** if the buffer is empty
    pub fn rand<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&T> {
        self.buffer
            .choose(rng)
            .ok_or(Error::Empty("replay buffer"))
    }

    /// Get a slice view of the internal buffer
    pub fn view(&self) -> &[T] {
        &self.buffer
    }
}

impl<T> Index<usize> for DefaultBuf<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.buffer[index]
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn default_buf_functional() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut buf = DefaultBuf::new();
        assert_eq!(buf.len(), 0, "initialized empty");
        assert!(
            matches!(buf.rand(&mut rng), Err(Error::Empty(_))),
            "drawing from an empty buffer fails"
        );

        for i in 0..4 {
            buf.append(i * 2);
        }
        let ix = buf.append(9);
        assert_eq!(ix, 4, "append returns position");
        assert_eq!(buf[ix], 9, "indexing works");
        assert_eq!(buf.view(), [0, 2, 4, 6, 9], "contents in append order");

        for _ in 0..20 {
            let x = *buf.rand(&mut rng).unwrap();
            assert!(buf.view().contains(&x), "draws come from the buffer");
        }
    }

    #[test]
    fn draws_cover_every_element() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut buf = DefaultBuf::with_capacity(3);
        for i in 0..3 {
            buf.append(i);
        }
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[*buf.rand(&mut rng).unwrap()] = true;
        }
        assert_eq!(seen, [true; 3], "uniform draw reaches all elements");
    }
}
