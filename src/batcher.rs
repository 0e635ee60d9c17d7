//! Grouping streamed items into bounded response batches.

use crate::Result;

/// Iterator adapter yielding items in batches of at most `size`.
///
/// An error is passed on as soon as it is seen, dropping the partial batch,
/// and nothing is yielded after it.
pub struct Batched<I> {
    inner: I,
    size: usize,
    done: bool,
}

impl<I> Batched<I> {
    pub fn new(inner: I, size: usize) -> Self {
        Batched {
            inner,
            size: size.max(1),
            done: false,
        }
    }

    /// Maximum number of items per batch.
    pub fn batch_size(&self) -> usize {
        self.size
    }
}

impl<T, I: Iterator<Item = Result<T>>> Iterator for Batched<I> {
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(Ok(item)) => batch.push(item),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Adds [`batched`](BatchExt::batched) to fallible iterators.
pub trait BatchExt: Iterator + Sized {
    fn batched(self, size: usize) -> Batched<Self> {
        Batched::new(self, size)
    }
}

impl<T, I: Iterator<Item = Result<T>>> BatchExt for I {}
