//! Store wrapper recording how much a caller reads.

use std::cell::{Cell, RefCell};
use std::io::{self, Read};

use super::{ObjectIds, ObjectStore};
use crate::{ObjectId, ObjectInfo, Result, TreeEntry};

/// Wraps a store and counts header lookups, blob opens and content bytes.
pub(crate) struct CountingStore<S> {
    inner: S,
    info_calls: Cell<usize>,
    opened: RefCell<Vec<(ObjectId, u64)>>,
    bytes_read: Cell<u64>,
}

impl<S: ObjectStore> CountingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        CountingStore {
            inner,
            info_calls: Cell::new(0),
            opened: RefCell::new(Vec::new()),
            bytes_read: Cell::new(0),
        }
    }

    /// Number of `info` calls, one per candidate a scan looked at.
    pub(crate) fn info_calls(&self) -> usize {
        self.info_calls.get()
    }

    /// Every `open_blob` call with the `max_len` it asked for.
    pub(crate) fn opened(&self) -> Vec<(ObjectId, u64)> {
        self.opened.borrow().clone()
    }

    /// Content bytes pulled through readers handed out so far.
    pub(crate) fn bytes_read(&self) -> u64 {
        self.bytes_read.get()
    }
}

struct CountingReader<'a> {
    inner: Box<dyn Read + 'a>,
    counter: &'a Cell<u64>,
}

impl Read for CountingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.set(self.counter.get() + n as u64);
        Ok(n)
    }
}

impl<S: ObjectStore> ObjectStore for CountingStore<S> {
    fn info(&self, id: &ObjectId) -> Result<Option<ObjectInfo>> {
        self.info_calls.set(self.info_calls.get() + 1);
        self.inner.info(id)
    }

    fn open_blob(&self, id: &ObjectId, max_len: u64) -> Result<Option<Box<dyn Read + '_>>> {
        self.opened.borrow_mut().push((id.clone(), max_len));
        Ok(self.inner.open_blob(id, max_len)?.map(|inner| {
            Box::new(CountingReader {
                inner,
                counter: &self.bytes_read,
            }) as Box<dyn Read + '_>
        }))
    }

    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>> {
        self.inner.resolve_tree(revision)
    }

    fn tree_entries(&self, tree: &ObjectId) -> Result<Option<Vec<TreeEntry>>> {
        self.inner.tree_entries(tree)
    }

    fn object_ids(&self) -> Result<ObjectIds<'_>> {
        self.inner.object_ids()
    }
}
