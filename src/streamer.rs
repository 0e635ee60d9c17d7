//! Streaming a single blob in bounded chunks.

use serde::Serialize;
use std::io::Read;

use crate::store::ObjectStore;
use crate::{Blob, Error, Limit, ObjectId, ObjectType, Result};

/// One slice of a blob's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobChunk {
    pub oid: ObjectId,
    /// Full size of the blob, repeated on every chunk.
    pub size: i64,
    /// Byte offset of `data` within the blob.
    pub offset: u64,
    pub data: Vec<u8>,
}

/// Cuts a bounded reader into chunks of at most `chunk_size` bytes.
///
/// Always produces at least one chunk, so callers have somewhere to put
/// metadata even when nothing is read.
pub(crate) struct ChunkReader<'a> {
    reader: Option<Box<dyn Read + 'a>>,
    remaining: u64,
    offset: u64,
    chunk_size: u64,
    started: bool,
}

impl<'a> ChunkReader<'a> {
    /// `reader` may be `None` only when `read_limit` is zero.
    pub(crate) fn new(reader: Option<Box<dyn Read + 'a>>, read_limit: u64, chunk_size: usize) -> Self {
        ChunkReader {
            reader,
            remaining: read_limit,
            offset: 0,
            chunk_size: chunk_size.max(1) as u64,
            started: false,
        }
    }

    pub(crate) fn next_chunk(&mut self) -> Option<Result<(u64, Vec<u8>)>> {
        if self.remaining == 0 {
            if self.started {
                return None;
            }
            self.started = true;
            return Some(Ok((0, Vec::new())));
        }
        self.started = true;

        let want = self.remaining.min(self.chunk_size);
        let result = match self.reader.as_mut() {
            Some(reader) => read_exact_or_short(reader, want),
            None => Err(Error::Corrupt("blob content unavailable".into())),
        };

        match result {
            Ok(data) => {
                let offset = self.offset;
                self.offset += want;
                self.remaining -= want;
                if self.remaining == 0 {
                    // Release the store's reader as soon as the limit is met.
                    self.reader = None;
                }
                Some(Ok((offset, data)))
            }
            Err(e) => {
                self.remaining = 0;
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}

fn read_exact_or_short(reader: &mut Box<dyn Read + '_>, want: u64) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(want as usize);
    reader.by_ref().take(want).read_to_end(&mut data)?;
    if (data.len() as u64) < want {
        return Err(Error::Corrupt(format!(
            "blob content ended early: read {} of {} bytes",
            data.len(),
            want
        )));
    }
    Ok(data)
}

/// Lazily produced chunks of one blob.
///
/// Nothing is read from the store until the next chunk is requested, and
/// dropping the stream abandons the read.
pub struct BlobStream<'a> {
    oid: ObjectId,
    size: i64,
    chunks: ChunkReader<'a>,
}

impl BlobStream<'_> {
    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    /// Full size of the blob.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Drain the stream into a single [`Blob`].
    pub fn into_blob(self) -> Result<Blob> {
        let id = self.oid.clone();
        let size = self.size;
        let mut data = Vec::new();
        for chunk in self {
            data.extend_from_slice(&chunk?.data);
        }
        Ok(Blob { id, size, data })
    }
}

impl Iterator for BlobStream<'_> {
    type Item = Result<BlobChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next_chunk()?;
        Some(chunk.map(|(offset, data)| BlobChunk {
            oid: self.oid.clone(),
            size: self.size,
            offset,
            data,
        }))
    }
}

/// Start streaming the blob `oid`, reading at most `limit` bytes of content.
///
/// Fails with `InvalidArgument` for an empty or malformed id and with
/// `NotFound` when the id does not name a blob.
pub fn get_blob<'a, S: ObjectStore + ?Sized>(
    store: &'a S,
    oid: &str,
    limit: Limit,
    chunk_size: usize,
) -> Result<BlobStream<'a>> {
    if oid.is_empty() {
        return Err(Error::InvalidArgument("empty Oid".into()));
    }
    let id = ObjectId::parse(oid)?;

    let info = match store.info(&id)? {
        Some(info) if info.kind == ObjectType::Blob => info,
        Some(info) => {
            return Err(Error::NotFound(format!("{} is a {}, not a blob", id, info.kind)));
        }
        None => return Err(Error::NotFound(format!("blob not found: {}", id))),
    };

    let read_limit = limit.cap(info.size);
    let reader = if read_limit == 0 {
        None
    } else {
        Some(
            store
                .open_blob(&id, read_limit)?
                .ok_or_else(|| Error::NotFound(format!("blob not found: {}", id)))?,
        )
    };

    tracing::debug!(oid = %id, size = info.size, read_limit, "streaming blob");

    Ok(BlobStream {
        oid: id,
        size: info.size as i64,
        chunks: ChunkReader::new(reader, read_limit, chunk_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::FILEMODE_BLOB;
    use crate::store::{CountingStore, MemoryStore};
    use crate::Code;

    fn store_with(content: &[u8]) -> (MemoryStore, ObjectId) {
        let mut store = MemoryStore::new();
        let id = store.add_blob(content);
        (store, id)
    }

    #[test]
    fn test_chunks_reassemble_blob() {
        let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let (store, id) = store_with(&content);

        let chunks: Vec<BlobChunk> = get_blob(&store, id.as_str(), Limit::Unlimited, 64)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 16);
        assert!(chunks.iter().all(|c| c.data.len() <= 64));
        assert!(chunks.iter().all(|c| c.size == 1000 && c.oid == id));

        let mut offset = 0;
        let mut joined = Vec::new();
        for chunk in &chunks {
            assert_eq!(chunk.offset, offset);
            offset += chunk.data.len() as u64;
            joined.extend_from_slice(&chunk.data);
        }
        assert_eq!(joined, content);
    }

    #[test]
    fn test_zero_limit_yields_metadata_only() {
        let (store, id) = store_with(b"some content");

        let chunks: Vec<BlobChunk> = get_blob(&store, id.as_str(), Limit::bytes(0), 4)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].size, 12);
        assert_eq!(chunks[0].oid, id);
        assert!(chunks[0].data.is_empty());
    }

    #[test]
    fn test_empty_blob_yields_one_chunk() {
        let (store, id) = store_with(b"");

        let blob = get_blob(&store, id.as_str(), Limit::Unlimited, 4)
            .unwrap()
            .into_blob()
            .unwrap();
        assert_eq!(blob.size, 0);
        assert!(blob.data.is_empty());
        assert_eq!(get_blob(&store, id.as_str(), Limit::Unlimited, 4).unwrap().count(), 1);
    }

    #[test]
    fn test_positive_limit_truncates() {
        let (store, id) = store_with(b"0123456789");

        let blob = get_blob(&store, id.as_str(), Limit::bytes(7), 3)
            .unwrap()
            .into_blob()
            .unwrap();
        assert_eq!(blob.data, b"0123456");
        assert_eq!(blob.size, 10);

        let larger = get_blob(&store, id.as_str(), Limit::bytes(100), 3)
            .unwrap()
            .into_blob()
            .unwrap();
        assert_eq!(larger.data, b"0123456789");
    }

    #[test]
    fn test_never_reads_past_limit() {
        let (store, id) = store_with(&vec![7u8; 10_000]);
        let store = CountingStore::new(store);

        let blob = get_blob(&store, id.as_str(), Limit::bytes(10), 4)
            .unwrap()
            .into_blob()
            .unwrap();
        assert_eq!(blob.data.len(), 10);
        assert_eq!(store.opened(), vec![(id.clone(), 10)]);
        assert_eq!(store.bytes_read(), 10);

        // Metadata only never opens the blob
        get_blob(&store, id.as_str(), Limit::bytes(0), 4).unwrap().for_each(drop);
        assert_eq!(store.opened().len(), 1);
    }

    #[test]
    fn test_reads_only_as_far_as_pulled() {
        let (store, id) = store_with(&vec![7u8; 10_000]);
        let store = CountingStore::new(store);

        let mut stream = get_blob(&store, id.as_str(), Limit::Unlimited, 100).unwrap();
        assert_eq!(store.bytes_read(), 0);

        stream.next().unwrap().unwrap();
        assert!(store.bytes_read() <= 100);
        drop(stream);
        assert!(store.bytes_read() <= 100);
    }

    #[test]
    fn test_errors() {
        let (mut store, blob) = store_with(b"x");
        let tree = store.add_tree([("x", FILEMODE_BLOB, blob)]);

        let code = |oid: &str| get_blob(&store, oid, Limit::Unlimited, 4).err().unwrap().code();
        assert_eq!(code(""), Code::InvalidArgument);
        assert_eq!(code("not-an-oid"), Code::InvalidArgument);
        assert_eq!(code(tree.as_str()), Code::NotFound);
        assert_eq!(code(&"ab".repeat(32)), Code::NotFound);
    }

    #[test]
    fn test_short_read_is_corrupt() {
        let mut chunks = ChunkReader::new(Some(Box::new(&b"abc"[..])), 5, 2);
        assert_eq!(chunks.next_chunk().unwrap().unwrap(), (0, b"ab".to_vec()));
        assert_eq!(chunks.next_chunk().unwrap().unwrap_err().code(), Code::Internal);
        assert!(chunks.next_chunk().is_none());
    }
}
