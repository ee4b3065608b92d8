//! Chunked byte FIFO and zero-copy views over it.
//!
//! Incoming bytes arrive in arbitrary-sized chunks (TCP segments, file reads).
//! [`ByteQueue`] keeps each chunk as a refcounted [`Bytes`] handle, so appending
//! is O(1) and never copies payload data. [`split_prefix`](ByteQueue::split_prefix)
//! carves off the first n bytes as a [`ByteView`], a rope that may span several
//! source chunks, again without copying: splitting inside a chunk is a refcount
//! bump via [`Bytes::split_to`].
//!
//! Equality of queues and views is content-wise: `[[1,2,3],[4,5]]` equals
//! `[[1,2],[3,4,5]]`. The only copying path is [`ByteView::to_vec`] (and the
//! bounded 8-byte linearization used for integer decoding).

use bytes::Bytes;
use std::collections::VecDeque;

/// FIFO of byte chunks with O(1) append and O(k) prefix split.
#[derive(Debug, Clone, Default)]
pub struct ByteQueue {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl ByteQueue {
    pub fn new() -> Self {
        ByteQueue::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Total number of queued bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Detach the first `n` bytes as a view, leaving the suffix queued.
    ///
    /// Returns `Err(deficit)` with `deficit = n - len()` when the queue is
    /// short; the queue is left untouched in that case. `split_prefix(0)`
    /// always succeeds with an empty view.
    pub fn split_prefix(&mut self, n: usize) -> Result<ByteView, usize> {
        if n > self.len {
            return Err(n - self.len);
        }
        let mut view = ByteView::default();
        let mut need = n;
        while need > 0 {
            let Some(mut front) = self.chunks.pop_front() else {
                break;
            };
            if front.len() > need {
                let head = front.split_to(need);
                self.chunks.push_front(front);
                view.push_chunk(head);
                need = 0;
            } else {
                need -= front.len();
                view.push_chunk(front);
            }
        }
        self.len -= n;
        Ok(view)
    }

    /// Clone the first `n` bytes as a view without consuming them.
    pub fn peek_prefix(&self, n: usize) -> Result<ByteView, usize> {
        if n > self.len {
            return Err(n - self.len);
        }
        let mut view = ByteView::default();
        let mut need = n;
        for chunk in &self.chunks {
            if need == 0 {
                break;
            }
            let take = chunk.len().min(need);
            view.push_chunk(chunk.slice(..take));
            need -= take;
        }
        Ok(view)
    }

    /// View of everything currently queued, without consuming it.
    pub fn peek_all(&self) -> ByteView {
        ByteView {
            chunks: self.chunks.iter().cloned().collect(),
            len: self.len,
        }
    }

    /// Iterate over the queued bytes.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.chunks.iter().flat_map(|c| c.iter().copied())
    }
}

impl From<ByteView> for ByteQueue {
    fn from(view: ByteView) -> Self {
        ByteQueue {
            len: view.len,
            chunks: view.chunks.into(),
        }
    }
}

impl PartialEq for ByteQueue {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for ByteQueue {}

/// Zero-copy view of a byte range: a rope over refcounted chunks.
#[derive(Debug, Clone, Default)]
pub struct ByteView {
    chunks: Vec<Bytes>,
    len: usize,
}

impl ByteView {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push_chunk(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Iterate over the underlying chunks as slices.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(|c| c.as_ref())
    }

    /// Iterate over the bytes.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.chunks.iter().flat_map(|c| c.iter().copied())
    }

    /// Linearize into a contiguous buffer. The only unbounded copying path.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Copy the first `dst.len()` bytes into `dst`. The view must be at least
    /// that long.
    pub(crate) fn copy_into(&self, dst: &mut [u8]) {
        debug_assert!(self.len >= dst.len());
        let mut at = 0;
        for chunk in self.chunks() {
            if at == dst.len() {
                break;
            }
            let take = chunk.len().min(dst.len() - at);
            dst[at..at + take].copy_from_slice(&chunk[..take]);
            at += take;
        }
    }

    /// Append the view's content to a byte buffer.
    pub fn extend_into(&self, out: &mut Vec<u8>) {
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
    }
}

impl From<Bytes> for ByteView {
    fn from(chunk: Bytes) -> Self {
        let mut view = ByteView::default();
        view.push_chunk(chunk);
        view
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(buf: Vec<u8>) -> Self {
        ByteView::from(Bytes::from(buf))
    }
}

impl From<&[u8]> for ByteView {
    fn from(buf: &[u8]) -> Self {
        ByteView::from(Bytes::copy_from_slice(buf))
    }
}

impl PartialEq for ByteView {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for ByteView {}

impl PartialEq<[u8]> for ByteView {
    fn eq(&self, other: &[u8]) -> bool {
        self.len == other.len() && self.iter().eq(other.iter().copied())
    }
}

impl PartialEq<&[u8]> for ByteView {
    fn eq(&self, other: &&[u8]) -> bool {
        *self == **other
    }
}

impl PartialEq<Vec<u8>> for ByteView {
    fn eq(&self, other: &Vec<u8>) -> bool {
        *self == other[..]
    }
}
