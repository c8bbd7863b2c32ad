//! IO vectors exchanged between the file service and the memory cache

use bytes::Bytes;

/// A batch of byte-range reads against one file
#[derive(Clone, Debug, Default)]
pub struct IoVector {
    /// File service path, see [`crate::FilePath`]
    pub file_path: String,
    pub entries: Vec<IoEntry>,
    /// Bypass the cache entirely
    pub no_cache: bool,
    /// Speculative read-ahead rather than a demand read
    pub preloading: bool,
}

impl IoVector {
    pub fn new(file_path: impl Into<String>, entries: Vec<IoEntry>) -> Self {
        Self {
            file_path: file_path.into(),
            entries,
            no_cache: false,
            preloading: false,
        }
    }

    #[must_use]
    pub fn with_no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    #[must_use]
    pub fn with_preloading(mut self) -> Self {
        self.preloading = true;
        self
    }

    /// True when every entry has been resolved
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.entries.iter().all(IoEntry::is_done)
    }
}

/// One byte range of an [`IoVector`]
#[derive(Clone, Debug)]
pub struct IoEntry {
    pub offset: u64,
    pub size: u64,
    /// Whether this entry may be served from and stored into the cache
    pub cacheable: bool,
    /// Resolved object bytes (cache hit or fetched by the caller)
    pub object: Option<Bytes>,
    /// Accounted size of `object`
    pub object_size: u64,
    pub(crate) done: bool,
}

impl IoEntry {
    pub fn new(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            cacheable: true,
            object: None,
            object_size: 0,
            done: false,
        }
    }

    /// Entry that is never looked up in or stored into the cache
    pub fn uncached(offset: u64, size: u64) -> Self {
        Self {
            cacheable: false,
            ..Self::new(offset, size)
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Mark the entry resolved with the given object bytes
    pub fn resolve(&mut self, object: Bytes, object_size: u64) {
        self.object = Some(object);
        self.object_size = object_size;
        self.done = true;
    }
}
