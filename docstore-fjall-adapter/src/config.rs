use fjall::{CompressionType, Config, PartitionCreateOptions};
use parking_lot::RwLock;
use std::sync::atomic::{
    AtomicBool, AtomicI8, AtomicU16, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};
use std::sync::{Arc, OnceLock};

/// Configuration for the fjall document store.
///
/// Cheap to clone; every clone shares the same settings. Values are set
/// through [FjallModuleBuilder](crate::FjallModuleBuilder) and read when the
/// keyspace and its partitions are opened.
///
/// Keyspace settings:
/// - `db_path` - directory holding the keyspace
/// - `manual_journal_persist` - when true the journal is only persisted on commit
/// - `flush_workers` / `compaction_workers` - background worker threads
/// - `block_cache_capacity` / `blob_cache_capacity` - combined into the cache size
/// - `max_journaling_size` / `max_write_buffer_size` - memory limits
/// - `fsync_frequency` - periodic fsync in milliseconds, `0` disables it
/// - `commit_before_close` - persist the journal when the store closes
///
/// Partition settings apply to every collection and index partition:
/// `bloom_filter_bits` (`-1` disables the filter), `compression_type`,
/// `max_memtable_size` and `block_size`.
#[derive(Clone)]
pub struct FjallConfig {
    inner: Arc<FjallConfigInner>,
}

impl FjallConfig {
    #[inline]
    pub fn new() -> FjallConfig {
        FjallConfig {
            inner: Arc::new(FjallConfigInner::new()),
        }
    }

    #[inline]
    pub(crate) fn keyspace_config(&self) -> Config {
        let mut config = Config::new(self.inner.db_path());
        config = config
            .manual_journal_persist(self.inner.manual_journal_persist())
            .flush_workers(self.inner.flush_workers())
            .compaction_workers(self.inner.compaction_workers())
            .cache_size(self.inner.block_cache_capacity() + self.inner.blob_cache_capacity())
            .max_journaling_size(self.inner.max_journaling_size())
            .max_write_buffer_size(self.inner.max_write_buffer_size());

        if self.inner.fsync_frequency() > 0 {
            config = config.fsync_ms(Some(self.inner.fsync_frequency()));
        }
        config
    }

    #[inline]
    pub(crate) fn partition_config(&self) -> PartitionCreateOptions {
        PartitionCreateOptions::default()
            .bloom_filter_bits(if self.inner.bloom_filter_bits() < 0 {
                None
            } else {
                Some(self.inner.bloom_filter_bits() as u8)
            })
            .compression(self.inner.compression_type())
            .max_memtable_size(self.inner.max_memtable_size())
            .block_size(self.inner.block_size())
    }

    #[inline]
    pub fn db_path(&self) -> &str {
        self.inner.db_path()
    }

    #[inline]
    pub(crate) fn set_db_path(&self, db_path: &str) {
        self.inner.set_db_path(db_path)
    }

    #[inline]
    pub fn manual_journal_persist(&self) -> bool {
        self.inner.manual_journal_persist()
    }

    #[inline]
    pub(crate) fn set_manual_journal_persist(&self, v: bool) {
        self.inner.set_manual_journal_persist(v)
    }

    #[inline]
    pub fn flush_workers(&self) -> usize {
        self.inner.flush_workers()
    }

    #[inline]
    pub(crate) fn set_flush_workers(&self, c: usize) {
        self.inner.set_flush_workers(c)
    }

    #[inline]
    pub fn compaction_workers(&self) -> usize {
        self.inner.compaction_workers()
    }

    #[inline]
    pub(crate) fn set_compaction_workers(&self, c: usize) {
        self.inner.set_compaction_workers(c)
    }

    #[inline]
    pub fn block_cache_capacity(&self) -> u64 {
        self.inner.block_cache_capacity()
    }

    #[inline]
    pub(crate) fn set_block_cache_capacity(&self, c: u64) {
        self.inner.set_block_cache_capacity(c)
    }

    #[inline]
    pub fn blob_cache_capacity(&self) -> u64 {
        self.inner.blob_cache_capacity()
    }

    #[inline]
    pub(crate) fn set_blob_cache_capacity(&self, c: u64) {
        self.inner.set_blob_cache_capacity(c)
    }

    #[inline]
    pub fn max_journaling_size(&self) -> u64 {
        self.inner.max_journaling_size()
    }

    #[inline]
    pub(crate) fn set_max_journaling_size(&self, s: u64) {
        self.inner.set_max_journaling_size(s)
    }

    #[inline]
    pub fn max_write_buffer_size(&self) -> u64 {
        self.inner.max_write_buffer_size()
    }

    #[inline]
    pub(crate) fn set_max_write_buffer_size(&self, s: u64) {
        self.inner.set_max_write_buffer_size(s)
    }

    #[inline]
    pub fn fsync_frequency(&self) -> u16 {
        self.inner.fsync_frequency()
    }

    #[inline]
    pub(crate) fn set_fsync_frequency(&self, f: u16) {
        self.inner.set_fsync_frequency(f)
    }

    #[inline]
    pub fn commit_before_close(&self) -> bool {
        self.inner.commit_before_close()
    }

    #[inline]
    pub(crate) fn set_commit_before_close(&self, v: bool) {
        self.inner.set_commit_before_close(v)
    }

    #[inline]
    pub fn bloom_filter_bits(&self) -> i8 {
        self.inner.bloom_filter_bits()
    }

    #[inline]
    pub(crate) fn set_bloom_filter_bits(&self, bits: i8) {
        self.inner.set_bloom_filter_bits(bits)
    }

    #[inline]
    pub fn compression_type(&self) -> CompressionType {
        self.inner.compression_type()
    }

    #[inline]
    pub(crate) fn set_compression_type(&self, compression_type: CompressionType) {
        self.inner.set_compression_type(compression_type)
    }

    #[inline]
    pub fn max_memtable_size(&self) -> u32 {
        self.inner.max_memtable_size()
    }

    #[inline]
    pub(crate) fn set_max_memtable_size(&self, s: u32) {
        self.inner.set_max_memtable_size(s)
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.inner.block_size()
    }

    #[inline]
    pub(crate) fn set_block_size(&self, s: u32) {
        self.inner.set_block_size(s)
    }
}

impl Default for FjallConfig {
    fn default() -> Self {
        FjallConfig::new()
    }
}

struct FjallConfigInner {
    db_path: OnceLock<String>,
    manual_journal_persist: AtomicBool,
    flush_workers_count: AtomicUsize,
    compaction_workers_count: AtomicUsize,
    block_cache_capacity: AtomicU64,
    blob_cache_capacity: AtomicU64,
    max_journaling_size: AtomicU64,
    max_write_buffer_size: AtomicU64,
    fsync_frequency: AtomicU16,
    commit_before_close: AtomicBool,

    bloom_filter_bits: AtomicI8,
    compression_type: RwLock<CompressionType>,
    max_memtable_size: AtomicU32,
    block_size: AtomicU32,
}

impl FjallConfigInner {
    pub const DEFAULT_BLOCK_CACHE_MB: u64 = 64;

    pub const DEFAULT_BLOB_CACHE_MB: u64 = 32;

    pub const DEFAULT_WRITE_BUFFER_MB: u64 = 128;

    pub const DEFAULT_MAX_JOURNALING_MB: u64 = 512;

    pub const DEFAULT_MEMTABLE_MB: u32 = 32;

    fn new() -> FjallConfigInner {
        let cpus = std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(4);

        FjallConfigInner {
            db_path: OnceLock::new(),
            manual_journal_persist: AtomicBool::new(false),
            flush_workers_count: AtomicUsize::new(cpus.max(1)),
            compaction_workers_count: AtomicUsize::new((cpus / 2).max(1)),
            block_cache_capacity: AtomicU64::new(Self::DEFAULT_BLOCK_CACHE_MB * 1_024 * 1_024),
            blob_cache_capacity: AtomicU64::new(Self::DEFAULT_BLOB_CACHE_MB * 1_024 * 1_024),
            max_journaling_size: AtomicU64::new(Self::DEFAULT_MAX_JOURNALING_MB * 1_024 * 1_024),
            max_write_buffer_size: AtomicU64::new(Self::DEFAULT_WRITE_BUFFER_MB * 1_024 * 1_024),
            fsync_frequency: AtomicU16::new(0),
            commit_before_close: AtomicBool::new(true),
            bloom_filter_bits: AtomicI8::new(10),
            compression_type: RwLock::new(CompressionType::Lz4),
            max_memtable_size: AtomicU32::new(Self::DEFAULT_MEMTABLE_MB * 1_024 * 1_024),
            block_size: AtomicU32::new(4 * 1_024),
        }
    }

    #[inline]
    fn db_path(&self) -> &str {
        self.db_path.get_or_init(|| "".to_string()).as_str()
    }

    /// The path can be set only once; later calls are ignored.
    #[inline]
    fn set_db_path(&self, db_path: &str) {
        self.db_path.get_or_init(|| db_path.to_string());
    }

    #[inline]
    fn manual_journal_persist(&self) -> bool {
        self.manual_journal_persist.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_manual_journal_persist(&self, v: bool) {
        self.manual_journal_persist.store(v, Ordering::Relaxed)
    }

    #[inline]
    fn flush_workers(&self) -> usize {
        self.flush_workers_count.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_flush_workers(&self, c: usize) {
        self.flush_workers_count.store(c, Ordering::Relaxed)
    }

    #[inline]
    fn compaction_workers(&self) -> usize {
        self.compaction_workers_count.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_compaction_workers(&self, c: usize) {
        self.compaction_workers_count.store(c, Ordering::Relaxed)
    }

    #[inline]
    fn block_cache_capacity(&self) -> u64 {
        self.block_cache_capacity.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_block_cache_capacity(&self, c: u64) {
        self.block_cache_capacity.store(c, Ordering::Relaxed)
    }

    #[inline]
    fn blob_cache_capacity(&self) -> u64 {
        self.blob_cache_capacity.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_blob_cache_capacity(&self, c: u64) {
        self.blob_cache_capacity.store(c, Ordering::Relaxed)
    }

    #[inline]
    fn max_journaling_size(&self) -> u64 {
        self.max_journaling_size.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_max_journaling_size(&self, s: u64) {
        self.max_journaling_size.store(s, Ordering::Relaxed)
    }

    #[inline]
    fn max_write_buffer_size(&self) -> u64 {
        self.max_write_buffer_size.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_max_write_buffer_size(&self, s: u64) {
        self.max_write_buffer_size.store(s, Ordering::Relaxed)
    }

    #[inline]
    fn fsync_frequency(&self) -> u16 {
        self.fsync_frequency.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_fsync_frequency(&self, f: u16) {
        self.fsync_frequency.store(f, Ordering::Relaxed)
    }

    #[inline]
    fn commit_before_close(&self) -> bool {
        self.commit_before_close.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_commit_before_close(&self, v: bool) {
        self.commit_before_close.store(v, Ordering::Relaxed)
    }

    #[inline]
    fn bloom_filter_bits(&self) -> i8 {
        self.bloom_filter_bits.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_bloom_filter_bits(&self, bits: i8) {
        self.bloom_filter_bits.store(bits, Ordering::Relaxed)
    }

    #[inline]
    fn compression_type(&self) -> CompressionType {
        *self.compression_type.read()
    }

    #[inline]
    fn set_compression_type(&self, compression_type: CompressionType) {
        *self.compression_type.write() = compression_type
    }

    #[inline]
    fn max_memtable_size(&self) -> u32 {
        self.max_memtable_size.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_max_memtable_size(&self, s: u32) {
        self.max_memtable_size.store(s, Ordering::Relaxed)
    }

    #[inline]
    fn block_size(&self) -> u32 {
        self.block_size.load(Ordering::Relaxed)
    }

    #[inline]
    fn set_block_size(&self, s: u32) {
        self.block_size.store(s, Ordering::Relaxed)
    }
}
