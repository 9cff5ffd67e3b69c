use crate::common::current_time_millis;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use log::{info, warn};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use std::time::Duration;

const EPOCH: u64 = 1288834974657;
const NODE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_NODE_ID: u64 = (1 << NODE_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_LEFT_SHIFT: u64 = SEQUENCE_BITS + NODE_ID_BITS;
// larger backward clock jumps fail generation instead of stalling
const MAX_CLOCK_DRIFT_MS: u64 = 5_000;

type Clock = Box<dyn Fn() -> DocStoreResult<u64> + Send + Sync>;

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// 64-bit time-ordered id generator.
///
/// Layout, most significant first: 42 bits of milliseconds since `EPOCH`,
/// 10 bits of random node id, 12 bits of per-millisecond sequence. Up to 4096
/// ids per millisecond per process; a process that exhausts the sequence waits
/// for the next millisecond.
pub struct SnowflakeIdGenerator {
    node_id: u64,
    state: Mutex<GeneratorState>,
    clock: Clock,
}

impl SnowflakeIdGenerator {
    pub fn new() -> DocStoreResult<Self> {
        Self::with_clock(Box::new(current_time_millis))
    }

    pub(crate) fn with_clock(clock: Clock) -> DocStoreResult<Self> {
        let node_id = random_node_id()?;
        info!("Initialized identifier generator with node id: {}", node_id);

        Ok(SnowflakeIdGenerator {
            node_id,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
            clock,
        })
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn get_id(&self) -> DocStoreResult<u64> {
        let mut state = self.state.lock();

        let mut timestamp = (self.clock)()?;
        if timestamp < state.last_timestamp {
            let drift = state.last_timestamp - timestamp;
            if drift > MAX_CLOCK_DRIFT_MS {
                log::error!("Clock moved backwards by {} ms, refusing to generate id", drift);
                return Err(DocStoreError::new(
                    &format!("clock moved backwards by {} ms", drift),
                    ErrorKind::IdentifierGenerationFailed,
                ));
            }
            warn!("Clock moved backwards by {} ms, waiting", drift);
            timestamp = self.wait_until(state.last_timestamp)?;
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                timestamp = self.wait_until(state.last_timestamp + 1)?;
            }
        } else {
            state.sequence = 0;
        }

        if timestamp < EPOCH {
            log::error!("Clock reports {} which is before the id epoch", timestamp);
            return Err(DocStoreError::new(
                "clock reports a time before the id epoch",
                ErrorKind::IdentifierGenerationFailed,
            ));
        }

        state.last_timestamp = timestamp;
        Ok(((timestamp - EPOCH) << TIMESTAMP_LEFT_SHIFT)
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence)
    }

    fn wait_until(&self, target: u64) -> DocStoreResult<u64> {
        loop {
            let now = (self.clock)()?;
            if now >= target {
                return Ok(now);
            }
            std::thread::sleep(Duration::from_millis(target - now));
        }
    }
}

fn random_node_id() -> DocStoreResult<u64> {
    let uuid = uuid::Uuid::new_v4();
    let uid = uuid.as_bytes();

    let mut random = [0u8; 1];
    OsRng.try_fill_bytes(&mut random).map_err(|e| {
        log::error!("Could not read from the OS random source: {}", e);
        DocStoreError::new(
            &format!("could not read from the OS random source: {}", e),
            ErrorKind::IdentifierGenerationFailed,
        )
    })?;

    Ok(((uid[uid.len() - 1] as u64) | ((random[0] as u64) << 8)) & MAX_NODE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn fixed_clock(millis: Arc<AtomicU64>) -> Clock {
        Box::new(move || Ok(millis.load(Ordering::SeqCst)))
    }

    #[test]
    fn generates_unique_increasing_ids() {
        let generator = SnowflakeIdGenerator::new().unwrap();
        let mut last = 0;
        for _ in 0..1000 {
            let id = generator.get_id().unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn id_carries_node_id_and_timestamp() {
        let now = Arc::new(AtomicU64::new(EPOCH + 12_345));
        let generator = SnowflakeIdGenerator::with_clock(fixed_clock(now)).unwrap();
        let id = generator.get_id().unwrap();

        assert_eq!((id >> SEQUENCE_BITS) & MAX_NODE_ID, generator.node_id());
        assert_eq!(id >> TIMESTAMP_LEFT_SHIFT, 12_345);
        assert_eq!(id & SEQUENCE_MASK, 0);
    }

    #[test]
    fn sequence_increments_within_one_millisecond() {
        let now = Arc::new(AtomicU64::new(EPOCH + 1));
        let generator = SnowflakeIdGenerator::with_clock(fixed_clock(now)).unwrap();
        let first = generator.get_id().unwrap();
        let second = generator.get_id().unwrap();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn exhausted_sequence_moves_to_next_millisecond() {
        let now = Arc::new(AtomicU64::new(EPOCH + 1));
        let generator = SnowflakeIdGenerator::with_clock(fixed_clock(now.clone())).unwrap();

        for _ in 0..=SEQUENCE_MASK {
            generator.get_id().unwrap();
        }
        // the next call waits for the clock to advance
        let advance = now.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            advance.store(EPOCH + 2, Ordering::SeqCst);
        });
        let id = generator.get_id().unwrap();
        handle.join().unwrap();

        assert_eq!(id >> TIMESTAMP_LEFT_SHIFT, 2);
        assert_eq!(id & SEQUENCE_MASK, 0);
    }

    #[test]
    fn large_backward_clock_jump_fails() {
        let now = Arc::new(AtomicU64::new(EPOCH + 100_000));
        let generator = SnowflakeIdGenerator::with_clock(fixed_clock(now.clone())).unwrap();
        generator.get_id().unwrap();

        now.store(EPOCH + 100_000 - MAX_CLOCK_DRIFT_MS - 1, Ordering::SeqCst);
        let err = generator.get_id().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IdentifierGenerationFailed);
    }

    #[test]
    fn clock_failure_is_propagated() {
        let clock: Clock = Box::new(|| {
            Err(DocStoreError::new(
                "clock unavailable",
                ErrorKind::IdentifierGenerationFailed,
            ))
        });
        let generator = SnowflakeIdGenerator::with_clock(clock).unwrap();
        let err = generator.get_id().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IdentifierGenerationFailed);
    }

    #[test]
    fn concurrent_generation_is_unique() {
        let generator = Arc::new(SnowflakeIdGenerator::new().unwrap());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| generator.get_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
