//! Snowflake-style id generation: 41 bits of milliseconds since the custom
//! epoch, 10 bits of worker id, 12 bits of per-process sequence. Ids sort
//! roughly by creation time and stay positive in an i64.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 2022-01-01T00:00:00Z in milliseconds.
const EPOCH_MS: u64 = 1_640_995_200_000;

const WORKER_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const WORKER_MASK: u64 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn generate(worker_id: u16) -> i64 {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let timestamp = now_ms.saturating_sub(EPOCH_MS);
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;

    let id = (timestamp << (WORKER_BITS + SEQUENCE_BITS))
        | ((u64::from(worker_id) & WORKER_MASK) << SEQUENCE_BITS)
        | sequence;
    (id & (i64::MAX as u64)) as i64
}

/// Extract the creation timestamp (ms since the unix epoch) from an id.
pub fn timestamp_ms(id: i64) -> u64 {
    ((id as u64) >> (WORKER_BITS + SEQUENCE_BITS)) + EPOCH_MS
}
