//! Snowflake ID Generator
//!
//! Time-ordered 64-bit ids for every forum record.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// RiverForo epoch (2024-01-01T00:00:00.000Z)
pub const RIVERFORO_EPOCH: u64 = 1704067200000;

const SEQUENCE_MASK: u64 = 0xFFF;

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
///
/// Layout: 41 bits of milliseconds since [`RIVERFORO_EPOCH`], 5 bits machine id,
/// 5 bits node id, 12 bits sequence.
pub struct SnowflakeGenerator {
    machine_id: u64,
    node_id: u64,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self {
            machine_id: machine_id & 0x1F,
            node_id: node_id & 0x1F,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let mut timestamp = current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond.
                while timestamp <= state.last_timestamp {
                    std::hint::spin_loop();
                    timestamp = current_timestamp();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp - RIVERFORO_EPOCH) << 22)
            | (self.machine_id << 17)
            | (self.node_id << 12)
            | state.sequence;

        id as i64
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(RIVERFORO_EPOCH)
}

/// Parse snowflake from a path or body string
pub fn from_string(s: &str) -> Result<i64, std::num::ParseIntError> {
    s.trim().parse()
}

/// Serde adapter that writes i64 ids as JSON strings.
pub mod as_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s.trim().parse().map_err(de::Error::custom),
            Raw::Num(n) => Ok(n),
        }
    }
}

/// Serde adapter for optional ids.
pub mod option_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::as_string")] i64);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique() {
        let gen = SnowflakeGenerator::new(1, 1);
        let ids: HashSet<i64> = (0..10_000).map(|_| gen.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let gen = SnowflakeGenerator::new(1, 0);
        let mut last = gen.generate();
        for _ in 0..1000 {
            let next = gen.generate();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_string_serde_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Doc {
            #[serde(with = "as_string")]
            id: i64,
        }

        let json = serde_json::to_string(&Doc { id: 42 }).unwrap();
        assert_eq!(json, r#"{"id":"42"}"#);

        let numeric: Doc = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(numeric.id, 7);
    }
}
