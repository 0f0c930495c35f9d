use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(|| rand::thread_rng().gen());
static OID_COUNTER: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new(rand::thread_rng().gen_range(0..=MAX_COUNTER)));

const MAX_COUNTER: u32 = 0x00FF_FFFF;

/// A 12 byte document identifier.
///
/// Layout: 4 byte big-endian seconds since the epoch, 5 random bytes chosen once
/// per process, 3 byte big-endian counter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    /// Generates a new identifier.
    pub fn new() -> Self {
        let timestamp = (Utc::now().timestamp() as u32).to_be_bytes();
        let counter = OID_COUNTER.fetch_add(1, Ordering::SeqCst) & MAX_COUNTER;
        let counter = counter.to_be_bytes();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&timestamp);
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&counter[1..]);
        ObjectId { bytes }
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId { bytes }
    }

    /// Parses a 24 character hexadecimal string.
    pub fn parse_str(value: &str) -> MigrateResult<Self> {
        if value.len() != 24 || !value.is_ascii() {
            return Err(MigrateError::new(
                &format!("invalid object id '{}': expected 24 hex characters", value),
                ErrorKind::InvalidDocument,
            ));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &value[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| {
                MigrateError::new(
                    &format!("invalid object id '{}': not hexadecimal", value),
                    ErrorKind::InvalidDocument,
                )
            })?;
        }
        Ok(ObjectId { bytes })
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.bytes
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// The creation time encoded in the identifier.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let mut secs = [0u8; 4];
        secs.copy_from_slice(&self.bytes[..4]);
        Utc.timestamp_opt(u32::from_be_bytes(secs) as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
