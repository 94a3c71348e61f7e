use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

/// Matches the `import_batches.file_name` column.
pub const FILE_NAME_MAX_LEN: usize = 255;

/// Lifecycle of an import batch. Persisted and serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
pub enum ImportStatus {
    Synchronous = 0,
    AsyncPending = 1,
    AsyncDone = 2,
}

impl ImportStatus {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Synchronous),
            1 => Some(Self::AsyncPending),
            2 => Some(Self::AsyncDone),
            _ => None,
        }
    }
}

impl Serialize for ImportStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.code())
    }
}

impl<'de> Deserialize<'de> for ImportStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i16::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown import status {code}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ImportBatch {
    pub id: i64,
    pub file_name: String,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
}
