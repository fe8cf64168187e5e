//! The `Item` entity: an id, a content string, and a creation timestamp.

use chrono::{DateTime, SubsecRound, Utc};

use crate::codec::{Entity, Fields, UNSET_KEY};
use crate::error::Result;
use crate::types::{ColumnDescriptor, EntityDescriptor, LogicalType, Value};

/// A text entry with a storage-assigned id.
///
/// `id` is [`UNSET_KEY`] until storage assigns one on insert.
/// `created_time` is always held at millisecond resolution.
///
/// # Examples
///
/// ```
/// use rowmap_core::{Item, UNSET_KEY};
///
/// let item = Item::created_now(UNSET_KEY, "buy milk");
/// assert!(!item.is_persisted());
/// assert_eq!(item.content, "buy milk");
/// assert_eq!(item.created_time.timestamp_subsec_nanos() % 1_000_000, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Row id, [`UNSET_KEY`] before insert.
    pub id: i64,
    /// Entry text.
    pub content: String,
    /// Creation time, truncated to milliseconds.
    pub created_time: DateTime<Utc>,
}

impl Item {
    /// Creates an item with an explicit creation time.
    pub fn new(id: i64, content: impl Into<String>, created_time: DateTime<Utc>) -> Self {
        Self {
            id,
            content: content.into(),
            created_time: created_time.trunc_subsecs(3),
        }
    }

    /// Creates an item stamped with the current time.
    pub fn created_now(id: i64, content: impl Into<String>) -> Self {
        Self::new(id, content, Utc::now())
    }

    /// Returns `true` once storage has assigned an id.
    pub fn is_persisted(&self) -> bool {
        self.id != UNSET_KEY
    }
}

impl Entity for Item {
    const NAME: &'static str = "Item";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .with_autoincrement()
            .with_column(ColumnDescriptor::new("id", LogicalType::Integer).primary_key())
            .with_column(ColumnDescriptor::new("content", LogicalType::Text))
            .with_column(ColumnDescriptor::new("created_time", LogicalType::Timestamp))
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(Value::Integer(self.id)),
            "content" => Some(Value::from(self.content.as_str())),
            "created_time" => Some(Value::Timestamp(self.created_time)),
            _ => None,
        }
    }

    fn from_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(Self::new(
            fields.get_as("id")?,
            fields.get_as::<String>("content")?,
            fields.get_as("created_time")?,
        ))
    }
}
