//! Dynamic resource attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Type tag for a stored attribute value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttributeValueType {
    /// Stored as-is.
    String,
    /// Parsed to a double; falls back to string on failure.
    Number,
    /// Case-insensitive match against true/1/yes.
    Boolean,
    /// Parsed as a JSON document; falls back to string on failure.
    Json,
}

/// A dynamic attribute attached to a resource instance, keyed by
/// (resource_type, resource_id, attribute_name).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourceAttribute {
    /// Row id.
    pub id: Uuid,
    /// Resource type the attribute belongs to.
    pub resource_type: String,
    /// Resource instance id.
    pub resource_id: i64,
    /// Attribute name; becomes a key of the resource bag.
    pub attribute_name: String,
    /// Raw stored value.
    pub attribute_value: Option<String>,
    /// How to interpret the stored value.
    pub attribute_type: AttributeValueType,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
