//! Table models for the classicmodels schema.
//!
//! Every model is one row type plus a [`Resource`] description of its table
//! that the generic CRUD handlers work from.

pub mod catalog;
pub mod company;
pub mod fields;
pub mod sales;

use serde::{de::DeserializeOwned, Serialize, Serializer};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, FromRow};

pub use catalog::{Product, ProductLine};
pub use company::{Employee, Office};
pub use fields::{Field, FieldKind, Mode};
pub use sales::{Customer, Order, OrderDetail, Payment};

/// A table served through the generic resource handlers.
pub trait Resource:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Sync + Unpin + 'static
{
    /// Path parameters identifying one row.
    type Key: DeserializeOwned + Send + Sync + 'static;

    /// Readable name used in messages, e.g. "product line".
    const NAME: &'static str;
    const TABLE: &'static str;
    const FIELDS: &'static [Field];
    /// JSON names of the key fields, in path order.
    const KEY: &'static [&'static str];

    /// Key values in the order of [`Resource::KEY`].
    fn key_values(key: &Self::Key) -> Vec<Value>;

    fn field(name: &str) -> Option<&'static Field> {
        Self::FIELDS.iter().find(|field| field.name == name)
    }

    fn key_fields() -> Vec<&'static Field> {
        Self::KEY.iter().filter_map(|name| Self::field(name)).collect()
    }
}

/// Serialize optional bytes as base64 text.
pub(crate) fn serialize_base64<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    match bytes {
        Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
        None => serializer.serialize_none(),
    }
}
