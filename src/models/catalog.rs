//! Product lines and products.

use serde::Serialize;
use serde_json::Value;

use super::{serialize_base64, Field, Resource};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductLine {
    #[sqlx(rename = "productLine")]
    pub productline: String,
    #[sqlx(rename = "textDescription")]
    pub textdescription: Option<String>,
    #[sqlx(rename = "htmlDescription")]
    pub htmldescription: Option<String>,
    #[serde(serialize_with = "serialize_base64")]
    pub image: Option<Vec<u8>>,
}

impl Resource for ProductLine {
    type Key = String;

    const NAME: &'static str = "product line";
    const TABLE: &'static str = "productlines";
    const FIELDS: &'static [Field] = &[
        Field::char("productline", "productLine", 50),
        Field::char("textdescription", "textDescription", 4000).nullable(),
        Field::text("htmldescription", "htmlDescription").nullable(),
        Field::binary("image", "image").nullable(),
    ];
    const KEY: &'static [&'static str] = &["productline"];

    fn key_values(key: &String) -> Vec<Value> {
        vec![Value::from(key.as_str())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    #[sqlx(rename = "productCode")]
    pub productcode: String,
    #[sqlx(rename = "productName")]
    pub productname: String,
    #[sqlx(rename = "productLine")]
    pub productline: String,
    #[sqlx(rename = "productScale")]
    pub productscale: String,
    #[sqlx(rename = "productVendor")]
    pub productvendor: String,
    #[sqlx(rename = "productDescription")]
    pub productdescription: String,
    #[sqlx(rename = "quantityInStock")]
    pub quantityinstock: i64,
    #[sqlx(rename = "buyPrice")]
    pub buyprice: String,
    #[sqlx(rename = "MSRP")]
    pub msrp: String,
}

impl Resource for Product {
    type Key = String;

    const NAME: &'static str = "product";
    const TABLE: &'static str = "products";
    const FIELDS: &'static [Field] = &[
        Field::char("productcode", "productCode", 15),
        Field::char("productname", "productName", 70),
        Field::char("productline", "productLine", 50).references("productlines", "productLine"),
        Field::char("productscale", "productScale", 10),
        Field::char("productvendor", "productVendor", 50),
        Field::text("productdescription", "productDescription"),
        Field::small_integer("quantityinstock", "quantityInStock"),
        Field::money("buyprice", "buyPrice"),
        Field::money("msrp", "MSRP"),
    ];
    const KEY: &'static [&'static str] = &["productcode"];

    fn key_values(key: &String) -> Vec<Value> {
        vec![Value::from(key.as_str())]
    }
}
