//! Customers, orders, order lines and payments.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::{Field, Resource};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Customer {
    #[sqlx(rename = "customerNumber")]
    pub customernumber: i64,
    #[sqlx(rename = "customerName")]
    pub customername: String,
    #[sqlx(rename = "contactLastName")]
    pub contactlastname: String,
    #[sqlx(rename = "contactFirstName")]
    pub contactfirstname: String,
    pub phone: String,
    #[sqlx(rename = "addressLine1")]
    pub addressline1: String,
    #[sqlx(rename = "addressLine2")]
    pub addressline2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    #[sqlx(rename = "postalCode")]
    pub postalcode: Option<String>,
    pub country: String,
    #[sqlx(rename = "salesRepEmployeeNumber")]
    pub salesrepemployeenumber: Option<i64>,
    #[sqlx(rename = "creditLimit")]
    pub creditlimit: Option<String>,
}

impl Resource for Customer {
    type Key = i64;

    const NAME: &'static str = "customer";
    const TABLE: &'static str = "customers";
    const FIELDS: &'static [Field] = &[
        Field::integer("customernumber", "customerNumber"),
        Field::char("customername", "customerName", 50),
        Field::char("contactlastname", "contactLastName", 50),
        Field::char("contactfirstname", "contactFirstName", 50),
        Field::char("phone", "phone", 50),
        Field::char("addressline1", "addressLine1", 50),
        Field::char("addressline2", "addressLine2", 50).nullable(),
        Field::char("city", "city", 50),
        Field::char("state", "state", 50).nullable(),
        Field::char("postalcode", "postalCode", 15).nullable(),
        Field::char("country", "country", 50),
        Field::integer("salesrepemployeenumber", "salesRepEmployeeNumber")
            .nullable()
            .references("employees", "employeeNumber"),
        Field::money("creditlimit", "creditLimit").nullable(),
    ];
    const KEY: &'static [&'static str] = &["customernumber"];

    fn key_values(key: &i64) -> Vec<Value> {
        vec![Value::from(*key)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Order {
    #[sqlx(rename = "orderNumber")]
    pub ordernumber: i64,
    #[sqlx(rename = "orderDate")]
    pub orderdate: NaiveDate,
    #[sqlx(rename = "requiredDate")]
    pub requireddate: NaiveDate,
    #[sqlx(rename = "shippedDate")]
    pub shippeddate: Option<NaiveDate>,
    pub status: String,
    pub comments: Option<String>,
    #[sqlx(rename = "customerNumber")]
    pub customernumber: i64,
}

impl Resource for Order {
    type Key = i64;

    const NAME: &'static str = "order";
    const TABLE: &'static str = "orders";
    const FIELDS: &'static [Field] = &[
        Field::integer("ordernumber", "orderNumber"),
        Field::date("orderdate", "orderDate"),
        Field::date("requireddate", "requiredDate"),
        Field::date("shippeddate", "shippedDate").nullable(),
        Field::char("status", "status", 15),
        Field::text("comments", "comments").nullable(),
        Field::integer("customernumber", "customerNumber").references("customers", "customerNumber"),
    ];
    const KEY: &'static [&'static str] = &["ordernumber"];

    fn key_values(key: &i64) -> Vec<Value> {
        vec![Value::from(*key)]
    }
}

/// One line of an order, keyed by (order, product).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderDetail {
    #[sqlx(rename = "orderNumber")]
    pub ordernumber: i64,
    #[sqlx(rename = "productCode")]
    pub productcode: String,
    #[sqlx(rename = "quantityOrdered")]
    pub quantityordered: i64,
    #[sqlx(rename = "priceEach")]
    pub priceeach: String,
    #[sqlx(rename = "orderLineNumber")]
    pub orderlinenumber: i64,
}

impl Resource for OrderDetail {
    type Key = (i64, String);

    const NAME: &'static str = "orderdetail";
    const TABLE: &'static str = "orderdetails";
    const FIELDS: &'static [Field] = &[
        Field::integer("ordernumber", "orderNumber").references("orders", "orderNumber"),
        Field::char("productcode", "productCode", 15).references("products", "productCode"),
        Field::integer("quantityordered", "quantityOrdered"),
        Field::money("priceeach", "priceEach"),
        Field::small_integer("orderlinenumber", "orderLineNumber"),
    ];
    const KEY: &'static [&'static str] = &["ordernumber", "productcode"];

    fn key_values((order, product): &(i64, String)) -> Vec<Value> {
        vec![Value::from(*order), Value::from(product.as_str())]
    }
}

/// A customer payment, keyed by (customer, check number).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Payment {
    #[sqlx(rename = "customerNumber")]
    pub customernumber: i64,
    #[sqlx(rename = "checkNumber")]
    pub checknumber: String,
    #[sqlx(rename = "paymentDate")]
    pub paymentdate: NaiveDate,
    pub amount: String,
}

impl Resource for Payment {
    type Key = (i64, String);

    const NAME: &'static str = "payment";
    const TABLE: &'static str = "payments";
    const FIELDS: &'static [Field] = &[
        Field::integer("customernumber", "customerNumber").references("customers", "customerNumber"),
        Field::char("checknumber", "checkNumber", 50),
        Field::date("paymentdate", "paymentDate"),
        Field::money("amount", "amount"),
    ];
    const KEY: &'static [&'static str] = &["customernumber", "checknumber"];

    fn key_values((customer, check): &(i64, String)) -> Vec<Value> {
        vec![Value::from(*customer), Value::from(check.as_str())]
    }
}
