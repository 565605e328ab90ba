//! Offices and employees.

use serde::Serialize;
use serde_json::Value;

use super::{Field, Resource};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Office {
    #[sqlx(rename = "officeCode")]
    pub officecode: String,
    pub city: String,
    pub phone: String,
    #[sqlx(rename = "addressLine1")]
    pub addressline1: String,
    #[sqlx(rename = "addressLine2")]
    pub addressline2: Option<String>,
    pub state: Option<String>,
    pub country: String,
    #[sqlx(rename = "postalCode")]
    pub postalcode: String,
    pub territory: String,
}

impl Resource for Office {
    type Key = String;

    const NAME: &'static str = "office";
    const TABLE: &'static str = "offices";
    const FIELDS: &'static [Field] = &[
        Field::char("officecode", "officeCode", 10),
        Field::char("city", "city", 50),
        Field::char("phone", "phone", 50),
        Field::char("addressline1", "addressLine1", 50),
        Field::char("addressline2", "addressLine2", 50).nullable(),
        Field::char("state", "state", 50).nullable(),
        Field::char("country", "country", 50),
        Field::char("postalcode", "postalCode", 15),
        Field::char("territory", "territory", 10),
    ];
    const KEY: &'static [&'static str] = &["officecode"];

    fn key_values(key: &String) -> Vec<Value> {
        vec![Value::from(key.as_str())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Employee {
    #[sqlx(rename = "employeeNumber")]
    pub employeenumber: i64,
    #[sqlx(rename = "lastName")]
    pub lastname: String,
    #[sqlx(rename = "firstName")]
    pub firstname: String,
    pub extension: String,
    pub email: String,
    #[sqlx(rename = "officeCode")]
    pub officecode: String,
    #[sqlx(rename = "reportsTo")]
    pub reportsto: Option<i64>,
    #[sqlx(rename = "jobTitle")]
    pub jobtitle: String,
}

impl Resource for Employee {
    type Key = i64;

    const NAME: &'static str = "employee";
    const TABLE: &'static str = "employees";
    const FIELDS: &'static [Field] = &[
        Field::integer("employeenumber", "employeeNumber"),
        Field::char("lastname", "lastName", 50),
        Field::char("firstname", "firstName", 50),
        Field::char("extension", "extension", 10),
        Field::char("email", "email", 100),
        Field::char("officecode", "officeCode", 10).references("offices", "officeCode"),
        Field::integer("reportsto", "reportsTo")
            .nullable()
            .references("employees", "employeeNumber"),
        Field::char("jobtitle", "jobTitle", 50),
    ];
    const KEY: &'static [&'static str] = &["employeenumber"];

    fn key_values(key: &i64) -> Vec<Value> {
        vec![Value::from(*key)]
    }
}
