//! Read-only child collections under a parent row, e.g. the products of
//! one product line.

use axum::{
    extract::{OriginalUri, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;

use crate::http::extract::{KeyPath, QueryParams};
use crate::http::pagination::{Page, PageLinks, PageQuery};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::models::{Customer, Employee, Office, Order, OrderDetail, Payment, Product, ProductLine, Resource};
use crate::resources::handlers::paginate;
use crate::resources::store::{self, Filter};

/// A one-to-many link from `Parent` to `Child`.
pub trait Relation: Send + Sync + 'static {
    type Parent: Resource;
    type Child: Resource;

    /// Child field holding the parent key.
    const FOREIGN_KEY: &'static str;
    /// Detail of the 404 when the parent does not exist.
    const MISSING: &'static str;
}

pub struct LineProducts;

impl Relation for LineProducts {
    type Parent = ProductLine;
    type Child = Product;
    const FOREIGN_KEY: &'static str = "productline";
    const MISSING: &'static str = "Product line not found.";
}

pub struct ProductOrderDetails;

impl Relation for ProductOrderDetails {
    type Parent = Product;
    type Child = OrderDetail;
    const FOREIGN_KEY: &'static str = "productcode";
    const MISSING: &'static str = "Product not found.";
}

pub struct OfficeEmployees;

impl Relation for OfficeEmployees {
    type Parent = Office;
    type Child = Employee;
    const FOREIGN_KEY: &'static str = "officecode";
    const MISSING: &'static str = "Office not found.";
}

pub struct EmployeeReports;

impl Relation for EmployeeReports {
    type Parent = Employee;
    type Child = Employee;
    const FOREIGN_KEY: &'static str = "reportsto";
    const MISSING: &'static str = "Employee not found.";
}

pub struct CustomerOrders;

impl Relation for CustomerOrders {
    type Parent = Customer;
    type Child = Order;
    const FOREIGN_KEY: &'static str = "customernumber";
    const MISSING: &'static str = "Customer not found.";
}

pub struct CustomerPayments;

impl Relation for CustomerPayments {
    type Parent = Customer;
    type Child = Payment;
    const FOREIGN_KEY: &'static str = "customernumber";
    const MISSING: &'static str = "Customer not found.";
}

/// Page of the children of one parent row.
pub async fn list_related<L: Relation>(
    State(state): State<AppState>,
    KeyPath(parent): KeyPath<<L::Parent as Resource>::Key>,
    QueryParams(query): QueryParams<PageQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Page<L::Child>>, ApiError> {
    let key = <L::Parent as Resource>::key_values(&parent);
    if store::fetch_one::<L::Parent>(&state.db, &key).await?.is_none() {
        return Err(ApiError::NotFound(L::MISSING));
    }

    let field = <L::Child as Resource>::field(L::FOREIGN_KEY).ok_or_else(|| {
        ApiError::Internal(format!(
            "{} has no field {}",
            <L::Child as Resource>::TABLE,
            L::FOREIGN_KEY
        ))
    })?;
    let filter = Filter {
        field,
        value: key.into_iter().next().unwrap_or(Value::Null),
    };

    let links = PageLinks::from_request(
        &uri,
        &headers,
        state.config.pagination.public_base_url.as_deref(),
    );
    paginate::<L::Child>(&state, Some(&filter), &query, &links)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_links<L: Relation>() {
        let field = <L::Child as Resource>::field(L::FOREIGN_KEY).expect("foreign key field");
        let target = field.references.expect("field references parent");
        assert_eq!(target.table, <L::Parent as Resource>::TABLE);
        assert_eq!(<L::Parent as Resource>::KEY.len(), 1);
    }

    #[test]
    fn test_relations_follow_foreign_keys() {
        assert_links::<LineProducts>();
        assert_links::<ProductOrderDetails>();
        assert_links::<OfficeEmployees>();
        assert_links::<EmployeeReports>();
        assert_links::<CustomerOrders>();
        assert_links::<CustomerPayments>();
    }
}
