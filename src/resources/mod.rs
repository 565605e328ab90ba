//! The classicmodels REST resources.
//!
//! # Data Flow
//! ```text
//! request ──▶ require_auth ──▶ read throttle ──▶ write throttle
//!         ──▶ handlers.rs (validate, CRUD) ──▶ store.rs (SQL) ──▶ SQLite
//!
//! related ──▶ require_auth ──▶ read + burst throttle ──▶ related.rs ──▶ SQLite
//! ```
//!
//! Every route needs an access token. Only one of the read and write
//! throttles counts a given request, picked by its action. Related
//! collections are counted under read and burst together, so a request
//! either side rejects uses up neither.

pub mod handlers;
pub mod related;
pub mod store;

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::auth::require_auth;
use crate::http::server::AppState;
use crate::models::{
    Customer, Employee, Office, Order, OrderDetail, Payment, Product, ProductLine, Resource,
};
use crate::security::rate_limit::{throttle_middleware, Scope, Throttle};

use self::related::{
    list_related, CustomerOrders, CustomerPayments, EmployeeReports, LineProducts,
    OfficeEmployees, ProductOrderDetails,
};

/// Collection and detail routes for one table.
fn crud<R: Resource>(router: Router<AppState>, collection: &str, detail: &str) -> Router<AppState> {
    router
        .route(
            collection,
            get(handlers::list::<R>).post(handlers::create::<R>),
        )
        .route(
            detail,
            get(handlers::retrieve::<R>)
                .put(handlers::update::<R>)
                .patch(handlers::partial_update::<R>)
                .delete(handlers::destroy::<R>),
        )
}

/// Routes under `/classic-models/api/v1/classicmodels`.
pub fn router(state: &AppState) -> Router<AppState> {
    let limiter = &state.limiter;

    let related = Router::new()
        .route(
            "/productlines/{productline}/products/",
            get(list_related::<LineProducts>),
        )
        .route(
            "/products/{productcode}/order-details/",
            get(list_related::<ProductOrderDetails>),
        )
        .route(
            "/offices/{officecode}/employees/",
            get(list_related::<OfficeEmployees>),
        )
        .route(
            "/employees/{employeenumber}/reports/",
            get(list_related::<EmployeeReports>),
        )
        .route(
            "/customers/{customernumber}/orders/",
            get(list_related::<CustomerOrders>),
        )
        .route(
            "/customers/{customernumber}/payments/",
            get(list_related::<CustomerPayments>),
        )
        .route_layer(from_fn_with_state(
            Throttle::stacked(limiter.clone(), &[Scope::Read, Scope::Burst]),
            throttle_middleware,
        ));

    let mut router = Router::new();
    router = crud::<ProductLine>(router, "/productlines/", "/productlines/{productline}/");
    router = crud::<Product>(router, "/products/", "/products/{productcode}/");
    router = crud::<Office>(router, "/offices/", "/offices/{officecode}/");
    router = crud::<Employee>(router, "/employees/", "/employees/{employeenumber}/");
    router = crud::<Customer>(router, "/customers/", "/customers/{customernumber}/");
    router = crud::<Order>(router, "/orders/", "/orders/{ordernumber}/");
    router = crud::<Payment>(
        router,
        "/payments/",
        "/payments/{customernumber}/{checknumber}/",
    );
    router = crud::<OrderDetail>(
        router,
        "/orderdetails/",
        "/orderdetails/{ordernumber}/{productcode}/",
    );

    router
        .route_layer(from_fn_with_state(
            Throttle::for_actions(limiter.clone(), Scope::Write),
            throttle_middleware,
        ))
        .route_layer(from_fn_with_state(
            Throttle::for_actions(limiter.clone(), Scope::Read),
            throttle_middleware,
        ))
        .merge(related)
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}
