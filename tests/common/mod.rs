//! Shared utilities for the integration suites.
//!
//! Each test gets its own server on an ephemeral port, backed by a fresh
//! SQLite file, so throttle counters and rows never leak between tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use classicmodels_api::auth::users::{self, NewUser};
use classicmodels_api::config::ApiConfig;
use classicmodels_api::db::{self, DbPool};
use classicmodels_api::http::{ApiServer, AppState};
use classicmodels_api::lifecycle::Shutdown;
use classicmodels_api::security::rate_limit::ThrottleRate;
use classicmodels_client::ApiClient;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo123";

/// Config for tests: cheap hashing and rates no test trips by accident.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.auth.bcrypt_cost = 4;

    let generous = ThrottleRate::per_minute(1_000);
    let rates = &mut config.throttle.rates;
    rates.login = generous;
    rates.register = generous;
    rates.token_refresh = generous;
    rates.logout = generous;
    rates.current_user = generous;
    rates.read = generous;
    rates.write = generous;
    rates.burst = generous;
    rates.demo = generous;
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub db: DbPool,
    shutdown: Shutdown,
    handle: Option<JoinHandle<()>>,
    db_path: PathBuf,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with [`test_config`] adjusted by `tweak`.
    pub async fn start_with(tweak: impl FnOnce(&mut ApiConfig)) -> Self {
        let db_path = std::env::temp_dir().join(format!("classicmodels-{}.db", uuid::Uuid::new_v4()));
        let mut config = test_config();
        config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
        tweak(&mut config);

        let pool = db::connect(&config.database).await.expect("database");
        let server = ApiServer::new(AppState::new(config, pool.clone()));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        Self {
            addr,
            db: pool,
            shutdown,
            handle: Some(handle),
            db_path,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.url())
    }

    /// Insert a user directly, bypassing signup.
    pub async fn create_user(&self, username: &str, password: &str) {
        users::create_user(
            &self.db,
            NewUser {
                username: username.to_string(),
                email: format!("{}@classicmodels.com", username),
                first_name: "Demo".to_string(),
                last_name: "User".to_string(),
                password: password.to_string(),
            },
            4,
        )
        .await
        .expect("create user");
    }

    /// A client logged in as the demo user.
    pub async fn demo_client(&self) -> ApiClient {
        self.create_user(DEMO_USERNAME, DEMO_PASSWORD).await;
        let mut client = self.client();
        let res = client.login(DEMO_USERNAME, DEMO_PASSWORD).await.unwrap();
        assert_eq!(res.status, 200, "demo login failed: {}", res.body);
        client
    }

    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.db.close().await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

pub fn office(code: &str) -> Value {
    json!({
        "officecode": code,
        "city": "San Francisco",
        "phone": "+1 650 219 4782",
        "addressline1": "100 Market Street",
        "addressline2": "Suite 300",
        "state": "CA",
        "country": "USA",
        "postalcode": "94080",
        "territory": "NA",
    })
}

pub fn product_line(name: &str) -> Value {
    json!({
        "productline": name,
        "textdescription": "Attention car enthusiasts",
        "htmldescription": null,
        "image": null,
    })
}

pub fn product(code: &str, line: &str) -> Value {
    json!({
        "productcode": code,
        "productname": "1969 Harley Davidson Ultimate Chopper",
        "productline": line,
        "productscale": "1:10",
        "productvendor": "Min Lin Diecast",
        "productdescription": "This replica features working kickstand",
        "quantityinstock": 7933,
        "buyprice": "48.81",
        "msrp": "95.70",
    })
}

pub fn customer(number: i64) -> Value {
    json!({
        "customernumber": number,
        "customername": "Atelier graphique",
        "contactlastname": "Schmitt",
        "contactfirstname": "Carine",
        "phone": "40.32.2555",
        "addressline1": "54, rue Royale",
        "addressline2": null,
        "city": "Nantes",
        "state": null,
        "postalcode": "44000",
        "country": "France",
        "salesrepemployeenumber": null,
        "creditlimit": "21000.00",
    })
}

pub fn payment(customer: i64, check: &str) -> Value {
    json!({
        "customernumber": customer,
        "checknumber": check,
        "paymentdate": "2004-10-19",
        "amount": "6066.78",
    })
}

pub fn order(number: i64, customer: i64) -> Value {
    json!({
        "ordernumber": number,
        "orderdate": "2003-01-06",
        "requireddate": "2003-01-13",
        "shippeddate": null,
        "status": "In Process",
        "comments": null,
        "customernumber": customer,
    })
}

pub fn order_detail(order: i64, product: &str) -> Value {
    json!({
        "ordernumber": order,
        "productcode": product,
        "quantityordered": 30,
        "priceeach": "136.00",
        "orderlinenumber": 3,
    })
}
