use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const RESOURCES_PATH: &str = "/classic-models/api/v1/classicmodels";
pub const AUTH_PATH: &str = "/classic-models/api/auth";

/// Access and refresh tokens from `login/` or `refresh/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

/// Status, headers and decoded JSON body of one call.
///
/// Bodies that are not JSON decode to `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Numeric header such as `X-RateLimit-Remaining`.
    pub fn header_u64(&self, name: &str) -> Option<u64> {
        self.header(name).and_then(|v| v.parse().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Tokens from a successful login or refresh.
    pub fn tokens(&self) -> Option<Tokens> {
        serde_json::from_value(self.body.clone()).ok()
    }
}

/// Client for the ClassicModels API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    access: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            access: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every later call.
    pub fn set_token(&mut self, access: Option<String>) {
        self.access = access;
    }

    pub fn token(&self) -> Option<&str> {
        self.access.as_deref()
    }

    /// Path of a resource collection, e.g. `resource("offices")`.
    pub fn resource(name: &str) -> String {
        format!("{}/{}/", RESOURCES_PATH, name)
    }

    /// Path of one row.
    pub fn detail(name: &str, key: &str) -> String {
        format!("{}/{}/{}/", RESOURCES_PATH, name, key)
    }

    /// Log in and keep the access token on success.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<ApiResponse, reqwest::Error> {
        let body = json!({ "username": username, "password": password });
        let response = self
            .request(Method::POST, &format!("{}/login/", AUTH_PATH), Some(&body))
            .await?;
        if let Some(tokens) = response.tokens().filter(|_| response.is_success()) {
            self.access = Some(tokens.access);
        }
        Ok(response)
    }

    pub async fn signup(&self, body: &Value) -> Result<ApiResponse, reqwest::Error> {
        self.request(Method::POST, &format!("{}/signup/", AUTH_PATH), Some(body))
            .await
    }

    pub async fn refresh(&self, refresh: &str) -> Result<ApiResponse, reqwest::Error> {
        let body = json!({ "refresh": refresh });
        self.request(Method::POST, &format!("{}/refresh/", AUTH_PATH), Some(&body))
            .await
    }

    pub async fn logout(&self, refresh: &str) -> Result<ApiResponse, reqwest::Error> {
        let body = json!({ "refresh": refresh });
        self.request(Method::POST, &format!("{}/logout/", AUTH_PATH), Some(&body))
            .await
    }

    pub async fn me(&self) -> Result<ApiResponse, reqwest::Error> {
        self.get(&format!("{}/me/", AUTH_PATH)).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, reqwest::Error> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, reqwest::Error> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, reqwest::Error> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<ApiResponse, reqwest::Error> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, reqwest::Error> {
        self.request(Method::DELETE, path, None).await
    }

    /// Any method with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.access {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::read(builder.send().await?).await
    }

    /// Send a raw body as `application/json`, for malformed payloads.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        body: &str,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(token) = &self.access {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        Self::read(builder.send().await?).await
    }

    async fn read(response: reqwest::Response) -> Result<ApiResponse, reqwest::Error> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
