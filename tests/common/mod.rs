// Allow dead_code because not every test file uses every helper
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use stockroom::{
    config::JwtSettings, create_router, models::NewUser, store::Repositories, AppState,
    DEFAULT_BODY_LIMIT,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "correct-horse";
pub const BOUNDARY: &str = "stockroom-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    /// Router over an in-memory store with one active user.
    pub async fn spawn() -> Self {
        let uploads = TempDir::new().unwrap();
        let state = AppState::new(
            Repositories::in_memory(),
            JwtSettings::new("integration-secret"),
            uploads.path().to_path_buf(),
        );
        state
            .repos
            .users
            .insert(NewUser {
                username: USERNAME.into(),
                password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
            })
            .await
            .unwrap();

        Self {
            router: create_router(state.clone(), DEFAULT_BODY_LIMIT),
            state,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns a `Cookie` header value carrying both session cookies.
    pub async fn login(&self) -> String {
        let response = self
            .send(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({ "username": USERNAME, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        cookie_header(&response)
    }

    pub async fn get(&self, path: &str, cookie: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        into_parts(self.send(request).await).await
    }

    pub async fn post(&self, path: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        into_parts(self.send(json_request(Method::POST, path, Some(cookie), body)).await).await
    }

    pub async fn put(&self, path: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        into_parts(self.send(json_request(Method::PUT, path, Some(cookie), body)).await).await
    }

    pub async fn delete(&self, path: &str, cookie: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        into_parts(self.send(request).await).await
    }

    pub async fn upload(&self, path: &str, cookie: &str, file_name: &str, csv: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        into_parts(self.send(request).await).await
    }

    pub async fn create_product(&self, cookie: &str, name: &str, price: i64) -> i64 {
        let (status, body) = self
            .post(
                "/products",
                cookie,
                json!({ "name": name, "price": price, "description": "" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn purchase(&self, cookie: &str, product: i64, quantity: i64, date: &str) {
        let (status, body) = self
            .post(
                "/purchases",
                cookie,
                json!({ "product": product, "quantity": quantity, "purchase_date": date }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    pub async fn sell(&self, cookie: &str, product: i64, quantity: i64, date: &str) -> (StatusCode, Value) {
        self.post(
            "/sales",
            cookie,
            json!({ "product": product, "quantity": quantity, "sales_date": date }),
        )
        .await
    }
}

pub fn json_request(method: Method, path: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Folds `Set-Cookie` headers into a request `Cookie` header.
pub fn cookie_header(response: &Response) -> String {
    set_cookies(response)
        .iter()
        .filter_map(|c| c.split(';').next().map(str::to_string))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn cookie_value(cookie: &str, name: &str) -> Option<String> {
    cookie
        .split("; ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

pub async fn into_parts(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
