mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use stockroom::models::ImportStatus;
use tower::ServiceExt;

use common::{cookie_header, cookie_value, into_parts, json_request, set_cookies, TestApp, PASSWORD, USERNAME};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_sets_access_and_refresh_cookies() {
    let app = TestApp::spawn().await;
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("access=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    assert!(cookies.iter().all(|c| c.contains("Max-Age=86400")));
}

#[tokio::test]
async fn bad_password_is_401_without_cookies() {
    let app = TestApp::spawn().await;
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": "wrong" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    let (_, body) = into_parts(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn unknown_user_is_401() {
    let app = TestApp::spawn().await;
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": "ghost", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn login_without_password_is_400() {
    let app = TestApp::spawn().await;
    let (status, body) = into_parts(
        app.send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME }),
        ))
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["password"][0], "This field is required.");
}

#[tokio::test]
async fn logout_clears_cookies_even_when_anonymous() {
    let app = TestApp::spawn().await;

    for cookie in [None, Some(app.login().await)] {
        let mut builder = Request::builder().method(Method::POST).uri("/auth/logout");
        if let Some(cookie) = &cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = app.send(builder.body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cookies.iter().any(|c| c.starts_with("access=;")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh=;")));
    }
}

#[tokio::test]
async fn protected_routes_require_access_cookie() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/products", "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.get("/products", "access=not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is not accepted in place of an access token.
    let session = app.login().await;
    let refresh = cookie_value(&session, "refresh").unwrap();
    let (status, _) = app.get("/products", &format!("access={refresh}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/products", &session).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_rotates_both_cookies() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let refresh = cookie_value(&session, "refresh").unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/refresh")
        .header(header::COOKIE, format!("refresh={refresh}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);

    let renewed = cookie_header(&response);
    let (status, _) = app.get("/products", &renewed).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_cookie_is_401() {
    let app = TestApp::spawn().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/refresh")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_crud() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    let id = app.create_product(&session, "Coffee beans", 1200).await;

    let (status, body) = app.get(&format!("/products/{id}"), &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Coffee beans");
    assert_eq!(body["price"], 1200);

    let (status, body) = app
        .put(
            &format!("/products/{id}"),
            &session,
            json!({ "name": "Coffee beans (1kg)", "price": 1500, "description": "roasted" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 1500);
    assert_eq!(body["description"], "roasted");

    let (status, body) = app.get("/products", &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("/products/{id}"), &session).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/products/{id}"), &session).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app.delete(&format!("/products/{id}"), &session).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_validation_errors() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    let (status, body) = app.post("/products", &session, json!({ "price": -5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["fields"]["name"][0], "This field is required.");
    assert!(body["fields"]["price"].is_array());

    let (status, body) = app
        .put("/products/999", &session, json!({ "name": "x", "price": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn unparseable_path_id_is_json_400() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    for path in ["/products/abc", "/inventory/abc", "/inventory/abc/stock", "/import-batches/abc"] {
        let (status, body) = app.get(path, &session).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["error"], "malformed_body", "{path}");
    }

    let (status, body) = app.delete("/products/1.5", &session).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_body");
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/products")
        .header(header::COOKIE, &session)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = into_parts(app.send(request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_body");
}

// ---------------------------------------------------------------------------
// Purchases, sales and the stock check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn purchase_for_unknown_product_is_400() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    let (status, body) = app
        .post(
            "/purchases",
            &session,
            json!({ "product": 404, "quantity": 1, "purchase_date": "2024-05-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["product"].is_array());
}

#[tokio::test]
async fn sale_beyond_stock_is_rejected_and_not_persisted() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Widget", 300).await;

    app.purchase(&session, product, 6, "2024-05-01T09:00:00Z").await;
    app.purchase(&session, product, 4, "2024-05-02T09:00:00Z").await;

    let (status, body) = app.sell(&session, product, 7, "2024-05-03T09:00:00Z").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["product"], product);
    assert_eq!(body["quantity"], 7);
    assert!(body["import_batch"].is_null());

    let (status, body) = app.sell(&session, product, 5, "2024-05-04T09:00:00Z").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");

    let (_, sales) = app.get("/sales", &session).await;
    assert_eq!(sales.as_array().unwrap().len(), 1);

    let (status, stock) = app.get(&format!("/inventory/{product}/stock"), &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock["purchased"], 10);
    assert_eq!(stock["sold"], 7);
    assert_eq!(stock["available"], 3);

    let (status, _) = app.sell(&session, product, 3, "2024-05-05T09:00:00Z").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn sequential_sales_never_exceed_purchases() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Bolt", 5).await;
    app.purchase(&session, product, 12, "2024-01-01T00:00:00Z").await;

    for quantity in [5, 4, 6, 2, 1, 3] {
        app.sell(&session, product, quantity, "2024-01-02T00:00:00Z").await;
        let (_, stock) = app.get(&format!("/inventory/{product}/stock"), &session).await;
        assert!(stock["sold"].as_i64().unwrap() <= stock["purchased"].as_i64().unwrap());
        assert!(stock["available"].as_i64().unwrap() >= 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_cannot_oversell() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Lamp", 2500).await;
    app.purchase(&session, product, 10, "2024-06-01T00:00:00Z").await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let router = app.router.clone();
            let request = json_request(
                Method::POST,
                "/sales",
                Some(session.as_str()),
                json!({ "product": product, "quantity": 1, "sales_date": "2024-06-02T00:00:00Z" }),
            );
            tokio::spawn(async move { router.oneshot(request).await.unwrap().status() })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::CREATED {
            accepted += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }
    assert_eq!(accepted, 10);

    let (_, stock) = app.get(&format!("/inventory/{product}/stock"), &session).await;
    assert_eq!(stock["sold"], 10);
    assert_eq!(stock["available"], 0);
}

#[tokio::test]
async fn sale_for_unknown_product_is_validation_error() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let (status, body) = app.sell(&session, 77, 1, "2024-01-02T00:00:00Z").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ledger_is_ordered_by_date_not_insertion() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Tea", 800).await;

    app.purchase(&session, product, 10, "2024-03-10T00:00:00Z").await;
    app.purchase(&session, product, 5, "2024-03-01T00:00:00Z").await;
    let (status, _) = app.sell(&session, product, 3, "2024-03-05T00:00:00Z").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, ledger) = app.get(&format!("/inventory/{product}"), &session).await;
    assert_eq!(status, StatusCode::OK);

    let entries = ledger.as_array().unwrap();
    let dates: Vec<_> = entries.iter().map(|e| e["date"].as_str().unwrap()).collect();
    assert_eq!(
        dates,
        ["2024-03-01T00:00:00Z", "2024-03-05T00:00:00Z", "2024-03-10T00:00:00Z"]
    );
    let types: Vec<_> = entries.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["inflow", "outflow", "inflow"]);
    assert!(entries.iter().all(|e| e["unit"] == 800));
}

#[tokio::test]
async fn ledger_for_unknown_product_is_404() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let (status, _) = app.get("/inventory/12345", &session).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Bulk import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_creates_sales_under_one_batch() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Mug", 900).await;

    let csv = format!(
        "product,date,quantity\n{product},2024-05-01,2\n{product},2024-05-02 10:00:00,3\n"
    );
    let (status, body) = app.upload("/sales/import", &session, "may.csv", &csv).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.is_null());

    let (_, sales) = app.get("/sales", &session).await;
    let sales = sales.as_array().unwrap();
    assert_eq!(sales.len(), 2);
    let batch = sales[0]["import_batch"].as_i64().unwrap();
    assert!(sales.iter().all(|s| s["import_batch"] == batch));

    let (status, batch) = app.get(&format!("/import-batches/{batch}"), &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["file_name"], "may.csv");
    assert_eq!(batch["status"], ImportStatus::Synchronous.code());

    let stored: Vec<_> = std::fs::read_dir(app.uploads.path()).unwrap().collect();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn import_does_not_check_stock() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Plate", 100).await;

    let csv = format!("product,date,quantity\n{product},2024-05-01,50\n");
    let (status, _) = app.upload("/sales/import", &session, "big.csv", &csv).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, stock) = app.get(&format!("/inventory/{product}/stock"), &session).await;
    assert_eq!(stock["available"], -50);
}

#[tokio::test]
async fn import_stops_at_first_bad_row_keeping_earlier_rows() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Bowl", 400).await;

    let csv = format!(
        "product,date,quantity\n\
         {product},2024-05-01,1\n\
         {product},2024-05-02,2\n\
         {product},2024-05-03,3\n\
         {product},2024-05-04,four\n\
         {product},2024-05-05,5\n"
    );
    let (status, body) = app.upload("/sales/import", &session, "broken.csv", &csv).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "import_error");
    assert!(body["message"].as_str().unwrap().contains("line 5"));

    let (_, sales) = app.get("/sales", &session).await;
    let quantities: Vec<_> = sales
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, [1, 2, 3]);
}

#[tokio::test]
async fn import_rejects_unknown_product() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    let csv = "product,date,quantity\n999,2024-05-01,1\n";
    let (status, body) = app.upload("/sales/import", &session, "ghost.csv", csv).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn import_without_file_field_is_400() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = common::BOUNDARY
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/sales/import")
        .header(header::COOKIE, &session)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", common::BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = into_parts(app.send(request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["file"].is_array());
}

#[tokio::test]
async fn import_without_multipart_body_is_json_400() {
    let app = TestApp::spawn().await;
    let session = app.login().await;

    for path in ["/sales/import", "/sales/import/async"] {
        let (status, body) = app.post(path, &session, json!({ "file": "sales.csv" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["error"], "malformed_body", "{path}");
    }
}

#[tokio::test]
async fn overlong_file_name_is_rejected_before_saving() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Cup", 300).await;

    let name = format!("{}.csv", "a".repeat(300));
    let csv = format!("product,date,quantity\n{product},2024-05-01,1\n");
    let (status, body) = app.upload("/sales/import", &session, &name, &csv).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["file"][0].as_str().unwrap().contains("255"));

    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
    let (_, sales) = app.get("/sales", &session).await;
    assert!(sales.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn async_import_completes_batch() {
    let app = TestApp::spawn().await;
    let session = app.login().await;
    let product = app.create_product(&session, "Spoon", 50).await;

    let csv = format!("product,date,quantity\n{product},2024-05-01,1\n{product},2024-05-02,1\n");
    let (status, batch) = app
        .upload("/sales/import/async", &session, "later.csv", &csv)
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(batch["status"], ImportStatus::AsyncPending.code());
    let id = batch["id"].as_i64().unwrap();

    let mut status = batch["status"].clone();
    for _ in 0..50 {
        let (_, batch) = app.get(&format!("/import-batches/{id}"), &session).await;
        status = batch["status"].clone();
        if status == ImportStatus::AsyncDone.code() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(status, ImportStatus::AsyncDone.code());

    let sales = app.state.repos.sales.list_by_batch(id).await.unwrap();
    assert_eq!(sales.len(), 2);
}

#[tokio::test]
async fn import_requires_authentication() {
    let app = TestApp::spawn().await;
    let (status, _) = app
        .upload("/sales/import", "", "x.csv", "product,date,quantity\n")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
