//! CRUD, validation and pagination over the resource routes.

use classicmodels_client::ApiClient;
use reqwest::Method;
use serde_json::json;

mod common;

use common::TestServer;

#[tokio::test]
async fn test_resources_require_token() {
    let server = TestServer::start().await;
    let client = server.client();

    let res = client.get(&ApiClient::resource("offices")).await.unwrap();
    assert_eq!(res.status, 401);
    assert_eq!(res.body["detail"], "Authentication credentials were not provided.");

    let mut forged = server.client();
    forged.set_token(Some("not.a.jwt".to_string()));
    let res = forged.get(&ApiClient::resource("offices")).await.unwrap();
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "token_not_valid");

    server.stop().await;
}

#[tokio::test]
async fn test_office_lifecycle() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    let detail = ApiClient::detail("offices", "8");

    let res = client.post(&ApiClient::resource("offices"), &common::office("8")).await.unwrap();
    assert_eq!(res.status, 201, "{}", res.body);
    assert_eq!(res.body["officecode"], "8");
    assert_eq!(res.body["territory"], "NA");

    let res = client.get(&detail).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["city"], "San Francisco");

    let res = client.patch(&detail, &json!({ "city": "Boston" })).await.unwrap();
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.body["city"], "Boston");
    assert_eq!(res.body["country"], "USA");

    let mut replacement = common::office("8");
    replacement["city"] = json!("Paris");
    replacement["state"] = json!(null);
    let res = client.put(&detail, &replacement).await.unwrap();
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.body["city"], "Paris");
    assert!(res.body["state"].is_null());

    let res = client.delete(&detail).await.unwrap();
    assert_eq!(res.status, 204);

    let res = client.get(&detail).await.unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(res.body["detail"], "Not found.");

    server.stop().await;
}

#[tokio::test]
async fn test_duplicate_key_is_rejected() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    let collection = ApiClient::resource("offices");

    assert_eq!(client.post(&collection, &common::office("1")).await.unwrap().status, 201);
    let res = client.post(&collection, &common::office("1")).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body["officecode"],
        json!(["office with this officecode already exists."])
    );

    let mut changed = common::office("1");
    changed["city"] = json!("Sydney");
    assert_eq!(client.post(&collection, &changed).await.unwrap().status, 400);
    let res = client.get(&ApiClient::detail("offices", "1")).await.unwrap();
    assert_eq!(res.body["city"], "San Francisco");

    server.stop().await;
}

#[tokio::test]
async fn test_field_validation_messages() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    let res = client
        .post(&ApiClient::resource("offices"), &json!({ "officecode": "9", "city": "" }))
        .await
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["city"], json!(["This field may not be blank."]));
    assert_eq!(res.body["country"], json!(["This field is required."]));
    assert!(res.body.get("addressline2").is_none(), "nullable field reported");

    let mut bad = common::office("this-code-is-too-long");
    bad["phone"] = json!(12);
    let res = client.post(&ApiClient::resource("offices"), &bad).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body["officecode"],
        json!(["Ensure this field has no more than 10 characters."])
    );

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_bodies() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    let collection = ApiClient::resource("offices");

    let res = client.send_raw(Method::POST, &collection, "{\"officecode\": ").await.unwrap();
    assert_eq!(res.status, 400);
    assert!(
        res.body["detail"].as_str().unwrap().starts_with("JSON parse error"),
        "{}",
        res.body
    );

    let res = client.post(&collection, &json!(["not", "an", "object"])).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body["non_field_errors"],
        json!(["Invalid data. Expected a dictionary, but got list."])
    );

    server.stop().await;
}

#[tokio::test]
async fn test_key_fields_cannot_change() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    client.post(&ApiClient::resource("offices"), &common::office("2")).await.unwrap();
    let res = client
        .patch(&ApiClient::detail("offices", "2"), &json!({ "officecode": "3" }))
        .await
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["officecode"], json!(["This field cannot be changed."]));

    let res = client.get(&ApiClient::detail("offices", "3")).await.unwrap();
    assert_eq!(res.status, 404);

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_routes_and_methods() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    let res = client.get("/classic-models/api/v1/classicmodels/widgets/").await.unwrap();
    assert_eq!(res.status, 404);

    let res = client.delete(&ApiClient::resource("offices")).await.unwrap();
    assert_eq!(res.status, 405);
    assert_eq!(res.body["detail"], "Method \"DELETE\" not allowed.");

    let res = client.get(&ApiClient::detail("employees", "not-a-number")).await.unwrap();
    assert_eq!(res.status, 404);

    server.stop().await;
}

#[tokio::test]
async fn test_pagination_links() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    let collection = ApiClient::resource("offices");

    for code in 10..22 {
        let res = client.post(&collection, &common::office(&code.to_string())).await.unwrap();
        assert_eq!(res.status, 201);
    }

    let res = client.get(&collection).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["count"], 12);
    assert_eq!(res.body["results"].as_array().unwrap().len(), 10);
    assert!(res.body["previous"].is_null());
    let next = res.body["next"].as_str().unwrap();
    assert!(next.ends_with("/offices/?page=2"), "{}", next);

    let res = client.get(&format!("{}?page=2", collection)).await.unwrap();
    assert_eq!(res.body["results"].as_array().unwrap().len(), 2);
    assert!(res.body["next"].is_null());
    let previous = res.body["previous"].as_str().unwrap();
    assert!(previous.ends_with("/offices/"), "{}", previous);

    let res = client.get(&format!("{}?page=last", collection)).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["results"].as_array().unwrap().len(), 2);

    let res = client.get(&format!("{}?page=3", collection)).await.unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(res.body["detail"], "Invalid page.");

    server.stop().await;
}

#[tokio::test]
async fn test_empty_collection() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    let res = client.get(&ApiClient::resource("payments")).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(
        res.body,
        json!({ "count": 0, "next": null, "previous": null, "results": [] })
    );

    server.stop().await;
}

#[tokio::test]
async fn test_foreign_keys() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    let res = client
        .post(&ApiClient::resource("products"), &common::product("S10_1678", "Motorcycles"))
        .await
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body["productline"],
        json!(["Invalid pk \"Motorcycles\" - object does not exist."])
    );

    let res = client
        .post(&ApiClient::resource("productlines"), &common::product_line("Motorcycles"))
        .await
        .unwrap();
    assert_eq!(res.status, 201, "{}", res.body);
    let res = client
        .post(&ApiClient::resource("products"), &common::product("S10_1678", "Motorcycles"))
        .await
        .unwrap();
    assert_eq!(res.status, 201, "{}", res.body);
    assert_eq!(res.body["msrp"], "95.70");

    let res = client.get(&format!("{}products/", ApiClient::detail("productlines", "Motorcycles"))).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["count"], 1);
    assert_eq!(res.body["results"][0]["productcode"], "S10_1678");

    // Still referenced by the product
    let res = client.delete(&ApiClient::detail("productlines", "Motorcycles")).await.unwrap();
    assert_eq!(res.status, 409);

    assert_eq!(client.delete(&ApiClient::detail("products", "S10_1678")).await.unwrap().status, 204);
    assert_eq!(client.delete(&ApiClient::detail("productlines", "Motorcycles")).await.unwrap().status, 204);

    let res = client.get(&format!("{}products/", ApiClient::detail("productlines", "Motorcycles"))).await.unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(res.body["detail"], "Product line not found.");

    server.stop().await;
}

#[tokio::test]
async fn test_composite_keys() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    assert_eq!(
        client.post(&ApiClient::resource("customers"), &common::customer(103)).await.unwrap().status,
        201
    );
    let res = client
        .post(&ApiClient::resource("payments"), &common::payment(103, "HQ336336"))
        .await
        .unwrap();
    assert_eq!(res.status, 201, "{}", res.body);
    assert_eq!(res.body["amount"], "6066.78");
    assert_eq!(res.body["paymentdate"], "2004-10-19");

    let detail = "/classic-models/api/v1/classicmodels/payments/103/HQ336336/";
    let res = client.get(detail).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["checknumber"], "HQ336336");

    let res = client
        .post(&ApiClient::resource("payments"), &common::payment(103, "HQ336336"))
        .await
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body["non_field_errors"],
        json!(["The fields customernumber, checknumber must make a unique set."])
    );

    // Sharing one half of the key is fine
    assert_eq!(
        client.post(&ApiClient::resource("customers"), &common::customer(112)).await.unwrap().status,
        201
    );
    for (customer, check) in [(103, "JM555205"), (112, "HQ336336")] {
        let res = client
            .post(&ApiClient::resource("payments"), &common::payment(customer, check))
            .await
            .unwrap();
        assert_eq!(res.status, 201, "{}", res.body);
    }

    let res = client.patch(detail, &json!({ "amount": 100 })).await.unwrap();
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.body["amount"], "100.00");

    let res = client.get(&format!("{}payments/", ApiClient::detail("customers", "103"))).await.unwrap();
    assert_eq!(res.body["count"], 2);

    assert_eq!(client.delete(detail).await.unwrap().status, 204);
    assert_eq!(client.get(detail).await.unwrap().status, 404);

    server.stop().await;
}

/// Product line, two products, a customer and two orders to hang order lines on.
async fn seed_orders(client: &ApiClient) {
    let seed = [
        ("productlines", common::product_line("Classic Cars")),
        ("products", common::product("S10_1949", "Classic Cars")),
        ("products", common::product("S12_1099", "Classic Cars")),
        ("customers", common::customer(103)),
        ("orders", common::order(10100, 103)),
        ("orders", common::order(10101, 103)),
    ];
    for (resource, body) in seed {
        let res = client.post(&ApiClient::resource(resource), &body).await.unwrap();
        assert_eq!(res.status, 201, "{}: {}", resource, res.body);
    }
}

#[tokio::test]
async fn test_order_detail_lifecycle() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    seed_orders(&client).await;
    let collection = ApiClient::resource("orderdetails");
    let detail = "/classic-models/api/v1/classicmodels/orderdetails/10100/S10_1949/";

    let res = client.post(&collection, &common::order_detail(10100, "S10_1949")).await.unwrap();
    assert_eq!(res.status, 201, "{}", res.body);
    assert_eq!(res.body["priceeach"], "136.00");

    let res = client.post(&collection, &common::order_detail(10100, "S10_1949")).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(
        res.body["non_field_errors"],
        json!(["The fields ordernumber, productcode must make a unique set."])
    );

    for (order, product) in [(10100, "S12_1099"), (10101, "S10_1949")] {
        let res = client.post(&collection, &common::order_detail(order, product)).await.unwrap();
        assert_eq!(res.status, 201, "{}", res.body);
    }

    // Full replacement, key fields repeated
    let mut replacement = common::order_detail(10100, "S10_1949");
    replacement["quantityordered"] = json!(45);
    let res = client.put(detail, &replacement).await.unwrap();
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.body["quantityordered"], 45);

    // Full replacement, key fields taken from the path
    let res = client
        .put(
            detail,
            &json!({ "quantityordered": 12, "priceeach": "99.50", "orderlinenumber": 1 }),
        )
        .await
        .unwrap();
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.body["ordernumber"], 10100);
    assert_eq!(res.body["productcode"], "S10_1949");
    assert_eq!(res.body["priceeach"], "99.50");

    let mut moved = common::order_detail(10101, "S10_1949");
    moved["quantityordered"] = json!(1);
    let res = client.put(detail, &moved).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["ordernumber"], json!(["This field cannot be changed."]));

    let res = client.put(detail, &json!({ "quantityordered": 5 })).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["priceeach"], json!(["This field is required."]));

    // Order lines still reference the order
    let res = client.delete(&ApiClient::detail("orders", "10100")).await.unwrap();
    assert_eq!(res.status, 409);

    assert_eq!(client.delete(detail).await.unwrap().status, 204);
    let res = client.get(detail).await.unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(client.delete(detail).await.unwrap().status, 404);

    server.stop().await;
}

#[tokio::test]
async fn test_payment_full_update() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    let detail = "/classic-models/api/v1/classicmodels/payments/103/HQ336336/";

    client.post(&ApiClient::resource("customers"), &common::customer(103)).await.unwrap();
    let res = client
        .post(&ApiClient::resource("payments"), &common::payment(103, "HQ336336"))
        .await
        .unwrap();
    assert_eq!(res.status, 201, "{}", res.body);

    let res = client
        .put(detail, &json!({ "paymentdate": "2005-01-31", "amount": "250.00" }))
        .await
        .unwrap();
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.body["customernumber"], 103);
    assert_eq!(res.body["paymentdate"], "2005-01-31");

    let mut renamed = common::payment(103, "XX000001");
    renamed["amount"] = json!("1.00");
    let res = client.put(detail, &renamed).await.unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["checknumber"], json!(["This field cannot be changed."]));

    let res = client.get(detail).await.unwrap();
    assert_eq!(res.body["amount"], "250.00");

    server.stop().await;
}

#[tokio::test]
async fn test_product_order_details() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;
    seed_orders(&client).await;
    let lines = format!("{}order-details/", ApiClient::detail("products", "S10_1949"));

    let res = client.get(&lines).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["count"], 0);

    for order in [10100, 10101] {
        let res = client
            .post(&ApiClient::resource("orderdetails"), &common::order_detail(order, "S10_1949"))
            .await
            .unwrap();
        assert_eq!(res.status, 201, "{}", res.body);
    }
    client
        .post(&ApiClient::resource("orderdetails"), &common::order_detail(10100, "S12_1099"))
        .await
        .unwrap();

    let res = client.get(&lines).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["count"], 2);
    for line in res.body["results"].as_array().unwrap() {
        assert_eq!(line["productcode"], "S10_1949");
    }

    let res = client
        .get(&format!("{}order-details/", ApiClient::detail("products", "S99_0000")))
        .await
        .unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(res.body["detail"], "Product not found.");

    server.stop().await;
}

#[tokio::test]
async fn test_bad_query_string_is_json() {
    let server = TestServer::start().await;
    let client = server.demo_client().await;

    let res = client
        .get(&format!("{}?page=1&page=2", ApiClient::resource("offices")))
        .await
        .unwrap();
    assert_eq!(res.status, 400);
    assert!(res.body["non_field_errors"][0].is_string(), "{}", res.body);

    server.stop().await;
}
