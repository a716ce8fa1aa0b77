mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{response_json, TestApp};

fn sample_order_body() -> Value {
    json!({
        "client_name": "João Silva",
        "client_document": "12345678901",
        "delivery_date": "2025-08-20",
        "delivery_address": {
            "street_name": "Rua das Flores",
            "number": "123",
            "complement": "Apto 45",
            "reference_point": "Próximo ao mercado"
        },
        "items": [
            {"name": "Produto A", "quantity": 2, "unit_price": 10.50},
            {"name": "Produto B", "quantity": 1, "unit_price": 20.70}
        ]
    })
}

async fn create_sample_order(app: &TestApp) -> Value {
    let response = app
        .request(Method::POST, "/orders/", Some(sample_order_body()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

#[tokio::test]
async fn create_and_retrieve_order_with_computed_total() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().expect("order id in response");

    assert_eq!(created["client_name"], "João Silva");
    assert_eq!(created["client_document"], "12345678901");
    assert_eq!(created["delivery_date"], "2025-08-20");
    assert_eq!(created["delivery_address"]["street_name"], "Rua das Flores");
    assert_eq!(created["items"].as_array().unwrap().len(), 2);

    // total_price is a JSON number, not a string: (2 × 10.50) + (1 × 20.70)
    let total = created["total_price"].as_f64().expect("numeric total_price");
    assert!((total - 41.70).abs() < 1e-9);

    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = response_json(response).await;

    assert_eq!(fetched["id"], created["id"]);
    let total = fetched["total_price"].as_f64().expect("numeric total_price");
    assert!((total - 41.70).abs() < 1e-9);

    // Timestamps are always present and non-null
    assert!(fetched["created_at"].is_string());
    assert!(fetched["updated_at"].is_string());
}

#[tokio::test]
async fn get_unknown_order_returns_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/orders/00000000-0000-0000-0000-000000000000/",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_order_without_items_returns_empty_list_and_zero_total() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/orders/",
            Some(json!({
                "client_name": "Maria Souza",
                "client_document": "98765432100",
                "delivery_date": "2025-09-01"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;

    assert!(created["items"].as_array().unwrap().is_empty());
    assert!(created["delivery_address"].is_null());
    assert_eq!(created["total_price"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn create_order_with_empty_client_name_is_rejected() {
    let app = TestApp::new().await;

    let mut body = sample_order_body();
    body["client_name"] = json!("");

    let response = app.request(Method::POST, "/orders/", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = response_json(response).await;
    let errors = error["errors"].as_array().expect("field errors listed");
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().starts_with("client_name:")));
}

#[tokio::test]
async fn malformed_field_types_are_rejected_as_bad_request() {
    let app = TestApp::new().await;

    // A date that fails type-level deserialization
    let mut body = sample_order_body();
    body["delivery_date"] = json!("not-a-date");
    let response = app.request(Method::POST, "/orders/", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = response_json(response).await;
    assert!(error["message"].is_string());

    // A quantity carried as a string instead of a number
    let mut body = sample_order_body();
    body["items"][0]["quantity"] = json!("two");
    let response = app.request(Method::POST, "/orders/", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted
    let response = app.request(Method::GET, "/orders/filter/", None).await;
    let orders = response_json(response).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_order_with_overlong_client_document_is_rejected() {
    let app = TestApp::new().await;

    let mut body = sample_order_body();
    body["client_document"] = json!("123456789012345");

    let response = app.request(Method::POST, "/orders/", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_with_negative_item_values_is_rejected_and_not_persisted() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/orders/",
            Some(json!({
                "client_name": "Cliente Inválido",
                "client_document": "11122233344",
                "delivery_date": "2025-08-21",
                "items": [
                    {"name": "Produto X", "quantity": -1, "unit_price": -10.99}
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = response_json(response).await;
    let errors = error["errors"].as_array().expect("field errors listed");
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().contains("quantity")));
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().contains("unit_price")));

    // Nothing was persisted
    let response = app.request(Method::GET, "/orders/filter/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let orders = response_json(response).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_order_with_incomplete_address_is_rejected_and_not_persisted() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/orders/",
            Some(json!({
                "client_name": "Cliente Sem Rua",
                "client_document": "55566677788",
                "delivery_date": "2025-08-22",
                "delivery_address": {"number": "42"}
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = response_json(response).await;
    let errors = error["errors"].as_array().expect("field errors listed");
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().contains("street_name")));

    let response = app.request(Method::GET, "/orders/filter/", None).await;
    let orders = response_json(response).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_client_and_delivery_date_is_rejected() {
    let app = TestApp::new().await;

    create_sample_order(&app).await;

    let response = app
        .request(Method::POST, "/orders/", Some(sample_order_body()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Same client on a different date is fine
    let mut body = sample_order_body();
    body["delivery_date"] = json!("2025-08-25");
    let response = app.request(Method::POST, "/orders/", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn add_items_appends_to_existing_order() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/add-items/", order_id),
            Some(json!({
                "items": [
                    {"name": "Produto C", "quantity": 3, "unit_price": 5.00}
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["created"], 1);

    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    let fetched = response_json(response).await;
    assert_eq!(fetched["items"].as_array().unwrap().len(), 3);
    let total = fetched["total_price"].as_f64().unwrap();
    assert!((total - 56.70).abs() < 1e-9);
}

#[tokio::test]
async fn add_items_to_unknown_order_returns_404_even_with_invalid_items() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::PATCH,
            "/orders/00000000-0000-0000-0000-000000000000/add-items/",
            Some(json!({
                "items": [{"quantity": -1}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_items_batch_with_one_invalid_item_rejects_all() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/add-items/", order_id),
            Some(json!({
                "items": [
                    {"name": "Produto Válido", "quantity": 1, "unit_price": 9.99},
                    {"quantity": 2, "unit_price": 4.00}
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The valid item was not persisted either
    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    let fetched = response_json(response).await;
    assert_eq!(fetched["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn add_items_without_items_key_is_rejected() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/add-items/", order_id),
            Some(json!({})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_item_removes_it_and_updates_total() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();
    let item_id = created["items"][0]["id"].as_str().unwrap();

    let response = app
        .request(
            Method::DELETE,
            &format!("/orders/{}/items/{}/", order_id, item_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    let fetched = response_json(response).await;
    assert_eq!(fetched["items"].as_array().unwrap().len(), 1);
    let total = fetched["total_price"].as_f64().unwrap();
    assert!((total - 20.70).abs() < 1e-9);
}

#[tokio::test]
async fn delete_nonexistent_item_returns_404() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .request(
            Method::DELETE,
            &format!(
                "/orders/{}/items/00000000-0000-0000-0000-000000000000/",
                order_id
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_item_belonging_to_another_order_returns_404() {
    let app = TestApp::new().await;

    let first = create_sample_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/orders/",
            Some(json!({
                "client_name": "Outro Cliente",
                "client_document": "22233344455",
                "delivery_date": "2025-08-23",
                "items": [{"name": "Produto Z", "quantity": 1, "unit_price": 7.00}]
            })),
        )
        .await;
    let second = response_json(response).await;

    let foreign_item = first["items"][0]["id"].as_str().unwrap();
    let response = app
        .request(
            Method::DELETE,
            &format!(
                "/orders/{}/items/{}/",
                second["id"].as_str().unwrap(),
                foreign_item
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_address_creates_one_when_order_has_none() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/orders/",
            Some(json!({
                "client_name": "Sem Endereço",
                "client_document": "33344455566",
                "delivery_date": "2025-08-24"
            })),
        )
        .await;
    let created = response_json(response).await;
    let order_id = created["id"].as_str().unwrap();

    // Creating an address requires street_name and number
    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/update-address/", order_id),
            Some(json!({"delivery_address": {"complement": "Fundos"}})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/update-address/", order_id),
            Some(json!({
                "delivery_address": {
                    "street_name": "Avenida Central",
                    "number": "1000"
                }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    let fetched = response_json(response).await;
    assert_eq!(
        fetched["delivery_address"]["street_name"],
        "Avenida Central"
    );
    assert_eq!(fetched["delivery_address"]["number"], "1000");
}

#[tokio::test]
async fn update_address_partially_overwrites_existing_one() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/update-address/", order_id),
            Some(json!({"delivery_address": {"number": "999"}})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    let fetched = response_json(response).await;

    // Only the supplied field changed
    assert_eq!(fetched["delivery_address"]["number"], "999");
    assert_eq!(
        fetched["delivery_address"]["street_name"],
        "Rua das Flores"
    );
    assert_eq!(fetched["delivery_address"]["complement"], "Apto 45");
}

#[tokio::test]
async fn update_address_with_explicit_null_clears_optional_field() {
    let app = TestApp::new().await;

    let created = create_sample_order(&app).await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PATCH,
            &format!("/orders/{}/update-address/", order_id),
            Some(json!({"delivery_address": {"complement": null}})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/orders/{}/", order_id), None)
        .await;
    let fetched = response_json(response).await;

    // An explicit null cleared the field; untouched fields survive
    assert!(fetched["delivery_address"]["complement"].is_null());
    assert_eq!(
        fetched["delivery_address"]["reference_point"],
        "Próximo ao mercado"
    );
    assert_eq!(
        fetched["delivery_address"]["street_name"],
        "Rua das Flores"
    );
}

#[tokio::test]
async fn update_address_on_unknown_order_returns_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::PATCH,
            "/orders/00000000-0000-0000-0000-000000000000/update-address/",
            Some(json!({
                "delivery_address": {"street_name": "Rua Nova", "number": "1"}
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filter_orders_applies_and_semantics() {
    let app = TestApp::new().await;

    create_sample_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/orders/",
            Some(json!({
                "client_name": "Maria Souza",
                "client_document": "98765432100",
                "delivery_date": "2025-08-20"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // No filters: everything
    let response = app.request(Method::GET, "/orders/filter/", None).await;
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 2);

    // By document
    let response = app
        .request(
            Method::GET,
            "/orders/filter/?client_document=12345678901",
            None,
        )
        .await;
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["client_name"], "João Silva");

    // By date: both match
    let response = app
        .request(Method::GET, "/orders/filter/?delivery_date=2025-08-20", None)
        .await;
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 2);

    // Both filters must match (AND)
    let response = app
        .request(
            Method::GET,
            "/orders/filter/?client_document=98765432100&delivery_date=2025-08-20",
            None,
        )
        .await;
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["client_name"], "Maria Souza");

    // No match
    let response = app
        .request(
            Method::GET,
            "/orders/filter/?client_document=12345678901&delivery_date=2025-09-30",
            None,
        )
        .await;
    let orders = response_json(response).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn filter_orders_rejects_malformed_date() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/orders/filter/?delivery_date=20-08-2025", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_reports_database_status() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "up");
}
