use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Json;
use crate::errors::ServiceError;
use crate::services::orders::{
    DeliveryAddressPatch, NewDeliveryAddress, NewItem, NewOrder, OrderDetails, OrderFilter,
};
use crate::AppState;

// Order DTOs

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub client_name: Option<String>,

    #[validate(length(max = 14, message = "must be at most 14 characters"))]
    pub client_document: Option<String>,

    pub delivery_date: Option<NaiveDate>,
    pub delivery_address: Option<DeliveryAddressPayload>,

    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

/// The optional address fields use a double `Option` so an explicit JSON
/// `null` (clear the field) stays distinguishable from the field being absent
/// (leave it untouched).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryAddressPayload {
    pub street_name: Option<String>,
    pub number: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub complement: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reference_point: Option<Option<String>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemPayload {
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddItemsRequest {
    pub items: Option<Vec<ItemPayload>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAddressRequest {
    pub delivery_address: Option<DeliveryAddressPayload>,
}

#[derive(Debug, Deserialize)]
pub struct FilterOrdersQuery {
    pub client_document: Option<String>,
    pub delivery_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub client_name: String,
    pub client_document: String,
    pub delivery_date: NaiveDate,
    pub delivery_address: Option<DeliveryAddressResponse>,
    pub items: Vec<ItemResponse>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryAddressResponse {
    pub street_name: String,
    pub number: String,
    pub complement: Option<String>,
    pub reference_point: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AddItemsResponse {
    pub message: String,
    pub created: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// Validation helpers. Requests are checked exhaustively before any mutation;
// all offending fields are reported at once.

fn schema_errors(validation_errors: &validator::ValidationErrors) -> Vec<String> {
    validation_errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = field.clone();
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect()
}

fn take_required_string(
    value: Option<String>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Some(value),
        Some(_) => {
            errors.push(format!("{field}: must not be empty"));
            None
        }
        None => {
            errors.push(format!("{field}: is required"));
            None
        }
    }
}

fn convert_item(index: usize, item: ItemPayload, errors: &mut Vec<String>) -> Option<NewItem> {
    let context = format!("items[{index}]");

    let name = take_required_string(item.name, &format!("{context}.name"), errors);

    let quantity = match item.quantity {
        Some(quantity) if quantity < 0 => {
            errors.push(format!("{context}.quantity: must not be negative"));
            None
        }
        Some(quantity) => Some(quantity),
        None => {
            errors.push(format!("{context}.quantity: is required"));
            None
        }
    };

    let unit_price = match item.unit_price {
        Some(unit_price) if unit_price < Decimal::ZERO => {
            errors.push(format!("{context}.unit_price: must not be negative"));
            None
        }
        Some(unit_price) => Some(unit_price),
        None => {
            errors.push(format!("{context}.unit_price: is required"));
            None
        }
    };

    match (name, quantity, unit_price) {
        (Some(name), Some(quantity), Some(unit_price)) => Some(NewItem {
            name,
            quantity,
            unit_price,
        }),
        _ => None,
    }
}

fn convert_new_address(
    address: DeliveryAddressPayload,
    errors: &mut Vec<String>,
) -> Option<NewDeliveryAddress> {
    let street_name =
        take_required_string(address.street_name, "delivery_address.street_name", errors);
    let number = take_required_string(address.number, "delivery_address.number", errors);

    match (street_name, number) {
        (Some(street_name), Some(number)) => Some(NewDeliveryAddress {
            street_name,
            number,
            complement: address.complement.flatten(),
            reference_point: address.reference_point.flatten(),
        }),
        _ => None,
    }
}

fn map_order_details(details: &OrderDetails) -> OrderResponse {
    OrderResponse {
        id: details.order.id,
        client_name: details.order.client_name.clone(),
        client_document: details.order.client_document.clone(),
        delivery_date: details.order.delivery_date,
        delivery_address: details.delivery_address.as_ref().map(|address| {
            DeliveryAddressResponse {
                street_name: address.street_name.clone(),
                number: address.number.clone(),
                complement: address.complement.clone(),
                reference_point: address.reference_point.clone(),
            }
        }),
        items: details
            .items
            .iter()
            .map(|item| ItemResponse {
                id: item.id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        total_price: details.total_price(),
        created_at: details.order.created_at,
        updated_at: details.order.updated_at.unwrap_or(details.order.created_at),
    }
}

/// Create a new order with its optional delivery address and items
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ServiceError> {
    let mut errors = Vec::new();

    if let Err(validation_errors) = request.validate() {
        errors.extend(schema_errors(&validation_errors));
    }

    let client_name = take_required_string(request.client_name, "client_name", &mut errors);
    let client_document =
        take_required_string(request.client_document, "client_document", &mut errors);
    if request.delivery_date.is_none() {
        errors.push("delivery_date: is required".to_string());
    }

    let delivery_address = request
        .delivery_address
        .and_then(|address| convert_new_address(address, &mut errors));

    let mut items = Vec::with_capacity(request.items.len());
    for (index, item) in request.items.into_iter().enumerate() {
        if let Some(item) = convert_item(index, item, &mut errors) {
            items.push(item);
        }
    }

    let (client_name, client_document, delivery_date) =
        match (client_name, client_document, request.delivery_date) {
            (Some(name), Some(document), Some(date)) if errors.is_empty() => {
                (name, document, date)
            }
            _ => return Err(ServiceError::FieldErrors(errors)),
        };

    let details = state
        .services
        .order
        .create_order(NewOrder {
            client_name,
            client_document,
            delivery_date,
            delivery_address,
            items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(map_order_details(&details))))
}

/// Get an order by its ID, with nested address, items and computed total
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    match state.services.order.get_order(id).await? {
        Some(details) => Ok(Json(map_order_details(&details))),
        None => Err(ServiceError::NotFound(format!(
            "Order with ID {} not found",
            id
        ))),
    }
}

/// Append items to an existing order. The batch is all-or-nothing: any
/// invalid item rejects every item in the request.
pub async fn add_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemsRequest>,
) -> Result<Json<AddItemsResponse>, ServiceError> {
    if !state.services.order.order_exists(id).await? {
        return Err(ServiceError::NotFound(format!(
            "Order with ID {} not found",
            id
        )));
    }

    let payloads = match request.items {
        Some(items) if !items.is_empty() => items,
        _ => return Err(ServiceError::BadRequest("items is required".to_string())),
    };

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(payloads.len());
    for (index, item) in payloads.into_iter().enumerate() {
        if let Some(item) = convert_item(index, item, &mut errors) {
            items.push(item);
        }
    }

    if !errors.is_empty() {
        return Err(ServiceError::FieldErrors(errors));
    }

    let created = state.services.order.add_items(id, items).await?;

    Ok(Json(AddItemsResponse {
        message: format!("{created} items added"),
        created,
    }))
}

/// Remove one item from an order
pub async fn delete_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state.services.order.delete_item(id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create or update an order's delivery address. An existing address is
/// patched field-wise; creating one requires street_name and number.
pub async fn update_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAddressRequest>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let details = state
        .services
        .order
        .get_order(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order with ID {} not found", id)))?;

    let payload = request
        .delivery_address
        .ok_or_else(|| ServiceError::BadRequest("delivery_address is required".to_string()))?;

    if details.delivery_address.is_none() {
        let mut errors = Vec::new();
        if payload
            .street_name
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
        {
            errors.push("delivery_address.street_name: is required".to_string());
        }
        if payload
            .number
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
        {
            errors.push("delivery_address.number: is required".to_string());
        }
        if !errors.is_empty() {
            return Err(ServiceError::FieldErrors(errors));
        }
    }

    state
        .services
        .order
        .upsert_address(
            id,
            DeliveryAddressPatch {
                street_name: payload.street_name,
                number: payload.number,
                complement: payload.complement,
                reference_point: payload.reference_point,
            },
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Delivery address updated".to_string(),
    }))
}

/// List orders, optionally filtered by client_document and delivery_date
/// (AND semantics)
pub async fn filter_orders(
    State(state): State<AppState>,
    Query(query): Query<FilterOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let client_document = query
        .client_document
        .filter(|value| !value.trim().is_empty());

    let delivery_date = match query.delivery_date.filter(|value| !value.trim().is_empty()) {
        Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            ServiceError::BadRequest("delivery_date must be in YYYY-MM-DD format".to_string())
        })?),
        None => None,
    };

    let orders = state
        .services
        .order
        .list_orders(OrderFilter {
            client_document,
            delivery_date,
        })
        .await?;

    Ok(Json(orders.iter().map(map_order_details).collect()))
}
