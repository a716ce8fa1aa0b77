use crate::{
    db::DbPool,
    entities::delivery_address::{
        ActiveModel as AddressActiveModel, Entity as AddressEntity, Model as AddressModel,
    },
    entities::item::{self, ActiveModel as ItemActiveModel, Entity as ItemEntity, Model as ItemModel},
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
    errors::ServiceError,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const DUPLICATE_ORDER_MESSAGE: &str =
    "an order for this client_name, client_document and delivery_date already exists";

/// Input types for the order service. Field-level validation happens at the
/// HTTP boundary; these carry already-checked values.
#[derive(Debug)]
pub struct NewOrder {
    pub client_name: String,
    pub client_document: String,
    pub delivery_date: NaiveDate,
    pub delivery_address: Option<NewDeliveryAddress>,
    pub items: Vec<NewItem>,
}

#[derive(Debug)]
pub struct NewDeliveryAddress {
    pub street_name: String,
    pub number: String,
    pub complement: Option<String>,
    pub reference_point: Option<String>,
}

#[derive(Debug)]
pub struct NewItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Partial update for a delivery address; only supplied fields change. For
/// the nullable fields, `Some(None)` clears the stored value while an outer
/// `None` leaves it untouched.
#[derive(Debug, Default)]
pub struct DeliveryAddressPatch {
    pub street_name: Option<String>,
    pub number: Option<String>,
    pub complement: Option<Option<String>>,
    pub reference_point: Option<Option<String>>,
}

#[derive(Debug, Default)]
pub struct OrderFilter {
    pub client_document: Option<String>,
    pub delivery_date: Option<NaiveDate>,
}

/// An order header together with its related rows.
#[derive(Debug)]
pub struct OrderDetails {
    pub order: OrderModel,
    pub delivery_address: Option<AddressModel>,
    pub items: Vec<ItemModel>,
}

impl OrderDetails {
    /// Σ(quantity × unit_price) over the order's items, 2-decimal precision.
    /// Computed on read, never stored.
    pub fn total_price(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| Decimal::from(item.quantity) * item.unit_price)
            .sum::<Decimal>()
            .round_dp(2)
    }
}

/// Service for managing orders, their delivery addresses and line items
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates an order, its optional delivery address and its items as one
    /// transaction. Rejects duplicates of the (client_name, client_document,
    /// delivery_date) triple.
    #[instrument(skip(self, input), fields(client_document = %input.client_document, delivery_date = %input.delivery_date))]
    pub async fn create_order(&self, input: NewOrder) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let duplicate = OrderEntity::find()
            .filter(order::Column::ClientName.eq(input.client_name.clone()))
            .filter(order::Column::ClientDocument.eq(input.client_document.clone()))
            .filter(order::Column::DeliveryDate.eq(input.delivery_date))
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check for duplicate order");
                ServiceError::DatabaseError(e)
            })?;

        if duplicate.is_some() {
            warn!("Rejected duplicate order for the same client and delivery date");
            return Err(ServiceError::ValidationError(
                DUPLICATE_ORDER_MESSAGE.to_string(),
            ));
        }

        let delivery_address = match input.delivery_address {
            Some(address) => {
                let model = AddressActiveModel {
                    id: Set(Uuid::new_v4()),
                    street_name: Set(address.street_name),
                    number: Set(address.number),
                    complement: Set(address.complement),
                    reference_point: Set(address.reference_point),
                    created_at: Set(now),
                    updated_at: Set(Some(now)),
                }
                .insert(&txn)
                .await
                .map_err(|e| {
                    error!(error = %e, order_id = %order_id, "Failed to create delivery address");
                    ServiceError::DatabaseError(e)
                })?;
                Some(model)
            }
            None => None,
        };

        let order_model = OrderActiveModel {
            id: Set(order_id),
            client_name: Set(input.client_name),
            client_document: Set(input.client_document),
            delivery_date: Set(input.delivery_date),
            delivery_address_id: Set(delivery_address.as_ref().map(|address| address.id)),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order in database");
            classify_order_insert_error(e)
        })?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            let model = ItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                name: Set(item.name),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to create order item");
                ServiceError::DatabaseError(e)
            })?;
            items.push(model);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, item_count = items.len(), "Order created successfully");

        Ok(OrderDetails {
            order: order_model,
            delivery_address,
            items,
        })
    }

    /// Returns whether an order with the given ID exists
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn order_exists(&self, order_id: Uuid) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let count = OrderEntity::find_by_id(order_id)
            .count(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to check order existence");
                ServiceError::DatabaseError(e)
            })?;

        Ok(count > 0)
    }

    /// Retrieves an order with its delivery address and items
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderDetails>, ServiceError> {
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id).one(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to fetch order from database");
            ServiceError::DatabaseError(e)
        })?;

        match order {
            Some(order_model) => Ok(Some(load_related(db, order_model).await?)),
            None => Ok(None),
        }
    }

    /// Appends items to an existing order. All-or-nothing: every item is
    /// persisted in one transaction, so a failure leaves the order untouched.
    #[instrument(skip(self, items), fields(order_id = %order_id, item_count = items.len()))]
    pub async fn add_items(
        &self,
        order_id: Uuid,
        items: Vec<NewItem>,
    ) -> Result<usize, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let order = OrderEntity::find_by_id(order_id).one(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to fetch order for add-items");
            ServiceError::DatabaseError(e)
        })?;

        if order.is_none() {
            warn!(order_id = %order_id, "Order not found for add-items");
            return Err(ServiceError::NotFound(format!(
                "Order with ID {} not found",
                order_id
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for add-items");
            ServiceError::DatabaseError(e)
        })?;

        let mut created = 0usize;
        for item in items {
            ItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                name: Set(item.name),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to append order item");
                ServiceError::DatabaseError(e)
            })?;
            created += 1;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit add-items transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, created = created, "Items appended to order");

        Ok(created)
    }

    /// Permanently removes one item. The lookup is compound: the item must
    /// exist and belong to the given order.
    #[instrument(skip(self), fields(order_id = %order_id, item_id = %item_id))]
    pub async fn delete_item(&self, order_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let item = ItemEntity::find_by_id(item_id)
            .filter(item::Column::OrderId.eq(order_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch item for deletion");
                ServiceError::DatabaseError(e)
            })?;

        let item = item.ok_or_else(|| {
            warn!(order_id = %order_id, item_id = %item_id, "Item not found for deletion");
            ServiceError::NotFound("Item not found".to_string())
        })?;

        item.delete(db).await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to delete item");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, item_id = %item_id, "Item deleted");

        Ok(())
    }

    /// Updates the order's delivery address in place, or creates and attaches
    /// one when the order has none. Only supplied fields change on update.
    #[instrument(skip(self, patch), fields(order_id = %order_id))]
    pub async fn upsert_address(
        &self,
        order_id: Uuid,
        patch: DeliveryAddressPatch,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let order = OrderEntity::find_by_id(order_id).one(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to fetch order for address update");
            ServiceError::DatabaseError(e)
        })?;

        let order = order.ok_or_else(|| {
            warn!(order_id = %order_id, "Order not found for address update");
            ServiceError::NotFound(format!("Order with ID {} not found", order_id))
        })?;

        match order.delivery_address_id {
            Some(address_id) => {
                let address = AddressEntity::find_by_id(address_id)
                    .one(db)
                    .await
                    .map_err(|e| {
                        error!(error = %e, address_id = %address_id, "Failed to fetch delivery address");
                        ServiceError::DatabaseError(e)
                    })?
                    .ok_or_else(|| {
                        error!(order_id = %order_id, address_id = %address_id, "Order references a missing delivery address row");
                        ServiceError::InternalError("delivery address row missing".to_string())
                    })?;

                let mut active_model: AddressActiveModel = address.into();
                if let Some(street_name) = patch.street_name {
                    active_model.street_name = Set(street_name);
                }
                if let Some(number) = patch.number {
                    active_model.number = Set(number);
                }
                if let Some(complement) = patch.complement {
                    active_model.complement = Set(complement);
                }
                if let Some(reference_point) = patch.reference_point {
                    active_model.reference_point = Set(reference_point);
                }
                active_model.updated_at = Set(Some(now));

                active_model.update(db).await.map_err(|e| {
                    error!(error = %e, address_id = %address_id, "Failed to update delivery address");
                    ServiceError::DatabaseError(e)
                })?;

                info!(order_id = %order_id, address_id = %address_id, "Delivery address updated");
            }
            None => {
                // The HTTP boundary validates presence; re-checked here so the
                // invariant holds for any caller.
                let street_name = patch.street_name.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "delivery_address.street_name is required".to_string(),
                    )
                })?;
                let number = patch.number.ok_or_else(|| {
                    ServiceError::ValidationError("delivery_address.number is required".to_string())
                })?;

                let txn = db.begin().await.map_err(|e| {
                    error!(error = %e, order_id = %order_id, "Failed to start transaction for address creation");
                    ServiceError::DatabaseError(e)
                })?;

                let address = AddressActiveModel {
                    id: Set(Uuid::new_v4()),
                    street_name: Set(street_name),
                    number: Set(number),
                    complement: Set(patch.complement.flatten()),
                    reference_point: Set(patch.reference_point.flatten()),
                    created_at: Set(now),
                    updated_at: Set(Some(now)),
                }
                .insert(&txn)
                .await
                .map_err(|e| {
                    error!(error = %e, order_id = %order_id, "Failed to create delivery address");
                    ServiceError::DatabaseError(e)
                })?;

                let address_id = address.id;
                let mut active_order: OrderActiveModel = order.into();
                active_order.delivery_address_id = Set(Some(address_id));
                active_order.updated_at = Set(Some(now));
                active_order.update(&txn).await.map_err(|e| {
                    error!(error = %e, order_id = %order_id, "Failed to attach delivery address to order");
                    ServiceError::DatabaseError(e)
                })?;

                txn.commit().await.map_err(|e| {
                    error!(error = %e, order_id = %order_id, "Failed to commit address creation transaction");
                    ServiceError::DatabaseError(e)
                })?;

                info!(order_id = %order_id, address_id = %address_id, "Delivery address created and attached");
            }
        }

        Ok(())
    }

    /// Lists orders matching the given filters (AND semantics); no filters
    /// returns all orders.
    #[instrument(skip(self, filter))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderDetails>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = OrderEntity::find().order_by_asc(order::Column::CreatedAt);
        if let Some(client_document) = filter.client_document {
            query = query.filter(order::Column::ClientDocument.eq(client_document));
        }
        if let Some(delivery_date) = filter.delivery_date {
            query = query.filter(order::Column::DeliveryDate.eq(delivery_date));
        }

        let orders = query.all(db).await.map_err(|e| {
            error!(error = %e, "Failed to list orders");
            ServiceError::DatabaseError(e)
        })?;

        let mut results = Vec::with_capacity(orders.len());
        for order_model in orders {
            results.push(load_related(db, order_model).await?);
        }

        info!(returned_count = results.len(), "Orders listed");

        Ok(results)
    }

    /// Deletes an order together with its items and delivery address, as one
    /// transaction. The cascade is explicit so it holds on stores without
    /// native cascade support. Not exposed over HTTP.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id).one(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to fetch order for deletion");
            ServiceError::DatabaseError(e)
        })?;

        let order = order.ok_or_else(|| {
            warn!(order_id = %order_id, "Order not found for deletion");
            ServiceError::NotFound(format!("Order with ID {} not found", order_id))
        })?;

        let address_id = order.delivery_address_id;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for order deletion");
            ServiceError::DatabaseError(e)
        })?;

        ItemEntity::delete_many()
            .filter(item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to delete order items");
                ServiceError::DatabaseError(e)
            })?;

        OrderEntity::delete_by_id(order_id)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to delete order");
                ServiceError::DatabaseError(e)
            })?;

        // The order row owns the FK, so the address goes last.
        if let Some(address_id) = address_id {
            AddressEntity::delete_by_id(address_id)
                .exec(&txn)
                .await
                .map_err(|e| {
                    error!(error = %e, address_id = %address_id, "Failed to delete delivery address");
                    ServiceError::DatabaseError(e)
                })?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order deletion transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, "Order deleted with items and delivery address");

        Ok(())
    }
}

/// Classifies an order insert failure. The duplicate pre-check cannot see a
/// concurrent transaction, so a race lands on the unique
/// (client_name, client_document, delivery_date) index; that is still a
/// duplicate submission, not a server fault.
fn classify_order_insert_error(e: DbErr) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::ValidationError(DUPLICATE_ORDER_MESSAGE.to_string())
        }
        _ => ServiceError::DatabaseError(e),
    }
}

/// Loads an order's delivery address and items. Items are returned in stable
/// insertion order.
async fn load_related<C: ConnectionTrait>(
    db: &C,
    order: OrderModel,
) -> Result<OrderDetails, ServiceError> {
    let delivery_address = match order.delivery_address_id {
        Some(address_id) => AddressEntity::find_by_id(address_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, address_id = %address_id, "Failed to fetch delivery address");
                ServiceError::DatabaseError(e)
            })?,
        None => None,
    };

    let items = ItemEntity::find()
        .filter(item::Column::OrderId.eq(order.id))
        .order_by_asc(item::Column::CreatedAt)
        .order_by_asc(item::Column::Id)
        .all(db)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to fetch order items");
            ServiceError::DatabaseError(e)
        })?;

    Ok(OrderDetails {
        order,
        delivery_address,
        items,
    })
}
