use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_delivery_addresses_table::Migration),
            Box::new(m20240101_000002_create_orders_table::Migration),
            Box::new(m20240101_000003_create_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_delivery_addresses_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_delivery_addresses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create delivery_addresses table aligned with entities::delivery_address Model
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryAddresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryAddresses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAddresses::StreetName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryAddresses::Number).string().not_null())
                        .col(ColumnDef::new(DeliveryAddresses::Complement).string().null())
                        .col(
                            ColumnDef::new(DeliveryAddresses::ReferencePoint)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAddresses::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryAddresses::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryAddresses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DeliveryAddresses {
        Table,
        Id,
        StreetName,
        Number,
        Complement,
        ReferencePoint,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_orders_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_delivery_addresses_table::DeliveryAddresses;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::ClientName).string().not_null())
                        .col(
                            ColumnDef::new(Orders::ClientDocument)
                                .string_len(14)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::DeliveryDate).date().not_null())
                        .col(
                            ColumnDef::new(Orders::DeliveryAddressId)
                                .uuid()
                                .null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_delivery_address_id")
                                .from(Orders::Table, Orders::DeliveryAddressId)
                                .to(DeliveryAddresses::Table, DeliveryAddresses::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Backs the duplicate-submission invariant
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_orders_client_name_document_delivery_date")
                        .table(Orders::Table)
                        .col(Orders::ClientName)
                        .col(Orders::ClientDocument)
                        .col(Orders::DeliveryDate)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_client_document")
                        .table(Orders::Table)
                        .col(Orders::ClientDocument)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_delivery_date")
                        .table(Orders::Table)
                        .col(Orders::DeliveryDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        ClientName,
        ClientDocument,
        DeliveryDate,
        DeliveryAddressId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000002_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create items table aligned with entities::item Model
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(Items::UnitPrice)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Items::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_order_id")
                                .from(Items::Table, Items::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_order_id")
                        .table(Items::Table)
                        .col(Items::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Items {
        Table,
        Id,
        OrderId,
        Name,
        Quantity,
        UnitPrice,
        CreatedAt,
        UpdatedAt,
    }
}
