use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_freight_tables::Migration),
            Box::new(m20240301_000002_create_courier_tables::Migration),
        ]
    }
}

/// Money and volume columns. SQLite caps decimal precision at 16.
fn amount(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).decimal_len(16, 4).not_null().to_owned()
}

fn optional_amount(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).decimal_len(16, 4).null().to_owned()
}

mod m20240301_000001_create_freight_tables {
    use super::{amount, optional_amount};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_freight_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Containers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Containers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Containers::ContainerNumber).string().not_null())
                        .col(ColumnDef::new(Containers::ContainerName).string().null())
                        .col(ColumnDef::new(Containers::ContainerType).string().not_null())
                        .col(ColumnDef::new(Containers::Destination).string().null())
                        .col(amount(Containers::TotalVolume))
                        .col(amount(Containers::Price))
                        .col(ColumnDef::new(Containers::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Containers::Priority)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Containers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Containers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Clients::Name).string().not_null())
                        .col(ColumnDef::new(Clients::Mark).string().not_null())
                        .col(ColumnDef::new(Clients::Phone).string().null())
                        .col(
                            ColumnDef::new(Clients::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::ContainerId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::GoodsType).string_len(32).not_null())
                        .col(ColumnDef::new(Shipments::PricingMode).string_len(32).not_null())
                        .col(amount(Shipments::Volume))
                        .col(amount(Shipments::Price))
                        .col(amount(Shipments::ExtraCharge))
                        .col(optional_amount(Shipments::Tonnage))
                        .col(optional_amount(Shipments::PricePerTonne))
                        .col(optional_amount(Shipments::VolumeVide))
                        .col(optional_amount(Shipments::VolumeUsed))
                        .col(ColumnDef::new(Shipments::PaymentStatus).string_len(32).not_null())
                        .col(amount(Shipments::PaidAmount))
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_container")
                                .from(Shipments::Table, Shipments::ContainerId)
                                .to(Containers::Table, Containers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_client")
                                .from(Shipments::Table, Shipments::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_container_id")
                        .table(Shipments::Table)
                        .col(Shipments::ContainerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_client_id")
                        .table(Shipments::Table)
                        .col(Shipments::ClientId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Products::Reference).string().not_null())
                        .col(ColumnDef::new(Products::GoodsType).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(amount(Products::Length))
                        .col(amount(Products::Width))
                        .col(amount(Products::Height))
                        .col(optional_amount(Products::Tonnage))
                        .col(optional_amount(Products::VolumeVide))
                        .col(optional_amount(Products::VolumeUsed))
                        .col(amount(Products::Volume))
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_client")
                                .from(Products::Table, Products::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_client_id")
                        .table(Products::Table)
                        .col(Products::ClientId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Containers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Containers {
        Table,
        Id,
        ContainerNumber,
        ContainerName,
        ContainerType,
        Destination,
        TotalVolume,
        Price,
        Status,
        Priority,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
        Name,
        Mark,
        Phone,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Shipments {
        Table,
        Id,
        ClientId,
        ContainerId,
        GoodsType,
        PricingMode,
        Volume,
        Price,
        ExtraCharge,
        Tonnage,
        PricePerTonne,
        VolumeVide,
        VolumeUsed,
        PaymentStatus,
        PaidAmount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        ClientId,
        Reference,
        GoodsType,
        Quantity,
        Length,
        Width,
        Height,
        Tonnage,
        VolumeVide,
        VolumeUsed,
        Volume,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_courier_tables {
    use super::{amount, optional_amount};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_courier_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Couriers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Couriers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Couriers::Reference).string().not_null())
                        .col(ColumnDef::new(Couriers::Date).date().not_null())
                        .col(
                            ColumnDef::new(Couriers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CourierItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CourierItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(CourierItems::CourierId).uuid().not_null())
                        .col(ColumnDef::new(CourierItems::SenderName).string().not_null())
                        .col(ColumnDef::new(CourierItems::ReceiverName).string().not_null())
                        .col(amount(CourierItems::Amount))
                        .col(amount(CourierItems::Service))
                        .col(optional_amount(CourierItems::ExchangeRate))
                        .col(
                            ColumnDef::new(CourierItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_courier_items_courier")
                                .from(CourierItems::Table, CourierItems::CourierId)
                                .to(Couriers::Table, Couriers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Billetages::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Billetages::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Billetages::CourierId).uuid().null())
                        .col(ColumnDef::new(Billetages::Notes).text().null())
                        .col(
                            ColumnDef::new(Billetages::ReportingCurrency)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Billetages::Counts).json().not_null())
                        .col(ColumnDef::new(Billetages::ExchangeRates).json().not_null())
                        .col(amount(Billetages::TotalCounted))
                        .col(amount(Billetages::ExpectedAmount))
                        .col(amount(Billetages::Difference))
                        .col(
                            ColumnDef::new(Billetages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Billetages::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_billetages_courier")
                                .from(Billetages::Table, Billetages::CourierId)
                                .to(Couriers::Table, Couriers::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Billetages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CourierItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Couriers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Couriers {
        Table,
        Id,
        Reference,
        Date,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CourierItems {
        Table,
        Id,
        CourierId,
        SenderName,
        ReceiverName,
        Amount,
        Service,
        ExchangeRate,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Billetages {
        Table,
        Id,
        CourierId,
        Notes,
        ReportingCurrency,
        Counts,
        ExchangeRates,
        TotalCounted,
        ExpectedAmount,
        Difference,
        CreatedAt,
        UpdatedAt,
    }
}
