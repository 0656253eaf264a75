use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== USERS ==========
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::UserId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::PhoneNo)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Address).text().not_null())
                    .col(ColumnDef::new(Users::Password).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== MACHINES ==========
        manager
            .create_table(
                Table::create()
                    .table(Machines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Machines::MachineId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Machines::UserId).integer().not_null())
                    .col(ColumnDef::new(Machines::MachineName).string_len(100).not_null())
                    .col(ColumnDef::new(Machines::SerialNumber).string_len(100))
                    .col(ColumnDef::new(Machines::Location).string_len(255))
                    .col(
                        ColumnDef::new(Machines::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_machines_user_id")
                            .col(Machines::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_machines_user")
                            .from(Machines::Table, Machines::UserId)
                            .to(Users::Table, Users::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== CYLINDERS ==========
        // No cascade: a machine cannot be deleted while a cylinder points at it.
        manager
            .create_table(
                Table::create()
                    .table(Cylinders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cylinders::CylinderId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cylinders::MachineId).integer().not_null())
                    .col(ColumnDef::new(Cylinders::GasWeight).double().not_null())
                    .col(ColumnDef::new(Cylinders::ReplacedDate).date().not_null())
                    .index(
                        Index::create()
                            .name("idx_cylinders_machine_id")
                            .col(Cylinders::MachineId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cylinders_machine")
                            .from(Cylinders::Table, Cylinders::MachineId)
                            .to(Machines::Table, Machines::MachineId),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== SENSOR DATA (append-only log) ==========
        // machine_id holds the Firebase node key, which is opaque text.
        manager
            .create_table(
                Table::create()
                    .table(SensorData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SensorData::SensorId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SensorData::MachineId).string_len(64).not_null())
                    .col(ColumnDef::new(SensorData::CurrentWeight).double())
                    .col(ColumnDef::new(SensorData::GasContentWeight).double())
                    .col(
                        ColumnDef::new(SensorData::GasLeakDetected)
                            .tiny_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SensorData::TareWeight).double())
                    .col(ColumnDef::new(SensorData::RecordedAt).timestamp().not_null())
                    .index(
                        Index::create()
                            .name("idx_sensor_data_machine_time")
                            .col(SensorData::MachineId)
                            .col(SensorData::RecordedAt),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SensorData::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cylinders::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Machines::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    UserId,
    Name,
    Email,
    PhoneNo,
    Address,
    Password,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Machines {
    Table,
    MachineId,
    UserId,
    MachineName,
    SerialNumber,
    Location,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Cylinders {
    Table,
    CylinderId,
    MachineId,
    GasWeight,
    ReplacedDate,
}

#[derive(DeriveIden)]
pub enum SensorData {
    Table,
    SensorId,
    MachineId,
    CurrentWeight,
    GasContentWeight,
    GasLeakDetected,
    TareWeight,
    RecordedAt,
}
