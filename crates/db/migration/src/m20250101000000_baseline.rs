use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Foreign keys are RESTRICT. Subtree removal belongs to the hierarchy
// manager; the schema only refuses to orphan rows.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Workspaces::Table)
                    .col(pk_id_col(manager, Workspaces::Id))
                    .col(uuid_col(Workspaces::Uuid))
                    .col(ColumnDef::new(Workspaces::Title).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Workspaces::Icon)
                            .string_len(10)
                            .not_null()
                            .default(Expr::val("💼")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_workspaces_uuid")
                    .table(Workspaces::Table)
                    .col(Workspaces::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Boards::Table)
                    .col(pk_id_col(manager, Boards::Id))
                    .col(uuid_col(Boards::Uuid))
                    .col(ColumnDef::new(Boards::Title).string_len(50).not_null())
                    .col(ColumnDef::new(Boards::Description).text())
                    .col(fk_id_col(manager, Boards::WorkspaceId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boards_workspace_id")
                            .from(Boards::Table, Boards::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_boards_uuid")
                    .table(Boards::Table)
                    .col(Boards::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_boards_workspace_id")
                    .table(Boards::Table)
                    .col(Boards::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Columns::Table)
                    .col(pk_id_col(manager, Columns::Id))
                    .col(uuid_col(Columns::Uuid))
                    .col(ColumnDef::new(Columns::Title).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Columns::OrderIndex)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(fk_id_col(manager, Columns::BoardId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_columns_board_id")
                            .from(Columns::Table, Columns::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_columns_uuid")
                    .table(Columns::Table)
                    .col(Columns::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_columns_board_id_order_index")
                    .table(Columns::Table)
                    .col(Columns::BoardId)
                    .col(Columns::OrderIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(ColumnDef::new(Tasks::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(ColumnDef::new(Tasks::StartDate).date())
                    .col(ColumnDef::new(Tasks::DueDate).date())
                    .col(fk_id_col(manager, Tasks::ColumnId))
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_column_id")
                            .from(Tasks::Table, Tasks::ColumnId)
                            .to(Columns::Table, Columns::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_column_id")
                    .table(Tasks::Table)
                    .col(Tasks::ColumnId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_title")
                    .table(Tasks::Table)
                    .col(Tasks::Title)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Columns::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boards::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Workspaces {
    Table,
    Id,
    Uuid,
    Title,
    Icon,
}

#[derive(Iden)]
enum Boards {
    Table,
    Id,
    Uuid,
    Title,
    Description,
    WorkspaceId,
}

#[derive(Iden)]
enum Columns {
    Table,
    Id,
    Uuid,
    Title,
    OrderIndex,
    BoardId,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    Title,
    Description,
    StartDate,
    DueDate,
    ColumnId,
    CreatedAt,
    UpdatedAt,
}
