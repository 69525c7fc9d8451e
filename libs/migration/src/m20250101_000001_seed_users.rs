use sea_orm_migration::prelude::*;

use crate::m20250101_000000_create_users::Users;

const SAMPLE_USERS: [(&str, &str, i32); 4] = [
    ("João Silva", "joao.silva@example.com", 30),
    ("Maria Santos", "maria.santos@example.com", 25),
    ("Pedro Oliveira", "pedro.oliveira@example.com", 35),
    ("Ana Costa", "ana.costa@example.com", 28),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(Users::Table)
            .columns([Users::Name, Users::Email, Users::Age])
            .on_conflict(OnConflict::column(Users::Email).do_nothing().to_owned());

        for (name, email, age) in SAMPLE_USERS {
            insert.values_panic([name.into(), email.into(), age.into()]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let emails = SAMPLE_USERS.map(|(_, email, _)| email);
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Users::Table)
                    .and_where(Expr::col(Users::Email).is_in(emails))
                    .to_owned(),
            )
            .await
    }
}
