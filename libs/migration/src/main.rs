//! `cargo run -p migration -- up` applies pending migrations against
//! `DATABASE_URL`; `down`, `status`, `fresh` and `refresh` are also available.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
