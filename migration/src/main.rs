use lingkod_common::database;

use crate::settings::Settings;

mod settings;
mod tables;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    let database = database::connect(&settings.database).await?;
    println!("Connected to DB");

    // create the workflow schema and tables in one transaction
    let statements = tables::ddl_statements(database.schema());
    database
        .execute_in_transaction(statements, "schema migration")
        .await?;
    println!("Schema migrated");

    Ok(())
}
