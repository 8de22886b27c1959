use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{db_types::ProductId, traits::StockLedger, ExternalLink, SqliteDatabase};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A fresh database file in the system temp directory, so that tests never share state.
pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("ssg_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

pub async fn drop_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
}

/// Creates a product with the given stock and links it to `item` at `location` with sync enabled.
pub async fn seed_linked_product(db: &SqliteDatabase, product_id: &str, stock: i64, item: &str, location: &str) {
    let product_id = ProductId::from(product_id);
    db.insert_product(&product_id, stock).await.expect("Error seeding product");
    db.link_product(&product_id, &ExternalLink::new(item, location), true).await.expect("Error linking product");
}
