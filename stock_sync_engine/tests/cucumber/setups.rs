use cucumber::given;
use stock_sync_engine::test_utils::prepare_env::seed_linked_product;

use crate::cucumber::{stock_world::StockSyncSystem, StockWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut StockWorld) {
    let system = StockSyncSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "product '{word}' with {int} units linked to item '{word}' at location '{word}'")]
async fn linked_product(world: &mut StockWorld, product_id: String, stock: i64, item: String, location: String) {
    seed_linked_product(world.db(), &product_id, stock, &item, &location).await;
    world.platform().set_level(&item, &location, stock);
}
