use std::{sync::Arc, time::Duration};

use actix_web::{
    body::MessageBody,
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    App,
};
use log::debug;
use ssg_common::Secret;
use stock_sync_engine::{
    db_types::{ProductId, ProductInventory, SyncLogEntry},
    events::EventProducers,
    sync_objects::SyncOptions,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path, seed_linked_product},
    SqliteDatabase,
    StockLedger,
    StockSyncDatabase,
};

use super::mocks::MockPlatform;
use crate::{
    config::ShopifyConfig,
    helpers::calculate_hmac,
    server::{configure_api, shopify_scope},
    shopify_routes::{SHOPIFY_HMAC_HEADER, SHOPIFY_TOPIC_HEADER, SHOPIFY_WEBHOOK_ID_HEADER},
};

pub const WEBHOOK_SECRET: &str = "whsec_test_only_0123456789";

/// A throwaway SQLite ledger plus the Shopify settings the server is run with.
pub struct TestServer {
    pub db: SqliteDatabase,
    pub shopify: ShopifyConfig,
}

impl TestServer {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let shopify = ShopifyConfig {
            hmac_secret: Secret::new(WEBHOOK_SECRET.to_string()),
            hmac_checks: true,
            whitelist: None,
            ..Default::default()
        };
        Self { db, shopify }
    }

    pub async fn seed(&self, product_id: &str, stock: i64, item: &str, location: &str) {
        seed_linked_product(&self.db, product_id, stock, item, location).await;
    }

    pub async fn product(&self, product_id: &str) -> ProductInventory {
        self.db
            .fetch_product_inventory(&ProductId::from(product_id))
            .await
            .expect("Error fetching product")
            .expect("Product does not exist")
    }

    pub async fn log(&self, product_id: &str) -> Vec<SyncLogEntry> {
        self.db.fetch_sync_log(&ProductId::from(product_id), 100).await.expect("Error fetching sync log")
    }

    /// Sends the request through an app wired up exactly like the real server, with `platform` standing in for
    /// Shopify. Middleware errors are turned into responses the way actix does it on a live connection.
    pub async fn send(&self, platform: MockPlatform, req: TestRequest) -> (StatusCode, String) {
        let db = self.db.clone();
        let platform = Arc::new(platform);
        let app = App::new()
            .configure(|cfg| configure_api(cfg, db, platform, EventProducers::default(), test_options()))
            .service(shopify_scope::<SqliteDatabase>(&self.shopify, false, false));
        let service = test::init_service(app).await;
        debug!("Making request");
        match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = test::read_body(res).await;
                (status, String::from_utf8_lossy(&body).into_owned())
            },
            Err(e) => {
                let res = e.error_response();
                let status = res.status();
                let body = res.into_body().try_into_bytes().unwrap_or_default();
                (status, String::from_utf8_lossy(&body).into_owned())
            },
        }
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        self.db.close().await.expect("Error closing database");
        drop_database(&url).await;
    }
}

pub fn test_options() -> SyncOptions {
    SyncOptions { platform_timeout: Duration::from_millis(500), concurrency: 4 }
}

/// A webhook request. The body is signed with `secret` if one is given.
pub fn webhook_request(event_id: &str, topic: &str, body: &str, secret: Option<&str>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/shopify/webhook/inventory")
        .insert_header(ContentType::json())
        .insert_header((SHOPIFY_TOPIC_HEADER, topic))
        .insert_header((SHOPIFY_WEBHOOK_ID_HEADER, event_id))
        .set_payload(body.to_string());
    if let Some(secret) = secret {
        req = req.insert_header((SHOPIFY_HMAC_HEADER, calculate_hmac(secret, body.as_bytes())));
    }
    req
}

pub fn json_request(req: TestRequest, body: serde_json::Value) -> TestRequest {
    req.insert_header(ContentType::json()).set_payload(body.to_string())
}
