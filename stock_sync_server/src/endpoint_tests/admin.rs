use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use stock_sync_engine::{
    db_types::{ProductId, SyncAction, SyncContext, SyncSource},
    PlatformError,
    StockLedger,
};

use super::{
    helpers::{json_request, webhook_request, TestServer, WEBHOOK_SECRET},
    mocks::MockPlatform,
};

#[actix_web::test]
async fn link_and_fetch_a_product() {
    let server = TestServer::new().await;
    let req = json_request(
        TestRequest::put().uri("/api/inventory/P9/link"),
        json!({
            "external_item_ref": "111",
            "external_variant_ref": "v-1",
            "external_location_ref": "222",
            "sync_enabled": true
        }),
    );
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["product_id"], "P9");
    assert_eq!(res["stock"], 0);
    assert_eq!(res["sync_enabled"], true);
    assert_eq!(res["external_variant_ref"], "v-1");

    let req = TestRequest::get().uri("/api/inventory/P9");
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["external_item_ref"], "111");
    assert_eq!(res["external_location_ref"], "222");

    let req = TestRequest::get().uri("/api/inventory/NOPE");
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(res.contains("NOPE"), "{res}");
    server.tear_down().await;
}

#[actix_web::test]
async fn link_requires_both_refs() {
    let server = TestServer::new().await;
    let req = json_request(
        TestRequest::put().uri("/api/inventory/P9/link"),
        json!({ "external_item_ref": " ", "external_location_ref": "222" }),
    );
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.tear_down().await;
}

#[actix_web::test]
async fn toggling_sync() {
    let server = TestServer::new().await;
    server.seed("P1", 3, "1", "2").await;
    server.db.insert_product(&ProductId::from("LOCAL"), 7).await.unwrap();

    let req = json_request(TestRequest::post().uri("/api/inventory/P1/sync"), json!({ "enabled": false }));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["sync_enabled"], false);

    // A product with no external link can never be synced
    let req = json_request(TestRequest::post().uri("/api/inventory/LOCAL/sync"), json!({ "enabled": true }));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!server.product("LOCAL").await.sync_enabled);

    let req = json_request(TestRequest::post().uri("/api/inventory/NOPE/sync"), json!({ "enabled": true }));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    server.tear_down().await;
}

#[actix_web::test]
async fn sync_log_is_newest_first() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "1", "2").await;
    let context = SyncContext::reconcile(SyncSource::Manual);
    let product_id = ProductId::from("P1");
    for level in [5, 6, 7] {
        server.db.apply_stock_level(&product_id, level, &context).await.unwrap();
    }

    let (status, res) = server.send(MockPlatform::new(), TestRequest::get().uri("/api/inventory/P1/log?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let entries: Value = serde_json::from_str(&res).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["stock_after"], 7);
    assert_eq!(entries[1]["stock_after"], 6);

    let (_, res) = server.send(MockPlatform::new(), TestRequest::get().uri("/api/inventory/P1/log")).await;
    let entries: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 3);
    assert_eq!(entries[2]["change"], -5);

    let (status, _) = server.send(MockPlatform::new(), TestRequest::get().uri("/api/inventory/NOPE/log")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    server.tear_down().await;
}

#[actix_web::test]
async fn resync_corrects_drift() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "A", "L").await;
    let mut platform = MockPlatform::new();
    platform.expect_fetch_available().withf(|link| link.item_ref == "A").times(1).returning(|_| Ok(4));
    let (status, res) = server.send(platform, TestRequest::post().uri("/api/inventory/P1/resync")).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["status"], "corrected");
    assert_eq!(res["old_stock"], 10);
    assert_eq!(res["new_stock"], 4);

    assert_eq!(server.product("P1").await.stock, 4);
    let log = server.log("P1").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, SyncAction::Reconcile);
    assert_eq!(log[0].source, SyncSource::Manual);
    assert_eq!(log[0].change, -6);
    server.tear_down().await;
}

#[actix_web::test]
async fn resync_failures() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "A", "L").await;
    server.db.insert_product(&ProductId::from("LOCAL"), 7).await.unwrap();

    let mut platform = MockPlatform::new();
    platform.expect_fetch_available().returning(|_| Err(PlatformError::Unavailable("HTTP 503".into())));
    let (status, res) = server.send(platform, TestRequest::post().uri("/api/inventory/P1/resync")).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["status"], "failed");
    let p1 = server.product("P1").await;
    assert_eq!(p1.stock, 10);
    assert!(p1.sync_error.unwrap().contains("HTTP 503"));

    let (status, _) = server.send(MockPlatform::new(), TestRequest::post().uri("/api/inventory/LOCAL/resync")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = server.send(MockPlatform::new(), TestRequest::post().uri("/api/inventory/NOPE/resync")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    server.tear_down().await;
}

#[actix_web::test]
async fn manual_sweep_reports_corrections() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "A", "L").await;
    server.seed("P2", 3, "A", "L").await;
    server.seed("P3", 5, "B", "L").await;
    let mut platform = MockPlatform::new();
    // P1 and P2 share an item, which is only queried once
    platform.expect_fetch_available().withf(|link| link.item_ref == "A").times(1).returning(|_| Ok(7));
    platform.expect_fetch_available().withf(|link| link.item_ref == "B").times(1).returning(|_| Ok(5));

    let (status, res) = server.send(platform, TestRequest::post().uri("/api/reconcile")).await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(report["checked"], 3);
    assert_eq!(report["unchanged"], 1);
    assert_eq!(report["corrected"].as_array().unwrap().len(), 2);
    assert!(report["failed"].as_array().unwrap().is_empty());
    assert_eq!(server.product("P1").await.stock, 7);
    assert_eq!(server.product("P2").await.stock, 7);
    assert_eq!(server.product("P3").await.stock, 5);
    assert_eq!(server.log("P2").await[0].source, SyncSource::Manual);
    server.tear_down().await;
}

#[actix_web::test]
async fn inbound_events_can_be_inspected() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "1", "2").await;
    let body = json!({ "external_item_ref": "1", "external_location_ref": "2", "available": 9 }).to_string();
    let req = webhook_request("evt_audit", "inventory_levels/update", &body, Some(WEBHOOK_SECRET));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, res) = server.send(MockPlatform::new(), TestRequest::get().uri("/api/events/evt_audit")).await;
    assert_eq!(status, StatusCode::OK);
    let event: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(event["event_id"], "evt_audit");
    assert_eq!(event["processed"], true);
    assert_eq!(event["success"], true);
    assert_eq!(event["raw_payload"]["available"], 9);

    let (status, _) = server.send(MockPlatform::new(), TestRequest::get().uri("/api/events/evt_missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    server.tear_down().await;
}
