use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use stock_sync_engine::{
    db_types::{ProductId, SyncAction, SyncSource},
    traits::{AdjustmentReason, AdjustmentResponse},
    PlatformError,
};

use super::{
    helpers::{json_request, TestServer},
    mocks::MockPlatform,
};

#[actix_web::test]
async fn stock_check_uses_the_ledger_only() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "1", "2").await;
    let req = json_request(
        TestRequest::post().uri("/api/stock/check"),
        json!({ "products": [
            { "product_id": "P1", "requested_quantity": 3 },
            { "product_id": "P1", "requested_quantity": 20 },
            { "product_id": "NOPE", "requested_quantity": 1 }
        ]}),
    );
    // No expectations are set, so any platform call would panic
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    let items = res["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["sufficient"], true);
    assert_eq!(items[0]["available"], 10);
    assert_eq!(items[1]["sufficient"], false);
    assert_eq!(items[1]["requested"], 20);
    assert_eq!(items[2]["sufficient"], false);
    assert_eq!(items[2]["available"], 0);
    assert_eq!(items[2]["error"], "product not found");
    server.tear_down().await;
}

#[actix_web::test]
async fn deduct_reports_each_item_in_order() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "X1", "L1").await;
    server.seed("P2", 5, "X2", "L1").await;

    let mut platform = MockPlatform::new();
    platform
        .expect_adjust_available()
        .withf(|r| r.link.item_ref == "X1")
        .times(1)
        .returning(|r| {
            assert_eq!(r.delta, -2);
            assert_eq!(r.reason, AdjustmentReason::Sale);
            assert_eq!(r.reference_id.as_deref(), Some("INV-1"));
            Ok(AdjustmentResponse { new_quantity: Some(8) })
        });
    platform
        .expect_adjust_available()
        .withf(|r| r.link.item_ref == "X2")
        .times(1)
        .returning(|_| Err(PlatformError::Rejected("Quantity is too low".into())));

    let req = json_request(
        TestRequest::post().uri("/api/stock/deduct"),
        json!({
            "products": [{ "product_id": "P1", "quantity": 2 }, { "product_id": "P2", "quantity": 1 }],
            "reference_id": "INV-1"
        }),
    );
    let (status, res) = server.send(platform, req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], false);
    let results = res["results"].as_array().unwrap();
    assert_eq!(results[0]["product_id"], "P1");
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[0]["new_quantity"], 8);
    assert_eq!(results[1]["product_id"], "P2");
    assert_eq!(results[1]["success"], false);
    assert!(results[1]["error"].as_str().unwrap().contains("Quantity is too low"));

    // The ledger waits for the platform to report the new level
    assert_eq!(server.product("P1").await.stock, 10);
    let log = server.log("P1").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, SyncAction::Deduct);
    assert_eq!(log[0].source, SyncSource::InvoiceCreated);
    assert_eq!(log[0].change, -2);
    assert_eq!(log[0].stock_after, 8);
    assert_eq!(log[0].reference_id.as_deref(), Some("INV-1"));
    assert_eq!(log[0].reference_type.as_deref(), Some("invoice"));

    let p2 = server.product("P2").await;
    assert_eq!(p2.stock, 5);
    assert!(p2.sync_error.unwrap().contains("Quantity is too low"));
    assert!(server.log("P2").await.is_empty());
    server.tear_down().await;
}

#[actix_web::test]
async fn deduct_without_products_is_a_bad_request() {
    let server = TestServer::new().await;
    let req = json_request(TestRequest::post().uri("/api/stock/deduct"), json!({ "products": [] }));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("At least one product"), "{res}");

    let req = json_request(TestRequest::post().uri("/api/stock/deduct"), json!({ "reference_id": "INV-2" }));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.tear_down().await;
}

#[actix_web::test]
async fn deduct_skips_products_that_cannot_sync() {
    let server = TestServer::new().await;
    server.db.insert_product(&ProductId::from("UNLINKED"), 4).await.unwrap();
    let req = json_request(
        TestRequest::post().uri("/api/stock/deduct"),
        json!({ "products": [
            { "product_id": "NOPE", "quantity": 1 },
            { "product_id": "UNLINKED", "quantity": 1 }
        ]}),
    );
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], false);
    assert!(res["results"][0]["error"].as_str().unwrap().contains("product not found"));
    assert!(res["results"][1]["error"].as_str().unwrap().contains("not linked"));
    assert!(server.product("UNLINKED").await.sync_error.is_some());
    server.tear_down().await;
}

#[actix_web::test]
async fn restore_returns_stock_to_the_platform() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "X1", "L1").await;
    let mut platform = MockPlatform::new();
    platform
        .expect_adjust_available()
        .withf(|r| {
            r.delta == 2 && r.reason == AdjustmentReason::Cancellation && r.reference_id.as_deref() == Some("INV-9")
        })
        .times(1)
        .returning(|_| Ok(AdjustmentResponse { new_quantity: None }));
    let req = json_request(
        TestRequest::post().uri("/api/stock/restore"),
        json!({
            "products": [{ "product_id": "P1", "quantity": 2 }],
            "reference_id": "INV-9",
            "created_by": "billing"
        }),
    );
    let (status, res) = server.send(platform, req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], true);
    assert!(res["results"][0].get("new_quantity").is_none());

    let log = server.log("P1").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, SyncAction::Restore);
    assert_eq!(log[0].source, SyncSource::InvoiceVoided);
    assert_eq!(log[0].change, 2);
    // Without a reported quantity the ledger value is recorded
    assert_eq!(log[0].stock_after, 10);
    assert_eq!(log[0].created_by, "billing");
    server.tear_down().await;
}

#[actix_web::test]
async fn non_positive_quantities_fail_per_item() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "X1", "L1").await;
    let req = json_request(
        TestRequest::post().uri("/api/stock/restore"),
        json!({ "products": [{ "product_id": "P1", "quantity": 0 }] }),
    );
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["results"][0]["success"], false);
    assert!(res["results"][0]["error"].as_str().unwrap().contains("must be positive"));
    server.tear_down().await;
}
