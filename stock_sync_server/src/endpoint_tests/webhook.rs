use actix_web::http::StatusCode;
use serde_json::{json, Value};
use stock_sync_engine::{db_types::SyncAction, InboundEventJournal};

use super::{
    helpers::{webhook_request, TestServer, WEBHOOK_SECRET},
    mocks::MockPlatform,
};

const TOPIC: &str = "inventory_levels/update";

fn level_body(item: u64, location: u64, available: i64) -> String {
    json!({
        "inventory_item_id": item,
        "location_id": location,
        "available": available,
        "updated_at": "2024-06-12T11:58:03-04:00"
    })
    .to_string()
}

#[actix_web::test]
async fn signed_webhook_updates_the_ledger_once() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "808950810", "905684977").await;
    let body = level_body(808950810, 905684977, 7);

    let req = webhook_request("evt_1", TOPIC, &body, Some(WEBHOOK_SECRET));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["outcome"]["outcome"], "applied");
    assert_eq!(res["outcome"]["results"][0]["product_id"], "P1");
    assert_eq!(res["outcome"]["results"][0]["new_stock"], 7);
    assert_eq!(server.product("P1").await.stock, 7);

    // Shopify redelivers the same webhook
    let req = webhook_request("evt_1", TOPIC, &body, Some(WEBHOOK_SECRET));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["outcome"]["outcome"], "duplicate");
    assert_eq!(res["outcome"]["event"]["success"], true);
    assert_eq!(server.product("P1").await.stock, 7);

    let log = server.log("P1").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, SyncAction::InboundUpdate);
    assert_eq!(log[0].change, -3);
    assert_eq!(log[0].stock_after, 7);
    assert_eq!(log[0].reference_id.as_deref(), Some("evt_1"));
    server.tear_down().await;
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "1", "2").await;
    let req = webhook_request("evt_nosig", TOPIC, &level_body(1, 2, 3), None);
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(res.contains("No HMAC signature"), "{res}");
    assert_eq!(server.product("P1").await.stock, 10);
    assert!(server.db.fetch_inbound_event("evt_nosig").await.unwrap().is_none());
    server.tear_down().await;
}

#[actix_web::test]
async fn invalid_signature_is_rejected() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "1", "2").await;
    let req = webhook_request("evt_forged", TOPIC, &level_body(1, 2, 0), Some("not-the-secret"));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(res.contains("signature is invalid"), "{res}");
    assert_eq!(server.product("P1").await.stock, 10);
    assert!(server.db.fetch_inbound_event("evt_forged").await.unwrap().is_none());
    server.tear_down().await;
}

#[actix_web::test]
async fn missing_topic_header_is_a_bad_request() {
    let server = TestServer::new().await;
    let body = level_body(1, 2, 3);
    let req = webhook_request("evt_2", TOPIC, &body, Some(WEBHOOK_SECRET));
    let req = req.insert_header(("X-Shopify-Topic", ""));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    // An empty topic passes the middleware's presence check but not the handler's
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = actix_web::test::TestRequest::post()
        .uri("/shopify/webhook/inventory")
        .insert_header(("X-Shopify-Webhook-Id", "evt_3"))
        .insert_header(("X-Shopify-Hmac-Sha256", "irrelevant"))
        .set_payload(body);
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("X-Shopify-Topic"), "{res}");
    server.tear_down().await;
}

#[actix_web::test]
async fn malformed_payload_is_not_recorded() {
    let server = TestServer::new().await;
    let body = json!({ "inventory_item_id": 1, "location_id": 2, "available": "plenty" }).to_string();
    let req = webhook_request("evt_bad", TOPIC, &body, Some(WEBHOOK_SECRET));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("malformed"), "{res}");
    assert!(server.db.fetch_inbound_event("evt_bad").await.unwrap().is_none());

    let req = webhook_request("evt_not_json", TOPIC, "available=7", Some(WEBHOOK_SECRET));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.tear_down().await;
}

#[actix_web::test]
async fn unsupported_topics_are_acknowledged_and_journalled() {
    let server = TestServer::new().await;
    let body = json!({ "id": 632910392, "title": "IPod Nano - 8GB" }).to_string();
    let req = webhook_request("evt_product", "products/update", &body, Some(WEBHOOK_SECRET));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["outcome"]["outcome"], "unsupported_topic");
    let event = server.db.fetch_inbound_event("evt_product").await.unwrap().expect("Event should be journalled");
    assert!(event.processed);
    assert_eq!(event.success, Some(false));
    assert_eq!(event.event_type, "products/update");
    server.tear_down().await;
}

#[actix_web::test]
async fn untracked_items_are_acknowledged_without_a_level() {
    let server = TestServer::new().await;
    server.seed("P1", 10, "808950810", "905684977").await;
    let body = json!({
        "inventory_item_id": 808950810,
        "location_id": 905684977,
        "available": null,
        "updated_at": "2024-06-12T11:58:03-04:00"
    })
    .to_string();
    let req = webhook_request("evt_untracked", TOPIC, &body, Some(WEBHOOK_SECRET));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["outcome"]["outcome"], "untracked");
    assert_eq!(res["outcome"]["external_item_ref"], "808950810");
    assert!(res["message"].as_str().unwrap().contains("not tracked"), "{res}");

    let event = server.db.fetch_inbound_event("evt_untracked").await.unwrap().expect("Event should be journalled");
    assert!(event.processed);
    assert_eq!(event.success, Some(false));
    let error = event.error_message.unwrap();
    assert_eq!(error, "item 808950810 is not tracked at location 905684977");
    assert_eq!(server.product("P1").await.stock, 10);
    assert!(server.log("P1").await.is_empty());
    server.tear_down().await;
}

#[actix_web::test]
async fn fan_out_to_all_linked_products() {
    let server = TestServer::new().await;
    server.seed("P1", 5, "44", "9").await;
    server.seed("P2", 8, "44", "9").await;
    server.seed("P3", 8, "45", "9").await;
    let body = json!({ "external_item_ref": "44", "external_location_ref": 9, "available": 12 }).to_string();
    let req = webhook_request("evt_fan", TOPIC, &body, Some(WEBHOOK_SECRET));
    let (status, res) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["outcome"]["results"].as_array().unwrap().len(), 2);
    assert_eq!(server.product("P1").await.stock, 12);
    assert_eq!(server.product("P2").await.stock, 12);
    assert_eq!(server.product("P3").await.stock, 8);
    server.tear_down().await;
}

#[actix_web::test]
async fn negative_levels_are_clamped() {
    let server = TestServer::new().await;
    server.seed("P1", 2, "1", "2").await;
    let req = webhook_request("evt_neg", TOPIC, &level_body(1, 2, -4), Some(WEBHOOK_SECRET));
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.product("P1").await.stock, 0);
    server.tear_down().await;
}

#[actix_web::test]
async fn signature_checks_can_be_disabled() {
    let mut server = TestServer::new().await;
    server.shopify.hmac_checks = false;
    server.seed("P1", 10, "1", "2").await;
    let req = webhook_request("evt_dev", TOPIC, &level_body(1, 2, 4), None);
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.product("P1").await.stock, 4);
    server.tear_down().await;
}

#[actix_web::test]
async fn whitelist_blocks_unknown_peers() {
    let mut server = TestServer::new().await;
    server.shopify.whitelist = Some(vec!["10.0.0.1".parse().unwrap()]);
    server.seed("P1", 10, "1", "2").await;
    let body = level_body(1, 2, 4);

    let req =
        webhook_request("evt_ip1", TOPIC, &body, Some(WEBHOOK_SECRET)).peer_addr("127.0.0.1:4000".parse().unwrap());
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(server.product("P1").await.stock, 10);

    let req =
        webhook_request("evt_ip2", TOPIC, &body, Some(WEBHOOK_SECRET)).peer_addr("10.0.0.1:4000".parse().unwrap());
    let (status, _) = server.send(MockPlatform::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.product("P1").await.stock, 4);
    server.tear_down().await;
}
