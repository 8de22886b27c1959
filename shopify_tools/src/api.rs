use std::sync::Arc;

use graphql_parser::parse_query;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::ShopifyConfig,
    data_objects::{InventoryAdjustQuantitiesResponse, InventoryAdjustment, InventoryItemResponse},
    helpers::{inventory_item_gid, location_gid},
    ShopifyApiError,
};

/// The inventory state that the gateway mirrors. Shopify tracks several named quantities per level; only
/// `available` is sellable.
const AVAILABLE: &str = "available";

const ADJUST_QUANTITIES_MUTATION: &str = r#"
mutation inventoryAdjustQuantities($input: InventoryAdjustQuantitiesInput!) {
  inventoryAdjustQuantities(input: $input) {
    inventoryAdjustmentGroup { reason referenceDocumentUri changes { name delta quantityAfterChange } }
    userErrors { field message code }
  }
}"#;

const INVENTORY_LEVEL_QUERY: &str = r#"
query inventoryLevel($item: ID!, $location: ID!) {
  inventoryItem(id: $item) {
    id
    inventoryLevel(locationId: $location) { id quantities(names: ["available"]) { name quantity } }
  }
}"#;

#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.admin_access_token.reveal().as_str())
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        headers.insert("X-Shopify-Access-Token", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn shop(&self) -> &str {
        self.config.shop.as_str()
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, ShopifyApiError> {
        let url = self.url(path);
        trace!("🛍️️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ShopifyApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🛍️️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }

    pub async fn graphql_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ShopifyApiError> {
        let query = parse_query::<String>(query).map_err(|e| ShopifyApiError::InvalidGraphQL(e.to_string()))?;
        let mut body = serde_json::json!({
            "query": query.to_string(),
        });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        trace!("🛍️️ Sending GraphQL query: {body}");
        let result = self.rest_query::<Value, Value>(Method::POST, "/graphql.json", &[], Some(body)).await?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::GraphQLError(e));
        }
        let data = result["data"].clone();
        trace!("🛍️️ GraphQL response: {data}");
        trace!("🛍️️ GraphQL costs: {}", result["extensions"]["cost"]);
        if data.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        serde_json::from_value(data).map_err(|e| ShopifyApiError::JsonError(e.to_string()))
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://{}/admin/api/{}{path}", self.config.shop, self.config.api_version)
    }

    /// Fetches the `available` quantity of `inventory_item` at `location`. Either argument may be a numeric REST id
    /// or a GraphQL global id.
    pub async fn fetch_available(&self, inventory_item: &str, location: &str) -> Result<i64, ShopifyApiError> {
        let item = inventory_item_gid(inventory_item);
        let location = location_gid(location);
        let variables = serde_json::json!({ "item": item, "location": location });
        debug!("🛍️️ Fetching available quantity for {item} at {location}");
        let response = self.graphql_query::<InventoryItemResponse>(INVENTORY_LEVEL_QUERY, Some(variables)).await?;
        let level = response
            .inventory_item
            .ok_or_else(|| ShopifyApiError::NotFound(format!("inventory item {item}")))?
            .inventory_level
            .ok_or_else(|| ShopifyApiError::NotFound(format!("inventory level for {item} at {location}")))?;
        let available = level
            .available()
            .ok_or_else(|| ShopifyApiError::NotFound(format!("'{AVAILABLE}' quantity for {item} at {location}")))?;
        trace!("🛍️️ {item} at {location} has {available} available");
        Ok(available)
    }

    /// Applies `delta` to the `available` quantity of `inventory_item` at `location`.
    ///
    /// `reason` must be one of Shopify's inventory adjustment reason codes (e.g. `correction`, `restock`). The
    /// optional `reference_document_uri` ties the adjustment to the document that caused it, such as an invoice.
    pub async fn adjust_available(
        &self,
        inventory_item: &str,
        location: &str,
        delta: i64,
        reason: &str,
        reference_document_uri: Option<&str>,
    ) -> Result<InventoryAdjustment, ShopifyApiError> {
        let item = inventory_item_gid(inventory_item);
        let location = location_gid(location);
        let mut input = serde_json::json!({
            "reason": reason,
            "name": AVAILABLE,
            "changes": [ { "delta": delta, "inventoryItemId": item, "locationId": location } ],
        });
        if let Some(uri) = reference_document_uri {
            input["referenceDocumentUri"] = Value::from(uri);
        }
        debug!("🛍️️ Adjusting {item} at {location} by {delta} ({reason})");
        let response = self
            .graphql_query::<InventoryAdjustQuantitiesResponse>(
                ADJUST_QUANTITIES_MUTATION,
                Some(serde_json::json!({ "input": input })),
            )
            .await?
            .inventory_adjust_quantities;
        if !response.user_errors.is_empty() {
            let e = response.user_errors.iter().map(|e| e.message.as_str()).collect::<Vec<&str>>().join(", ");
            warn!("🛍️️ Adjustment of {item} at {location} was rejected. {e}");
            return Err(ShopifyApiError::UserErrors(e));
        }
        let group = response.inventory_adjustment_group.ok_or(ShopifyApiError::EmptyResponse)?;
        let quantity_after_change =
            group.changes.iter().find(|c| c.name == AVAILABLE).and_then(|c| c.quantity_after_change);
        info!("🛍️️ Adjusted {item} at {location} by {delta}. Available after change: {quantity_after_change:?}");
        Ok(InventoryAdjustment { inventory_item_id: item, location_id: location, delta, quantity_after_change })
    }
}
