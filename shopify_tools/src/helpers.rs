//! Shopify identifies objects by numeric REST ids in webhooks and by global ids (`gid://shopify/Type/123`) in the
//! GraphQL API. The gateway stores whatever the webhook sent, so these helpers build the global ids the GraphQL API expects.

const GID_PREFIX: &str = "gid://shopify/";

/// Returns `reference` as a GraphQL global id of the given `kind`. References that are already global ids are
/// passed through untouched.
pub fn to_gid(kind: &str, reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("gid://") {
        reference.to_string()
    } else {
        format!("{GID_PREFIX}{kind}/{reference}")
    }
}

pub fn inventory_item_gid(reference: &str) -> String {
    to_gid("InventoryItem", reference)
}

pub fn location_gid(reference: &str) -> String {
    to_gid("Location", reference)
}
