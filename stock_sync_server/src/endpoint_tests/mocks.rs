use mockall::mock;
use stock_sync_engine::{
    traits::{AdjustmentRequest, AdjustmentResponse},
    ExternalLink,
    InventoryPlatform,
    PlatformError,
};

mock! {
    pub Platform {}
    impl InventoryPlatform for Platform {
        async fn adjust_available(&self, request: &AdjustmentRequest) -> Result<AdjustmentResponse, PlatformError>;
        async fn fetch_available(&self, link: &ExternalLink) -> Result<i64, PlatformError>;
    }
}
