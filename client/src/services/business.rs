use crate::{client::join, Client, Result};
use maffisol_types::{
    api::{BusinessAction, PlayerProfile},
    Identity,
};
use reqwest::Method;

impl Client {
    /// Runs a business action and returns the updated profile.
    pub async fn business_action(
        &self,
        action: BusinessAction,
        wallet: &Identity,
    ) -> Result<PlayerProfile> {
        let url = join(&self.endpoints.business, &[action.as_str(), wallet.as_str()])?;
        self.bodiless_json(Method::PUT, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::serve_router;
    use axum::{extract::Path, routing::put, Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn test_business_action_path() {
        let router = Router::new().route(
            "/api/business/:action/:wallet",
            put(|Path((action, wallet)): Path<(String, String)>| async move {
                assert_eq!(action, "buyHalfKilo");
                assert_eq!(wallet, "w1");
                Json(json!({"username": "vito", "money": 50, "halfKilos": 1}))
            }),
        );
        let (base_url, handle) = serve_router(router).await;
        let client = crate::Client::for_origin(&base_url).unwrap();

        let profile = client
            .business_action(BusinessAction::BuyHalfKilo, &Identity::new("w1").unwrap())
            .await
            .unwrap();
        assert_eq!(profile.half_kilos, 1);
        assert_eq!(profile.money, 50);

        handle.abort();
    }
}
