use crate::{client::join, Client, Result};
use chrono::{DateTime, Utc};
use maffisol_types::{
    api::{
        AddItemRequest, Inventory, MinigameKind, MinigameLog, MinigameResult, PlayerProfile,
        PlayerSummary, RegisterRequest, RewardItem, SellItemRequest,
    },
    Identity,
};
use reqwest::Method;
use serde_json::json;
use tracing::debug;

impl Client {
    /// Looks up the player behind `wallet`. `None` means the wallet has no
    /// registered username yet.
    pub async fn login(&self, wallet: &Identity) -> Result<Option<PlayerProfile>> {
        let url = join(&self.endpoints.player, &["login"])?;
        let body = RegisterRequest {
            wallet_address: wallet.to_string(),
            username: None,
        };
        match self.post_json::<_, PlayerProfile>(url, &body).await {
            Ok(profile) if profile.username.is_empty() => Ok(None),
            Ok(profile) => Ok(Some(profile)),
            Err(err) if err.is_not_found() => {
                debug!(identity = %wallet, "wallet not registered");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn register(&self, wallet: &Identity, username: &str) -> Result<PlayerProfile> {
        let url = join(&self.endpoints.player, &["register"])?;
        self.post_json(url, &registration(wallet, username)).await
    }

    pub async fn create_player(&self, wallet: &Identity, username: &str) -> Result<PlayerProfile> {
        let url = join(&self.endpoints.player, &["createPlayer"])?;
        self.post_json(url, &registration(wallet, username)).await
    }

    pub async fn profile(&self, wallet: &Identity) -> Result<PlayerProfile> {
        let url = join(&self.endpoints.player, &["profile", wallet.as_str()])?;
        self.get_json(url).await
    }

    /// Whether `wallet` has a player record (404 means no).
    pub async fn is_registered(&self, wallet: &Identity) -> Result<bool> {
        let url = join(&self.endpoints.player, &["player", wallet.as_str()])?;
        Ok(self
            .get_optional::<serde_json::Value>(url)
            .await?
            .is_some())
    }

    pub async fn players(&self) -> Result<Vec<PlayerSummary>> {
        let url = join(&self.endpoints.player, &["players"])?;
        self.get_json(url).await
    }

    pub async fn inventory(&self, wallet: &Identity) -> Result<Inventory> {
        let url = join(&self.endpoints.player, &["inventory", wallet.as_str()])?;
        self.get_json(url).await
    }

    pub async fn add_item(&self, wallet: &Identity, item: RewardItem) -> Result<()> {
        let url = join(&self.endpoints.player, &["add-item"])?;
        let body = AddItemRequest {
            wallet_address: wallet.to_string(),
            item,
        };
        self.post_unit(url, &body).await
    }

    /// Sells `quantity` of an item and returns the updated inventory.
    pub async fn sell_item(
        &self,
        wallet: &Identity,
        item_name: &str,
        quantity: u32,
    ) -> Result<Inventory> {
        let url = join(&self.endpoints.player, &["sell-item"])?;
        let body = SellItemRequest {
            wallet_address: wallet.to_string(),
            item_name: item_name.to_string(),
            quantity,
        };
        self.post_json(url, &body).await
    }

    pub async fn update_last_ounce_purchase(
        &self,
        wallet: &Identity,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let url = join(
            &self.endpoints.player,
            &["update-lastouncepurchase", wallet.as_str()],
        )?;
        let body = json!({ "lastouncepurchase": at });
        self.send_json::<_, serde_json::Value>(Method::PUT, url, &body)
            .await
            .map(|_| ())
    }

    pub async fn log_minigame(
        &self,
        wallet: &Identity,
        game: MinigameKind,
        score: i64,
    ) -> Result<MinigameResult> {
        let url = join(&self.endpoints.player, &["player", "minigame", "log"])?;
        let body = MinigameLog {
            wallet_address: wallet.to_string(),
            game_type: game.as_str().to_string(),
            score,
        };
        self.post_json(url, &body).await
    }

    /// Records the click counter of the clicker minigame.
    pub async fn record_clicks(&self, wallet: &Identity, click_count: u64) -> Result<()> {
        let url = join(&self.endpoints.hitter, &["hitter"])?;
        let body = maffisol_types::social::HitterRequest {
            wallet_address: wallet.to_string(),
            click_count: click_count.to_string(),
        };
        self.post_unit(url, &body).await
    }
}

fn registration(wallet: &Identity, username: &str) -> RegisterRequest {
    RegisterRequest {
        wallet_address: wallet.to_string(),
        username: Some(username.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::serve_router;
    use axum::{
        extract::{Json as AxumJson, Path},
        http::StatusCode as AxumStatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    fn wallet(raw: &str) -> Identity {
        Identity::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_login_unregistered_is_none() {
        let router = Router::new().route(
            "/api/player/login",
            post(|AxumJson(body): AxumJson<Value>| async move {
                match body["walletAddress"].as_str() {
                    Some("known") => (
                        AxumStatusCode::OK,
                        Json(json!({"username": "vito", "rank": "Capo", "money": 100})),
                    ),
                    Some("blank") => (AxumStatusCode::OK, Json(json!({"username": ""}))),
                    _ => (
                        AxumStatusCode::NOT_FOUND,
                        Json(json!({"message": "Player not found"})),
                    ),
                }
            }),
        );
        let (base_url, handle) = serve_router(router).await;
        let client = Client::for_origin(&base_url).unwrap();

        let profile = client.login(&wallet("known")).await.unwrap().unwrap();
        assert_eq!(profile.username, "vito");
        assert!(client.login(&wallet("blank")).await.unwrap().is_none());
        assert!(client.login(&wallet("stranger")).await.unwrap().is_none());

        handle.abort();
    }

    #[tokio::test]
    async fn test_register_trims_username() {
        let router = Router::new().route(
            "/api/player/createPlayer",
            post(|AxumJson(body): AxumJson<Value>| async move {
                Json(json!({
                    "username": body["username"],
                    "walletAddress": body["walletAddress"],
                }))
            }),
        );
        let (base_url, handle) = serve_router(router).await;
        let client = Client::for_origin(&base_url).unwrap();

        let profile = client
            .create_player(&wallet("w1"), "  sonny ")
            .await
            .unwrap();
        assert_eq!(profile.username, "sonny");
        assert_eq!(profile.wallet_address.as_deref(), Some("w1"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_is_registered() {
        let router = Router::new().route(
            "/api/player/player/:wallet",
            get(|Path(wallet): Path<String>| async move {
                if wallet == "w1" {
                    (AxumStatusCode::OK, Json(json!({"username": "vito"})))
                } else {
                    (AxumStatusCode::NOT_FOUND, Json(json!({})))
                }
            }),
        );
        let (base_url, handle) = serve_router(router).await;
        let client = Client::for_origin(&base_url).unwrap();

        assert!(client.is_registered(&wallet("w1")).await.unwrap());
        assert!(!client.is_registered(&wallet("w2")).await.unwrap());

        handle.abort();
    }

    #[tokio::test]
    async fn test_sell_item_returns_inventory() {
        let router = Router::new().route(
            "/api/player/sell-item",
            post(|AxumJson(body): AxumJson<Value>| async move {
                assert_eq!(body["itemName"], "Luxury Watch");
                assert_eq!(body["quantity"], 2);
                Json(json!({"inventory": [
                    {"itemName": "Luxury Watch", "quantity": 1, "value": 200, "xp": 20}
                ]}))
            }),
        );
        let (base_url, handle) = serve_router(router).await;
        let client = Client::for_origin(&base_url).unwrap();

        let inventory = client
            .sell_item(&wallet("w1"), "Luxury Watch", 2)
            .await
            .unwrap();
        assert_eq!(inventory.item("Luxury Watch").unwrap().quantity, 1);

        handle.abort();
    }
}
