use crate::{client::join, Client, Result};
use maffisol_types::api::{Leaderboard, LeaderboardKind};

impl Client {
    /// Fetches a leaderboard. A body of the other kind reads as empty.
    pub async fn leaderboard(&self, kind: LeaderboardKind) -> Result<Leaderboard> {
        let url = join(&self.endpoints.base, &["leaderboard", kind.as_str()])?;
        let board: Leaderboard = self.get_json(url).await?;
        Ok(board
            .into_kind(kind)
            .unwrap_or_else(|| Leaderboard::empty(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::serve_router;
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn test_leaderboards() {
        let router = Router::new()
            .route(
                "/api/leaderboard/players",
                get(|| async {
                    Json(json!([{
                        "walletAddress": "w1", "username": "vito", "points": 12000,
                        "family": {"name": "Corleone"}, "rank": "Capo", "isPro": true
                    }]))
                }),
            )
            .route(
                "/api/leaderboard/families",
                get(|| async {
                    Json(json!([{
                        "familyName": "Corleone", "memberCount": 4,
                        "totalPoints": 40000, "dominancePoints": null
                    }]))
                }),
            );
        let (base_url, handle) = serve_router(router).await;
        let client = Client::for_origin(&base_url).unwrap();

        let players = client.leaderboard(LeaderboardKind::Players).await.unwrap();
        assert_eq!(players.kind(), LeaderboardKind::Players);
        assert_eq!(players.len(), 1);

        let families = client.leaderboard(LeaderboardKind::Families).await.unwrap();
        let Leaderboard::Families(entries) = families else {
            panic!("expected families");
        };
        assert_eq!(entries[0].dominance_points, 0);

        handle.abort();
    }
}
