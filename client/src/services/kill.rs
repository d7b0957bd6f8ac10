use crate::{client::join, Client, Result};
use maffisol_types::{
    api::{ApiMessage, AttackRequest, PlayerSummary},
    rules::{attack_success_chance, Attacker, Rank},
};

impl Client {
    /// Attacks `target` with the success chance implied by the rank gap.
    ///
    /// Refuses locally when the attacker may not attack at all; target
    /// eligibility is left to [`Attacker::eligible_targets`] and the backend.
    pub async fn attack(&self, attacker: &Attacker, target: &PlayerSummary) -> Result<ApiMessage> {
        attacker.check()?;
        let target_rank = target.rank.parse().unwrap_or(Rank::Rookie);
        let url = join(&self.endpoints.kill, &["kill"])?;
        let body = AttackRequest {
            player_id: attacker.id.clone(),
            target_id: target.id.clone(),
            success_chance: attack_success_chance(attacker.rank, target_rank),
        };
        self.post_json(url, &body).await
    }
}
