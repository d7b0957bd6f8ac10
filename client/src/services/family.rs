//! Family dashboard (territories, cooldowns, upgrades, treasury, family
//! chat history) and family management.

use crate::{client::join, Client, Error, Result};
use maffisol_types::{
    api::{
        ApiMessage, ClaimTerritoryRequest, Cooldowns, CooldownsResponse, DonationRequest,
        FamilyChatPage, FamilyMessage, FamilyUpgradeKind, FamilyUpgradeRequest, SabotageRequest,
        Territory, UpgradeCost,
    },
    social::{
        CreateFamilyRequest, FamilyRecord, InviteMemberRequest, PendingInvite,
        RemoveMemberRequest,
    },
    Identity,
};
use reqwest::Method;

/// Family chat history page size. A shorter page means the history is
/// exhausted.
pub const FAMILY_CHAT_PAGE: usize = 100;

impl Client {
    pub async fn territories(&self) -> Result<Vec<Territory>> {
        let url = join(&self.endpoints.family, &["territories"])?;
        self.get_json(url).await
    }

    pub async fn cooldowns(&self, family_id: &str) -> Result<Cooldowns> {
        let url = join(&self.endpoints.family, &["request-cooldown", family_id])?;
        let response: CooldownsResponse = self.get_json(url).await?;
        Ok(response.cooldowns)
    }

    pub async fn claim_territory(&self, family_id: &str, territory_id: &str) -> Result<ApiMessage> {
        let url = join(&self.endpoints.family, &["territory", "claim"])?;
        let body = ClaimTerritoryRequest {
            family_id: family_id.to_string(),
            territory_id: territory_id.to_string(),
        };
        self.post_json(url, &body).await
    }

    /// Sabotages a territory held by `target_family_id` (unheld territories
    /// pass `None`).
    pub async fn sabotage_territory(
        &self,
        family_id: &str,
        target_family_id: Option<&str>,
        territory_id: &str,
    ) -> Result<ApiMessage> {
        let url = join(&self.endpoints.family, &["territory", "sabotage"])?;
        let body = SabotageRequest {
            attacker_id: family_id.to_string(),
            target_family_id: target_family_id.map(str::to_string),
            territory_id: territory_id.to_string(),
        };
        self.post_json(url, &body).await
    }

    pub async fn upgrade_family(
        &self,
        family_id: &str,
        kind: FamilyUpgradeKind,
    ) -> Result<ApiMessage> {
        let url = join(&self.endpoints.family, &["upgrade"])?;
        let body = FamilyUpgradeRequest {
            family_id: family_id.to_string(),
            upgrade_type: kind.as_str().to_string(),
        };
        self.post_json(url, &body).await
    }

    pub async fn upgrade_cost(&self, family_id: &str, kind: FamilyUpgradeKind) -> Result<u64> {
        let mut url = join(&self.endpoints.family, &["upgrade-cost"])?;
        url.query_pairs_mut()
            .append_pair("familyId", family_id)
            .append_pair("upgradeType", kind.as_str());
        let cost: UpgradeCost = self.get_json(url).await?;
        Ok(cost.cost)
    }

    pub async fn collect_resources(&self, family_id: &str) -> Result<String> {
        let url = join(&self.endpoints.family, &["collect-resources", family_id])?;
        self.message(Method::POST, url).await
    }

    pub async fn donate(&self, family_id: &str, player_id: &str, amount: u64) -> Result<ApiMessage> {
        let url = join(&self.endpoints.family, &["family", "donate"])?;
        let body = DonationRequest {
            family_id: family_id.to_string(),
            player_id: player_id.to_string(),
            amount,
        };
        self.post_json(url, &body).await
    }

    /// One page of family chat history, oldest first.
    pub async fn family_chat(&self, family_id: &str, offset: usize) -> Result<Vec<FamilyMessage>> {
        let mut url = join(&self.endpoints.family, &[family_id, "chat"])?;
        url.query_pairs_mut()
            .append_pair("limit", &FAMILY_CHAT_PAGE.to_string())
            .append_pair("offset", &offset.to_string());
        let page: FamilyChatPage = self.get_json(url).await?;
        Ok(page.chat_history)
    }

    pub async fn families(&self) -> Result<Vec<FamilyRecord>> {
        let url = join(&self.endpoints.base, &["family"])?;
        self.get_json(url).await
    }

    pub async fn family(&self, family_id: &str) -> Result<Option<FamilyRecord>> {
        let url = join(&self.endpoints.base, &["family", family_id])?;
        self.get_optional(url).await
    }

    pub async fn create_family(&self, name: &str, owner_username: &str) -> Result<()> {
        let url = join(&self.endpoints.base, &["family"])?;
        self.post_unit(url, &CreateFamilyRequest::founded_by(name, owner_username))
            .await
    }

    /// Deletes a family. The backend only honors the owner.
    pub async fn delete_family(&self, family_id: &str, owner_username: &str) -> Result<()> {
        let url = join(&self.endpoints.base, &["family", family_id])?;
        let response = self
            .http_client
            .delete(url)
            .header("ownerUsername", owner_username)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::FailedWithBody { status, body })
    }

    pub async fn invite_member(
        &self,
        inviter: &Identity,
        invitee_username: &str,
        family_id: &str,
    ) -> Result<()> {
        let url = join(&self.endpoints.base, &["family-invites", "invite-member"])?;
        let body = InviteMemberRequest {
            inviter_wallet_address: inviter.to_string(),
            invitee_username: invitee_username.to_string(),
            family_id: family_id.to_string(),
        };
        self.post_unit(url, &body).await
    }

    pub async fn remove_member(&self, family_id: &str, username: &str) -> Result<()> {
        let url = join(&self.endpoints.base, &["family", "remove-member"])?;
        let body = RemoveMemberRequest {
            family_id: family_id.to_string(),
            username: username.to_string(),
        };
        self.post_unit(url, &body).await
    }

    pub async fn pending_invites(&self, family_id: &str) -> Result<Vec<PendingInvite>> {
        let url = join(
            &self.endpoints.base,
            &["family-invites", family_id, "pending-invites"],
        )?;
        self.get_json(url).await
    }
}
