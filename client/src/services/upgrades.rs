use crate::{client::join, Client, Result};
use maffisol_types::{
    api::{BaseUpgrade, PurchaseUpgradeRequest, PurchaseUpgradeResponse},
    Identity,
};

impl Client {
    pub async fn base_upgrades(&self) -> Result<Vec<BaseUpgrade>> {
        let url = join(&self.endpoints.upgrade, &["all"])?;
        self.get_json(url).await
    }

    pub async fn purchase_upgrade(
        &self,
        wallet: &Identity,
        upgrade_id: &str,
    ) -> Result<PurchaseUpgradeResponse> {
        let url = join(&self.endpoints.upgrade, &["purchase"])?;
        let body = PurchaseUpgradeRequest {
            wallet_address: wallet.to_string(),
            upgrade_id: upgrade_id.to_string(),
        };
        self.post_json(url, &body).await
    }
}
