use crate::{Client, Result};
use maffisol_types::api::Mission;

impl Client {
    pub async fn missions(&self) -> Result<Vec<Mission>> {
        self.get_json(self.endpoints.missions.clone()).await
    }
}
