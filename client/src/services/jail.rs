use crate::{client::join, Client, Result};
use chrono::{DateTime, Utc};
use maffisol_types::{
    api::{Inmate, JailRequest},
    rules::{CrimeOutcome, JAIL_MINUTES},
    Identity, JailStatus, TimedLock,
};
use reqwest::Method;

/// Current inmates split by whether they share the viewer's family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InmateLists {
    pub family: Vec<Inmate>,
    pub others: Vec<Inmate>,
}

/// Keeps inmates whose lock is active at `now` and splits them by the
/// viewer's family. The viewer's family is looked up in the unfiltered list;
/// a viewer without a family has no family inmates.
pub fn partition_inmates(inmates: Vec<Inmate>, viewer: &Identity, now: DateTime<Utc>) -> InmateLists {
    let viewer_family = inmates
        .iter()
        .find(|inmate| viewer.matches(&inmate.wallet_address))
        .and_then(|inmate| inmate.family.clone());

    let mut lists = InmateLists::default();
    for inmate in inmates {
        let locked = inmate
            .jail
            .as_ref()
            .is_some_and(|jail| jail.lock_at(now).is_active());
        if !locked {
            continue;
        }
        if viewer_family.is_some() && inmate.family == viewer_family {
            lists.family.push(inmate);
        } else {
            lists.others.push(inmate);
        }
    }
    lists
}

impl Client {
    pub async fn jail_status(&self, wallet: &Identity) -> Result<JailStatus> {
        let url = join(&self.endpoints.jail, &["jail-status", wallet.as_str()])?;
        self.get_json(url).await
    }

    /// Jail status normalized into a lock observed now.
    pub async fn jail_lock(&self, wallet: &Identity) -> Result<TimedLock> {
        Ok(self.jail_status(wallet).await?.lock_at(Utc::now()))
    }

    pub async fn jail_list(&self) -> Result<Vec<Inmate>> {
        let url = join(&self.endpoints.jail, &["jail-list"])?;
        self.get_json(url).await
    }

    pub async fn send_to_jail(&self, wallet: &Identity, minutes: u32) -> Result<()> {
        let url = join(&self.endpoints.jail, &["jail", wallet.as_str()])?;
        self.post_unit(url, &JailRequest { jail_time: minutes }).await
    }

    /// Tells the jail service a sentence has run out.
    pub async fn release_from_jail(&self, wallet: &Identity) -> Result<String> {
        let url = join(&self.endpoints.jail, &["release-jail", wallet.as_str()])?;
        self.message(Method::POST, url).await
    }

    /// Applies a rolled crime or theft: loot goes to the inventory, getting
    /// caught costs [`JAIL_MINUTES`] in jail.
    pub async fn settle_crime(&self, wallet: &Identity, outcome: &CrimeOutcome) -> Result<()> {
        match outcome {
            CrimeOutcome::Success(item) => self.add_item(wallet, item.clone()).await,
            CrimeOutcome::Caught => self.send_to_jail(wallet, JAIL_MINUTES).await,
        }
    }

    /// Pays to release `member`. The backend checks funds and family.
    pub async fn bailout(&self, wallet: &Identity, member: &Identity) -> Result<String> {
        let url = join(
            &self.endpoints.jail,
            &["bailout", wallet.as_str(), member.as_str()],
        )?;
        self.message(Method::POST, url).await
    }
}
