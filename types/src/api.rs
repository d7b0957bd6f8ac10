//! JSON shapes exchanged with the game's REST services.
//!
//! The backends are loosely typed: numeric fields may be absent, families
//! may be a name, an object or null, and Mongo ids leak through as `_id`.
//! Every model here accepts those variations and normalizes them.

use crate::{lock::JailStatus, rules::Rank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Accepts `"Corleone"`, `{"name": "Corleone", ...}` or `null`.
fn family_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Object { name: String },
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Name(name)) | Some(Raw::Object { name }) if !name.is_empty() => Some(name),
        _ => None,
    })
}

/// Accepts an id string or a populated document carrying `_id`.
fn document_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(String),
        Document {
            #[serde(rename = "_id")]
            id: String,
        },
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Id(id) | Raw::Document { id } => id,
    })
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Generic `{ "message": ... }` body used for confirmations and rejections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedUpgrade {
    #[serde(deserialize_with = "document_id")]
    pub upgrade_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub rank: String,
    #[serde(default, deserialize_with = "family_name")]
    pub family: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub bags: u64,
    #[serde(default)]
    pub ounces: u64,
    #[serde(default)]
    pub half_kilos: u64,
    #[serde(default)]
    pub kilos: u64,
    #[serde(rename = "lastouncepurchase", default)]
    pub last_ounce_purchase: Option<DateTime<Utc>>,
    #[serde(default)]
    pub jail: Option<JailStatus>,
    #[serde(default)]
    pub base_upgrades_count: u64,
    #[serde(default)]
    pub inventory_items_count: u64,
    #[serde(default)]
    pub upgrades: Vec<OwnedUpgrade>,
}

impl PlayerProfile {
    pub fn rank(&self) -> Option<Rank> {
        self.rank.parse().ok()
    }

    pub fn has_bought_ounce(&self) -> bool {
        self.ounces > 0 || self.last_ounce_purchase.is_some()
    }

    pub fn owns_upgrade(&self, upgrade_id: &str) -> bool {
        self.upgrades.iter().any(|u| u.upgrade_id == upgrade_id)
    }
}

/// Body of `POST /login`, `POST /register` and `POST /createPlayer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub item_name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub xp: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
}

impl Inventory {
    pub fn item(&self, item_name: &str) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.item_name == item_name)
    }
}

/// Loot granted by a successful crime or theft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardItem {
    pub name: String,
    pub value: u64,
    pub xp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub wallet_address: String,
    pub item: RewardItem,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellItemRequest {
    pub wallet_address: String,
    pub item_name: String,
    pub quantity: u32,
}

/// Entry of `GET /players`, the roster attack targets are chosen from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default, deserialize_with = "family_name")]
    pub family: Option<String>,
    #[serde(default)]
    pub jail: Option<JailStatus>,
}

impl PlayerSummary {
    /// Jailed only while the flag is set and the release time is still
    /// ahead of `now`.
    pub fn is_jailed(&self, now: DateTime<Utc>) -> bool {
        self.jail
            .as_ref()
            .is_some_and(|jail| jail.lock_at(now).is_active())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inmate {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default, deserialize_with = "family_name")]
    pub family: Option<String>,
    pub wallet_address: String,
    #[serde(default)]
    pub jail: Option<JailStatus>,
}

/// Body of `POST /jail/{wallet}`; jail time is in minutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JailRequest {
    pub jail_time: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub wallet_address: String,
    pub username: String,
    #[serde(default)]
    pub points: u64,
    #[serde(default, deserialize_with = "family_name")]
    pub family: Option<String>,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub is_pro: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyEntry {
    pub family_name: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub total_points: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub dominance_points: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeaderboardKind {
    Players,
    Families,
}

impl LeaderboardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardKind::Players => "players",
            LeaderboardKind::Families => "families",
        }
    }
}

/// A leaderboard snapshot. Push updates do not say which board they carry,
/// so the variant is inferred from the entries' fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Leaderboard {
    Players(Vec<LeaderboardEntry>),
    Families(Vec<FamilyEntry>),
}

impl Leaderboard {
    pub fn empty(kind: LeaderboardKind) -> Self {
        match kind {
            LeaderboardKind::Players => Leaderboard::Players(Vec::new()),
            LeaderboardKind::Families => Leaderboard::Families(Vec::new()),
        }
    }

    pub fn kind(&self) -> LeaderboardKind {
        match self {
            Leaderboard::Players(_) => LeaderboardKind::Players,
            Leaderboard::Families(_) => LeaderboardKind::Families,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Leaderboard::Players(entries) => entries.len(),
            Leaderboard::Families(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reinterprets this snapshot as `kind`. An empty array is ambiguous and
    /// fits either board; a non-empty board of the other kind does not.
    pub fn into_kind(self, kind: LeaderboardKind) -> Option<Self> {
        if self.kind() == kind {
            Some(self)
        } else if self.is_empty() {
            Some(Self::empty(kind))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: String,
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ChatMessage {
    pub fn public(sender_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            message: message.into(),
            kind: Some("public".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMessage {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: MessageTime,
}

/// Family chat timestamps: epoch milliseconds from stored history, or the
/// ISO-8601 string the sending client stamped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTime {
    Millis(i64),
    Text(String),
}

impl Default for MessageTime {
    fn default() -> Self {
        MessageTime::Millis(0)
    }
}

/// Outgoing `familyMessage` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMessageRequest {
    pub family_id: String,
    pub sender: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyChatPage {
    #[serde(default)]
    pub chat_history: Vec<FamilyMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Other(String),
}

impl From<String> for Difficulty {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Other(value),
        }
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        match value {
            Difficulty::Easy => "Easy".to_string(),
            Difficulty::Medium => "Medium".to_string(),
            Difficulty::Hard => "Hard".to_string(),
            Difficulty::Other(other) => other,
        }
    }
}

impl Serialize for Difficulty {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from(self.clone()))
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Difficulty::from)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reward: u64,
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bonus: String,
    #[serde(default)]
    pub controlled_by: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub dominance_points: Option<u64>,
    #[serde(default)]
    pub resource_income: u64,
}

impl Territory {
    /// Merges a partial `territory-update` push into this territory.
    pub fn apply(&mut self, update: &TerritoryUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(bonus) = &update.bonus {
            self.bonus = bonus.clone();
        }
        if let Some(controlled_by) = &update.controlled_by {
            self.controlled_by = Some(controlled_by.clone());
        }
        if let Some(status) = &update.status {
            self.status = status.clone();
        }
        if let Some(points) = update.dominance_points {
            self.dominance_points = Some(points);
        }
        if let Some(income) = update.resource_income {
            self.resource_income = income;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryUpdate {
    pub territory_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bonus: Option<String>,
    #[serde(default)]
    pub controlled_by: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub dominance_points: Option<u64>,
    #[serde(default)]
    pub resource_income: Option<u64>,
}

/// Applies a territory push to a list, leaving unknown territories alone.
pub fn apply_territory_update(territories: &mut [Territory], update: &TerritoryUpdate) -> bool {
    match territories.iter_mut().find(|t| t.id == update.territory_id) {
        Some(territory) => {
            territory.apply(update);
            true
        }
        None => false,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyUpgrades {
    #[serde(default)]
    pub armory: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub income: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FamilyUpgradeKind {
    Armory,
    Defense,
    Income,
}

impl FamilyUpgradeKind {
    pub const ALL: [FamilyUpgradeKind; 3] = [
        FamilyUpgradeKind::Armory,
        FamilyUpgradeKind::Defense,
        FamilyUpgradeKind::Income,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyUpgradeKind::Armory => "armory",
            FamilyUpgradeKind::Defense => "defense",
            FamilyUpgradeKind::Income => "income",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub resources: BTreeMap<String, i64>,
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub dominance_points: u64,
    #[serde(default)]
    pub upgrades: FamilyUpgrades,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Family {
    pub fn apply(&mut self, update: &FamilyUpdate) {
        if let Some(resources) = &update.resources {
            self.resources = resources.clone();
        }
        if let Some(money) = update.money {
            self.money = money;
        }
        if let Some(upgrades) = update.upgrades {
            self.upgrades = upgrades;
        }
    }
}

/// Partial `family-update` push.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyUpdate {
    #[serde(default)]
    pub resources: Option<BTreeMap<String, i64>>,
    #[serde(default)]
    pub money: Option<i64>,
    #[serde(default)]
    pub upgrades: Option<FamilyUpgrades>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesUpdate {
    #[serde(default)]
    pub resources: BTreeMap<String, i64>,
    #[serde(default)]
    pub dominance_points: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CooldownKind {
    Claim,
    Sabotage,
    Collect,
}

impl CooldownKind {
    pub const ALL: [CooldownKind; 3] = [
        CooldownKind::Claim,
        CooldownKind::Sabotage,
        CooldownKind::Collect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CooldownKind::Claim => "claim",
            CooldownKind::Sabotage => "sabotage",
            CooldownKind::Collect => "collect",
        }
    }
}

/// A cooldown as reported by `GET /request-cooldown/{family}`; `remaining`
/// is in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub remaining: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldowns {
    #[serde(default)]
    pub claim: Cooldown,
    #[serde(default)]
    pub sabotage: Cooldown,
    #[serde(default)]
    pub collect: Cooldown,
}

impl Cooldowns {
    pub fn get(&self, kind: CooldownKind) -> Cooldown {
        match kind {
            CooldownKind::Claim => self.claim,
            CooldownKind::Sabotage => self.sabotage,
            CooldownKind::Collect => self.collect,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownsResponse {
    #[serde(default)]
    pub cooldowns: Cooldowns,
}

/// `update-cooldowns` push: remaining milliseconds per action, absent or
/// zero meaning ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRemaining {
    #[serde(default)]
    pub claim: u64,
    #[serde(default)]
    pub sabotage: u64,
    #[serde(default)]
    pub collect: u64,
}

impl CooldownRemaining {
    pub fn get(&self, kind: CooldownKind) -> u64 {
        match kind {
            CooldownKind::Claim => self.claim,
            CooldownKind::Sabotage => self.sabotage,
            CooldownKind::Collect => self.collect,
        }
    }

    pub fn into_cooldowns(self) -> Cooldowns {
        let cooldown = |remaining: u64| Cooldown {
            active: remaining > 0,
            remaining,
        };
        Cooldowns {
            claim: cooldown(self.claim),
            sabotage: cooldown(self.sabotage),
            collect: cooldown(self.collect),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTerritoryRequest {
    pub family_id: String,
    pub territory_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SabotageRequest {
    pub attacker_id: String,
    pub target_family_id: Option<String>,
    pub territory_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyUpgradeRequest {
    pub family_id: String,
    pub upgrade_type: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeCost {
    #[serde(default)]
    pub cost: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    pub family_id: String,
    pub player_id: String,
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUpgrade {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseUpgradeRequest {
    pub wallet_address: String,
    pub upgrade_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseUpgradeResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub player: PlayerProfile,
}

/// Body of `POST /kill`; `success_chance` is a percentage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    pub player_id: String,
    pub target_id: String,
    pub success_chance: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MinigameKind {
    DiceGame,
    Lockpicking,
    Shootout,
    CarChase,
}

impl MinigameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinigameKind::DiceGame => "DiceGame",
            MinigameKind::Lockpicking => "Lockpicking",
            MinigameKind::Shootout => "Shootout",
            MinigameKind::CarChase => "CarChase",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinigameLog {
    pub wallet_address: String,
    pub game_type: String,
    pub score: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinigameReward {
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub item: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinigameResult {
    #[serde(default)]
    pub reward: MinigameReward,
}

/// Business actions, issued as `PUT /{action}/{wallet}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BusinessAction {
    BuyOunce,
    BuyHalfKilo,
    SellBags,
    SellOunce,
}

impl BusinessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessAction::BuyOunce => "buyOunce",
            BusinessAction::BuyHalfKilo => "buyHalfKilo",
            BusinessAction::SellBags => "sellBags",
            BusinessAction::SellOunce => "sellOunce",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_name_shapes() {
        let summary: PlayerSummary = serde_json::from_str(
            r#"{"_id":"1","username":"vito","rank":"Capo","family":"Corleone"}"#,
        )
        .unwrap();
        assert_eq!(summary.family.as_deref(), Some("Corleone"));

        let summary: PlayerSummary = serde_json::from_str(
            r#"{"_id":"1","username":"vito","rank":"Capo","family":{"name":"Tattaglia","_id":"f1"}}"#,
        )
        .unwrap();
        assert_eq!(summary.family.as_deref(), Some("Tattaglia"));

        let summary: PlayerSummary =
            serde_json::from_str(r#"{"_id":"1","family":null}"#).unwrap();
        assert_eq!(summary.family, None);

        let summary: PlayerSummary =
            serde_json::from_str(r#"{"_id":"1","family":{"_id":"f1"}}"#).unwrap();
        assert_eq!(summary.family, None);
    }

    #[test]
    fn test_profile_defaults_and_upgrades() {
        let profile: PlayerProfile = serde_json::from_str(
            r#"{
                "username": "vito",
                "money": 1500,
                "ounces": 0,
                "lastouncepurchase": "2024-11-01T10:00:00Z",
                "upgrades": [{"upgradeId": "u1"}, {"upgradeId": {"_id": "u2", "name": "Vault"}}]
            }"#,
        )
        .unwrap();
        assert_eq!(profile.money, 1500);
        assert_eq!(profile.kilos, 0);
        assert!(profile.has_bought_ounce());
        assert!(profile.owns_upgrade("u1"));
        assert!(profile.owns_upgrade("u2"));
        assert!(!profile.owns_upgrade("u3"));
        assert_eq!(profile.rank(), None);
    }

    #[test]
    fn test_leaderboard_variant_inference() {
        let players: Leaderboard = serde_json::from_str(
            r#"[{"walletAddress":"w1","username":"vito","points":10,"family":"Corleone","rank":"Don","isPro":true}]"#,
        )
        .unwrap();
        assert_eq!(players.kind(), LeaderboardKind::Players);

        let families: Leaderboard = serde_json::from_str(
            r#"[{"familyName":"Corleone","memberCount":3,"totalPoints":100,"dominancePoints":null}]"#,
        )
        .unwrap();
        assert_eq!(families.kind(), LeaderboardKind::Families);
        let Leaderboard::Families(entries) = &families else {
            panic!("expected families");
        };
        assert_eq!(entries[0].dominance_points, 0);

        assert_eq!(families.clone().into_kind(LeaderboardKind::Players), None);
        let empty: Leaderboard = serde_json::from_str("[]").unwrap();
        assert_eq!(
            empty.into_kind(LeaderboardKind::Families),
            Some(Leaderboard::Families(Vec::new()))
        );
    }

    #[test]
    fn test_difficulty_case_insensitive() {
        let mission: Mission = serde_json::from_str(
            r#"{"_id":"m1","title":"Collect debts","reward":500,"difficulty":"MEDIUM"}"#,
        )
        .unwrap();
        assert_eq!(mission.difficulty, Difficulty::Medium);
        let mission: Mission =
            serde_json::from_str(r#"{"_id":"m2","title":"?","difficulty":"Insane"}"#).unwrap();
        assert_eq!(mission.difficulty, Difficulty::Other("Insane".to_string()));
    }

    #[test]
    fn test_territory_update_merges() {
        let mut territories = vec![Territory {
            id: "t1".to_string(),
            name: "Docks".to_string(),
            bonus: "+10% income".to_string(),
            controlled_by: None,
            status: "neutral".to_string(),
            dominance_points: None,
            resource_income: 50,
        }];
        let update: TerritoryUpdate = serde_json::from_str(
            r#"{"territoryId":"t1","controlledBy":"Corleone","status":"claimed"}"#,
        )
        .unwrap();
        assert!(apply_territory_update(&mut territories, &update));
        assert_eq!(territories[0].controlled_by.as_deref(), Some("Corleone"));
        assert_eq!(territories[0].status, "claimed");
        assert_eq!(territories[0].resource_income, 50);

        let unknown = TerritoryUpdate {
            territory_id: "t9".to_string(),
            ..update
        };
        assert!(!apply_territory_update(&mut territories, &unknown));
    }

    #[test]
    fn test_cooldown_remaining_into_cooldowns() {
        let remaining: CooldownRemaining =
            serde_json::from_str(r#"{"claim":30000,"collect":0}"#).unwrap();
        let cooldowns = remaining.into_cooldowns();
        assert!(cooldowns.get(CooldownKind::Claim).active);
        assert_eq!(cooldowns.claim.remaining, 30_000);
        assert!(!cooldowns.get(CooldownKind::Sabotage).active);
        assert!(!cooldowns.get(CooldownKind::Collect).active);
    }

    #[test]
    fn test_request_bodies_are_camel_case() {
        let body = serde_json::to_value(SellItemRequest {
            wallet_address: "w1".to_string(),
            item_name: "Diamond Ring".to_string(),
            quantity: 2,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"walletAddress": "w1", "itemName": "Diamond Ring", "quantity": 2})
        );

        let body = serde_json::to_value(ChatMessage::public("vito", "hi")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"senderId": "vito", "message": "hi", "type": "public"})
        );
    }
}
