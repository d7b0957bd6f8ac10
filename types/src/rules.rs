//! Game rules evaluated on the client before a request is sent.
//!
//! The backend remains authoritative; these only decide which requests are
//! worth making and what to show while they are in flight.

use crate::api::{InventoryItem, PlayerSummary, RewardItem};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

/// Cost of bailing a family member out of jail.
pub const BAILOUT_COST: u64 = 200;

/// Minutes spent in jail after a failed crime or theft.
pub const JAIL_MINUTES: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Rookie,
    Associate,
    Soldier,
    Capo,
    Underboss,
    Don,
    Godfather,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown rank: {0}")]
pub struct UnknownRank(pub String);

impl Rank {
    /// Progression ladder, highest first.
    pub const THRESHOLDS: [(Rank, u64); 7] = [
        (Rank::Godfather, 100_000),
        (Rank::Don, 50_000),
        (Rank::Underboss, 25_000),
        (Rank::Capo, 10_000),
        (Rank::Soldier, 5_000),
        (Rank::Associate, 1_000),
        (Rank::Rookie, 0),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Rookie => "Rookie",
            Rank::Associate => "Associate",
            Rank::Soldier => "Soldier",
            Rank::Capo => "Capo",
            Rank::Underboss => "Underboss",
            Rank::Don => "Don",
            Rank::Godfather => "Godfather",
        }
    }

    /// Level on the attack ladder. Associates fight at Rookie level.
    pub fn attack_level(&self) -> u8 {
        match self {
            Rank::Rookie | Rank::Associate => 0,
            Rank::Soldier => 1,
            Rank::Capo => 2,
            Rank::Underboss => 3,
            Rank::Don => 4,
            Rank::Godfather => 5,
        }
    }

    pub fn for_points(points: u64) -> Rank {
        Self::THRESHOLDS
            .iter()
            .find(|(_, threshold)| points >= *threshold)
            .map(|(rank, _)| *rank)
            .unwrap_or(Rank::Rookie)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Rookie" => Rank::Rookie,
            "Associate" => Rank::Associate,
            "Soldier" => Rank::Soldier,
            "Capo" => Rank::Capo,
            "Underboss" => Rank::Underboss,
            "Don" => Rank::Don,
            "Godfather" => Rank::Godfather,
            other => return Err(UnknownRank(other.to_string())),
        })
    }
}

/// Attack level of a raw rank string; unknown ranks count as level 0.
fn attack_level(rank: &str) -> u8 {
    rank.parse::<Rank>().map(|r| r.attack_level()).unwrap_or(0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankProgress {
    pub current: Rank,
    pub next: Rank,
    /// Percent of the way from `current` to `next`, in `[0, 100]`.
    pub percent: f64,
}

pub fn rank_progress(points: u64) -> RankProgress {
    let index = Rank::THRESHOLDS
        .iter()
        .position(|(_, threshold)| points >= *threshold)
        .unwrap_or(Rank::THRESHOLDS.len() - 1);
    let (current, floor) = Rank::THRESHOLDS[index];
    let (next, ceiling) = if index == 0 {
        (current, floor)
    } else {
        Rank::THRESHOLDS[index - 1]
    };
    let percent = if ceiling <= floor {
        100.0
    } else {
        ((points - floor) as f64 / (ceiling - floor) as f64 * 100.0).min(100.0)
    };
    RankProgress {
        current,
        next,
        percent,
    }
}

/// Percent chance an attack succeeds, by how far the target outranks the
/// attacker.
pub fn attack_success_chance(attacker: Rank, target: Rank) -> u8 {
    let gap = target.attack_level() as i16 - attacker.attack_level() as i16;
    match gap {
        g if g >= 2 => 20,
        1 => 50,
        _ => 70,
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackRefusal {
    #[error("Rookie players cannot attack.")]
    Rookie,
    #[error("You are in jail and cannot attack.")]
    Jailed,
}

/// The player picking a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attacker {
    pub id: String,
    pub rank: Rank,
    pub family: Option<String>,
    pub jailed: bool,
}

impl Attacker {
    pub fn check(&self) -> Result<(), AttackRefusal> {
        if self.rank == Rank::Rookie {
            return Err(AttackRefusal::Rookie);
        }
        if self.jailed {
            return Err(AttackRefusal::Jailed);
        }
        Ok(())
    }

    /// A target must be someone else, out of jail, outside the attacker's
    /// family and not above the attacker on the attack ladder.
    pub fn can_target(&self, target: &PlayerSummary, now: DateTime<Utc>) -> bool {
        if target.id == self.id || target.is_jailed(now) {
            return false;
        }
        if let (Some(mine), Some(theirs)) = (&self.family, &target.family) {
            if mine == theirs {
                return false;
            }
        }
        attack_level(&target.rank) <= self.rank.attack_level()
    }

    pub fn eligible_targets<'a>(
        &self,
        roster: &'a [PlayerSummary],
        now: DateTime<Utc>,
    ) -> Vec<&'a PlayerSummary> {
        roster.iter().filter(|p| self.can_target(p, now)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrimeOption {
    pub name: &'static str,
    pub success_chance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardTemplate {
    pub name: &'static str,
    pub value: u64,
    pub xp: u64,
}

impl RewardTemplate {
    pub fn to_item(&self) -> RewardItem {
        RewardItem {
            name: self.name.to_string(),
            value: self.value,
            xp: self.xp,
        }
    }
}

pub const CRIMES: [CrimeOption; 3] = [
    CrimeOption {
        name: "Rob a Bank",
        success_chance: 0.3,
    },
    CrimeOption {
        name: "Drug Deal",
        success_chance: 0.5,
    },
    CrimeOption {
        name: "Blackmail",
        success_chance: 0.6,
    },
];

pub const CRIME_REWARDS: [RewardTemplate; 3] = [
    RewardTemplate {
        name: "Luxury Watch",
        value: 200,
        xp: 20,
    },
    RewardTemplate {
        name: "Diamond Ring",
        value: 150,
        xp: 15,
    },
    RewardTemplate {
        name: "Stolen Cash",
        value: 100,
        xp: 10,
    },
];

pub const CAR_THEFTS: [CrimeOption; 3] = [
    CrimeOption {
        name: "Luxury Sedan",
        success_chance: 0.3,
    },
    CrimeOption {
        name: "Sport Coupe",
        success_chance: 0.5,
    },
    CrimeOption {
        name: "SUV",
        success_chance: 0.6,
    },
];

pub const CAR_REWARDS: [RewardTemplate; 3] = [
    RewardTemplate {
        name: "Luxury Car Stereo",
        value: 250,
        xp: 25,
    },
    RewardTemplate {
        name: "Stolen License Plate",
        value: 100,
        xp: 10,
    },
    RewardTemplate {
        name: "Bag of Cash",
        value: 200,
        xp: 20,
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CrimeOutcome {
    Success(RewardItem),
    Caught,
}

/// Rolls a crime attempt: success with `option.success_chance`, in which
/// case one reward is drawn uniformly.
pub fn roll_crime(
    option: &CrimeOption,
    rewards: &[RewardTemplate],
    rng: &mut impl Rng,
) -> CrimeOutcome {
    if rewards.is_empty() || rng.gen::<f64>() >= option.success_chance {
        return CrimeOutcome::Caught;
    }
    let reward = &rewards[rng.gen_range(0..rewards.len())];
    CrimeOutcome::Success(reward.to_item())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionRefusal {
    #[error("You cannot perform this action while in jail.")]
    Jailed,
    #[error("You do not have enough money for this action (need {needed}, have {available}).")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("Upgrade already purchased.")]
    AlreadyOwned,
}

/// Gate shared by paid actions (business deals, base upgrades).
pub fn check_paid_action(jailed: bool, money: i64, cost: i64) -> Result<(), ActionRefusal> {
    if jailed {
        return Err(ActionRefusal::Jailed);
    }
    if money < cost {
        return Err(ActionRefusal::InsufficientFunds {
            needed: cost,
            available: money,
        });
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaleTotals {
    pub money: u64,
    pub xp: u64,
}

/// Money and xp earned by selling the selected quantity of each item.
pub fn sale_totals(inventory: &[InventoryItem], selected: &BTreeMap<String, u32>) -> SaleTotals {
    inventory.iter().fold(SaleTotals::default(), |acc, item| {
        let quantity = selected.get(&item.item_name).copied().unwrap_or(0) as u64;
        SaleTotals {
            money: acc.money + quantity * item.value,
            xp: acc.xp + quantity * item.xp,
        }
    })
}

/// Clamps a requested sale quantity to `[1, owned]`.
pub fn clamp_quantity(requested: i64, owned: u32) -> u32 {
    requested.clamp(1, owned.max(1) as i64) as u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuelOutcome {
    Win,
    Lose,
    Tie,
}

/// Dice game result: higher total wins.
pub fn dice_outcome(player: &[u8], opponent: &[u8]) -> DuelOutcome {
    let total = |rolls: &[u8]| rolls.iter().map(|r| *r as u32).sum::<u32>();
    match total(player).cmp(&total(opponent)) {
        std::cmp::Ordering::Greater => DuelOutcome::Win,
        std::cmp::Ordering::Less => DuelOutcome::Lose,
        std::cmp::Ordering::Equal => DuelOutcome::Tie,
    }
}
