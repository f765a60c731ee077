use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::gsi_logic::error::GsiError;

/// An RGB color. Serialized as a `[r, g, b]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Accepts `#rrggbb` or `r,g,b`.
impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(format!("expected #rrggbb, got '{}'", s));
            }
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("'{}': {}", s, e))
            };
            return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected r,g,b, got '{}'", s));
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|e| format!("'{}': {}", s, e));
        Ok(Rgb::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }
}

// ---------------------------------------------------------------------------
// Game state snapshot (CS2 game state integration payload)
// ---------------------------------------------------------------------------

/// One game-state payload. Every section is optional; missing or `null`
/// sections read as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub player: Option<Player>,
    #[serde(default)]
    pub map: Option<MapInfo>,
    #[serde(default)]
    pub round: Option<RoundInfo>,
    #[serde(default)]
    pub auth: Option<Auth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub activity: Option<Activity>,
    #[serde(default)]
    pub state: Option<PlayerState>,
    #[serde(default)]
    pub match_stats: Option<MatchStats>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub health: Option<f64>,
    #[serde(default)]
    pub flashed: Option<f64>,
    #[serde(default)]
    pub burning: Option<f64>,
    #[serde(default)]
    pub smoked: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MatchStats {
    #[serde(default)]
    pub kills: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapInfo {
    #[serde(default)]
    pub phase: Option<MapPhase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoundInfo {
    #[serde(default)]
    pub bomb: Option<BombState>,
    #[serde(default)]
    pub win_team: Option<Team>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub key1: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Menu,
    Playing,
    TextInput,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapPhase {
    LoadingScreen,
    Searching,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BombState {
    Planted,
    Exploded,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Team {
    T,
    CT,
    #[serde(other)]
    Other,
}

pub const DEFAULT_HEALTH: i64 = 100;

impl Snapshot {
    /// Parses a request body. Anything but a JSON object is malformed.
    pub fn from_slice(body: &[u8]) -> Result<Self, GsiError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| GsiError::MalformedInput(e.to_string()))?;
        if !value.is_object() {
            return Err(GsiError::MalformedInput(
                "payload is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| GsiError::MalformedInput(e.to_string()))
    }

    pub fn player_state(&self) -> PlayerState {
        self.player
            .as_ref()
            .and_then(|p| p.state)
            .unwrap_or_default()
    }

    pub fn activity(&self) -> Option<Activity> {
        self.player.as_ref().and_then(|p| p.activity)
    }

    pub fn map_phase(&self) -> Option<MapPhase> {
        self.map.as_ref().and_then(|m| m.phase)
    }

    pub fn kills(&self) -> i64 {
        self.player
            .as_ref()
            .and_then(|p| p.match_stats)
            .and_then(|s| s.kills)
            .map(whole)
            .unwrap_or(0)
    }

    pub fn bomb(&self) -> Option<BombState> {
        self.round.as_ref().and_then(|r| r.bomb)
    }

    pub fn win_team(&self) -> Option<Team> {
        self.round.as_ref().and_then(|r| r.win_team)
    }

    /// `auth.key1`, empty when absent.
    pub fn credential(&self) -> &str {
        self.auth
            .as_ref()
            .and_then(|a| a.key1.as_deref())
            .unwrap_or("")
    }
}

/// Rounds toward negative infinity; 79.9 health is still below the 80 tier.
fn whole(n: f64) -> i64 {
    n.floor() as i64
}

impl PlayerState {
    pub fn health(&self) -> i64 {
        self.health.map(whole).unwrap_or(DEFAULT_HEALTH)
    }

    pub fn is_flashed(&self) -> bool {
        self.flashed.unwrap_or(0.0) > 0.0
    }

    pub fn is_burning(&self) -> bool {
        self.burning.unwrap_or(0.0) > 0.0
    }

    pub fn is_smoked(&self) -> bool {
        self.smoked.unwrap_or(0.0) > 0.0
    }
}

// ---------------------------------------------------------------------------
// Engine output
// ---------------------------------------------------------------------------

/// Which cascade rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Flashed,
    Burning,
    Smoked,
    Menu,
    NewKill,
    BombPlanted,
    BombExploded,
    RoundWin,
    Health,
}

/// The color to show now and, for transient effects, how long to hold it
/// before going back to the idle color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub color: Rgb,
    pub flash: Option<Duration>,
    pub cue: Cue,
}

impl Decision {
    pub fn steady(cue: Cue, color: Rgb) -> Self {
        Self { color, flash: None, cue }
    }

    pub fn flash(cue: Cue, color: Rgb, hold: Duration) -> Self {
        Self { color, flash: Some(hold), cue }
    }
}

/// A decision tagged with its position in issuance order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssuedDecision {
    pub id: u64,
    pub decision: Decision,
}
