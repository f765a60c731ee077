//! Color resolution: one snapshot in, one [`Decision`] out.
//!
//! The rules live in [`CASCADE`] in priority order. [`ColorEngine::resolve`]
//! walks the list and stops at the first rule that produces a decision. The
//! health rule never decides on its own: it records health and leaves a base
//! color behind, which is what the snapshot resolves to when no later rule
//! matches.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

use crate::gsi_logic::model::{
    Activity, BombState, Cue, Decision, MapPhase, PlayerState, Rgb, Snapshot, Team,
};
use crate::gsi_logic::tracker::StateTracker;

/// Every color the cascade can produce, plus the idle color the output
/// falls back to after a flash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Palette {
    pub flashed: Rgb,
    pub burning: Rgb,
    pub smoked: Rgb,
    pub menu_loading: Rgb,
    pub menu_searching: Rgb,
    pub menu: Rgb,
    pub health_high: Rgb,
    pub health_mid: Rgb,
    pub health_low: Rgb,
    pub health_critical: Rgb,
    pub kill: Rgb,
    pub bomb_planted: Rgb,
    pub bomb_exploded: Rgb,
    pub win_t: Rgb,
    pub win_ct: Rgb,
    pub idle: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            flashed: Rgb::new(255, 255, 255),
            burning: Rgb::new(255, 178, 0),
            smoked: Rgb::new(100, 100, 100),
            menu_loading: Rgb::new(147, 112, 219),
            menu_searching: Rgb::new(255, 215, 0),
            menu: Rgb::new(0, 255, 0),
            health_high: Rgb::new(0, 255, 0),
            health_mid: Rgb::new(255, 255, 0),
            health_low: Rgb::new(255, 165, 0),
            health_critical: Rgb::new(255, 0, 0),
            kill: Rgb::new(145, 200, 66),
            bomb_planted: Rgb::new(0, 224, 245),
            bomb_exploded: Rgb::new(255, 200, 0),
            win_t: Rgb::new(235, 160, 0),
            win_ct: Rgb::new(0, 255, 255),
            idle: Rgb::new(255, 0, 255),
        }
    }
}

impl Palette {
    /// Named colors the cascade can produce; `idle` is not one of them.
    pub fn cascade_colors(&self) -> [(&'static str, Rgb); 15] {
        [
            ("flashed", self.flashed),
            ("burning", self.burning),
            ("smoked", self.smoked),
            ("menuLoading", self.menu_loading),
            ("menuSearching", self.menu_searching),
            ("menu", self.menu),
            ("healthHigh", self.health_high),
            ("healthMid", self.health_mid),
            ("healthLow", self.health_low),
            ("healthCritical", self.health_critical),
            ("kill", self.kill),
            ("bombPlanted", self.bomb_planted),
            ("bombExploded", self.bomb_exploded),
            ("winT", self.win_t),
            ("winCt", self.win_ct),
        ]
    }
}

/// Hold times for the transient cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashTimings {
    pub flashed: Duration,
    pub burning: Duration,
    pub smoked: Duration,
    pub kill: Duration,
    pub bomb_exploded: Duration,
}

impl Default for FlashTimings {
    fn default() -> Self {
        Self {
            flashed: Duration::from_millis(1500),
            burning: Duration::from_millis(600),
            smoked: Duration::from_millis(600),
            kill: Duration::from_millis(500),
            bomb_exploded: Duration::from_millis(1000),
        }
    }
}

/// Lower bounds (inclusive) of the health tiers; below `low` is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthTiers {
    pub high: i64,
    pub mid: i64,
    pub low: i64,
}

impl Default for HealthTiers {
    fn default() -> Self {
        Self {
            high: 80,
            mid: 50,
            low: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub palette: Palette,
    pub timings: FlashTimings,
    pub tiers: HealthTiers,
}

impl EngineSettings {
    pub fn health_color(&self, health: i64) -> Rgb {
        let (tiers, palette) = (&self.tiers, &self.palette);
        if health >= tiers.high {
            palette.health_high
        } else if health >= tiers.mid {
            palette.health_mid
        } else if health >= tiers.low {
            palette.health_low
        } else {
            palette.health_critical
        }
    }
}

/// Per-snapshot scratch space shared by the rules.
struct Evaluation<'a> {
    snapshot: &'a Snapshot,
    state: PlayerState,
    base: Option<Rgb>,
}

type RuleFn = fn(&EngineSettings, &mut StateTracker, &mut Evaluation<'_>) -> Option<Decision>;

struct Rule {
    name: &'static str,
    apply: RuleFn,
}

/// Highest priority first.
const CASCADE: [Rule; 8] = [
    Rule { name: "flashed", apply: flashed },
    Rule { name: "burning", apply: burning },
    Rule { name: "smoked", apply: smoked },
    Rule { name: "menu", apply: menu },
    Rule { name: "health", apply: health_tier },
    Rule { name: "new_kill", apply: new_kill },
    Rule { name: "bomb", apply: bomb },
    Rule { name: "round_win", apply: round_win },
];

fn flashed(s: &EngineSettings, _: &mut StateTracker, ev: &mut Evaluation<'_>) -> Option<Decision> {
    ev.state
        .is_flashed()
        .then(|| Decision::flash(Cue::Flashed, s.palette.flashed, s.timings.flashed))
}

fn burning(s: &EngineSettings, _: &mut StateTracker, ev: &mut Evaluation<'_>) -> Option<Decision> {
    ev.state
        .is_burning()
        .then(|| Decision::flash(Cue::Burning, s.palette.burning, s.timings.burning))
}

fn smoked(s: &EngineSettings, _: &mut StateTracker, ev: &mut Evaluation<'_>) -> Option<Decision> {
    ev.state
        .is_smoked()
        .then(|| Decision::flash(Cue::Smoked, s.palette.smoked, s.timings.smoked))
}

fn menu(s: &EngineSettings, _: &mut StateTracker, ev: &mut Evaluation<'_>) -> Option<Decision> {
    if ev.snapshot.activity() != Some(Activity::Menu) {
        return None;
    }
    let color = match ev.snapshot.map_phase() {
        Some(MapPhase::LoadingScreen) => s.palette.menu_loading,
        Some(MapPhase::Searching) => s.palette.menu_searching,
        _ => s.palette.menu,
    };
    Some(Decision::steady(Cue::Menu, color))
}

fn health_tier(
    s: &EngineSettings,
    tracker: &mut StateTracker,
    ev: &mut Evaluation<'_>,
) -> Option<Decision> {
    let health = ev.state.health();
    ev.base = Some(s.health_color(health));
    tracker.record_health(health);
    None
}

fn new_kill(
    s: &EngineSettings,
    tracker: &mut StateTracker,
    ev: &mut Evaluation<'_>,
) -> Option<Decision> {
    tracker
        .observe_kills(ev.snapshot.kills())
        .then(|| Decision::flash(Cue::NewKill, s.palette.kill, s.timings.kill))
}

fn bomb(s: &EngineSettings, _: &mut StateTracker, ev: &mut Evaluation<'_>) -> Option<Decision> {
    match ev.snapshot.bomb()? {
        BombState::Planted => Some(Decision::steady(Cue::BombPlanted, s.palette.bomb_planted)),
        BombState::Exploded => Some(Decision::flash(
            Cue::BombExploded,
            s.palette.bomb_exploded,
            s.timings.bomb_exploded,
        )),
        BombState::Other => None,
    }
}

fn round_win(s: &EngineSettings, _: &mut StateTracker, ev: &mut Evaluation<'_>) -> Option<Decision> {
    match ev.snapshot.win_team()? {
        Team::T => Some(Decision::steady(Cue::RoundWin, s.palette.win_t)),
        Team::CT => Some(Decision::steady(Cue::RoundWin, s.palette.win_ct)),
        Team::Other => None,
    }
}

/// Owns the tracker; evaluate snapshots one at a time.
#[derive(Debug, Clone)]
pub struct ColorEngine {
    settings: EngineSettings,
    tracker: StateTracker,
}

impl ColorEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_tracker(settings, StateTracker::new())
    }

    pub fn with_tracker(settings: EngineSettings, tracker: StateTracker) -> Self {
        Self { settings, tracker }
    }

    pub fn resolve(&mut self, snapshot: &Snapshot) -> Decision {
        let mut ev = Evaluation {
            snapshot,
            state: snapshot.player_state(),
            base: None,
        };

        for rule in &CASCADE {
            if let Some(decision) = (rule.apply)(&self.settings, &mut self.tracker, &mut ev) {
                trace!(rule = rule.name, color = %decision.color, "Cascade matched");
                return decision;
            }
        }

        let base = ev
            .base
            .unwrap_or_else(|| self.settings.health_color(ev.state.health()));
        Decision::steady(Cue::Health, base)
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }
}
