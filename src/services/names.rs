// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity name generation.
//!
//! A name is one of ten templates for the chosen style, picked uniformly
//! at random and filled in with the activity's type, distance (km, one
//! decimal), moving time (hours, one decimal), elevation gain (whole
//! meters) and, for the serious and descriptive styles, its start date.

use crate::format_utils::to_fixed;
use crate::models::Activity;
use crate::time_utils::format_short_date;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of templates per style.
pub const TEMPLATES_PER_STYLE: usize = 10;

/// Naming styles the generator implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingStyle {
    Funny,
    HardWork,
    Serious,
    Descriptive,
}

impl NamingStyle {
    pub const ALL: [NamingStyle; 4] = [
        NamingStyle::Funny,
        NamingStyle::HardWork,
        NamingStyle::Serious,
        NamingStyle::Descriptive,
    ];

    pub fn id(self) -> &'static str {
        match self {
            NamingStyle::Funny => "funny",
            NamingStyle::HardWork => "hardWork",
            NamingStyle::Serious => "serious",
            NamingStyle::Descriptive => "descriptive",
        }
    }

    /// Exact match on an implemented style id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.id() == id)
    }

    /// Style used for `id`; anything unrecognized is descriptive.
    pub fn resolve(id: &str) -> Self {
        Self::from_id(id).unwrap_or_else(|| {
            tracing::debug!(style = %id, "Unknown naming style, using descriptive");
            NamingStyle::Descriptive
        })
    }
}

/// Style choice offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleOption {
    pub id: &'static str,
    pub emoji: &'static str,
    pub label: &'static str,
    /// False when the generator falls back to descriptive for this choice
    pub implemented: bool,
}

/// Styles shown in the selector, in display order.
pub const STYLE_OPTIONS: [StyleOption; 6] = [
    StyleOption { id: "funny", emoji: "😄", label: "Funny", implemented: true },
    StyleOption { id: "hardWork", emoji: "💪", label: "Hard Work", implemented: true },
    StyleOption { id: "serious", emoji: "🎯", label: "Serious", implemented: true },
    StyleOption { id: "descriptive", emoji: "📝", label: "Descriptive", implemented: true },
    StyleOption { id: "motivational", emoji: "🚀", label: "Motivational", implemented: false },
    StyleOption { id: "achievement", emoji: "🏆", label: "Achievement", implemented: false },
];

/// Implemented style ids.
pub fn available_styles() -> Vec<&'static str> {
    NamingStyle::ALL.iter().map(|s| s.id()).collect()
}

/// Generate a name for `activity` in the style named `style`.
pub fn generate_name(activity: &Activity, style: &str) -> String {
    generate_name_with(activity, style, &mut rand::thread_rng())
}

/// Same as [`generate_name`] with a caller-supplied random source.
pub fn generate_name_with<R: Rng>(activity: &Activity, style: &str, rng: &mut R) -> String {
    let index = rng.gen_range(0..TEMPLATES_PER_STYLE);
    render_template(activity, NamingStyle::resolve(style), index)
}

/// Render template `index` (taken modulo the template count).
pub fn render_template(activity: &Activity, style: NamingStyle, index: usize) -> String {
    let q = Quantities::of(activity);
    let mut templates = templates(style, &q);
    std::mem::take(&mut templates[index % TEMPLATES_PER_STYLE])
}

/// Display values derived from an activity.
struct Quantities {
    kind: String,
    km: String,
    hours: String,
    elevation: i64,
    date: String,
}

impl Quantities {
    fn of(activity: &Activity) -> Self {
        Self {
            kind: activity.activity_type.clone(),
            km: to_fixed(activity.distance / 1000.0, 1),
            hours: to_fixed(activity.moving_time / 3600.0, 1),
            elevation: activity.total_elevation_gain.round() as i64,
            date: activity
                .start_date_utc()
                .map(format_short_date)
                .unwrap_or_else(|| "unknown date".to_string()),
        }
    }
}

fn templates(style: NamingStyle, q: &Quantities) -> [String; TEMPLATES_PER_STYLE] {
    let Quantities {
        kind: t,
        km,
        hours: h,
        elevation: e,
        date: d,
    } = q;

    match style {
        NamingStyle::Funny => [
            format!("🏃‍♂️ {t} like a caffeinated cheetah"),
            format!("🚴‍♀️ {t} - because walking is too mainstream"),
            format!("🏊‍♂️ {t} like a fish with a fitness goal"),
            format!("🏃‍♀️ {t} - {km}km of pure determination"),
            format!("🚴‍♂️ {t} up hills like a mountain goat"),
            format!("🏊‍♀️ {t} - {h}h of water therapy"),
            format!("🏃‍♂️ {t} - {e}m of elevation gain (ouch!)"),
            format!("🚴‍♀️ {t} - because cars are overrated"),
            format!("🏊‍♂️ {t} - {km}km of liquid courage"),
            format!("🏃‍♀️ {t} - {h}h of me time"),
        ],
        NamingStyle::HardWork => [
            format!("💪 {t} - {km}km of pure grit"),
            format!("🔥 {t} - {h}h of determination"),
            format!("⚡ {t} - {e}m of elevation conquered"),
            format!("💯 {t} - pushing limits, breaking barriers"),
            format!("🚀 {t} - {km}km of excellence"),
            format!("🏆 {t} - {h}h of commitment"),
            format!("💎 {t} - {e}m of strength"),
            format!("🌟 {t} - {km}km of achievement"),
            format!("⚔️ {t} - {h}h of warrior spirit"),
            format!("🎯 {t} - {e}m of perseverance"),
        ],
        NamingStyle::Serious => [
            format!("{t} - {km}km | {h}h | {e}m"),
            format!("{t} Training - {d}"),
            format!("{t} Session - {km}km Distance"),
            format!("{t} Workout - {h}h Duration"),
            format!("{t} - {km}km | {e}m Elevation"),
            format!("{t} - {d} | {km}km"),
            format!("{t} - {h}h | {e}m"),
            format!("{t} - {km}km Distance Training"),
            format!("{t} - {d} | {h}h"),
            format!("{t} - {e}m Elevation Training"),
        ],
        NamingStyle::Descriptive => [
            format!("{t} - {km}km in {h}h"),
            format!("{t} with {e}m elevation gain"),
            format!("{km}km {t} on {d}"),
            format!("{t} - {h}h, {km}km, {e}m"),
            format!("{t} session - {km}km distance"),
            format!("{t} workout - {h}h duration"),
            format!("{t} - {km}km route"),
            format!("{t} - {e}m climbing"),
            format!("{t} - {d} training"),
            format!("{t} - {km}km endurance"),
        ],
    }
}
