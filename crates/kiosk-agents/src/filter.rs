//! Request-type content filter.
//!
//! Retrieved passages are filtered before they reach generation so an answer
//! about opening hours is not polluted with menu or seating text. Each
//! request type carries an include set (a passage must hit at least one) and
//! an exclude set (a passage must hit none). Keyword sets are a seed policy
//! table covering Japanese and English content.

use kiosk_core::ScoredPassage;
use std::collections::HashMap;
use tracing::debug;

struct FilterRule {
    include: &'static [&'static str],
    exclude: &'static [&'static str],
}

const HOURS_INCLUDE: &[&str] = &[
    "am", "pm", ":", "open", "close", "hour", "time", "営業", "時間", "開", "閉", "時",
];
const HOURS_EXCLUDE: &[&str] = &[
    "menu", "price", "fee", "seat", "メニュー", "料金", "座席", "¥",
];

const PRICING_INCLUDE: &[&str] = &[
    "price", "fee", "cost", "admission", "ticket", "free", "¥", "yen", "料金", "値段", "円", "無料", "チケット",
];
const PRICING_EXCLUDE: &[&str] = &["menu", "seat", "メニュー", "座席"];

const ACCESS_INCLUDE: &[&str] = &[
    "station", "bus", "train", "walk", "exit", "parking", "駅", "バス", "電車", "徒歩", "出口", "駐車",
];
const ACCESS_EXCLUDE: &[&str] = &["menu", "price", "メニュー", "料金"];

const MENU_INCLUDE: &[&str] = &[
    "menu", "coffee", "tea", "lunch", "dish", "drink", "メニュー", "コーヒー", "ランチ", "ドリンク", "食",
];
const MENU_EXCLUDE: &[&str] = &["parking", "station", "駐車", "駅"];

const SEATING_INCLUDE: &[&str] = &[
    "seat", "seating", "capacity", "table", "席", "座席", "満席", "テーブル", "名様",
];
const SEATING_EXCLUDE: &[&str] = &["parking", "駐車"];

const RESERVATION_INCLUDE: &[&str] = &[
    "reserve", "reservation", "book", "advance", "予約", "事前", "申し込み",
];
const RESERVATION_EXCLUDE: &[&str] = &["parking", "駐車"];

/// Passage filter keyed on request type. Unknown request types pass
/// everything through unchanged.
pub struct ContentFilter {
    rules: HashMap<&'static str, FilterRule>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            "hours",
            FilterRule {
                include: HOURS_INCLUDE,
                exclude: HOURS_EXCLUDE,
            },
        );
        rules.insert(
            "pricing",
            FilterRule {
                include: PRICING_INCLUDE,
                exclude: PRICING_EXCLUDE,
            },
        );
        rules.insert(
            "access",
            FilterRule {
                include: ACCESS_INCLUDE,
                exclude: ACCESS_EXCLUDE,
            },
        );
        rules.insert(
            "menu",
            FilterRule {
                include: MENU_INCLUDE,
                exclude: MENU_EXCLUDE,
            },
        );
        rules.insert(
            "seating",
            FilterRule {
                include: SEATING_INCLUDE,
                exclude: SEATING_EXCLUDE,
            },
        );
        rules.insert(
            "reservation",
            FilterRule {
                include: RESERVATION_INCLUDE,
                exclude: RESERVATION_EXCLUDE,
            },
        );
        Self { rules }
    }
}

impl ContentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep passages that hit at least one include keyword and no exclude
    /// keyword for the request type.
    pub fn apply(&self, request_type: Option<&str>, passages: Vec<ScoredPassage>) -> Vec<ScoredPassage> {
        let Some(rule) = request_type.and_then(|rt| self.rules.get(rt)) else {
            return passages;
        };
        let before = passages.len();
        let kept: Vec<ScoredPassage> = passages
            .into_iter()
            .filter(|p| {
                let text = p.text.to_lowercase();
                rule.include.iter().any(|k| text.contains(k))
                    && !rule.exclude.iter().any(|k| text.contains(k))
            })
            .collect();
        if kept.len() < before {
            debug!(
                request_type = request_type.unwrap_or(""),
                before,
                after = kept.len(),
                "passages filtered by request type"
            );
        }
        kept
    }
}
