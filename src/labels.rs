use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketGroup {
    Goalscorers,
    ScoreAndWin,
    ShotsOnTarget,
    TotalShots,
    Assists,
    Cards,
    Fouls,
    Tackles,
    Offsides,
    Passes,
    Other,
}

impl MarketGroup {
    pub fn label(self) -> &'static str {
        match self {
            MarketGroup::Goalscorers => "Goalscorers",
            MarketGroup::ScoreAndWin => "Score & Win",
            MarketGroup::ShotsOnTarget => "Shots On Target",
            MarketGroup::TotalShots => "Total Shots",
            MarketGroup::Assists => "Assists",
            MarketGroup::Cards => "Cards",
            MarketGroup::Fouls => "Fouls",
            MarketGroup::Tackles => "Tackles",
            MarketGroup::Offsides => "Offsides",
            MarketGroup::Passes => "Passes",
            MarketGroup::Other => "Other",
        }
    }
}

/// Substring test over a lowercased market name: every `all` needle, at
/// least one `any` needle (when `any` is non-empty) and no `none` needle.
#[derive(Debug, Clone, Copy)]
pub struct NamePattern {
    pub all: &'static [&'static str],
    pub any: &'static [&'static str],
    pub none: &'static [&'static str],
}

impl NamePattern {
    const fn all(all: &'static [&'static str]) -> Self {
        Self { all, any: &[], none: &[] }
    }

    const fn any(any: &'static [&'static str]) -> Self {
        Self { all: &[], any, none: &[] }
    }

    const fn with_any(self, any: &'static [&'static str]) -> Self {
        Self { all: self.all, any, none: self.none }
    }

    const fn without(self, none: &'static [&'static str]) -> Self {
        Self { all: self.all, any: self.any, none }
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.all.iter().all(|n| lowered.contains(n))
            && (self.any.is_empty() || self.any.iter().any(|n| lowered.contains(n)))
            && !self.none.iter().any(|n| lowered.contains(n))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GroupRule {
    pub pattern: NamePattern,
    pub group: MarketGroup,
}

#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub pattern: NamePattern,
    pub label: &'static str,
}

/// Evaluated top to bottom, first match wins. Order matters: "Player to
/// Score and Team Win" must hit ScoreAndWin before Goalscorers.
pub static GROUP_RULES: &[GroupRule] = &[
    GroupRule { pattern: NamePattern::all(&["shot", "target"]), group: MarketGroup::ShotsOnTarget },
    GroupRule { pattern: NamePattern::all(&["shot"]), group: MarketGroup::TotalShots },
    GroupRule { pattern: NamePattern::all(&["assist"]), group: MarketGroup::Assists },
    GroupRule { pattern: NamePattern::all(&["score", "win", "team"]), group: MarketGroup::ScoreAndWin },
    GroupRule { pattern: NamePattern::any(&["goalscorer", "score"]), group: MarketGroup::Goalscorers },
    GroupRule { pattern: NamePattern::any(&["card", "shown"]), group: MarketGroup::Cards },
    GroupRule { pattern: NamePattern::all(&["offside"]), group: MarketGroup::Offsides },
    GroupRule { pattern: NamePattern::all(&["foul"]), group: MarketGroup::Fouls },
    GroupRule { pattern: NamePattern::all(&["tackle"]), group: MarketGroup::Tackles },
    GroupRule { pattern: NamePattern::all(&["pass"]), group: MarketGroup::Passes },
];

pub static MARKET_LABEL_RULES: &[LabelRule] = &[
    LabelRule { pattern: NamePattern::all(&["score", "win", "team"]), label: "daje gol i tim pobeđuje" },
    LabelRule {
        pattern: NamePattern::all(&["first"]).with_any(&["goalscorer", "scorer"]),
        label: "daje prvi gol",
    },
    LabelRule {
        pattern: NamePattern::all(&["last"]).with_any(&["goalscorer", "scorer"]),
        label: "daje poslednji gol",
    },
    LabelRule { pattern: NamePattern::any(&["hat-trick", "hattrick", "hat trick"]), label: "daje het-trik" },
    LabelRule { pattern: NamePattern::any(&["goalscorer", "scorer", "to score"]), label: "daje gol" },
    LabelRule { pattern: NamePattern::all(&["shot", "target"]), label: "šutevi u okvir gola" },
    LabelRule { pattern: NamePattern::all(&["shot"]), label: "ukupno šuteva" },
    LabelRule { pattern: NamePattern::all(&["assist"]), label: "asistencija" },
    LabelRule { pattern: NamePattern::any(&["red card", "sent off"]), label: "crveni karton" },
    LabelRule {
        pattern: NamePattern::any(&["card", "shown", "booked"]).without(&["red card", "sent off"]),
        label: "dobija karton",
    },
    LabelRule { pattern: NamePattern::all(&["foul"]), label: "broj faula" },
    LabelRule { pattern: NamePattern::all(&["tackle"]), label: "broj startova" },
    LabelRule { pattern: NamePattern::all(&["offside"]), label: "broj ofsajda" },
    LabelRule { pattern: NamePattern::all(&["pass"]), label: "broj pasova" },
];

/// Generic outcome words and their localized selection labels.
pub static SELECTION_WORDS: &[(&'static str, &'static str)] = &[
    ("yes", "DA"),
    ("no", "NE"),
    ("over", "Više"),
    ("under", "Manje"),
];

pub const DEFAULT_SELECTION_LABEL: &str = "DA";

static AT_LEAST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^\d.])(\d+)\s*(?:or more|\+)").expect("valid regex"));
static EXACTLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bexactly\s+(\d+)\b").expect("valid regex"));

pub fn classify(market_name: &str) -> MarketGroup {
    let lowered = market_name.to_lowercase();
    GROUP_RULES
        .iter()
        .find(|rule| rule.pattern.matches(&lowered))
        .map(|rule| rule.group)
        .unwrap_or(MarketGroup::Other)
}

/// Localized market label; unknown markets keep the provider text.
pub fn map_market_label(market_name: &str) -> String {
    let lowered = market_name.to_lowercase();
    MARKET_LABEL_RULES
        .iter()
        .find(|rule| rule.pattern.matches(&lowered))
        .map(|rule| rule.label.to_string())
        .unwrap_or_else(|| market_name.trim().to_string())
}

pub fn map_selection_label(market_name: &str, outcome_name: &str) -> String {
    if let Some(label) = selection_word_label(outcome_name) {
        return label;
    }
    if let Some(line) = market_line(market_name) {
        return line;
    }
    DEFAULT_SELECTION_LABEL.to_string()
}

/// Splits a generic outcome into its localized word and numeric line:
/// "Over 1.5" -> ("Više", "1.5"), "Yes" -> ("DA", ""). Anything else,
/// including "No Goalscorer", is a selection name and yields `None`.
pub fn selection_word(outcome_name: &str) -> Option<(&'static str, &str)> {
    let trimmed = outcome_name.trim();
    let (word, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let lowered = word.to_lowercase();
    let (_, label) = SELECTION_WORDS.iter().find(|(w, _)| *w == lowered)?;
    let line = rest.trim();
    line.chars()
        .all(|c| c.is_ascii_digit() || c == '.')
        .then_some((*label, line))
}

fn selection_word_label(outcome_name: &str) -> Option<String> {
    selection_word(outcome_name).map(|(label, line)| {
        if line.is_empty() {
            label.to_string()
        } else {
            format!("{label} {line}")
        }
    })
}

/// Threshold embedded in a market name: "2 or more" -> "2+", "exactly 1" -> "1".
pub fn market_line(market_name: &str) -> Option<String> {
    if let Some(caps) = AT_LEAST_RE.captures(market_name) {
        return Some(format!("{}+", &caps[1]));
    }
    EXACTLY_RE
        .captures(market_name)
        .map(|caps| caps[1].to_string())
}
