//! Domain types shared by every cartsync crate.
//!
//! Item identity is the exact item name. Sets are `BTreeSet`s so that every
//! derived value (targets, reports, persisted baselines) has a stable order.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item sets
// ---------------------------------------------------------------------------

/// An unordered, duplicate-free collection of item names.
pub type ItemSet = BTreeSet<String>;

/// Collapse a raw item listing into an [`ItemSet`].
///
/// Duplicates are collapsed and blank names (empty or whitespace-only) are
/// dropped. Non-blank names are kept byte-for-byte; no trimming or case
/// folding is applied.
pub fn normalize_items<I, S>(raw: I) -> ItemSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    raw.into_iter()
        .map(Into::into)
        .filter(|name| !name.trim().is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

/// One of the two synchronized list services.
///
/// Side A is the note service, side B the shopping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Note,
    Shopping,
}

impl Side {
    pub fn all() -> &'static [Side] {
        &[Side::Note, Side::Shopping]
    }

    pub fn other(self) -> Side {
        match self {
            Side::Note => Side::Shopping,
            Side::Shopping => Side::Note,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Note => write!(f, "note"),
            Side::Shopping => write!(f, "shopping"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync mode
// ---------------------------------------------------------------------------

/// How the two sides are reconciled. Fixed for the lifetime of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Three-way merge of both sides against the remembered baseline.
    #[default]
    Bidirectional,
    /// The note side is authoritative; the shopping side is overwritten.
    #[serde(rename = "mirror_from_note", alias = "mirror_from_a")]
    MirrorFromA,
    /// The shopping side is authoritative; the note side is overwritten.
    #[serde(rename = "mirror_from_shopping", alias = "mirror_from_b")]
    MirrorFromB,
}

impl SyncMode {
    /// The authoritative side for mirror modes; `None` when bidirectional.
    pub fn source(self) -> Option<Side> {
        match self {
            SyncMode::Bidirectional => None,
            SyncMode::MirrorFromA => Some(Side::Note),
            SyncMode::MirrorFromB => Some(Side::Shopping),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Bidirectional => write!(f, "bidirectional"),
            SyncMode::MirrorFromA => write!(f, "mirror_from_note"),
            SyncMode::MirrorFromB => write!(f, "mirror_from_shopping"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "bidirectional" | "both" => Ok(SyncMode::Bidirectional),
            "mirror_from_note" | "mirror_from_a" => Ok(SyncMode::MirrorFromA),
            "mirror_from_shopping" | "mirror_from_b" => Ok(SyncMode::MirrorFromB),
            other => Err(format!(
                "unknown sync mode '{other}'; expected: bidirectional, mirror_from_note, mirror_from_shopping"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// A list as exposed by a list service: opaque id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListRef {
    pub id: String,
    pub name: String,
}

impl ListRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id == self.name {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// Which of a service's lists to synchronize.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListSelector {
    /// The list whose display name matches exactly.
    Named(String),
    /// The first list the service reports.
    #[default]
    First,
}

impl ListSelector {
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.trim().is_empty() => ListSelector::Named(name.to_string()),
            _ => ListSelector::First,
        }
    }

    /// Pick the matching list out of `lists`.
    pub fn select<'a>(&self, lists: &'a [ListRef]) -> Option<&'a ListRef> {
        match self {
            ListSelector::Named(name) => lists.iter().find(|list| &list.name == name),
            ListSelector::First => lists.first(),
        }
    }
}

impl fmt::Display for ListSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSelector::Named(name) => write!(f, "'{name}'"),
            ListSelector::First => write!(f, "<first>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_duplicates() {
        let set = normalize_items(["milk", "milk", "eggs"]);
        assert_eq!(set, ItemSet::from(["milk".to_string(), "eggs".to_string()]));
    }

    #[test]
    fn normalize_drops_blank_names_but_keeps_whitespace_inside() {
        let set = normalize_items(["", "   ", " milk", "milk"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(" milk"));
        assert!(set.contains("milk"));
    }

    #[test]
    fn sync_mode_parses_aliases() {
        assert_eq!("bidirectional".parse::<SyncMode>(), Ok(SyncMode::Bidirectional));
        assert_eq!("mirror-from-a".parse::<SyncMode>(), Ok(SyncMode::MirrorFromA));
        assert_eq!("MIRROR_FROM_SHOPPING".parse::<SyncMode>(), Ok(SyncMode::MirrorFromB));
        assert!("sideways".parse::<SyncMode>().is_err());
    }

    #[test]
    fn sync_mode_display_roundtrips_through_from_str() {
        for mode in [SyncMode::Bidirectional, SyncMode::MirrorFromA, SyncMode::MirrorFromB] {
            assert_eq!(mode.to_string().parse::<SyncMode>(), Ok(mode));
        }
    }

    #[test]
    fn mirror_source_side() {
        assert_eq!(SyncMode::Bidirectional.source(), None);
        assert_eq!(SyncMode::MirrorFromA.source(), Some(Side::Note));
        assert_eq!(SyncMode::MirrorFromB.source(), Some(Side::Shopping));
    }

    #[test]
    fn selector_picks_named_or_first() {
        let lists = vec![ListRef::new("1", "Home"), ListRef::new("2", "Office")];
        assert_eq!(ListSelector::First.select(&lists), Some(&lists[0]));
        assert_eq!(
            ListSelector::Named("Office".into()).select(&lists),
            Some(&lists[1])
        );
        assert_eq!(ListSelector::Named("Cabin".into()).select(&lists), None);
        assert_eq!(ListSelector::First.select(&[]), None);
    }

    #[test]
    fn selector_from_blank_name_is_first() {
        assert_eq!(ListSelector::from_name(None), ListSelector::First);
        assert_eq!(ListSelector::from_name(Some("  ")), ListSelector::First);
        assert_eq!(
            ListSelector::from_name(Some("Home")),
            ListSelector::Named("Home".into())
        );
    }
}
