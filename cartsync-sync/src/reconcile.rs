//! Three-way reconciliation of the two sides against the previous baseline.
//!
//! Pure and deterministic: no I/O, no clock, no randomness. The same three
//! sets and mode always produce the same [`Reconciliation`].
//!
//! # Bidirectional policy
//!
//! For every name in `A ∪ B ∪ prev`:
//!
//! | on A | on B | in prev | fate                              |
//! |------|------|---------|-----------------------------------|
//! | yes  | yes  | any     | kept                              |
//! | yes  | no   | no      | added on A, copied to B           |
//! | yes  | no   | yes     | deleted on B, removed from A      |
//! | no   | yes  | no      | added on B, copied to A           |
//! | no   | yes  | yes     | deleted on A, removed from B      |
//! | no   | no   | yes     | vanished, dropped                 |
//!
//! Deletions win: a name missing from one side but remembered in the
//! baseline is removed everywhere, never re-added. Without a baseline every
//! name counts as new, so the first pass seeds both sides with `A ∪ B`.

use std::collections::BTreeMap;

use serde::Serialize;

use cartsync_core::{ItemSet, Side, SyncMode};

/// Why an item ends up in, or out of, the target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "fate", rename_all = "snake_case")]
pub enum ItemFate {
    /// Present on both sides.
    Kept,
    /// Present only on `from`; copied to the other side.
    Copied { from: Side },
    /// Gone from `on`; removed from the other side as well.
    Deleted { on: Side },
    /// Gone from both sides since the baseline.
    Vanished,
}

impl ItemFate {
    /// Whether the item belongs to the target set.
    pub fn is_retained(self) -> bool {
        matches!(self, ItemFate::Kept | ItemFate::Copied { .. })
    }
}

/// Outcome of one reconciliation.
///
/// `target_a`, `target_b` and `baseline` are always equal: both sides
/// converge on one logical list. They are kept separate to mirror the two
/// apply call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub mode: SyncMode,
    /// Bidirectional pass without a previous baseline.
    pub seeded: bool,
    pub target_a: ItemSet,
    pub target_b: ItemSet,
    pub baseline: ItemSet,
    pub fates: BTreeMap<String, ItemFate>,
}

impl Reconciliation {
    pub fn target(&self, side: Side) -> &ItemSet {
        match side {
            Side::Note => &self.target_a,
            Side::Shopping => &self.target_b,
        }
    }
}

/// Classify one item under the bidirectional policy.
pub fn classify(on_a: bool, on_b: bool, in_prev: bool) -> ItemFate {
    match (on_a, on_b, in_prev) {
        (true, true, _) => ItemFate::Kept,
        (true, false, false) => ItemFate::Copied { from: Side::Note },
        (true, false, true) => ItemFate::Deleted { on: Side::Shopping },
        (false, true, false) => ItemFate::Copied {
            from: Side::Shopping,
        },
        (false, true, true) => ItemFate::Deleted { on: Side::Note },
        (false, false, _) => ItemFate::Vanished,
    }
}

/// Compute the target set and new baseline for one pass.
///
/// Mirror modes never look at `prev`.
pub fn reconcile(
    set_a: &ItemSet,
    set_b: &ItemSet,
    prev: Option<&ItemSet>,
    mode: SyncMode,
) -> Reconciliation {
    let (fates, seeded) = match mode {
        SyncMode::MirrorFromA => (mirror(Side::Note, set_a, set_b), false),
        SyncMode::MirrorFromB => (mirror(Side::Shopping, set_b, set_a), false),
        SyncMode::Bidirectional => {
            let empty = ItemSet::new();
            let remembered = prev.unwrap_or(&empty);
            let fates: BTreeMap<String, ItemFate> = set_a
                .iter()
                .chain(set_b)
                .chain(remembered)
                .map(|item| {
                    let fate = classify(
                        set_a.contains(item),
                        set_b.contains(item),
                        remembered.contains(item),
                    );
                    (item.clone(), fate)
                })
                .collect();
            (fates, prev.is_none())
        }
    };

    let baseline: ItemSet = fates
        .iter()
        .filter(|(_, fate)| fate.is_retained())
        .map(|(item, _)| item.clone())
        .collect();

    Reconciliation {
        mode,
        seeded,
        target_a: baseline.clone(),
        target_b: baseline.clone(),
        baseline,
        fates,
    }
}

fn mirror(source: Side, from: &ItemSet, other: &ItemSet) -> BTreeMap<String, ItemFate> {
    from.iter()
        .chain(other)
        .map(|item| {
            let fate = match (from.contains(item), other.contains(item)) {
                (true, true) => ItemFate::Kept,
                (true, false) => ItemFate::Copied { from: source },
                (false, _) => ItemFate::Deleted { on: source },
            };
            (item.clone(), fate)
        })
        .collect()
}
