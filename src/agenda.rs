use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    color::Rgba8,
    error::{AgjendaError, AgjendaResult},
};

/// Item durations are clamped to this range (seconds) at creation time.
pub const MIN_DURATION_SECS: f64 = 2.0;
pub const MAX_DURATION_SECS: f64 = 60.0;

/// Accent colors cycled through as items are added.
pub const ACCENT_PALETTE: [&str; 7] = [
    "#6366f1", "#22d3ee", "#f97316", "#14b8a6", "#ec4899", "#8b5cf6", "#facc15",
];

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AgendaItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_secs: f64,
    pub accent: Rgba8,
}

impl AgendaItem {
    /// Build an item with a fresh id and the duration clamped to the
    /// accepted range.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        duration_secs: f64,
        accent: Rgba8,
    ) -> Self {
        Self {
            id: make_id(),
            title: title.into(),
            description: description.into(),
            duration_secs: duration_secs.clamp(MIN_DURATION_SECS, MAX_DURATION_SECS),
            accent,
        }
    }
}

/// Ordered playback list of agenda items.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Agenda {
    items: Vec<AgendaItem>,
}

impl Agenda {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default starter agenda.
    pub fn seed() -> Self {
        let items = vec![
            AgendaItem::new(
                "Mirëseardhje",
                "Përshëndetja hyrëse dhe prezantimi i ekipit organizator.",
                5.0,
                Rgba8::from_hex("#6366f1"),
            ),
            AgendaItem::new(
                "Agjenda e Ditës",
                "Rënditja e aktiviteteve kryesore dhe pritshmëritë për secilën prej tyre.",
                6.0,
                Rgba8::from_hex("#14b8a6"),
            ),
            AgendaItem::new(
                "Diskutime Kryesore",
                "Tema të hapura për koment, bashkëpunim dhe vendimmarrje të përbashkët.",
                6.0,
                Rgba8::from_hex("#f97316"),
            ),
            AgendaItem::new(
                "Mbyllja",
                "Pikat kryesore të përmbledhura dhe hapat e ardhshëm për pjesëmarrësit.",
                5.0,
                Rgba8::from_hex("#ec4899"),
            ),
        ];
        Self { items }
    }

    pub fn items(&self) -> &[AgendaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AgendaItem> {
        self.items.get(index)
    }

    /// Append a new item; the duration is clamped and the accent follows the
    /// palette cycle. Blank titles or descriptions are rejected.
    pub fn push(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        duration_secs: f64,
    ) -> AgjendaResult<&AgendaItem> {
        let title = title.into();
        let description = description.into();
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(AgjendaError::validation(
                "agenda item title and description must be non-empty",
            ));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(AgjendaError::validation(
                "agenda item duration must be a positive number of seconds",
            ));
        }

        let accent = Rgba8::from_hex(ACCENT_PALETTE[self.items.len() % ACCENT_PALETTE.len()]);
        self.items.push(AgendaItem::new(
            title.trim().to_owned(),
            description.trim().to_owned(),
            duration_secs,
            accent,
        ));
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn push_item(&mut self, item: AgendaItem) {
        self.items.push(item);
    }

    /// Remove the item with the given id. Removing the last remaining item
    /// is rejected so the list never becomes empty through removal.
    pub fn remove(&mut self, id: &str) -> AgjendaResult<AgendaItem> {
        if self.items.len() <= 1 {
            return Err(AgjendaError::validation(
                "the last remaining agenda item cannot be removed",
            ));
        }
        let pos = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| AgjendaError::validation(format!("no agenda item with id '{id}'")))?;
        Ok(self.items.remove(pos))
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.items.iter().map(|item| item.duration_secs).sum()
    }
}

/// Per-frame slide context, recomputed on every tick.
#[derive(Clone, Copy, Debug)]
pub struct SlideContext<'a> {
    pub item: &'a AgendaItem,
    /// Zero-based position in the agenda.
    pub index: usize,
    /// Total item count.
    pub total: usize,
    /// Fractional progress through the current item's duration, in [0, 1].
    pub focus: f64,
}

/// Unique-per-process id: wall clock salt plus a monotonic counter.
fn make_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let salt = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", salt ^ (n.rotate_left(32)), n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_clamps_duration_to_bounds() {
        let mut agenda = Agenda::new();
        agenda.push("a", "b", 0.5).unwrap();
        agenda.push("c", "d", 120.0).unwrap();
        assert_eq!(agenda.items()[0].duration_secs, MIN_DURATION_SECS);
        assert_eq!(agenda.items()[1].duration_secs, MAX_DURATION_SECS);
    }

    #[test]
    fn push_rejects_blank_fields_and_bad_durations() {
        let mut agenda = Agenda::new();
        assert!(agenda.push("  ", "desc", 5.0).is_err());
        assert!(agenda.push("title", "", 5.0).is_err());
        assert!(agenda.push("title", "desc", 0.0).is_err());
        assert!(agenda.push("title", "desc", f64::NAN).is_err());
        assert!(agenda.is_empty());
    }

    #[test]
    fn accents_cycle_through_the_palette() {
        let mut agenda = Agenda::new();
        for i in 0..9 {
            agenda.push(format!("t{i}"), "d", 5.0).unwrap();
        }
        assert_eq!(
            agenda.items()[0].accent,
            Rgba8::from_hex(ACCENT_PALETTE[0])
        );
        assert_eq!(
            agenda.items()[7].accent,
            Rgba8::from_hex(ACCENT_PALETTE[0])
        );
        assert_eq!(
            agenda.items()[8].accent,
            Rgba8::from_hex(ACCENT_PALETTE[1])
        );
    }

    #[test]
    fn remove_never_empties_the_list() {
        let mut agenda = Agenda::new();
        agenda.push("a", "x", 5.0).unwrap();
        agenda.push("b", "y", 5.0).unwrap();

        let first_id = agenda.items()[0].id.clone();
        agenda.remove(&first_id).unwrap();
        assert_eq!(agenda.len(), 1);

        let last_id = agenda.items()[0].id.clone();
        assert!(agenda.remove(&last_id).is_err());
        assert_eq!(agenda.len(), 1);
    }

    #[test]
    fn remove_unknown_id_is_an_error() {
        let mut agenda = Agenda::new();
        agenda.push("a", "x", 5.0).unwrap();
        agenda.push("b", "y", 5.0).unwrap();
        assert!(agenda.remove("nope").is_err());
        assert_eq!(agenda.len(), 2);
    }

    #[test]
    fn total_duration_is_the_sum_of_items() {
        let mut agenda = Agenda::new();
        agenda.push("a", "x", 5.0).unwrap();
        agenda.push("b", "y", 6.0).unwrap();
        assert_eq!(agenda.total_duration_secs(), 11.0);
    }

    #[test]
    fn ids_are_unique() {
        let mut agenda = Agenda::new();
        agenda.push("a", "x", 5.0).unwrap();
        agenda.push("b", "y", 5.0).unwrap();
        assert_ne!(agenda.items()[0].id, agenda.items()[1].id);
    }

    #[test]
    fn seed_agenda_matches_the_defaults() {
        let agenda = Agenda::seed();
        assert_eq!(agenda.len(), 4);
        assert_eq!(agenda.total_duration_secs(), 22.0);
        assert_eq!(agenda.items()[1].accent, Rgba8::from_hex("#14b8a6"));
    }

    #[test]
    fn json_roundtrip() {
        let agenda = Agenda::seed();
        let s = serde_json::to_string_pretty(&agenda).unwrap();
        let de: Agenda = serde_json::from_str(&s).unwrap();
        assert_eq!(de.len(), 4);
        assert_eq!(de.items()[0].title, "Mirëseardhje");
    }
}
