//! Presentation layer over the history store.
//!
//! The controller owns no persisted state. It reads records from the
//! [`HistoryStore`], sorts a transient copy, turns them into [`HistoryCard`]s,
//! and routes view/delete/clear requests back through the store. Prompts and
//! notices go through [`Interaction`] so any front end (terminal, tests) can
//! drive it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::history::HistoryStore;
use crate::session::SessionStage;
use crate::storage::Storage;
use crate::text_utils::{escape_html, sort_key, summary_preview};
use crate::{AnalysisRecord, Clock, dates};

pub const NO_SUMMARY: &str = "Sin resumen disponible";
pub const EMPTY_HISTORY: &str = "No hay análisis en el historial.";
pub const MSG_LOAD_FAILED: &str = "No se pudo cargar el resultado.";
pub const MSG_CONFIRM_DELETE: &str = "¿Estás seguro de que deseas eliminar este análisis del historial?";
pub const MSG_DELETE_FAILED: &str = "Error al eliminar el análisis.";
pub const MSG_CONFIRM_CLEAR: &str =
    "¿Estás seguro de que deseas eliminar TODO el historial? Esta acción no se puede deshacer.";
pub const MSG_CLEAR_FAILED: &str = "Error al eliminar el historial.";

/// Order in which history cards are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    DateDesc,
    DateAsc,
    #[default]
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::DateDesc,
        SortOrder::DateAsc,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date-desc",
            SortOrder::DateAsc => "date-asc",
            SortOrder::NameAsc => "name-asc",
            SortOrder::NameDesc => "name-desc",
        }
    }

    /// Sort a copy of `records`. Equal keys keep their stored order.
    pub fn apply(self, records: &[AnalysisRecord]) -> Vec<AnalysisRecord> {
        let mut sorted = records.to_vec();
        match self {
            SortOrder::DateDesc => sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortOrder::DateAsc => sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::NameAsc => sorted.sort_by(|a, b| compare_names(&a.file_name, &b.file_name)),
            SortOrder::NameDesc => sorted.sort_by(|a, b| compare_names(&b.file_name, &a.file_name)),
        }
        sorted
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown sort order '{s}' (expected date-desc, date-asc, name-asc or name-desc)")
            })
    }
}

/// One history entry prepared for display.
///
/// `*_html` fields are escaped for markup; the plain fields are for
/// terminals and other non-HTML surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCard {
    pub id: i64,
    pub file_name: String,
    pub file_name_html: String,
    pub date_label: String,
    pub timestamp: DateTime<Utc>,
    pub preview: String,
    pub preview_html: String,
}

impl HistoryCard {
    pub fn from_record(record: &AnalysisRecord, now: DateTime<Utc>) -> Self {
        let preview = record
            .result
            .summary()
            .map(summary_preview)
            .unwrap_or_else(|| NO_SUMMARY.to_string());
        Self {
            id: record.id,
            file_name: record.file_name.clone(),
            file_name_html: escape_html(&record.file_name),
            date_label: dates::relative_label(record.timestamp, now),
            timestamp: record.timestamp,
            preview_html: escape_html(&preview),
            preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPage {
    /// Nothing stored: show the empty-state placeholder and hide "clear all".
    Empty,
    Cards(Vec<HistoryCard>),
}

impl HistoryPage {
    pub fn cards(&self) -> &[HistoryCard] {
        match self {
            HistoryPage::Empty => &[],
            HistoryPage::Cards(cards) => cards,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, HistoryPage::Empty)
    }
}

/// Where the front end should go after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Results,
}

/// Result of a confirmed-or-declined history mutation, with the page to show
/// next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done(HistoryPage),
    Cancelled(HistoryPage),
    /// Storage refused the change; the user has already been notified.
    Failed(HistoryPage),
}

impl ActionOutcome {
    pub fn page(&self) -> &HistoryPage {
        match self {
            ActionOutcome::Done(page) | ActionOutcome::Cancelled(page) | ActionOutcome::Failed(page) => page,
        }
    }

    pub fn into_page(self) -> HistoryPage {
        match self {
            ActionOutcome::Done(page) | ActionOutcome::Cancelled(page) | ActionOutcome::Failed(page) => page,
        }
    }
}

/// User prompts and notices.
pub trait Interaction {
    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, message: &str) -> bool;
    /// Show a message the user has to see.
    fn notify(&mut self, message: &str);
}

pub struct HistoryController<'a, S, T, C> {
    store: &'a HistoryStore<S, C>,
    session: &'a SessionStage<T>,
    sort: SortOrder,
}

impl<'a, S: Storage, T: Storage, C: Clock> HistoryController<'a, S, T, C> {
    pub fn new(store: &'a HistoryStore<S, C>, session: &'a SessionStage<T>, sort: SortOrder) -> Self {
        Self { store, session, sort }
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortOrder) -> HistoryPage {
        self.sort = sort;
        self.load()
    }

    pub fn load(&self) -> HistoryPage {
        self.load_at(Utc::now())
    }

    /// Render against a fixed "now" so relative labels are reproducible.
    pub fn load_at(&self, now: DateTime<Utc>) -> HistoryPage {
        let records = self.store.get_all();
        if records.is_empty() {
            return HistoryPage::Empty;
        }
        let cards = self
            .sort
            .apply(&records)
            .iter()
            .map(|r| HistoryCard::from_record(r, now))
            .collect();
        HistoryPage::Cards(cards)
    }

    /// Stage a stored record for the results view.
    pub fn view(&self, id: i64, ui: &mut dyn Interaction) -> Option<Navigation> {
        let Some(record) = self.store.get_by_id(id) else {
            ui.notify(MSG_LOAD_FAILED);
            return None;
        };
        if let Err(e) = self.session.stage_from_history(&record.file_name, &record.result) {
            tracing::error!(id, error = %e, "failed to stage history item");
            ui.notify(MSG_LOAD_FAILED);
            return None;
        }
        Some(Navigation::Results)
    }

    /// Delete one record after confirmation.
    pub fn delete(&self, id: i64, ui: &mut dyn Interaction) -> ActionOutcome {
        if !ui.confirm(MSG_CONFIRM_DELETE) {
            return ActionOutcome::Cancelled(self.load());
        }
        if self.store.delete_by_id(id).is_err() {
            ui.notify(MSG_DELETE_FAILED);
            return ActionOutcome::Failed(self.load());
        }
        ActionOutcome::Done(self.load())
    }

    /// Clear everything after the stronger confirmation.
    pub fn clear_all(&self, ui: &mut dyn Interaction) -> ActionOutcome {
        if !ui.confirm(MSG_CONFIRM_CLEAR) {
            return ActionOutcome::Cancelled(self.load());
        }
        if self.store.clear_all().is_err() {
            ui.notify(MSG_CLEAR_FAILED);
            return ActionOutcome::Failed(self.load());
        }
        ActionOutcome::Done(self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryConfig;
    use crate::storage::{MemoryStorage, StorageError};
    use crate::testing::ManualClock;
    use crate::AnalysisResult;

    /// Scripted prompt answers plus a log of notices.
    #[derive(Default)]
    struct ScriptedUi {
        answer: bool,
        prompts: Vec<String>,
        notices: Vec<String>,
    }

    impl ScriptedUi {
        fn answering(answer: bool) -> Self {
            Self {
                answer,
                ..Default::default()
            }
        }
    }

    impl Interaction for ScriptedUi {
        fn confirm(&mut self, message: &str) -> bool {
            self.prompts.push(message.to_string());
            self.answer
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    /// Storage that reads fine but refuses every write.
    struct ReadOnlyStorage(MemoryStorage);

    impl Storage for ReadOnlyStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get_item(key)
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded { needed: 1, quota: 0 })
        }
        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded { needed: 1, quota: 0 })
        }
    }

    fn with_summary(text: &str) -> AnalysisResult {
        AnalysisResult {
            resumen_ejecutivo: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn seeded(storage: &MemoryStorage, clock: &ManualClock, names: &[&str]) -> Vec<i64> {
        let config = HistoryConfig {
            max_items: 10,
            ..Default::default()
        };
        let store = HistoryStore::with_clock(storage, config, clock);
        names
            .iter()
            .map(|n| {
                let id = store.insert(n, with_summary(n)).unwrap().id;
                clock.advance_secs(60);
                id
            })
            .collect()
    }

    fn card_names(page: &HistoryPage) -> Vec<&str> {
        page.cards().iter().map(|c| c.file_name.as_str()).collect()
    }

    #[test]
    fn empty_history_renders_empty_state() {
        let storage = MemoryStorage::new();
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());
        assert!(controller.load().is_empty());
        assert!(controller.load().cards().is_empty());
    }

    #[test]
    fn sort_orders() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        seeded(&storage, &clock, &["beta.pdf", "Árbol.pdf", "alfa.pdf", "Zeta.pdf"]);
        let store = HistoryStore::new(&storage, HistoryConfig { max_items: 10, ..Default::default() });
        let session = SessionStage::new(MemoryStorage::new());
        let mut controller = HistoryController::new(&store, &session, SortOrder::default());

        assert_eq!(
            card_names(&controller.load()),
            vec!["alfa.pdf", "Árbol.pdf", "beta.pdf", "Zeta.pdf"]
        );
        assert_eq!(
            card_names(&controller.set_sort(SortOrder::NameDesc)),
            vec!["Zeta.pdf", "beta.pdf", "Árbol.pdf", "alfa.pdf"]
        );
        assert_eq!(
            card_names(&controller.set_sort(SortOrder::DateDesc)),
            vec!["Zeta.pdf", "alfa.pdf", "Árbol.pdf", "beta.pdf"]
        );
        assert_eq!(
            card_names(&controller.set_sort(SortOrder::DateAsc)),
            vec!["beta.pdf", "Árbol.pdf", "alfa.pdf", "Zeta.pdf"]
        );
    }

    #[test]
    fn sorting_does_not_touch_the_store() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        seeded(&storage, &clock, &["b.pdf", "a.pdf"]);
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        let before = store.get_all();

        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::NameAsc);
        controller.load();
        assert_eq!(store.get_all(), before);
    }

    #[test]
    fn name_sort_is_stable_for_equal_keys() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        let ids = seeded(&storage, &clock, &["lab.pdf", "LAB.pdf", "Láb.pdf"]);
        let store = HistoryStore::new(&storage, HistoryConfig { max_items: 10, ..Default::default() });
        let records = store.get_all();

        let sorted = SortOrder::NameAsc.apply(&records);
        let sorted_ids: Vec<i64> = sorted.iter().map(|r| r.id).collect();
        // All three fold to the same key, so stored (newest-first) order wins.
        assert_eq!(sorted_ids, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn cards_escape_untrusted_text() {
        let storage = MemoryStorage::new();
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        store
            .insert(
                "<script>alert(1)</script>.pdf",
                with_summary("**Nivel** <b>alto</b> de [hierro](http://x)"),
            )
            .unwrap();
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());

        let page = controller.load();
        let card = &page.cards()[0];
        assert_eq!(card.file_name_html, "&lt;script&gt;alert(1)&lt;/script&gt;.pdf");
        assert_eq!(card.preview, "Nivel <b>alto</b> de hierro");
        assert_eq!(card.preview_html, "Nivel &lt;b&gt;alto&lt;/b&gt; de hierro");
    }

    #[test]
    fn card_without_summary_shows_placeholder() {
        let record = AnalysisRecord {
            id: 1,
            file_name: "a.pdf".into(),
            timestamp: Utc::now(),
            result: AnalysisResult::default(),
        };
        let card = HistoryCard::from_record(&record, record.timestamp);
        assert_eq!(card.preview, NO_SUMMARY);
        assert_eq!(card.date_label, "Hace un momento");
    }

    #[test]
    fn view_stages_record_with_history_flag() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        let ids = seeded(&storage, &clock, &["a.pdf"]);
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());
        let mut ui = ScriptedUi::default();

        assert_eq!(controller.view(ids[0], &mut ui), Some(Navigation::Results));
        let staged = session.take().unwrap().unwrap();
        assert!(staged.from_history);
        assert_eq!(staged.file_name.as_deref(), Some("a.pdf"));
        assert_eq!(staged.result, with_summary("a.pdf"));
        assert!(ui.notices.is_empty());
    }

    #[test]
    fn view_unknown_id_notifies() {
        let storage = MemoryStorage::new();
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());
        let mut ui = ScriptedUi::default();

        assert_eq!(controller.view(7, &mut ui), None);
        assert_eq!(ui.notices, vec![MSG_LOAD_FAILED]);
        assert!(session.take().unwrap().is_none());
    }

    #[test]
    fn delete_requires_confirmation() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        let ids = seeded(&storage, &clock, &["a.pdf", "b.pdf"]);
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());

        let mut declined = ScriptedUi::answering(false);
        let outcome = controller.delete(ids[0], &mut declined);
        assert!(matches!(outcome, ActionOutcome::Cancelled(_)));
        assert_eq!(card_names(outcome.page()), vec!["a.pdf", "b.pdf"]);
        assert_eq!(declined.prompts, vec![MSG_CONFIRM_DELETE]);

        let mut accepted = ScriptedUi::answering(true);
        let outcome = controller.delete(ids[0], &mut accepted);
        assert!(matches!(outcome, ActionOutcome::Done(_)));
        assert_eq!(card_names(outcome.page()), vec!["b.pdf"]);
        assert!(accepted.notices.is_empty());
    }

    #[test]
    fn failed_delete_is_reported_as_failure() {
        let inner = MemoryStorage::new();
        let clock = ManualClock::new();
        let ids = seeded(&inner, &clock, &["a.pdf"]);
        let store = HistoryStore::new(ReadOnlyStorage(inner), HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());
        let mut ui = ScriptedUi::answering(true);

        match controller.delete(ids[0], &mut ui) {
            ActionOutcome::Failed(page) => assert_eq!(card_names(&page), vec!["a.pdf"]),
            other => panic!("expected a failed delete, got {other:?}"),
        }
        assert_eq!(ui.notices, vec![MSG_DELETE_FAILED]);
    }

    #[test]
    fn clear_all_uses_stronger_warning() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        seeded(&storage, &clock, &["a.pdf", "b.pdf"]);
        let store = HistoryStore::new(&storage, HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());

        let mut declined = ScriptedUi::answering(false);
        let outcome = controller.clear_all(&mut declined);
        assert!(matches!(outcome, ActionOutcome::Cancelled(_)));
        assert!(!outcome.page().is_empty());

        let mut accepted = ScriptedUi::answering(true);
        assert_eq!(controller.clear_all(&mut accepted), ActionOutcome::Done(HistoryPage::Empty));
        assert_eq!(accepted.prompts, vec![MSG_CONFIRM_CLEAR]);
        assert!(MSG_CONFIRM_CLEAR.contains("no se puede deshacer"));
    }

    #[test]
    fn failed_clear_notifies() {
        let inner = MemoryStorage::new();
        let clock = ManualClock::new();
        seeded(&inner, &clock, &["a.pdf"]);
        let store = HistoryStore::new(ReadOnlyStorage(inner), HistoryConfig::default());
        let session = SessionStage::new(MemoryStorage::new());
        let controller = HistoryController::new(&store, &session, SortOrder::default());
        let mut ui = ScriptedUi::answering(true);

        let outcome = controller.clear_all(&mut ui);
        assert!(matches!(outcome, ActionOutcome::Failed(_)));
        assert!(!outcome.page().is_empty());
        assert_eq!(ui.notices, vec![MSG_CLEAR_FAILED]);
    }

    #[test]
    fn sort_order_parses() {
        assert_eq!("date-desc".parse::<SortOrder>().unwrap(), SortOrder::DateDesc);
        assert_eq!("NAME-ASC".parse::<SortOrder>().unwrap(), SortOrder::NameAsc);
        assert!("random".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::NameAsc);
    }
}
