pub mod controller;
pub mod notify;
pub mod pagination;

use serde::Serialize;

use crate::api::{ApiError, PageQuery, PaginationMeta, RecordPage, DEFAULT_PER_PAGE};
use crate::filters::FilterSet;
use crate::records::Record;
use crate::utils;

pub use controller::TableController;
pub use notify::{Notification, NotificationLevel};
pub use pagination::{DisplayRange, PageItem, PaginationView};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageState {
    pub current_page: u32,
    pub total_pages: u32,
    pub per_page: u32,
    pub filters: FilterSet,
}

impl PageState {
    fn new(per_page: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            per_page: per_page.max(1),
            filters: FilterSet::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Idle,
    Loading,
    Loaded,
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Open,
    ApplyFilters { values: Vec<(String, String)> },
    ClearFilters,
    GoToPage(u32),
    NextPage,
    PreviousPage,
    Refresh,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadRequest {
    pub seq: u64,
    pub query: PageQuery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Applied(RenderState),
    /// A newer request was issued; the result was discarded.
    Stale,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    pub id: i64,
    pub store: String,
    pub shipment_id: String,
    pub product_code: String,
    pub description: String,
    pub description_full: String,
    pub packaging_qty: String,
    pub status_label: String,
    pub status_class: String,
    pub registered_at: String,
}

impl From<&Record> for TableRow {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            store: record.store.clone(),
            shipment_id: record.shipment_id.clone(),
            product_code: record.product_code.clone(),
            description: record.short_description(),
            description_full: record.product_description.clone(),
            packaging_qty: utils::format_quantity(record.packaging_qty),
            status_label: record.status.to_string(),
            status_class: record.status.css_class(),
            registered_at: record.registered_at_display().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableView {
    pub state: RenderState,
    pub rows: Vec<TableRow>,
    pub pagination: Option<PaginationView>,
    pub filters: FilterSet,
}

pub struct TableViewModel {
    page: PageState,
    render: RenderState,
    rows: Vec<TableRow>,
    meta: Option<PaginationMeta>,
    opened: bool,
    last_seq: u64,
    pending: Option<u64>,
    notifications: Vec<Notification>,
}

impl Default for TableViewModel {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl TableViewModel {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: PageState::new(per_page),
            render: RenderState::Idle,
            rows: Vec::new(),
            meta: None,
            opened: false,
            last_seq: 0,
            pending: None,
            notifications: Vec::new(),
        }
    }

    pub fn state(&self) -> RenderState {
        self.render
    }

    pub fn page_state(&self) -> &PageState {
        &self.page
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn open(&mut self) -> Option<LoadRequest> {
        if self.opened {
            return None;
        }
        let filters = self.page.filters.clone();
        Some(self.load(1, filters))
    }

    /// Replaces the current filters (never merges) and goes back to page 1.
    pub fn apply_filters<I, K, V>(&mut self, raw: I) -> Option<LoadRequest>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let filters = FilterSet::from_raw(raw);
        Some(self.load(1, filters))
    }

    pub fn clear_filters(&mut self) -> Option<LoadRequest> {
        Some(self.load(1, FilterSet::new()))
    }

    pub fn go_to_page(&mut self, page: u32) -> Option<LoadRequest> {
        if page < 1 || page > self.page.total_pages {
            tracing::debug!(page, total_pages = self.page.total_pages, "ignoring page out of range");
            return None;
        }
        let filters = self.page.filters.clone();
        Some(self.load(page, filters))
    }

    pub fn next_page(&mut self) -> Option<LoadRequest> {
        if self.page.current_page >= self.page.total_pages {
            return None;
        }
        self.go_to_page(self.page.current_page + 1)
    }

    pub fn previous_page(&mut self) -> Option<LoadRequest> {
        if self.page.current_page <= 1 {
            return None;
        }
        self.go_to_page(self.page.current_page - 1)
    }

    pub fn refresh(&mut self) -> Option<LoadRequest> {
        let filters = self.page.filters.clone();
        Some(self.load(self.page.current_page, filters))
    }

    pub fn dispatch(&mut self, intent: Intent) -> Option<LoadRequest> {
        match intent {
            Intent::Open => self.open(),
            Intent::ApplyFilters { values } => self.apply_filters(values),
            Intent::ClearFilters => self.clear_filters(),
            Intent::GoToPage(page) => self.go_to_page(page),
            Intent::NextPage => self.next_page(),
            Intent::PreviousPage => self.previous_page(),
            Intent::Refresh => self.refresh(),
        }
    }

    /// Enters Loading and returns the request that must be fetched. Any
    /// request issued before this one becomes stale.
    pub fn load(&mut self, page: u32, filters: FilterSet) -> LoadRequest {
        self.opened = true;
        self.last_seq += 1;
        self.pending = Some(self.last_seq);
        self.page.current_page = page.max(1);
        self.page.filters = filters;
        self.render = RenderState::Loading;

        let request = LoadRequest {
            seq: self.last_seq,
            query: PageQuery {
                page: self.page.current_page,
                per_page: self.page.per_page,
                filters: self.page.filters.clone(),
            },
        };
        tracing::debug!(
            seq = request.seq,
            page = request.query.page,
            filters = self.page.filters.len(),
            "load issued"
        );
        request
    }

    pub fn complete(
        &mut self,
        request: &LoadRequest,
        result: Result<RecordPage, ApiError>,
    ) -> Completion {
        if self.pending != Some(request.seq) {
            tracing::debug!(
                seq = request.seq,
                latest = self.last_seq,
                "discarding stale response"
            );
            return Completion::Stale;
        }
        self.pending = None;

        match result {
            Ok(page) => {
                let meta = page.pagination;
                self.page.total_pages = meta.total_pages.max(1);
                self.page.current_page = meta.current_page.clamp(1, self.page.total_pages);
                self.rows = page.records.iter().map(TableRow::from).collect();
                self.render = if self.rows.is_empty() {
                    RenderState::Empty
                } else {
                    RenderState::Loaded
                };
                self.meta = Some(meta);
            }
            Err(err) => {
                tracing::warn!(seq = request.seq, error = %err, "load failed");
                self.rows.clear();
                self.meta = None;
                self.render = RenderState::Empty;
                self.notifications.push(Notification::load_failure(&err));
            }
        }
        Completion::Applied(self.render)
    }

    pub fn detail_failed(&mut self, err: &ApiError) {
        tracing::warn!(error = %err, "record lookup failed");
        self.notifications.push(Notification::detail_failure(err));
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn view(&self) -> TableView {
        let pagination = match (&self.meta, self.render) {
            (Some(meta), RenderState::Loaded) => Some(PaginationView::from_meta(meta)),
            _ => None,
        };
        TableView {
            state: self.render,
            rows: self.rows.clone(),
            pagination,
            filters: self.page.filters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterKey;
    use crate::records::RecordStatus;

    fn record(id: i64) -> Record {
        Record {
            id,
            store: "L01".to_string(),
            shipment_id: format!("45000{id}"),
            product_code: "7891".to_string(),
            product_description: "CAIXA DE PAPELAO ONDULADO 40X30X20 REFORCADA".to_string(),
            packaging_qty: 12.0,
            status: RecordStatus::Pendente,
            registered_at_formatted: None,
        }
    }

    fn page(current: u32, total_pages: u32, total_records: u64, ids: &[i64]) -> RecordPage {
        RecordPage {
            records: ids.iter().copied().map(record).collect(),
            pagination: PaginationMeta {
                current_page: current,
                total_pages,
                total_records,
                per_page: 50,
                has_prev: current > 1,
                has_next: current < total_pages,
            },
        }
    }

    fn loaded_on(current: u32, total_pages: u32) -> TableViewModel {
        let mut vm = TableViewModel::default();
        let req = vm.open().unwrap();
        vm.complete(&req, Ok(page(1, total_pages, 500, &[1, 2])));
        if current != 1 {
            let req = vm.go_to_page(current).unwrap();
            vm.complete(&req, Ok(page(current, total_pages, 500, &[3])));
        }
        vm
    }

    #[test]
    fn nothing_loads_before_open() {
        let mut vm = TableViewModel::default();
        assert_eq!(vm.state(), RenderState::Idle);
        let req = vm.open().unwrap();
        assert_eq!(vm.state(), RenderState::Loading);
        assert_eq!(req.query.page, 1);
        assert_eq!(req.query.per_page, 50);
        assert!(vm.open().is_none());
    }

    #[test]
    fn apply_filters_strips_blanks_and_resets_page() {
        let mut vm = loaded_on(5, 10);
        assert_eq!(vm.page_state().current_page, 5);

        let req = vm
            .apply_filters([("status", "pendente"), ("remessa", "")])
            .unwrap();
        assert_eq!(req.query.page, 1);
        assert_eq!(vm.page_state().current_page, 1);
        assert_eq!(req.query.filters.len(), 1);
        assert_eq!(req.query.filters.get(FilterKey::Status), Some("pendente"));
        assert_eq!(req.query.filters.get(FilterKey::Remessa), None);
    }

    #[test]
    fn apply_filters_replaces_previous_values() {
        let mut vm = loaded_on(1, 3);
        vm.apply_filters([("loja", "L01"), ("codigo", "7891")]);
        let req = vm.apply_filters([("status", "Faturado")]).unwrap();
        assert_eq!(req.query.filters.len(), 1);
        assert_eq!(req.query.filters.get(FilterKey::Loja), None);
    }

    #[test]
    fn clear_filters_empties_the_set() {
        let mut vm = loaded_on(2, 3);
        vm.apply_filters([("loja", "L01")]);
        let req = vm.clear_filters().unwrap();
        assert!(req.query.filters.is_empty());
        assert_eq!(req.query.page, 1);
    }

    #[test]
    fn out_of_range_pages_are_ignored() {
        let mut vm = loaded_on(2, 4);
        let before = vm.view();

        assert!(vm.go_to_page(0).is_none());
        assert!(vm.go_to_page(5).is_none());
        assert_eq!(vm.page_state().current_page, 2);
        assert_eq!(vm.view(), before);
        assert!(!vm.is_loading());
    }

    #[test]
    fn next_and_previous_stop_at_boundaries() {
        let mut vm = loaded_on(1, 2);
        assert!(vm.previous_page().is_none());
        let req = vm.next_page().unwrap();
        assert_eq!(req.query.page, 2);
        vm.complete(&req, Ok(page(2, 2, 60, &[51])));
        assert!(vm.next_page().is_none());
        assert_eq!(vm.previous_page().unwrap().query.page, 1);
    }

    #[test]
    fn empty_result_is_not_a_failure() {
        let mut vm = TableViewModel::default();
        let req = vm.open().unwrap();
        let outcome = vm.complete(&req, Ok(page(1, 0, 0, &[])));
        assert_eq!(outcome, Completion::Applied(RenderState::Empty));
        assert!(vm.take_notifications().is_empty());
        assert_eq!(vm.page_state().total_pages, 1);
        assert!(vm.view().pagination.is_none());
    }

    #[test]
    fn failures_end_in_empty_with_a_notification() {
        let mut vm = loaded_on(1, 3);
        let req = vm.next_page().unwrap();
        let outcome = vm.complete(&req, Err(ApiError::network("timed out")));
        assert_eq!(outcome, Completion::Applied(RenderState::Empty));
        assert!(vm.view().rows.is_empty());

        let notes = vm.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, notify::LOAD_CONNECTION_FAILED);

        // refresh retries the page that failed
        assert_eq!(vm.refresh().unwrap().query.page, 2);
    }

    #[test]
    fn later_request_wins_over_late_response() {
        let mut vm = loaded_on(1, 5);
        let a = vm.go_to_page(1).unwrap();
        let b = vm.go_to_page(2).unwrap();

        assert_eq!(
            vm.complete(&b, Ok(page(2, 5, 250, &[51, 52]))),
            Completion::Applied(RenderState::Loaded)
        );
        assert_eq!(vm.complete(&a, Ok(page(1, 5, 250, &[1]))), Completion::Stale);

        let view = vm.view();
        assert_eq!(view.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![51, 52]);
        assert_eq!(view.pagination.unwrap().current_page, 2);
        assert_eq!(vm.page_state().current_page, 2);
    }

    #[test]
    fn stale_failure_does_not_notify() {
        let mut vm = loaded_on(1, 5);
        let a = vm.next_page().unwrap();
        let b = vm.refresh().unwrap();
        assert_eq!(
            vm.complete(&a, Err(ApiError::application(None))),
            Completion::Stale
        );
        assert!(vm.take_notifications().is_empty());
        assert!(vm.is_loading());
        vm.complete(&b, Ok(page(2, 5, 250, &[51])));
        assert_eq!(vm.state(), RenderState::Loaded);
    }

    #[test]
    fn rows_truncate_long_descriptions() {
        let mut vm = TableViewModel::default();
        let req = vm.open().unwrap();
        vm.complete(&req, Ok(page(1, 1, 1, &[7])));
        let row = &vm.view().rows[0];
        assert_eq!(row.description.chars().count(), 33);
        assert!(row.description.ends_with("..."));
        assert_eq!(row.description_full.chars().count(), 44);
        assert_eq!(row.status_class, "pendente");
        assert_eq!(row.registered_at, "N/A");
        assert_eq!(row.packaging_qty, "12");
    }

    #[test]
    fn dispatch_routes_intents() {
        let mut vm = TableViewModel::default();
        assert!(vm.dispatch(Intent::Open).is_some());
        let req = vm
            .dispatch(Intent::ApplyFilters {
                values: vec![("status".into(), "Finalizado".into())],
            })
            .unwrap();
        assert_eq!(req.query.filters.get(FilterKey::Status), Some("Finalizado"));
        assert!(vm.dispatch(Intent::GoToPage(9)).is_none());
    }
}
