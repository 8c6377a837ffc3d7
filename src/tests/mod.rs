use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::api::{ApiError, Envelope, PageQuery, PaginationMeta, RecordPage, RecordsApi};
use crate::filters::FilterKey;
use crate::records::{Record, RecordDetail};
use crate::view::{
    notify, Completion, Intent, Notification, NotificationLevel, RenderState, TableController,
    TableViewModel,
};

const PAGE_ONE: &str = r#"{
  "success": true,
  "data": [
    {"id": 1, "Loja": "L01", "Remessa": 4500012345, "Codigo": "7891", "Descricao_Produto": "FITA ADESIVA TRANSPARENTE 45MM X 100M", "Qtde_Emb": "12", "Status": "Pendente", "Data_Registro_Formatted": "01/03/2024 08:15"},
    {"id": 2, "Loja": "L02", "Remessa": "4500012346", "Codigo": 7892, "Descricao_Produto": "CAIXA P", "Qtde_Emb": 3.5, "Status": "em_separacao"}
  ],
  "pagination": {"current_page": 1, "total_pages": 3, "total_records": 120, "per_page": 50, "has_prev": false, "has_next": true}
}"#;

/// In-memory API. Each page can be given a latency so responses can be
/// made to arrive out of order.
#[derive(Default)]
struct FakeApi {
    total_records: u64,
    per_page: u32,
    delays: HashMap<u32, Duration>,
    fail_pages: HashMap<u32, ApiError>,
    details: HashMap<i64, RecordDetail>,
    seen: Mutex<Vec<PageQuery>>,
}

impl FakeApi {
    fn with_records(total_records: u64) -> Self {
        Self {
            total_records,
            per_page: 50,
            ..Self::default()
        }
    }

    fn total_pages(&self) -> u32 {
        let pages = (self.total_records + u64::from(self.per_page) - 1) / u64::from(self.per_page);
        pages as u32
    }

    fn record(id: i64) -> Record {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "Loja": "L01",
            "Remessa": "4500012345",
            "Codigo": "7891",
            "Descricao_Produto": format!("ITEM {id}"),
            "Qtde_Emb": 1,
            "Status": "Finalizado"
        }))
        .unwrap()
    }

    fn seen_pages(&self) -> Vec<u32> {
        self.seen.lock().unwrap().iter().map(|q| q.page).collect()
    }
}

#[async_trait]
impl RecordsApi for FakeApi {
    async fn fetch_page(&self, query: &PageQuery) -> Result<RecordPage, ApiError> {
        self.seen.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delays.get(&query.page) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(err) = self.fail_pages.get(&query.page) {
            return Err(err.clone());
        }

        let total_pages = self.total_pages();
        let first = u64::from(query.page - 1) * u64::from(query.per_page) + 1;
        let last = (u64::from(query.page) * u64::from(query.per_page)).min(self.total_records);
        let records = if first > last {
            Vec::new()
        } else {
            (first..=last).map(|id| Self::record(id as i64)).collect()
        };
        Ok(RecordPage {
            records,
            pagination: PaginationMeta {
                current_page: query.page,
                total_pages,
                total_records: self.total_records,
                per_page: query.per_page,
                has_prev: query.page > 1,
                has_next: query.page < total_pages,
            },
        })
    }

    async fn fetch_record(&self, id: i64) -> Result<RecordDetail, ApiError> {
        self.details
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::application(Some("Registro não encontrado".to_string())))
    }
}

#[test]
fn data_envelope_decodes_into_rows() {
    let env: Envelope<Vec<Record>> = serde_json::from_str(PAGE_ONE).unwrap();
    let page = env.into_page().unwrap();

    let mut vm = TableViewModel::default();
    let req = vm.open().unwrap();
    assert_eq!(vm.complete(&req, Ok(page)), Completion::Applied(RenderState::Loaded));

    let view = vm.view();
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].shipment_id, "4500012345");
    assert_eq!(view.rows[0].description, "FITA ADESIVA TRANSPARENTE 45MM...");
    assert_eq!(view.rows[0].registered_at, "01/03/2024 08:15");
    assert_eq!(view.rows[1].product_code, "7892");
    assert_eq!(view.rows[1].packaging_qty, "3.5");
    assert_eq!(view.rows[1].registered_at, "N/A");

    let pagination = view.pagination.unwrap();
    assert_eq!(pagination.range.to_string(), "1-50");
    assert!(pagination.next_enabled);
    assert!(!pagination.prev_enabled);
}

#[test]
fn failed_envelope_uses_server_message() {
    let env: Envelope<Vec<Record>> =
        serde_json::from_str(r#"{"success": false, "error": "Tabela temp_embalagem indisponível"}"#)
            .unwrap();
    let mut vm = TableViewModel::default();
    let req = vm.open().unwrap();
    vm.complete(&req, env.into_page());

    assert_eq!(vm.state(), RenderState::Empty);
    let notes = vm.take_notifications();
    assert_eq!(notes[0].message, "Tabela temp_embalagem indisponível");
}

#[tokio::test]
async fn controller_walks_pages_and_filters() {
    let mut controller = TableController::new(FakeApi::with_records(120), 50);

    assert_eq!(
        controller.dispatch(Intent::Open).await,
        Some(Completion::Applied(RenderState::Loaded))
    );
    controller.dispatch(Intent::GoToPage(3)).await;
    let view = controller.model().view();
    assert_eq!(view.rows.len(), 20);
    assert_eq!(view.pagination.unwrap().range.to_string(), "101-120");

    assert_eq!(controller.dispatch(Intent::NextPage).await, None);
    assert_eq!(controller.dispatch(Intent::GoToPage(4)).await, None);

    controller
        .dispatch(Intent::ApplyFilters {
            values: vec![
                ("status".to_string(), "Finalizado".to_string()),
                ("remessa".to_string(), String::new()),
            ],
        })
        .await;
    assert_eq!(controller.model().page_state().current_page, 1);

    let seen = controller.api().seen.lock().unwrap().clone();
    assert_eq!(seen.iter().map(|q| q.page).collect::<Vec<_>>(), vec![1, 3, 1]);
    let last = seen.last().unwrap();
    assert_eq!(last.filters.get(FilterKey::Status), Some("Finalizado"));
    assert_eq!(last.filters.len(), 1);
}

#[tokio::test]
async fn ignored_intent_queues_info_notice() {
    let mut controller = TableController::new(FakeApi::with_records(30), 50);
    controller.dispatch(Intent::Open).await;
    assert_eq!(controller.dispatch(Intent::NextPage).await, None);

    controller
        .model_mut()
        .notify(Notification::info(notify::NOTHING_TO_DO));
    let notes = controller.model_mut().take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Info);
    assert_eq!(controller.api().seen_pages(), vec![1]);
}

#[tokio::test]
async fn empty_listing_renders_empty_without_notification() {
    let mut controller = TableController::new(FakeApi::with_records(0), 50);
    let outcome = controller.dispatch(Intent::Open).await;
    assert_eq!(outcome, Some(Completion::Applied(RenderState::Empty)));
    assert!(controller.model_mut().take_notifications().is_empty());
}

#[tokio::test]
async fn network_failure_is_recoverable_by_refresh() {
    let mut api = FakeApi::with_records(120);
    api.fail_pages.insert(2, ApiError::network("connection reset"));
    let mut controller = TableController::new(api, 50);

    controller.dispatch(Intent::Open).await;
    controller.dispatch(Intent::NextPage).await;
    assert_eq!(controller.model().state(), RenderState::Empty);
    let notes = controller.model_mut().take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, notify::LOAD_CONNECTION_FAILED);

    controller.dispatch(Intent::Refresh).await;
    assert_eq!(controller.api().seen_pages(), vec![1, 2, 2]);
}

#[tokio::test]
async fn missing_record_queues_detail_notification() {
    let mut controller = TableController::new(FakeApi::with_records(10), 50);
    assert!(controller.view_record(99).await.is_none());
    let notes = controller.model_mut().take_notifications();
    assert_eq!(notes[0].message, "Registro não encontrado");
}

#[tokio::test(start_paused = true)]
async fn slow_older_response_cannot_overwrite_newer_page() {
    let mut api = FakeApi::with_records(500);
    api.delays.insert(1, Duration::from_millis(900));
    api.delays.insert(2, Duration::from_millis(100));

    let mut vm = TableViewModel::default();
    let first = vm.open().unwrap();
    vm.complete(&first, api.fetch_page(&first.query).await);

    // A (page 1) goes out, then B (page 2) before A resolves
    let a = vm.go_to_page(1).unwrap();
    let b = vm.go_to_page(2).unwrap();

    let mut in_flight = FuturesUnordered::new();
    for request in [a, b] {
        let api = &api;
        in_flight.push(async move {
            let result = api.fetch_page(&request.query).await;
            (request, result)
        });
    }

    let mut outcomes = Vec::new();
    while let Some((request, result)) = in_flight.next().await {
        outcomes.push((request.query.page, vm.complete(&request, result)));
    }
    drop(in_flight);

    assert_eq!(
        outcomes,
        vec![
            (2, Completion::Applied(RenderState::Loaded)),
            (1, Completion::Stale)
        ]
    );
    let view = vm.view();
    assert_eq!(view.pagination.unwrap().current_page, 2);
    assert_eq!(view.rows.first().map(|r| r.id), Some(51));
    assert_eq!(vm.state(), RenderState::Loaded);
}
