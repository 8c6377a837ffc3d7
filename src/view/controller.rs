use crate::api::RecordsApi;
use crate::records::RecordDetail;
use crate::view::{Completion, Intent, LoadRequest, TableViewModel};

pub struct TableController<A> {
    api: A,
    model: TableViewModel,
}

impl<A: RecordsApi> TableController<A> {
    pub fn new(api: A, per_page: u32) -> Self {
        Self {
            api,
            model: TableViewModel::new(per_page),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn model(&self) -> &TableViewModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TableViewModel {
        &mut self.model
    }

    /// Applies `intent` and waits for the resulting load, if any. `None`
    /// means the intent was a no-op.
    pub async fn dispatch(&mut self, intent: Intent) -> Option<Completion> {
        let request = self.model.dispatch(intent)?;
        Some(self.execute(request).await)
    }

    pub async fn execute(&mut self, request: LoadRequest) -> Completion {
        let result = self.api.fetch_page(&request.query).await;
        self.model.complete(&request, result)
    }

    pub async fn view_record(&mut self, id: i64) -> Option<RecordDetail> {
        match self.api.fetch_record(id).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                self.model.detail_failed(&err);
                None
            }
        }
    }
}
