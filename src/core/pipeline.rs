use crate::core::rules;
use crate::domain::model::{Fields, Reservation, ReservationStatus, Table};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

/// 單一請求的暫存狀態，在各階段之間傳遞
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub today: NaiveDate,
    pub reservation_id: Option<String>,
    pub table_id: Option<String>,
    pub data: Option<Value>,
    pub reservation: Option<Reservation>,
    pub table: Option<Table>,
    pub status: Option<ReservationStatus>,
}

impl RequestContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            reservation_id: None,
            table_id: None,
            data: None,
            reservation: None,
            table: None,
            status: None,
        }
    }

    pub fn with_reservation_id(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }

    pub fn with_table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    pub fn fields(&self) -> Result<&Fields> {
        rules::require_data(self.data.as_ref())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(name))
    }

    /// The reservation attached by the lookup stage.
    pub fn loaded_reservation(&self, stage: &str) -> Result<&Reservation> {
        self.reservation.as_ref().ok_or_else(|| AppError::StageError {
            stage: stage.to_string(),
            details: "no reservation was loaded before this stage".to_string(),
        })
    }

    /// The table attached by the lookup stage.
    pub fn loaded_table(&self, stage: &str) -> Result<&Table> {
        self.table.as_ref().ok_or_else(|| AppError::StageError {
            stage: stage.to_string(),
            details: "no table was loaded before this stage".to_string(),
        })
    }
}

/// 請求處理鏈中的一個階段
#[async_trait]
pub trait Stage: Send + Sync {
    fn get_name(&self) -> &str;

    async fn apply(&self, context: RequestContext) -> Result<RequestContext>;
}

pub type StageFn = fn(RequestContext) -> Result<RequestContext>;

/// A synchronous stage backed by a plain function.
pub struct FnStage {
    name: &'static str,
    run: StageFn,
}

impl FnStage {
    pub fn new(name: &'static str, run: StageFn) -> Self {
        Self { name, run }
    }
}

#[async_trait]
impl Stage for FnStage {
    fn get_name(&self) -> &str {
        self.name
    }

    async fn apply(&self, context: RequestContext) -> Result<RequestContext> {
        (self.run)(context)
    }
}

/// 依序執行各階段，遇到第一個錯誤即停止
pub struct StageChain {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl StageChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.add_stage(Box::new(stage));
        self
    }

    pub fn with_fn(self, name: &'static str, run: StageFn) -> Self {
        self.with_stage(FnStage::new(name, run))
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.get_name()).collect()
    }

    pub async fn execute(&self, mut context: RequestContext) -> Result<RequestContext> {
        for stage in &self.stages {
            tracing::debug!("🔗 {}: running stage '{}'", self.name, stage.get_name());
            context = match stage.apply(context).await {
                Ok(context) => context,
                Err(e) => {
                    tracing::debug!(
                        "⛔ {}: stage '{}' stopped the chain: {}",
                        self.name,
                        stage.get_name(),
                        e
                    );
                    return Err(e);
                }
            };
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    struct CountingStage {
        name: String,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Stage for CountingStage {
        fn get_name(&self) -> &str {
            &self.name
        }

        async fn apply(&self, context: RequestContext) -> Result<RequestContext> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::bad_request(format!("{} failed", self.name)))
            } else {
                Ok(context)
            }
        }
    }

    fn counting(name: &str, calls: &Arc<AtomicUsize>, fail: bool) -> CountingStage {
        CountingStage {
            name: name.to_string(),
            calls: calls.clone(),
            fail,
        }
    }

    #[tokio::test]
    async fn test_chain_runs_stages_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = StageChain::new("test")
            .with_stage(counting("first", &calls, false))
            .with_stage(counting("second", &calls, false));

        assert_eq!(chain.stage_names(), vec!["first", "second"]);
        assert!(chain.execute(RequestContext::new(today())).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_short_circuits_on_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let chain = StageChain::new("test")
            .with_stage(counting("guard", &calls, true))
            .with_stage(counting("never", &after, false));

        let err = chain
            .execute(RequestContext::new(today()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "guard failed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fn_stage_can_update_context() {
        fn mark_seated(mut context: RequestContext) -> Result<RequestContext> {
            context.status = Some(ReservationStatus::Seated);
            Ok(context)
        }

        let chain = StageChain::new("test").with_fn("mark", mark_seated);
        let context = chain.execute(RequestContext::new(today())).await.unwrap();
        assert_eq!(context.status, Some(ReservationStatus::Seated));
    }

    #[test]
    fn test_context_accessors() {
        let context = RequestContext::new(today())
            .with_reservation_id("7")
            .with_data(Some(json!({"status": "seated"})));

        assert_eq!(context.reservation_id.as_deref(), Some("7"));
        assert_eq!(context.field("status"), Some(&json!("seated")));
        assert!(context.fields().is_ok());
        assert!(matches!(
            context.loaded_reservation("not_finished"),
            Err(AppError::StageError { .. })
        ));
    }
}
