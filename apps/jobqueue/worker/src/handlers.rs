//! Demonstration job handlers.
//!
//! Stand-ins for real business logic — illustrative only, so the worker
//! binary has something to dispatch out of the box.

use async_trait::async_trait;
use job_queue::{HandlerResult, JobHandler};
use serde_json::Value;
use tracing::info;

/// Pretends to send an email. Expects `{"to": "...", "subject": "..."}`.
pub struct EmailSendHandler;

#[async_trait]
impl JobHandler for EmailSendHandler {
    async fn handle(&self, payload: &Value) -> HandlerResult<()> {
        let to = payload.get("to").and_then(Value::as_str).unwrap_or("<unknown>");
        let subject = payload
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("<no subject>");
        info!(to, subject, "sending email");
        Ok(())
    }
}

/// Pretends to generate a report. Expects `{"report_type": "..."}`.
pub struct ReportGenerateHandler;

#[async_trait]
impl JobHandler for ReportGenerateHandler {
    async fn handle(&self, payload: &Value) -> HandlerResult<()> {
        let report_type = payload
            .get("report_type")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>");
        info!(report_type, "generating report");
        Ok(())
    }
}
