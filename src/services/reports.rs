//! Dashboard and report endpoints

use std::sync::Arc;

use crate::client::{
    ensure_success, json_body, ApiError, ApiRequest, ApiResult, AuthenticatedClient,
};
use crate::models::{DashboardData, PdfResponse, Report, ReportSummary};

/// Read reports and drive server-side PDF generation
pub struct ReportService {
    client: Arc<AuthenticatedClient>,
}

impl ReportService {
    pub fn new(client: Arc<AuthenticatedClient>) -> Self {
        Self { client }
    }

    pub async fn dashboard(&self) -> ApiResult<DashboardData> {
        let response = self.client.send(&ApiRequest::get("/dashboard/")).await?;
        json_body(response).await
    }

    pub async fn list(&self) -> ApiResult<Vec<ReportSummary>> {
        let response = self.client.send(&ApiRequest::get("/reports/")).await?;
        json_body(response).await
    }

    pub async fn get(&self, report_id: u64) -> ApiResult<Report> {
        let request = ApiRequest::get(format!("/reports/{report_id}/"));
        let response = self.client.send(&request).await?;
        json_body(response).await
    }

    /// Ask the server to render the PDF; returns its URL
    pub async fn generate_pdf(&self, report_id: u64) -> ApiResult<PdfResponse> {
        let request = ApiRequest::post(format!("/reports/{report_id}/generate-pdf/"));
        let response = self.client.send(&request).await?;
        json_body(response).await
    }

    /// Discard the stored PDF and render it again
    pub async fn regenerate_pdf(&self, report_id: u64) -> ApiResult<PdfResponse> {
        let request = ApiRequest::post(format!("/reports/{report_id}/regenerate-pdf/"));
        let response = self.client.send(&request).await?;
        json_body(response).await
    }

    /// Raw PDF bytes
    pub async fn download_pdf(&self, report_id: u64) -> ApiResult<Vec<u8>> {
        let request = ApiRequest::get(format!("/reports/{report_id}/download-pdf/"))
            .header("accept", "application/pdf");
        let response = ensure_success(self.client.send(&request).await?).await?;
        let bytes = response.bytes().await.map_err(ApiError::transport)?;
        tracing::debug!(report_id, bytes = bytes.len(), "PDF downloaded");
        Ok(bytes.to_vec())
    }
}
