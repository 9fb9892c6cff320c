//! CSV file endpoints

use std::path::Path;
use std::sync::Arc;

use crate::client::{json_body, ApiRequest, ApiResult, AuthenticatedClient, CancellationToken};
use crate::models::{CsvFile, MessageResponse, ReprocessResponse, UploadResponse};
use crate::upload::{CsvUpload, CSV_MIME};

/// Upload and manage CSV files
pub struct FileService {
    client: Arc<AuthenticatedClient>,
    max_upload_bytes: u64,
}

impl FileService {
    pub fn new(client: Arc<AuthenticatedClient>, max_upload_bytes: u64) -> Self {
        Self {
            client,
            max_upload_bytes,
        }
    }

    /// Validate a file on disk, then upload it
    pub async fn upload_path(&self, path: &Path) -> ApiResult<UploadResponse> {
        let upload = CsvUpload::from_path(path, self.max_upload_bytes)?;
        self.upload(upload).await
    }

    /// Upload an already-validated file as the multipart `file` field
    pub async fn upload(&self, upload: CsvUpload) -> ApiResult<UploadResponse> {
        let request = upload_request(upload);
        let response = self.client.send(&request).await?;
        json_body(response).await
    }

    /// Upload, giving up when `cancel` fires
    pub async fn upload_until(
        &self,
        upload: CsvUpload,
        cancel: &CancellationToken,
    ) -> ApiResult<UploadResponse> {
        let request = upload_request(upload);
        let response = self.client.send_until(&request, cancel).await?;
        json_body(response).await
    }

    pub async fn list(&self) -> ApiResult<Vec<CsvFile>> {
        let response = self.client.send(&ApiRequest::get("/csv-files/")).await?;
        json_body(response).await
    }

    /// Delete a file and its report
    pub async fn delete(&self, file_id: u64) -> ApiResult<MessageResponse> {
        let request = ApiRequest::delete(format!("/csv-files/{file_id}/delete/"));
        let response = self.client.send(&request).await?;
        json_body(response).await
    }

    /// Recompute the report for a file
    pub async fn reprocess(&self, file_id: u64) -> ApiResult<ReprocessResponse> {
        let request = ApiRequest::post(format!("/csv-files/{file_id}/reprocess/"));
        let response = self.client.send(&request).await?;
        json_body(response).await
    }
}

fn upload_request(upload: CsvUpload) -> ApiRequest {
    tracing::info!(file = %upload.file_name, bytes = upload.size(), "Uploading CSV");
    ApiRequest::post("/upload/").file("file", upload.file_name, CSV_MIME, upload.bytes)
}
