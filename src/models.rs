//! API Data Types
//!
//! Request and response bodies exchanged with the IntelliReport API.
//! Everything here is owned by the server; the client only caches copies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================
// Authentication
// ============================================

/// Profile of the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// "First Last", falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Access/refresh token pair issued at login or registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Login form
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration form
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

/// Partial profile update; only set fields are sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.company.is_none()
            && self.position.is_none()
    }
}

/// Response of `/auth/login/` and `/auth/register/`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

/// Response of `/auth/token/refresh/`; `refresh` is present when the server rotates it
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

// ============================================
// Files
// ============================================

/// Processing state of an uploaded CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// An uploaded CSV file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFile {
    pub id: u64,
    pub original_name: String,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response of `/upload/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub csv_file: CsvFile,
    pub report_id: u64,
}

/// Response of `/csv-files/:id/reprocess/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReprocessResponse {
    pub message: String,
    pub report_id: u64,
}

/// Plain `{ "message": ... }` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================
// Reports
// ============================================

/// Chart-ready series: parallel labels and values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub data: Vec<f64>,
}

impl ChartData {
    /// Label/value pairs, truncated to the shorter side
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.data.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() || self.data.is_empty()
    }
}

/// Month-over-month sales entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub sales: f64,
    #[serde(default)]
    pub growth: f64,
}

/// One parsed sales row, as sampled by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: u64,
    pub date: NaiveDate,
    pub product: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub region: String,
    pub sales_amount: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub additional_data: HashMap<String, serde_json::Value>,
}

/// Full server-computed report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: u64,
    pub csv_file: CsvFile,
    /// Decimal serialized as a string by the server
    #[serde(default)]
    pub total_sales: Option<String>,
    /// Null until analysis completes
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_records: u64,
    #[serde(default)]
    pub date_range_start: Option<NaiveDate>,
    #[serde(default)]
    pub date_range_end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_products: ChartData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sales_by_region: ChartData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sales_by_date: ChartData,
    /// Stored as `{}` when analysis never ran
    #[serde(default, deserialize_with = "trends_or_empty")]
    pub monthly_trends: Vec<MonthlyTrend>,
    #[serde(default)]
    pub auto_insights: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sales_data_sample: Vec<SalesRecord>,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

impl Report {
    pub fn total_sales_value(&self) -> Option<f64> {
        parse_amount(self.total_sales.as_deref())
    }

    /// Insights split into non-empty lines
    pub fn insights(&self) -> Vec<&str> {
        self.auto_insights
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/// Report row used in listings and on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: u64,
    pub csv_file: CsvFile,
    #[serde(default)]
    pub total_sales: Option<String>,
    /// Null until analysis completes
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_records: u64,
    #[serde(default)]
    pub date_range_start: Option<NaiveDate>,
    #[serde(default)]
    pub date_range_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl ReportSummary {
    pub fn total_sales_value(&self) -> Option<f64> {
        parse_amount(self.total_sales.as_deref())
    }
}

fn parse_amount(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TrendsField {
    List(Vec<MonthlyTrend>),
    Other(serde_json::Value),
}

fn trends_or_empty<'de, D>(deserializer: D) -> Result<Vec<MonthlyTrend>, D::Error>
where
    D: Deserializer<'de>,
{
    match TrendsField::deserialize(deserializer)? {
        TrendsField::List(trends) => Ok(trends),
        TrendsField::Other(_) => Ok(Vec::new()),
    }
}

/// Response of `/reports/:id/generate-pdf/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub pdf_url: String,
}

// ============================================
// Dashboard
// ============================================

/// Aggregate counters across all of a user's files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub total_reports: u64,
    #[serde(default)]
    pub completed_files: u64,
    #[serde(default)]
    pub processing_files: u64,
    #[serde(default)]
    pub error_files: u64,
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub total_records: u64,
}

/// Response of `/dashboard/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub statistics: DashboardStats,
    #[serde(default)]
    pub recent_reports: Vec<ReportSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn csv_file_json() -> serde_json::Value {
        json!({
            "id": 3,
            "original_name": "ventas.csv",
            "status": "completed",
            "created_at": "2024-03-01T10:00:00.123456Z",
            "updated_at": "2024-03-01T10:00:05Z"
        })
    }

    #[test]
    fn test_report_deserialize() {
        let body = json!({
            "id": 7,
            "csv_file": csv_file_json(),
            "total_sales": "15230.50",
            "total_records": 120,
            "date_range_start": "2024-01-01",
            "date_range_end": "2024-02-29",
            "top_products": {"labels": ["Laptop", "Mouse"], "data": [9000.0, 230.5]},
            "sales_by_region": {},
            "sales_by_date": {"labels": [], "data": []},
            "monthly_trends": [{"month": "2024-01", "sales": 8000.0, "growth": 0.0}],
            "auto_insights": "Laptop leads sales.\n\nNorth is the strongest region.",
            "created_at": "2024-03-01T10:00:06Z",
            "updated_at": "2024-03-01T10:00:06Z",
            "sales_data_sample": [{
                "id": 1,
                "date": "2024-01-02",
                "product": "Laptop",
                "category": "Electronics",
                "region": "North",
                "sales_amount": "1200.00",
                "quantity": 1,
                "additional_data": {"channel": "web"}
            }],
            "pdf_url": null
        });

        let report: Report = serde_json::from_value(body).unwrap();
        assert_eq!(report.csv_file.status, FileStatus::Completed);
        assert_eq!(report.total_sales_value(), Some(15230.5));
        assert_eq!(report.top_products.points().count(), 2);
        assert!(report.sales_by_region.is_empty());
        assert_eq!(report.insights().len(), 2);
        assert!(report.pdf_url.is_none());
    }

    #[test]
    fn test_dashboard_deserialize() {
        let body = json!({
            "statistics": {
                "total_files": 4,
                "total_reports": 3,
                "completed_files": 3,
                "processing_files": 0,
                "error_files": 1,
                "total_sales": 45000.75,
                "total_records": 900
            },
            "recent_reports": [{
                "id": 9,
                "csv_file": csv_file_json(),
                "total_sales": null,
                "total_records": 0,
                "date_range_start": null,
                "date_range_end": null,
                "created_at": "2024-03-02T08:00:00Z"
            }]
        });

        let dashboard: DashboardData = serde_json::from_value(body).unwrap();
        assert_eq!(dashboard.statistics.error_files, 1);
        assert_eq!(dashboard.recent_reports.len(), 1);
        assert_eq!(dashboard.recent_reports[0].total_sales_value(), None);
    }

    #[test]
    fn test_unanalyzed_report_rows() {
        let summary: ReportSummary = serde_json::from_value(json!({
            "id": 5,
            "csv_file": csv_file_json(),
            "total_sales": null,
            "total_records": null,
            "date_range_start": null,
            "date_range_end": null,
            "created_at": "2024-03-02T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(summary.total_records, 0);

        let report: Report = serde_json::from_value(json!({
            "id": 5,
            "csv_file": csv_file_json(),
            "total_sales": null,
            "total_records": null,
            "top_products": {},
            "sales_by_region": {},
            "sales_by_date": {},
            "monthly_trends": {},
            "auto_insights": "",
            "created_at": "2024-03-02T08:00:00Z",
            "updated_at": "2024-03-02T08:00:00Z",
            "pdf_url": null
        }))
        .unwrap();
        assert_eq!(report.total_records, 0);
        assert!(report.monthly_trends.is_empty());
        assert!(report.top_products.is_empty());
        assert!(report.insights().is_empty());
    }

    #[test]
    fn test_dashboard_with_unanalyzed_report() {
        let dashboard: DashboardData = serde_json::from_value(json!({
            "statistics": {"total_files": 1, "total_reports": 1},
            "recent_reports": [{
                "id": 5,
                "csv_file": csv_file_json(),
                "total_records": null,
                "created_at": "2024-03-02T08:00:00Z"
            }]
        }))
        .unwrap();
        assert_eq!(dashboard.recent_reports[0].total_records, 0);
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            company: Some("Acme".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"company": "Acme"}));
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user: UserProfile = serde_json::from_value(json!({
            "id": 1,
            "email": "a@b.com",
            "username": "ana",
            "first_name": "",
            "last_name": "",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(user.display_name(), "ana");
    }
}
