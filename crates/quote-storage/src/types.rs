use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A saved quote. `(year, number)` identifies it; the full fill payload travels as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub year: i32,
    pub number: String,
    pub issue_date: Option<NaiveDate>,
    pub client_name: String,
    pub project_name: String,
    pub total: f64,
    pub payload: serde_json::Value,
}

/// Row of a quote listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub id: i64,
    pub year: i32,
    pub number: String,
    pub issue_date: Option<NaiveDate>,
    pub client_name: String,
    pub total: f64,
}
