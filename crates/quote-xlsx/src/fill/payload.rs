//! Caller-supplied data for a fill.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TemplateError};
use crate::worksheet::CellValue;

/// One row of the item table, looked up by the field names a layout binds to columns.
pub trait ItemRecord {
    /// The value for `field`, or `None` when the record has no such field.
    fn cell_value(&self, field: &str) -> Result<Option<CellValue>>;
}

/// A number that may arrive as JSON text (`"150.50"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl Default for NumericInput {
    fn default() -> Self {
        NumericInput::Number(0.0)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl NumericInput {
    /// Coerce to a finite number. Blank text counts as zero.
    pub fn resolve(&self, field: &str) -> Result<f64> {
        let invalid = |value: String| TemplateError::InvalidNumericValue {
            field: field.to_string(),
            value,
        };
        let n = match self {
            NumericInput::Number(n) => *n,
            NumericInput::Text(text) if text.trim().is_empty() => 0.0,
            NumericInput::Text(text) => text.trim().parse::<f64>().map_err(|_| invalid(text.clone()))?,
        };
        if n.is_finite() {
            Ok(n)
        } else {
            Err(invalid(n.to_string()))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub name: String,
    pub tax_id: String,
    pub contact: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommercialContact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Applicable test standard.
    #[serde(default)]
    pub standard: String,
    /// Written as `SI` / `NO`; accepted as a boolean or as that same text.
    #[serde(default, deserialize_with = "deserialize_accredited")]
    pub accredited: bool,
    #[serde(default)]
    pub unit_cost: NumericInput,
    #[serde(default)]
    pub quantity: NumericInput,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AccreditedFlag {
    Bool(bool),
    Text(String),
}

fn deserialize_accredited<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match AccreditedFlag::deserialize(deserializer)? {
        AccreditedFlag::Bool(flag) => Ok(flag),
        AccreditedFlag::Text(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("SI") || text.eq_ignore_ascii_case("SÍ") {
                Ok(true)
            } else if text.is_empty() || text.eq_ignore_ascii_case("NO") {
                Ok(false)
            } else {
                Err(serde::de::Error::custom(format!(
                    "accredited must be a boolean, \"SI\" or \"NO\", got {text:?}"
                )))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentTerm {
    #[serde(rename = "valorizacion")]
    MonthlyValuation,
    #[serde(rename = "adelantado")]
    Prepaid,
    #[serde(rename = "50_adelanto")]
    HalfUpfront,
    #[serde(rename = "credito_7")]
    Credit7,
    #[serde(rename = "credito_15")]
    Credit15,
    #[serde(rename = "credito_30")]
    Credit30,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotePayload {
    /// Sequence number printed in the title, e.g. `"045"`.
    #[serde(default = "default_number")]
    pub number: String,
    /// Defaults to today's date when absent.
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub request_date: Option<NaiveDate>,
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub commercial: CommercialContact,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default = "default_include_tax")]
    pub include_tax: bool,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: NumericInput,
    /// Special conditions, one bullet each.
    #[serde(default)]
    pub conditions: Option<Vec<String>>,
    /// Working days; zero selects the generic lead-time paragraph.
    #[serde(default)]
    pub lead_time_days: Option<u32>,
    #[serde(default)]
    pub payment_term: Option<PaymentTerm>,
    /// Email named in the acceptance clause.
    #[serde(default)]
    pub acceptance_email: Option<String>,
}

fn default_number() -> String {
    "000".to_string()
}

fn default_include_tax() -> bool {
    true
}

fn default_tax_rate() -> NumericInput {
    NumericInput::Number(0.18)
}

impl Default for QuotePayload {
    fn default() -> Self {
        Self {
            number: default_number(),
            issue_date: None,
            request_date: None,
            client: ClientInfo::default(),
            project: ProjectInfo::default(),
            commercial: CommercialContact::default(),
            items: Vec::new(),
            include_tax: default_include_tax(),
            tax_rate: default_tax_rate(),
            conditions: None,
            lead_time_days: None,
            payment_term: None,
            acceptance_email: None,
        }
    }
}

impl QuotePayload {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A line item with its numbers coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine<'a> {
    pub item: &'a LineItem,
    pub unit_cost: f64,
    pub quantity: f64,
}

impl<'a> ResolvedLine<'a> {
    pub fn resolve(item: &'a LineItem, index: usize) -> Result<Self> {
        Ok(Self {
            item,
            unit_cost: item.unit_cost.resolve(&format!("items[{index}].unit_cost"))?,
            quantity: item.quantity.resolve(&format!("items[{index}].quantity"))?,
        })
    }

    pub fn subtotal(&self) -> f64 {
        self.unit_cost * self.quantity
    }
}

impl ItemRecord for ResolvedLine<'_> {
    fn cell_value(&self, field: &str) -> Result<Option<CellValue>> {
        let value = match field {
            "code" => CellValue::text(self.item.code.as_str()),
            "description" => CellValue::text(self.item.description.as_str()),
            "standard" => CellValue::text(self.item.standard.as_str()),
            "accredited" => CellValue::text(if self.item.accredited { "SI" } else { "NO" }),
            "unit_cost" => CellValue::Number(self.unit_cost),
            "quantity" => CellValue::Number(self.quantity),
            "subtotal" => CellValue::Number(self.subtotal()),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// One job in the laboratory schedule list. Every field is free text except the delay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEntry {
    pub item_number: String,
    pub reception_number: String,
    pub work_order: String,
    pub sample_codes: String,
    pub reception_date: String,
    pub start_date: String,
    pub estimated_delivery_date: String,
    pub client_name: String,
    pub service_description: String,
    pub project: String,
    pub actual_delivery: String,
    pub status: String,
    pub quote_reference: String,
    pub authorization: String,
    pub note: String,
    /// Days late; blank leaves the cell empty.
    pub delay_days: Option<NumericInput>,
    pub delay_reason: String,
    pub reception_evidence: String,
    pub report_delivery: String,
}

impl ItemRecord for ScheduleEntry {
    fn cell_value(&self, field: &str) -> Result<Option<CellValue>> {
        let text = match field {
            "item_number" => &self.item_number,
            "reception_number" => &self.reception_number,
            "work_order" => &self.work_order,
            "sample_codes" => &self.sample_codes,
            "reception_date" => &self.reception_date,
            "start_date" => &self.start_date,
            "estimated_delivery_date" => &self.estimated_delivery_date,
            "client_name" => &self.client_name,
            "service_description" => &self.service_description,
            "project" => &self.project,
            "actual_delivery" => &self.actual_delivery,
            "status" => &self.status,
            "quote_reference" => &self.quote_reference,
            "authorization" => &self.authorization,
            "note" => &self.note,
            "delay_reason" => &self.delay_reason,
            "reception_evidence" => &self.reception_evidence,
            "report_delivery" => &self.report_delivery,
            "delay_days" => {
                return Ok(Some(match &self.delay_days {
                    None => CellValue::Empty,
                    Some(NumericInput::Text(t)) if t.trim().is_empty() => CellValue::Empty,
                    Some(days) => CellValue::Number(days.resolve("delay_days")?),
                }))
            }
            _ => return Ok(None),
        };
        Ok(Some(CellValue::text(text.as_str())))
    }
}
