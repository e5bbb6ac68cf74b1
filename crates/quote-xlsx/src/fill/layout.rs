//! Per-template cell maps and shift policies.
//!
//! A [`TemplateLayout`] is plain data: the two built-in presets describe the laboratory quote and
//! the schedule list, and further template variants can be loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::a1::{column_to_number, CellAddress, CellRange};
use crate::error::{Result, TemplateError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateLayout {
    /// Worksheet to fill; the first sheet of the workbook when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    pub items: ItemTable,
    pub shift: ShiftPolicy,
    #[serde(default)]
    pub totals: Option<TotalsLayout>,
    #[serde(default)]
    pub header: Vec<HeaderBinding>,
    #[serde(default)]
    pub blocks: Option<TrailingBlocks>,
}

/// The variable-length list: one pre-styled template row that is cloned per extra item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemTable {
    pub first_row: u32,
    pub columns: Vec<ColumnBinding>,
    /// Columns re-merged on every duplicated row, e.g. `("C", "I")`.
    #[serde(default)]
    pub row_merge: Option<(String, String)>,
    #[serde(default)]
    pub row_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub column: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShiftPolicy {
    /// First row moved down when extra item rows are opened.
    pub threshold: u32,
    #[serde(default = "yes")]
    pub merge_ranges: bool,
    #[serde(default)]
    pub row_breaks: RowBreakPolicy,
    #[serde(default)]
    pub drawing_anchors: bool,
    #[serde(default)]
    pub print_area: bool,
    #[serde(default = "yes")]
    pub dimension: bool,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum RowBreakPolicy {
    /// Leave manual breaks where they are.
    Keep,
    /// Move breaks with the rest of the structure.
    #[default]
    Shift,
    /// Move breaks while the list has at most `max_shifted_items` items; beyond that put the
    /// first break at `anchor_row + extra_rows`, just before the fixed trailing section.
    ShiftOrReposition {
        max_shifted_items: usize,
        anchor_row: u32,
    },
}

/// Rows (before shifting) of the three aggregate cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TotalsLayout {
    pub column: String,
    pub subtotal_row: u32,
    pub tax_row: u32,
    pub total_row: u32,
}

/// A header field pinned to a fixed cell above the item table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBinding {
    pub cell: String,
    pub field: HeaderField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    Title,
    ClientName,
    ClientTaxId,
    ClientContact,
    ClientPhone,
    ClientEmail,
    ProjectName,
    ProjectLocation,
    CommercialName,
    CommercialPhone,
    RequestDate,
    IssueDate,
}

/// Rows (before shifting) of the free-text blocks below the totals, written into `first_column`
/// after blanking `first_column..=last_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrailingBlocks {
    pub first_column: String,
    pub last_column: String,
    pub conditions_row: u32,
    pub lead_time_row: u32,
    pub payment_row: u32,
    pub acceptance_row: u32,
}

impl TemplateLayout {
    /// The laboratory quote template (sheet `MORT2`).
    pub fn laboratory_quote() -> Self {
        let columns = [
            ("B", "code"),
            ("C", "description"),
            ("J", "standard"),
            ("K", "accredited"),
            ("L", "unit_cost"),
            ("M", "quantity"),
            ("N", "subtotal"),
        ];
        let header = [
            ("G3", HeaderField::Title),
            ("D5", HeaderField::ClientName),
            ("D6", HeaderField::ClientTaxId),
            ("D7", HeaderField::ClientContact),
            ("E8", HeaderField::ClientPhone),
            ("D9", HeaderField::ClientEmail),
            ("L5", HeaderField::ProjectName),
            ("E10", HeaderField::RequestDate),
            ("L7", HeaderField::ProjectLocation),
            ("L8", HeaderField::CommercialName),
            ("L9", HeaderField::CommercialPhone),
            ("L10", HeaderField::IssueDate),
        ];
        Self {
            sheet: Some("MORT2".to_string()),
            items: ItemTable {
                first_row: 17,
                columns: bindings(&columns),
                row_merge: Some(("C".to_string(), "I".to_string())),
                row_height: None,
            },
            shift: ShiftPolicy {
                threshold: 18,
                merge_ranges: true,
                row_breaks: RowBreakPolicy::ShiftOrReposition {
                    max_shifted_items: 6,
                    anchor_row: 26,
                },
                drawing_anchors: true,
                print_area: true,
                dimension: true,
            },
            totals: Some(TotalsLayout {
                column: "N".to_string(),
                subtotal_row: 18,
                tax_row: 19,
                total_row: 20,
            }),
            header: header
                .iter()
                .map(|(cell, field)| HeaderBinding {
                    cell: cell.to_string(),
                    field: *field,
                })
                .collect(),
            blocks: Some(TrailingBlocks {
                first_column: "B".to_string(),
                last_column: "N".to_string(),
                conditions_row: 23,
                lead_time_row: 24,
                payment_row: 34,
                acceptance_row: 51,
            }),
        }
    }

    /// The laboratory schedule list: one row per job from row 9, columns A..T without O.
    pub fn schedule() -> Self {
        let columns = [
            ("A", "item_number"),
            ("B", "reception_number"),
            ("C", "work_order"),
            ("D", "sample_codes"),
            ("E", "reception_date"),
            ("F", "start_date"),
            ("G", "estimated_delivery_date"),
            ("H", "client_name"),
            ("I", "service_description"),
            ("J", "project"),
            ("K", "actual_delivery"),
            ("L", "status"),
            ("M", "quote_reference"),
            ("N", "authorization"),
            ("P", "note"),
            ("Q", "delay_days"),
            ("R", "delay_reason"),
            ("S", "reception_evidence"),
            ("T", "report_delivery"),
        ];
        Self {
            sheet: None,
            items: ItemTable {
                first_row: 9,
                columns: bindings(&columns),
                row_merge: None,
                row_height: None,
            },
            shift: ShiftPolicy {
                threshold: 10,
                merge_ranges: true,
                row_breaks: RowBreakPolicy::Keep,
                drawing_anchors: false,
                print_area: false,
                dimension: true,
            },
            totals: None,
            header: Vec::new(),
            blocks: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)
            .map_err(|e| TemplateError::InvalidTemplate(format!("layout: {e}")))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every cell reference and column letter up front so a fill never fails halfway on a
    /// bad layout.
    pub fn validate(&self) -> Result<()> {
        if self.items.first_row == 0 || self.shift.threshold == 0 {
            return Err(TemplateError::InvalidTemplate(
                "layout rows are 1-based".to_string(),
            ));
        }
        if self.shift.threshold <= self.items.first_row {
            return Err(TemplateError::InvalidTemplate(format!(
                "shift threshold {} must be below the item row {}",
                self.shift.threshold, self.items.first_row
            )));
        }
        for binding in &self.items.columns {
            column_to_number(&binding.column)?;
        }
        self.row_merge_range(self.items.first_row)?;
        if let Some(totals) = &self.totals {
            column_to_number(&totals.column)?;
        }
        for binding in &self.header {
            CellAddress::parse(&binding.cell)?;
        }
        if let Some(blocks) = &self.blocks {
            column_to_number(&blocks.first_column)?;
            column_to_number(&blocks.last_column)?;
        }
        Ok(())
    }

    /// The per-row merge range for item row `row`, if the layout re-merges duplicated rows.
    pub(crate) fn row_merge_range(&self, row: u32) -> Result<Option<CellRange>> {
        let Some((first, last)) = &self.items.row_merge else {
            return Ok(None);
        };
        Ok(Some(CellRange::on_row(row, column_to_number(first)?, column_to_number(last)?)))
    }
}

fn bindings(columns: &[(&str, &str)]) -> Vec<ColumnBinding> {
    columns
        .iter()
        .map(|(column, field)| ColumnBinding {
            column: column.to_string(),
            field: field.to_string(),
        })
        .collect()
}
