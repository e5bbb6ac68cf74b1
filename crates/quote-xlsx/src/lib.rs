//! Patch pre-designed `.xlsx` templates with business data.
//!
//! The template package is never regenerated: parts the fill does not touch are copied through
//! byte-for-byte, and the parts it does touch (the target worksheet, the shared string table, the
//! workbook's print area, the sheet's drawing) are edited in place so logos, borders, merged
//! headers and page setup survive.
//!
//! ```no_run
//! use quote_xlsx::{fill_quote, QuotePayload, TemplateLayout, TemplatePackage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = TemplatePackage::open("templates/cotizacion.xlsx")?;
//! let payload = QuotePayload::from_json(r#"{ "number": "045", "items": [] }"#)?;
//! let filled = fill_quote(&template, &TemplateLayout::laboratory_quote(), &payload)?;
//! std::fs::write("cotizacion-045.xlsx", filled.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod a1;
pub mod drawing;
pub mod error;
pub mod fill;
pub mod package;
pub mod recalc;
pub mod relationships;
pub mod shared_strings;
pub mod workbook;
pub mod worksheet;
pub mod xml;

pub use a1::{CellAddress, CellRange};
pub use error::{Result, TemplateError};
pub use fill::{
    fill_quote, fill_schedule, FillSummary, FilledDocument, QuotePayload, ScheduleEntry,
    TemplateLayout, Totals,
};
pub use package::TemplatePackage;
pub use shared_strings::SharedStringTable;
pub use worksheet::{CellValue, Worksheet};
