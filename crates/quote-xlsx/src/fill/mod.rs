//! Document fill: open item rows, write items, totals, header and trailing blocks, then emit the
//! patched package.
//!
//! Every fill works on its own copy of the parsed parts; the [`TemplatePackage`] passed in is
//! only read, so one loaded template can serve any number of fills. Nothing is emitted unless
//! every step succeeds.

mod clauses;
mod layout;
mod payload;

pub use clauses::{acceptance, format_date, lead_time, payment, special_conditions, title};
pub use layout::{
    ColumnBinding, HeaderBinding, HeaderField, ItemTable, RowBreakPolicy, ShiftPolicy,
    TemplateLayout, TotalsLayout, TrailingBlocks,
};
pub use payload::{
    ClientInfo, CommercialContact, ItemRecord, LineItem, NumericInput, PaymentTerm, ProjectInfo,
    QuotePayload, ResolvedLine, ScheduleEntry,
};

use chrono::{Local, NaiveDate};

use crate::a1::{column_to_number, CellAddress, CellRange};
use crate::drawing::Drawing;
use crate::error::{Result, TemplateError};
use crate::package::TemplatePackage;
use crate::recalc::{drop_calc_chain, CALC_CHAIN_PART};
use crate::relationships::resolve_relationship;
use crate::shared_strings::{SharedStringTable, SHARED_STRINGS_PART};
use crate::workbook::{SheetEntry, Workbook, WORKBOOK_PART};
use crate::worksheet::{CellValue, Worksheet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// subtotal = Σ unit_cost × quantity; tax = subtotal × rate when included, else 0.
pub fn compute_totals(lines: &[ResolvedLine<'_>], include_tax: bool, tax_rate: f64) -> Totals {
    let subtotal: f64 = lines.iter().map(ResolvedLine::subtotal).sum();
    let tax = if include_tax { subtotal * tax_rate } else { 0.0 };
    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillSummary {
    pub items: usize,
    pub extra_rows: u32,
    pub totals: Option<Totals>,
    /// Part names rewritten in the output, in write order.
    pub modified_parts: Vec<String>,
    /// Template parts left out of the output.
    pub removed_parts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FilledDocument {
    pub bytes: Vec<u8>,
    pub summary: FillSummary,
}

/// Fill the laboratory quote (or any layout of the same shape).
pub fn fill_quote(
    template: &TemplatePackage,
    layout: &TemplateLayout,
    payload: &QuotePayload,
) -> Result<FilledDocument> {
    layout.validate()?;
    let lines = payload
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| ResolvedLine::resolve(item, idx))
        .collect::<Result<Vec<_>>>()?;
    let tax_rate = payload.tax_rate.resolve("tax_rate")?;
    let issue_date = payload
        .issue_date
        .unwrap_or_else(|| Local::now().date_naive());

    let mut session = FillSession::open(template, layout)?;
    let extra_rows = session.open_item_rows(layout, lines.len())?;
    session.write_items(layout, &lines)?;

    let totals = compute_totals(&lines, payload.include_tax, tax_rate);
    if let Some(totals_layout) = &layout.totals {
        session.write_totals(totals_layout, extra_rows, &totals)?;
    }
    session.write_header(layout, payload, issue_date)?;
    if let Some(blocks) = &layout.blocks {
        session.write_blocks(blocks, extra_rows, payload)?;
    }

    log::info!(
        "filled quote {:?}: {} items, {extra_rows} extra rows, subtotal {}, tax {}, total {}",
        payload.number,
        lines.len(),
        totals.subtotal,
        totals.tax,
        totals.total
    );
    session.finish(lines.len(), extra_rows, layout.totals.as_ref().map(|_| totals))
}

/// Fill the schedule list: item rows only, no totals, header or trailing blocks.
pub fn fill_schedule(
    template: &TemplatePackage,
    layout: &TemplateLayout,
    entries: &[ScheduleEntry],
) -> Result<FilledDocument> {
    layout.validate()?;
    let mut session = FillSession::open(template, layout)?;
    let extra_rows = session.open_item_rows(layout, entries.len())?;
    session.write_items(layout, entries)?;
    log::info!("filled schedule: {} entries, {extra_rows} extra rows", entries.len());
    session.finish(entries.len(), extra_rows, None)
}

/// Parsed parts of one fill.
struct FillSession {
    package: TemplatePackage,
    workbook: Workbook,
    sheet: SheetEntry,
    worksheet: Worksheet,
    strings: Option<SharedStringTable>,
    drawing: Option<Drawing>,
    workbook_changed: bool,
}

impl FillSession {
    fn open(template: &TemplatePackage, layout: &TemplateLayout) -> Result<Self> {
        let package = template.clone();
        let workbook = Workbook::load(&package)?;
        let sheet = match &layout.sheet {
            Some(name) => workbook.sheet(name)?,
            None => workbook
                .sheets()
                .into_iter()
                .next()
                .ok_or_else(|| TemplateError::MissingPart("worksheet".to_string()))?,
        };
        let part_name = workbook.worksheet_part(&package, &sheet.name)?;
        let worksheet = Worksheet::parse(&part_name, &package.require_part(&part_name)?)?;

        if worksheet.row(layout.items.first_row).is_none() {
            return Err(TemplateError::InvalidTemplate(format!(
                "{part_name}: item template row {} not found",
                layout.items.first_row
            )));
        }

        let strings = match package.read_part(SHARED_STRINGS_PART)? {
            Some(bytes) => Some(SharedStringTable::parse(SHARED_STRINGS_PART, &bytes)?),
            None => {
                log::debug!("template has no shared string table; writing inline strings");
                None
            }
        };

        log::debug!("filling sheet {:?} ({part_name})", sheet.name);
        Ok(Self {
            package,
            workbook,
            sheet,
            worksheet,
            strings,
            drawing: None,
            workbook_changed: false,
        })
    }

    /// Make room for `item_count` items below the template row and clone it into each new slot.
    /// Returns the number of rows inserted.
    fn open_item_rows(&mut self, layout: &TemplateLayout, item_count: usize) -> Result<u32> {
        let extra_rows = u32::try_from(item_count.saturating_sub(1)).map_err(|_| {
            TemplateError::InvalidTemplate(format!("{item_count} items exceed the sheet"))
        })?;
        if extra_rows == 0 {
            return Ok(0);
        }

        let policy = &layout.shift;
        let threshold = policy.threshold;
        self.worksheet.shift_rows(threshold, extra_rows)?;
        if policy.dimension {
            self.worksheet.shift_dimension(threshold, extra_rows)?;
        }
        if policy.merge_ranges {
            self.worksheet.shift_merge_ranges(threshold, extra_rows)?;
        }
        match policy.row_breaks {
            RowBreakPolicy::Keep => {}
            RowBreakPolicy::Shift => {
                self.worksheet.shift_row_breaks(threshold, extra_rows)?;
            }
            RowBreakPolicy::ShiftOrReposition {
                max_shifted_items,
                anchor_row,
            } => {
                if item_count <= max_shifted_items {
                    self.worksheet.shift_row_breaks(threshold, extra_rows)?;
                } else {
                    self.worksheet.reposition_first_row_break(anchor_row + extra_rows);
                }
            }
        }

        let first_row = layout.items.first_row;
        for offset in 1..=extra_rows {
            let target = first_row + offset;
            self.worksheet
                .duplicate_row(first_row, target, layout.items.row_height)?;
            if let Some(range) = layout.row_merge_range(target)? {
                self.worksheet.add_merge_range(range)?;
            }
        }

        if policy.print_area {
            self.workbook_changed |=
                self.workbook
                    .shift_print_area(self.sheet.position, threshold, extra_rows)?;
        }
        if policy.drawing_anchors {
            self.shift_drawing(threshold, extra_rows)?;
        }
        Ok(extra_rows)
    }

    fn shift_drawing(&mut self, threshold: u32, delta: u32) -> Result<()> {
        let Some(rel_id) = self.worksheet.drawing_rel_id().map(str::to_string) else {
            return Ok(());
        };
        let part_name = resolve_relationship(&self.package, self.worksheet.part_name(), &rel_id)?
            .ok_or_else(|| {
                TemplateError::MissingPart(format!(
                    "drawing relationship {rel_id} of {}",
                    self.worksheet.part_name()
                ))
            })?;
        let mut drawing = Drawing::parse(&part_name, &self.package.require_part(&part_name)?)?;
        if drawing.shift_anchors(threshold, delta)? > 0 {
            self.drawing = Some(drawing);
        }
        Ok(())
    }

    fn set(&mut self, addr: CellAddress, value: CellValue) -> Result<()> {
        self.worksheet
            .set_cell_value(addr, &value, self.strings.as_mut())
    }

    fn write_items<R: ItemRecord>(&mut self, layout: &TemplateLayout, items: &[R]) -> Result<()> {
        let columns = layout
            .items
            .columns
            .iter()
            .map(|binding| Ok((column_to_number(&binding.column)?, binding.field.as_str())))
            .collect::<Result<Vec<_>>>()?;

        for (idx, item) in items.iter().enumerate() {
            let row = layout.items.first_row + idx as u32;
            for &(col, field) in &columns {
                let value = item.cell_value(field)?.ok_or_else(|| {
                    TemplateError::InvalidTemplate(format!("layout binds unknown item field {field:?}"))
                })?;
                self.set(CellAddress::new(col, row), value)?;
            }
        }
        Ok(())
    }

    fn write_totals(&mut self, layout: &TotalsLayout, extra_rows: u32, totals: &Totals) -> Result<()> {
        let col = column_to_number(&layout.column)?;
        self.set(CellAddress::new(col, layout.subtotal_row + extra_rows), CellValue::Number(totals.subtotal))?;
        self.set(CellAddress::new(col, layout.tax_row + extra_rows), CellValue::Number(totals.tax))?;
        self.set(CellAddress::new(col, layout.total_row + extra_rows), CellValue::Number(totals.total))
    }

    fn write_header(
        &mut self,
        layout: &TemplateLayout,
        payload: &QuotePayload,
        issue_date: NaiveDate,
    ) -> Result<()> {
        for binding in &layout.header {
            let text = match binding.field {
                HeaderField::Title => title(&payload.number, issue_date),
                HeaderField::ClientName => payload.client.name.clone(),
                HeaderField::ClientTaxId => payload.client.tax_id.clone(),
                HeaderField::ClientContact => payload.client.contact.clone(),
                HeaderField::ClientPhone => payload.client.phone.clone(),
                HeaderField::ClientEmail => payload.client.email.clone(),
                HeaderField::ProjectName => payload.project.name.clone(),
                HeaderField::ProjectLocation => payload.project.location.clone(),
                HeaderField::CommercialName => payload.commercial.name.clone(),
                HeaderField::CommercialPhone => payload.commercial.phone.clone(),
                HeaderField::IssueDate => format_date(issue_date),
                // Only written when supplied.
                HeaderField::RequestDate => match payload.request_date {
                    Some(date) => format_date(date),
                    None => continue,
                },
            };
            self.set(CellAddress::parse(&binding.cell)?, CellValue::text(text))?;
        }
        Ok(())
    }

    fn write_blocks(&mut self, blocks: &TrailingBlocks, extra_rows: u32, payload: &QuotePayload) -> Result<()> {
        let first = column_to_number(&blocks.first_column)?;
        let last = column_to_number(&blocks.last_column)?;

        if let Some(conditions) = payload.conditions.as_deref().filter(|c| !c.is_empty()) {
            let row = blocks.conditions_row + extra_rows;
            self.write_block(first, last, row, special_conditions(conditions))?;
        }
        if let Some(days) = payload.lead_time_days {
            let row = blocks.lead_time_row + extra_rows;
            self.write_block(first, last, row, lead_time(days))?;
        }
        if let Some(term) = payload.payment_term {
            // The payment row is not merged; only its first cell is replaced.
            let row = blocks.payment_row + extra_rows;
            self.set(CellAddress::new(first, row), CellValue::text(payment(term)))?;
        }
        if let Some(email) = payload.acceptance_email.as_deref().filter(|e| !e.is_empty()) {
            let row = blocks.acceptance_row + extra_rows;
            self.write_block(first, last, row, acceptance(email))?;
        }
        Ok(())
    }

    fn write_block(&mut self, first: u32, last: u32, row: u32, text: String) -> Result<()> {
        self.worksheet.clear_range(CellRange::on_row(row, first, last))?;
        log::debug!("writing text block at row {row}");
        self.set(CellAddress::new(first, row), CellValue::text(text))
    }

    fn finish(mut self, items: usize, extra_rows: u32, totals: Option<Totals>) -> Result<FilledDocument> {
        let mut modified_parts = Vec::new();
        let mut removed_parts = Vec::new();

        // Overwritten or moved formulas leave cached values and the calc chain stale.
        let formulas_changed = self.worksheet.formulas_changed();
        if formulas_changed {
            self.workbook_changed |= self.workbook.force_full_calc_on_load();
        }

        let sheet_part = self.worksheet.part_name().to_string();
        self.package.set_part(sheet_part.clone(), self.worksheet.to_bytes()?);
        modified_parts.push(sheet_part);

        if let Some(strings) = self.strings.as_mut().filter(|s| s.appended() > 0) {
            self.package.set_part(SHARED_STRINGS_PART, strings.to_bytes()?);
            modified_parts.push(SHARED_STRINGS_PART.to_string());
        }
        if self.workbook_changed {
            self.package.set_part(WORKBOOK_PART, self.workbook.to_bytes()?);
            modified_parts.push(WORKBOOK_PART.to_string());
        }
        if let Some(drawing) = &self.drawing {
            self.package.set_part(drawing.part_name().to_string(), drawing.to_bytes()?);
            modified_parts.push(drawing.part_name().to_string());
        }
        if formulas_changed && self.package.contains(CALC_CHAIN_PART) {
            modified_parts.extend(drop_calc_chain(&mut self.package)?);
            removed_parts.push(CALC_CHAIN_PART.to_string());
        }

        let bytes = self.package.write_to_bytes()?;
        Ok(FilledDocument {
            bytes,
            summary: FillSummary {
                items,
                extra_rows,
                totals,
                modified_parts,
                removed_parts,
            },
        })
    }
}
