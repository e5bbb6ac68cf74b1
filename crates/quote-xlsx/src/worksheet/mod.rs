//! Worksheet document: rows and cells, structural shifts, and row templating.
//!
//! A [`Worksheet`] owns the parsed tree of one `xl/worksheets/sheetN.xml` part. Rows are the
//! `<row>` children of `<sheetData>` and are kept in strictly ascending `r` order; parsing
//! rejects a template that violates this, and every mutation here preserves it.

mod breaks;
mod cells;
mod merge;
mod shift;
mod template_row;

pub use cells::CellValue;

use crate::a1::{CellAddress, MAX_ROW};
use crate::error::{Result, TemplateError};
use crate::xml::{XmlDocument, XmlElement, XmlNode};

#[derive(Debug, Clone)]
pub struct Worksheet {
    part_name: String,
    doc: XmlDocument,
    /// Set once a formula cell is overwritten, cleared or moved.
    formulas_changed: bool,
}

impl Worksheet {
    pub fn parse(part_name: &str, bytes: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(part_name, bytes)?;
        let sheet = Self {
            part_name: part_name.to_string(),
            doc,
            formulas_changed: false,
        };
        sheet.validate()?;
        Ok(sheet)
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.doc.to_bytes()
    }

    /// Whether any formula cell was overwritten, cleared or moved since parsing. Cached values and
    /// the workbook's calculation chain are stale once this is set.
    pub fn formulas_changed(&self) -> bool {
        self.formulas_changed
    }

    /// Relationship id of the sheet's `<drawing>`, if it has one.
    pub fn drawing_rel_id(&self) -> Option<&str> {
        self.doc.root.child("drawing")?.attr_local("id")
    }

    /// Row numbers in document order.
    pub fn row_numbers(&self) -> Vec<u32> {
        self.sheet_data()
            .map(|data| data.elements().filter_map(row_number).collect())
            .unwrap_or_default()
    }

    pub fn row(&self, row: u32) -> Option<&XmlElement> {
        self.sheet_data()?
            .elements()
            .find(|el| row_number(el) == Some(row))
    }

    pub(crate) fn row_mut(&mut self, row: u32) -> Option<&mut XmlElement> {
        self.sheet_data_mut()
            .ok()?
            .elements_mut()
            .find(|el| row_number(el) == Some(row))
    }

    pub fn cell(&self, addr: CellAddress) -> Option<&XmlElement> {
        self.row(addr.row)?
            .elements()
            .find(|c| cell_address(c) == Some(addr))
    }

    fn validate(&self) -> Result<()> {
        let data = self.sheet_data().ok_or_else(|| {
            TemplateError::InvalidTemplate(format!("{}: missing <sheetData>", self.part_name))
        })?;

        let mut previous: Option<u32> = None;
        for row in data.elements().filter(|el| el.is("row")) {
            let r = row.attr("r").ok_or_else(|| {
                TemplateError::InvalidTemplate(format!("{}: <row> without r", self.part_name))
            })?;
            let number = r
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| TemplateError::MalformedReference(r.to_string()))?;
            if previous.is_some_and(|p| p >= number) {
                return Err(TemplateError::InvalidTemplate(format!(
                    "{}: rows out of order or duplicated at row {number}",
                    self.part_name
                )));
            }
            previous = Some(number);
        }
        Ok(())
    }

    fn sheet_data(&self) -> Option<&XmlElement> {
        self.doc.root.child("sheetData")
    }

    fn sheet_data_mut(&mut self) -> Result<&mut XmlElement> {
        let part_name = &self.part_name;
        self.doc
            .root
            .child_mut("sheetData")
            .ok_or_else(|| TemplateError::InvalidTemplate(format!("{part_name}: missing <sheetData>")))
    }

    /// Insert `element` as a direct child of the root, ahead of the first existing child named in
    /// `followers` (the elements CT_Worksheet orders after it), else at the end.
    fn insert_in_schema_order(&mut self, element: XmlElement, followers: &[&str]) -> usize {
        let idx = self
            .doc
            .root
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if followers.contains(&el.local_name())))
            .unwrap_or(self.doc.root.children.len());
        self.doc.root.children.insert(idx, element.into());
        idx
    }

    fn root_child_at(&mut self, idx: usize) -> Option<&mut XmlElement> {
        match self.doc.root.children.get_mut(idx) {
            Some(XmlNode::Element(el)) => Some(el),
            _ => None,
        }
    }
}

pub(crate) fn row_number(row: &XmlElement) -> Option<u32> {
    if !row.is("row") {
        return None;
    }
    row.attr("r")?.parse().ok()
}

pub(crate) fn cell_address(cell: &XmlElement) -> Option<CellAddress> {
    if !cell.is("c") {
        return None;
    }
    CellAddress::parse(cell.attr("r")?).ok()
}

pub(crate) fn has_formula(cell: &XmlElement) -> bool {
    cell.is("c") && cell.child("f").is_some()
}

/// `row + delta`, or `InvalidTemplate` when the result falls past the last worksheet row.
pub(crate) fn shifted_row(part_name: &str, row: u32, delta: u32) -> Result<u32> {
    row.checked_add(delta)
        .filter(|r| *r <= MAX_ROW)
        .ok_or_else(|| {
            TemplateError::InvalidTemplate(format!(
                "{part_name}: row {row} shifted by {delta} is past the last row {MAX_ROW}"
            ))
        })
}

/// Rewrite a row element and every cell reference inside it to `new_row`.
pub(crate) fn renumber_row(row: &mut XmlElement, new_row: u32) -> Result<()> {
    if new_row == 0 || new_row > MAX_ROW {
        return Err(TemplateError::MalformedReference(format!("row {new_row}")));
    }
    row.set_attr("r", new_row.to_string());
    for cell in row.elements_mut().filter(|el| el.is("c")) {
        let Some(r) = cell.attr("r") else {
            continue;
        };
        let addr = CellAddress::parse(r)?;
        cell.set_attr("r", addr.with_row(new_row).to_string());
    }
    Ok(())
}
