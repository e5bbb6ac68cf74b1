//! `xl/workbook.xml`: sheet lookup, the per-sheet print area and calculation properties.

use crate::a1::{CellAddress, CellRange};
use crate::error::{Result, TemplateError};
use crate::package::TemplatePackage;
use crate::relationships::resolve_relationship;
use crate::xml::{XmlDocument, XmlElement, XmlNode};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
const PRINT_AREA_NAME: &str = "_xlnm.Print_Area";

/// Elements that CT_Workbook places after `<calcPr>`.
const CALC_PR_FOLLOWERS: &[&str] = &[
    "oleSize",
    "customWorkbookViews",
    "pivotCaches",
    "smartTagPr",
    "smartTagTypes",
    "webPublishing",
    "fileRecoveryPr",
    "webPublishObjects",
    "extLst",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub rel_id: String,
    /// 0-based position in `<sheets>`; the `localSheetId` of sheet-scoped defined names.
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct Workbook {
    doc: XmlDocument,
}

impl Workbook {
    pub fn load(package: &TemplatePackage) -> Result<Self> {
        let bytes = package.require_part(WORKBOOK_PART)?;
        Ok(Self {
            doc: XmlDocument::parse(WORKBOOK_PART, &bytes)?,
        })
    }

    pub fn sheets(&self) -> Vec<SheetEntry> {
        let Some(sheets) = self.doc.root.child("sheets") else {
            return Vec::new();
        };
        sheets
            .elements()
            .filter(|el| el.is("sheet"))
            .enumerate()
            .filter_map(|(position, el)| {
                Some(SheetEntry {
                    name: el.attr("name")?.to_string(),
                    rel_id: el.attr_local("id")?.to_string(),
                    position,
                })
            })
            .collect()
    }

    pub fn sheet(&self, name: &str) -> Result<SheetEntry> {
        self.sheets()
            .into_iter()
            .find(|sheet| sheet.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| TemplateError::MissingPart(format!("worksheet {name:?}")))
    }

    /// Part name of the worksheet called `name`, e.g. `xl/worksheets/sheet36.xml`.
    pub fn worksheet_part(&self, package: &TemplatePackage, name: &str) -> Result<String> {
        let sheet = self.sheet(name)?;
        resolve_relationship(package, WORKBOOK_PART, &sheet.rel_id)?.ok_or_else(|| {
            TemplateError::MissingPart(format!("relationship {} for worksheet {name:?}", sheet.rel_id))
        })
    }

    /// Current print area formula of the sheet at `position`, if it has one.
    pub fn print_area(&self, position: usize) -> Option<String> {
        let names = self.doc.root.child("definedNames")?;
        names
            .elements()
            .find(|el| is_print_area_for(el.attr("name"), el.attr("localSheetId"), position))
            .map(|el| el.text())
    }

    /// Move every print-area row at or after `threshold` down by `delta`.
    ///
    /// Returns whether the workbook changed. A sheet without a print area is left alone, as is
    /// any area without row coordinates (`$B:$N`, `#REF!`).
    pub fn shift_print_area(&mut self, position: usize, threshold: u32, delta: u32) -> Result<bool> {
        if delta == 0 {
            return Ok(false);
        }
        let Some(names) = self.doc.root.child_mut("definedNames") else {
            return Ok(false);
        };
        let Some(defined) = names
            .elements_mut()
            .find(|el| is_print_area_for(el.attr("name"), el.attr("localSheetId"), position))
        else {
            return Ok(false);
        };

        let formula = defined.text();
        let mut areas = Vec::new();
        for area in split_areas(&formula) {
            let parsed = split_sheet_name(area)
                .and_then(|(sheet, range)| Ok((sheet, parse_absolute_range(range)?)));
            let (sheet, range) = match parsed {
                Ok(parsed) => parsed,
                Err(err) => {
                    // Whole-column areas and `#REF!` have no rows to move.
                    log::debug!("print area {area:?} kept as written: {err}");
                    areas.push(area.to_string());
                    continue;
                }
            };
            let shift = |cell: CellAddress| {
                if cell.row >= threshold {
                    cell.with_row(cell.row.saturating_add(delta))
                } else {
                    cell
                }
            };
            areas.push(format_area(&sheet, CellRange::new(shift(range.start), shift(range.end))));
        }

        let rewritten = areas.join(",");
        if rewritten == formula {
            return Ok(false);
        }
        log::debug!("print area {formula} -> {rewritten}");
        defined.set_text(rewritten);
        Ok(true)
    }

    /// Ask Excel to recalculate every formula when the file is opened, keeping any other
    /// `<calcPr>` attributes. Returns whether the workbook changed.
    pub fn force_full_calc_on_load(&mut self) -> bool {
        let root = &mut self.doc.root;
        if let Some(calc_pr) = root.child_mut("calcPr") {
            if calc_pr.attr("fullCalcOnLoad") == Some("1") {
                return false;
            }
            calc_pr.set_attr("fullCalcOnLoad", "1");
            return true;
        }

        let calc_pr = XmlElement::new(root.child_name("calcPr")).with_attr("fullCalcOnLoad", "1");
        let idx = root
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if CALC_PR_FOLLOWERS.contains(&el.local_name())))
            .unwrap_or(root.children.len());
        root.children.insert(idx, calc_pr.into());
        true
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.doc.to_bytes()
    }
}

fn is_print_area_for(name: Option<&str>, local_sheet_id: Option<&str>, position: usize) -> bool {
    name == Some(PRINT_AREA_NAME)
        && local_sheet_id.and_then(|id| id.trim().parse::<usize>().ok()) == Some(position)
}

/// Split `Sheet1!$A$1:$B$2,Sheet1!$D$1:$E$2` on commas outside quoted sheet names.
fn split_areas(formula: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, ch) in formula.char_indices() {
        match ch {
            // A doubled quote inside a quoted name toggles twice, which is a no-op.
            '\'' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                let part = formula[start..i].trim();
                if !part.is_empty() {
                    parts.push(part);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let part = formula[start..].trim();
    if !part.is_empty() {
        parts.push(part);
    }
    parts
}

fn split_sheet_name(area: &str) -> Result<(String, &str)> {
    let malformed = || TemplateError::MalformedReference(area.to_string());
    if let Some(rest) = area.strip_prefix('\'') {
        let mut sheet = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch != '\'' {
                sheet.push(ch);
                continue;
            }
            if chars.peek().map(|(_, c)| *c) == Some('\'') {
                sheet.push('\'');
                chars.next();
                continue;
            }
            let range = rest[i + 1..].strip_prefix('!').ok_or_else(malformed)?;
            return Ok((sheet, range));
        }
        return Err(malformed());
    }
    let (sheet, range) = area.rsplit_once('!').ok_or_else(malformed)?;
    Ok((sheet.to_string(), range))
}

fn parse_absolute_range(range: &str) -> Result<CellRange> {
    CellRange::parse(&range.replace('$', ""))
        .map_err(|_| TemplateError::MalformedReference(range.to_string()))
}

fn format_area(sheet: &str, range: CellRange) -> String {
    let mut out = format_sheet_name(sheet);
    out.push('!');
    out.push_str(&absolute(range.start));
    if range.start != range.end {
        out.push(':');
        out.push_str(&absolute(range.end));
    }
    out
}

fn absolute(cell: CellAddress) -> String {
    format!("${}${}", cell.column_label(), cell.row)
}

fn format_sheet_name(name: &str) -> String {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
