use crate::a1::{CellAddress, CellRange};
use crate::error::{Result, TemplateError};
use crate::shared_strings::SharedStringTable;
use crate::xml::{XmlElement, XmlNode};

use super::{cell_address, has_formula, row_number, Worksheet};

/// Value written into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Shared string when a table is available, inline string otherwise.
    Text(String),
    Number(f64),
    /// No type and no content; the style is kept.
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map(CellValue::text).unwrap_or(CellValue::Empty)
    }
}

impl Worksheet {
    /// The row numbered `row`, created (in ascending position) if absent.
    pub fn locate_or_create_row(&mut self, row: u32) -> Result<&mut XmlElement> {
        let data = self.sheet_data_mut()?;
        let mut insert_at = data.children.len();
        let mut existing = None;
        for (idx, node) in data.children.iter().enumerate() {
            let XmlNode::Element(el) = node else {
                continue;
            };
            match row_number(el) {
                Some(r) if r == row => {
                    existing = Some(idx);
                    break;
                }
                Some(r) if r > row => {
                    insert_at = idx;
                    break;
                }
                _ => {}
            }
        }

        let idx = match existing {
            Some(idx) => idx,
            None => {
                let el = XmlElement::new(data.child_name("row")).with_attr("r", row.to_string());
                data.children.insert(insert_at, el.into());
                insert_at
            }
        };
        match data.children.get_mut(idx) {
            Some(XmlNode::Element(el)) => Ok(el),
            _ => Err(TemplateError::InvalidTemplate(format!("row {row} could not be created"))),
        }
    }

    /// The cell at `addr`, created if absent; a new cell goes before the first sibling with a
    /// greater column.
    pub fn locate_or_create_cell(&mut self, addr: CellAddress) -> Result<&mut XmlElement> {
        let row = self.locate_or_create_row(addr.row)?;
        locate_or_create_cell_in_row(row, addr)
    }

    /// Overwrite a cell's content, keeping its style (`s`) and any other attributes.
    pub fn set_cell_value(
        &mut self,
        addr: CellAddress,
        value: &CellValue,
        strings: Option<&mut SharedStringTable>,
    ) -> Result<()> {
        if self.cell(addr).is_some_and(has_formula) {
            self.formulas_changed = true;
        }
        let cell = self.locate_or_create_cell(addr)?;
        cell.remove_attr("t");
        cell.children.clear();

        match value {
            CellValue::Empty => {}
            CellValue::Number(n) => {
                let mut v = XmlElement::new(cell.child_name("v"));
                v.set_text(n.to_string());
                cell.children.push(v.into());
            }
            CellValue::Text(text) => match strings {
                Some(table) => {
                    let idx = table.get_or_create(text);
                    cell.set_attr("t", "s");
                    let mut v = XmlElement::new(cell.child_name("v"));
                    v.set_text(idx.to_string());
                    cell.children.push(v.into());
                }
                None => {
                    cell.set_attr("t", "inlineStr");
                    let mut t = XmlElement::new(cell.child_name("t"));
                    if text.trim() != text || text.contains('\n') {
                        t.set_attr("xml:space", "preserve");
                    }
                    t.set_text(text.as_str());
                    let mut is = XmlElement::new(cell.child_name("is"));
                    is.children.push(t.into());
                    cell.children.push(is.into());
                }
            },
        }
        Ok(())
    }

    /// Displayed text of a cell: shared string, inline string, or the raw `<v>` text.
    pub fn cell_text(&self, addr: CellAddress, strings: Option<&SharedStringTable>) -> Option<String> {
        let cell = self.cell(addr)?;
        match cell.attr("t") {
            Some("s") => {
                let idx: u32 = cell.child("v")?.text().trim().parse().ok()?;
                strings?.text(idx).map(str::to_string)
            }
            Some("inlineStr") => Some(cell.child("is")?.child("t")?.text()),
            _ => cell.child("v").map(XmlElement::text),
        }
    }

    /// Set a custom height on an existing or new row.
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        let row = self.locate_or_create_row(row)?;
        row.set_attr("ht", height.to_string());
        row.set_attr("customHeight", "1");
        Ok(())
    }

    /// Blank every existing cell inside `range`, keeping styles. Returns the number of cells
    /// cleared; missing cells are not created.
    pub fn clear_range(&mut self, range: CellRange) -> Result<usize> {
        let mut cleared = 0;
        let mut formulas = false;
        let data = self.sheet_data_mut()?;
        for row in data.elements_mut().filter(|el| el.is("row")) {
            for cell in row.elements_mut() {
                if cell_address(cell).is_some_and(|addr| range.contains(addr)) {
                    formulas |= has_formula(cell);
                    cell.remove_attr("t");
                    cell.children.clear();
                    cleared += 1;
                }
            }
        }
        self.formulas_changed |= formulas;
        Ok(cleared)
    }
}

fn locate_or_create_cell_in_row(row: &mut XmlElement, addr: CellAddress) -> Result<&mut XmlElement> {
    let mut insert_at = row.children.len();
    let mut existing = None;
    for (idx, node) in row.children.iter().enumerate() {
        let XmlNode::Element(el) = node else {
            continue;
        };
        match cell_address(el) {
            Some(a) if a == addr => {
                existing = Some(idx);
                break;
            }
            Some(a) if a.col > addr.col => {
                insert_at = idx;
                break;
            }
            _ => {}
        }
    }

    let idx = match existing {
        Some(idx) => idx,
        None => {
            let el = XmlElement::new(row.child_name("c")).with_attr("r", addr.to_string());
            row.children.insert(insert_at, el.into());
            insert_at
        }
    };
    match row.children.get_mut(idx) {
        Some(XmlNode::Element(el)) => Ok(el),
        _ => Err(TemplateError::InvalidTemplate(format!("cell {addr} could not be created"))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::test_support::*;
    use super::*;
    use crate::shared_strings::SHARED_STRINGS_PART;

    fn addr(r: &str) -> CellAddress {
        CellAddress::parse(r).unwrap()
    }

    fn strings() -> SharedStringTable {
        SharedStringTable::parse(SHARED_STRINGS_PART, b"<sst><si><t>old</t></si></sst>").unwrap()
    }

    #[test]
    fn new_rows_are_inserted_in_order() {
        let mut ws = sheet(r#"<sheetData><row r="2"/><row r="9"/></sheetData>"#);
        ws.locate_or_create_row(5).unwrap();
        ws.locate_or_create_row(12).unwrap();
        ws.locate_or_create_row(1).unwrap();
        ws.locate_or_create_row(9).unwrap();
        assert_eq!(ws.row_numbers(), vec![1, 2, 5, 9, 12]);
    }

    #[test]
    fn new_cells_keep_column_order() {
        let mut ws = sheet(r#"<sheetData><row r="4"><c r="B4"/><c r="N4"/></row></sheetData>"#);
        ws.locate_or_create_cell(addr("L4")).unwrap();
        ws.locate_or_create_cell(addr("A4")).unwrap();
        ws.locate_or_create_cell(addr("AA4")).unwrap();
        let refs: Vec<_> = ws
            .row(4)
            .unwrap()
            .elements()
            .filter_map(|c| c.attr("r"))
            .collect();
        assert_eq!(refs, vec!["A4", "B4", "L4", "N4", "AA4"]);
    }

    #[test]
    fn set_value_keeps_style_and_drops_old_content() {
        let mut ws = sheet(
            r#"<sheetData><row r="17"><c r="L17" s="42" t="str"><f>SUM(A1)</f><v>x</v></c></row></sheetData>"#,
        );
        let mut table = strings();

        ws.set_cell_value(addr("L17"), &CellValue::Number(150.0), Some(&mut table))
            .unwrap();
        assert_eq!(
            xml(&ws),
            format!(r#"<worksheet {NS}><sheetData><row r="17"><c r="L17" s="42"><v>150</v></c></row></sheetData></worksheet>"#)
        );

        ws.set_cell_value(addr("L17"), &CellValue::text("Ensayo"), Some(&mut table))
            .unwrap();
        let cell = ws.cell(addr("L17")).unwrap();
        assert_eq!(cell.attr("s"), Some("42"));
        assert_eq!(cell.attr("t"), Some("s"));
        assert_eq!(ws.cell_text(addr("L17"), Some(&table)).as_deref(), Some("Ensayo"));

        ws.set_cell_value(addr("L17"), &CellValue::Empty, Some(&mut table))
            .unwrap();
        let cell = ws.cell(addr("L17")).unwrap();
        assert_eq!(cell.attrs, vec![("r".to_string(), "L17".to_string()), ("s".to_string(), "42".to_string())]);
        assert!(cell.children.is_empty());
    }

    #[test]
    fn overwriting_a_formula_is_tracked() {
        let mut ws = sheet(
            r#"<sheetData><row r="17"><c r="L17" s="1"><v>3</v></c><c r="N17" s="1"><f>L17*M17</f><v>0</v></c></row></sheetData>"#,
        );
        ws.set_cell_value(addr("L17"), &CellValue::Number(5.0), None).unwrap();
        ws.clear_range(CellRange::parse("A17:M17").unwrap()).unwrap();
        assert!(!ws.formulas_changed());

        ws.set_cell_value(addr("N17"), &CellValue::Number(15.0), None).unwrap();
        assert!(ws.formulas_changed());
        assert!(ws.cell(addr("N17")).unwrap().child("f").is_none());
    }

    #[test]
    fn text_falls_back_to_inline_strings() {
        let mut ws = sheet(r#"<sheetData/>"#);
        ws.set_cell_value(addr("B3"), &CellValue::text("a & b"), None).unwrap();
        assert_eq!(ws.cell_text(addr("B3"), None).as_deref(), Some("a & b"));
        assert_eq!(ws.cell(addr("B3")).unwrap().attr("t"), Some("inlineStr"));
    }

    #[test]
    fn clear_range_blanks_existing_cells_only() {
        let mut ws = sheet(
            r#"<sheetData><row r="23"><c r="B23" s="7" t="s"><v>0</v></c><c r="C23" s="7"/><c r="P23" t="s"><v>0</v></c></row></sheetData>"#,
        );
        let cleared = ws.clear_range(CellRange::parse("B23:N23").unwrap()).unwrap();
        assert_eq!(cleared, 2);
        assert!(ws.cell(addr("B23")).unwrap().children.is_empty());
        assert_eq!(ws.cell(addr("B23")).unwrap().attr("s"), Some("7"));
        assert_eq!(ws.cell(addr("P23")).unwrap().attr("t"), Some("s"));
        assert!(ws.cell(addr("D23")).is_none());
    }

    #[test]
    fn row_height_override() {
        let mut ws = sheet(r#"<sheetData><row r="5" spans="2:14"/></sheetData>"#);
        ws.set_row_height(5, 30.5).unwrap();
        let row = ws.row(5).unwrap();
        assert_eq!(row.attr("ht"), Some("30.5"));
        assert_eq!(row.attr("customHeight"), Some("1"));
    }
}
