use crate::a1::CellRange;
use crate::error::Result;
use crate::xml::XmlNode;

use super::{has_formula, renumber_row, row_number, shifted_row, Worksheet};

impl Worksheet {
    /// Move every row numbered `>= threshold` down by `delta`, rewriting the cell references
    /// inside each moved row. Returns the number of rows moved.
    ///
    /// Rows are renumbered from the bottom up so a moved row never shares a number with one that
    /// has not moved yet. Formulas are not rewritten. Fails with `InvalidTemplate`, leaving the
    /// sheet untouched, when the last row would move past the worksheet's row limit.
    pub fn shift_rows(&mut self, threshold: u32, delta: u32) -> Result<usize> {
        if delta == 0 {
            return Ok(0);
        }
        // Rows are ascending, so the last one bounds the shift.
        if let Some(last) = self.row_numbers().last().filter(|r| **r >= threshold) {
            shifted_row(&self.part_name, *last, delta)?;
        }
        let data = self.sheet_data_mut()?;
        let mut moved = 0;
        let mut formulas = false;
        for node in data.children.iter_mut().rev() {
            let XmlNode::Element(row) = node else {
                continue;
            };
            let Some(r) = row_number(row) else {
                continue;
            };
            if r < threshold {
                continue;
            }
            formulas |= row.elements().any(has_formula);
            renumber_row(row, r + delta)?;
            moved += 1;
        }
        self.formulas_changed |= formulas;
        log::debug!("{}: shifted {moved} rows at/after {threshold} by {delta}", self.part_name);
        Ok(moved)
    }

    /// Extend the `<dimension>` reference: any corner at/after `threshold` moves by `delta`.
    pub fn shift_dimension(&mut self, threshold: u32, delta: u32) -> Result<bool> {
        let Some(dimension) = self.doc.root.child_mut("dimension") else {
            return Ok(false);
        };
        let Some(reference) = dimension.attr("ref") else {
            return Ok(false);
        };
        let range = CellRange::parse(reference)?;
        let shift = |row: u32| {
            if row >= threshold {
                shifted_row(&self.part_name, row, delta)
            } else {
                Ok(row)
            }
        };
        let shifted = CellRange::new(
            range.start.with_row(shift(range.start.row)?),
            range.end.with_row(shift(range.end.row)?),
        );
        if shifted == range {
            return Ok(false);
        }
        dimension.set_attr("ref", shifted.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::super::test_support::*;
    use crate::a1::{CellAddress, MAX_ROW};
    use crate::error::TemplateError;

    #[test]
    fn moves_rows_and_cell_references() {
        let mut ws = sheet(
            r#"<dimension ref="B2:N60"/><sheetData><row r="17"><c r="B17"/></row><row r="18" ht="20"><c r="N18" s="3"><v>1</v></c></row><row r="60"/></sheetData>"#,
        );
        assert_eq!(ws.shift_rows(18, 3).unwrap(), 2);
        assert!(ws.shift_dimension(18, 3).unwrap());

        assert_eq!(ws.row_numbers(), vec![17, 21, 63]);
        let cell = ws.cell(CellAddress::parse("N21").unwrap()).unwrap();
        assert_eq!(cell.attr("s"), Some("3"));
        assert_eq!(ws.row(21).unwrap().attr("ht"), Some("20"));
        assert!(ws.cell(CellAddress::parse("B17").unwrap()).is_some());
        assert!(xml(&ws).contains(r#"<dimension ref="B2:N63"/>"#));
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let mut ws = sheet(r#"<sheetData><row r="18"><c r="A18"/></row></sheetData>"#);
        let before = xml(&ws);
        assert_eq!(ws.shift_rows(1, 0).unwrap(), 0);
        assert_eq!(xml(&ws), before);
    }

    #[test]
    fn shifting_past_the_last_row_is_rejected() {
        let last = MAX_ROW - 1;
        let mut ws = sheet(&format!(
            r#"<sheetData><row r="18"><c r="A18"/></row><row r="{last}"><c r="A{last}"/></row></sheetData>"#
        ));
        let before = xml(&ws);
        assert!(matches!(ws.shift_rows(18, 2), Err(TemplateError::InvalidTemplate(_))));
        assert!(matches!(ws.shift_rows(18, u32::MAX), Err(TemplateError::InvalidTemplate(_))));
        assert_eq!(xml(&ws), before);

        // Exactly reaching the limit is fine.
        assert_eq!(ws.shift_rows(18, 1).unwrap(), 2);
        assert_eq!(ws.row_numbers(), vec![19, MAX_ROW]);
    }

    #[test]
    fn dimension_past_the_last_row_is_rejected() {
        let mut ws = sheet(&format!(r#"<dimension ref="A1:N{MAX_ROW}"/><sheetData/>"#));
        assert!(matches!(ws.shift_dimension(18, 1), Err(TemplateError::InvalidTemplate(_))));
    }

    #[test]
    fn moving_a_formula_row_is_tracked() {
        let mut ws = sheet(r#"<sheetData><row r="18"><c r="A18"><v>1</v></c></row></sheetData>"#);
        ws.shift_rows(18, 2).unwrap();
        assert!(!ws.formulas_changed());

        let mut ws = sheet(r#"<sheetData><row r="18"><c r="N18"><f>SUM(N17)</f><v>0</v></c></row></sheetData>"#);
        ws.shift_rows(19, 2).unwrap();
        assert!(!ws.formulas_changed());
        ws.shift_rows(18, 2).unwrap();
        assert!(ws.formulas_changed());
    }

    proptest! {
        #[test]
        fn shift_keeps_rows_unique_and_ordered(
            rows in proptest::collection::btree_set(1u32..200, 0..30),
            threshold in 1u32..220,
            delta in 1u32..50,
        ) {
            let body: String = rows
                .iter()
                .map(|r| format!(r#"<row r="{r}"><c r="C{r}"/></row>"#))
                .collect();
            let mut ws = sheet(&format!("<sheetData>{body}</sheetData>"));
            ws.shift_rows(threshold, delta).unwrap();

            let expected: Vec<u32> = rows
                .iter()
                .map(|&r| if r >= threshold { r + delta } else { r })
                .collect();
            let numbers = ws.row_numbers();
            prop_assert_eq!(&numbers, &expected);
            prop_assert!(numbers.windows(2).all(|w| w[0] < w[1]));
            for r in numbers {
                let cell = ws.row(r).unwrap().child("c").unwrap();
                let expected_ref = format!("C{r}");
                prop_assert_eq!(cell.attr("r"), Some(expected_ref.as_str()));
            }
        }
    }
}
