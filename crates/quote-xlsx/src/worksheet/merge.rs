use crate::a1::{CellAddress, CellRange};
use crate::error::Result;
use crate::xml::XmlElement;

use super::{shifted_row, Worksheet};

/// Elements that CT_Worksheet places after `<mergeCells>`.
const MERGE_CELLS_FOLLOWERS: &[&str] = &[
    "phoneticPr",
    "conditionalFormatting",
    "dataValidations",
    "hyperlinks",
    "printOptions",
    "pageMargins",
    "pageSetup",
    "headerFooter",
    "rowBreaks",
    "colBreaks",
    "customProperties",
    "cellWatches",
    "ignoredErrors",
    "smartTags",
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

impl Worksheet {
    pub fn merge_ranges(&self) -> Result<Vec<CellRange>> {
        let Some(merges) = self.doc.root.child("mergeCells") else {
            return Ok(Vec::new());
        };
        merges
            .elements()
            .filter(|el| el.is("mergeCell"))
            .filter_map(|el| el.attr("ref"))
            .map(CellRange::parse)
            .collect()
    }

    /// Add a merge range unless an identical one already exists. Creates `<mergeCells>` at its
    /// schema position when the sheet has none. Returns whether a range was added.
    pub fn add_merge_range(&mut self, range: CellRange) -> Result<bool> {
        if self.merge_ranges()?.contains(&range) {
            return Ok(false);
        }

        let merges = match self.doc.root.child_index("mergeCells") {
            Some(idx) => self.root_child_at(idx),
            None => {
                let name = self.doc.root.child_name("mergeCells");
                let idx = self.insert_in_schema_order(XmlElement::new(name), MERGE_CELLS_FOLLOWERS);
                self.root_child_at(idx)
            }
        };
        let Some(merges) = merges else {
            return Ok(false);
        };

        let cell = XmlElement::new(merges.child_name("mergeCell")).with_attr("ref", range.to_string());
        merges.children.push(cell.into());
        let count = merges.elements().filter(|el| el.is("mergeCell")).count();
        merges.set_attr("count", count.to_string());
        Ok(true)
    }

    /// Move every merge range whose top row is `>= threshold` down by `delta`, keeping its
    /// height and column span. Returns the number of ranges moved.
    pub fn shift_merge_ranges(&mut self, threshold: u32, delta: u32) -> Result<usize> {
        if delta == 0 {
            return Ok(0);
        }
        let Some(merges) = self.doc.root.child_mut("mergeCells") else {
            return Ok(0);
        };
        let mut moved = 0;
        for merge in merges.elements_mut().filter(|el| el.is("mergeCell")) {
            let Some(reference) = merge.attr("ref") else {
                continue;
            };
            let range = CellRange::parse(reference)?;
            if range.start.row >= threshold {
                shifted_row(&self.part_name, range.start.row.max(range.end.row), delta)?;
                merge.set_attr("ref", range.offset_rows(delta).to_string());
                moved += 1;
            }
        }
        log::debug!("{}: shifted {moved} merge ranges at/after {threshold} by {delta}", self.part_name);
        Ok(moved)
    }

    /// The merge range covering `cell`, if any.
    pub fn merge_range_containing(&self, cell: CellAddress) -> Result<Option<CellRange>> {
        Ok(self.merge_ranges()?.into_iter().find(|range| range.contains(cell)))
    }
}
