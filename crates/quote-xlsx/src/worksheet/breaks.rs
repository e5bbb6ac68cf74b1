use crate::error::{Result, TemplateError};
use crate::xml::XmlElement;

use super::{shifted_row, Worksheet};

/// Elements that CT_Worksheet places after `<rowBreaks>`.
const ROW_BREAKS_FOLLOWERS: &[&str] = &[
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

/// Last column index Excel writes on a manual row break.
const BREAK_MAX_COL: &str = "16383";

impl Worksheet {
    /// Row ids of the manual and automatic row breaks, in document order.
    pub fn row_breaks(&self) -> Vec<u32> {
        self.doc
            .root
            .child("rowBreaks")
            .map(|breaks| {
                breaks
                    .elements()
                    .filter(|el| el.is("brk"))
                    .filter_map(|el| el.attr("id")?.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Move every break with id `>= threshold` down by `delta`. Returns the number moved.
    pub fn shift_row_breaks(&mut self, threshold: u32, delta: u32) -> Result<usize> {
        if delta == 0 {
            return Ok(0);
        }
        let Some(breaks) = self.doc.root.child_mut("rowBreaks") else {
            return Ok(0);
        };
        let mut moved = 0;
        for brk in breaks.elements_mut().filter(|el| el.is("brk")) {
            let Some(id) = brk.attr("id") else {
                continue;
            };
            let id: u32 = id
                .parse()
                .map_err(|_| TemplateError::MalformedReference(id.to_string()))?;
            if id >= threshold {
                brk.set_attr("id", shifted_row(&self.part_name, id, delta)?.to_string());
                moved += 1;
            }
        }
        log::debug!("{}: shifted {moved} row breaks at/after {threshold} by {delta}", self.part_name);
        Ok(moved)
    }

    /// Put the first row break at `row`. Returns the previous id, or `None` when the sheet has
    /// no row breaks.
    pub fn reposition_first_row_break(&mut self, row: u32) -> Option<u32> {
        let breaks = self.doc.root.child_mut("rowBreaks")?;
        let brk = breaks.elements_mut().find(|el| el.is("brk"))?;
        let previous = brk.attr("id").and_then(|id| id.parse().ok());
        brk.set_attr("id", row.to_string());
        log::debug!("{}: first row break {previous:?} -> {row}", self.part_name);
        previous
    }

    /// Add a manual break after `row`, creating `<rowBreaks>` if needed and keeping `count` and
    /// `manualBreakCount` in sync. Returns false if the break already exists.
    pub fn add_row_break(&mut self, row: u32) -> Result<bool> {
        if self.row_breaks().contains(&row) {
            return Ok(false);
        }

        let idx = match self.doc.root.child_index("rowBreaks") {
            Some(idx) => idx,
            None => {
                let name = self.doc.root.child_name("rowBreaks");
                self.insert_in_schema_order(XmlElement::new(name), ROW_BREAKS_FOLLOWERS)
            }
        };
        let Some(breaks) = self.root_child_at(idx) else {
            return Err(TemplateError::InvalidTemplate("rowBreaks could not be created".to_string()));
        };

        let brk = XmlElement::new(breaks.child_name("brk"))
            .with_attr("id", row.to_string())
            .with_attr("max", BREAK_MAX_COL)
            .with_attr("man", "1");
        breaks.children.push(brk.into());

        let count = breaks.elements().filter(|el| el.is("brk")).count();
        let manual = breaks
            .elements()
            .filter(|el| el.is("brk") && matches!(el.attr("man"), Some("1") | Some("true")))
            .count();
        breaks.set_attr("count", count.to_string());
        breaks.set_attr("manualBreakCount", manual.to_string());
        Ok(true)
    }
}
