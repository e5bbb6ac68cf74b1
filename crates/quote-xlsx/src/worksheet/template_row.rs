use crate::error::{Result, TemplateError};
use crate::xml::XmlNode;

use super::{has_formula, renumber_row, row_number, Worksheet};

impl Worksheet {
    /// Copy row `source` (attributes, cells and styles) to row number `target`, placed before the
    /// first row with a greater number. A row already at `target` is replaced.
    pub fn duplicate_row(&mut self, source: u32, target: u32, height: Option<f64>) -> Result<()> {
        let mut copy = self
            .row(source)
            .cloned()
            .ok_or_else(|| {
                TemplateError::InvalidTemplate(format!("{}: template row {source} not found", self.part_name))
            })?;
        renumber_row(&mut copy, target)?;
        self.formulas_changed |= copy.elements().any(has_formula);
        if let Some(height) = height {
            copy.set_attr("ht", height.to_string());
            copy.set_attr("customHeight", "1");
        }

        let data = self.sheet_data_mut()?;
        let next = data.children.iter().enumerate().find_map(|(idx, node)| match node {
            XmlNode::Element(el) => row_number(el).filter(|r| *r >= target).map(|r| (idx, r)),
            _ => None,
        });
        match next {
            Some((idx, r)) if r == target => data.children[idx] = copy.into(),
            Some((idx, _)) => data.children.insert(idx, copy.into()),
            None => data.children.push(copy.into()),
        }
        Ok(())
    }
}
