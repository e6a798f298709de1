use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::host::{TooltipItem, ValueFormatter};
use crate::model::DataPoint;
use crate::treemap::Rect;

/// Identifies a cell across update cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CellKey {
    /// The treemap root, covering the whole viewport behind the data cells.
    Root,
    /// A data cell. `ordinal` tells apart rows sharing a category name.
    Category { name: String, ordinal: usize },
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKey::Root => f.write_str("root"),
            CellKey::Category { name, ordinal: 0 } => f.write_str(name),
            CellKey::Category { name, ordinal } => write!(f, "{name}#{ordinal}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Fill {
    Solid(String),
    /// Image pattern referenced by its id (the data point's uri).
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub key: CellKey,
    pub rect: Rect,
    pub fill: Fill,
    pub opacity: f64,
    pub data_point: Option<DataPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PatternMode {
    /// Tiles of a fixed pixel size, anchored top-left, image cropped to fill each tile.
    Fixed { width: f64, height: f64 },
    /// One image stretched over the cell's bounding box.
    Resize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDef {
    pub id: String,
    pub href: String,
    pub mode: PatternMode,
}

/// Identity of one rendered cell set. A new one is minted every update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CellSetId(pub u64);

#[derive(Debug, Clone, Default)]
pub struct CellSet {
    pub id: CellSetId,
    pub cells: Vec<Cell>,
}

/// What the rendering layer binds to a data cell for hover and click.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub cell_set: CellSetId,
    pub key: CellKey,
    pub rect: Rect,
    pub data_point: DataPoint,
}

impl Interaction {
    /// Tooltip rows, recomputed on every call.
    pub fn tooltip(&self, formatter: &dyn ValueFormatter) -> Vec<TooltipItem> {
        vec![TooltipItem {
            display_name: self.data_point.category.clone(),
            value: formatter.format(self.data_point.value),
            color: self.data_point.color.clone(),
        }]
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct CellDiff<'a> {
    pub created: Vec<&'a Cell>,
    pub updated: Vec<&'a Cell>,
    pub destroyed: Vec<&'a CellKey>,
}

impl CellDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.destroyed.is_empty()
    }
}

/// Matches `previous` to `next` by key. Matched cells that did not change are
/// left out of `updated`.
pub fn reconcile<'a>(previous: &'a [Cell], next: &'a [Cell]) -> CellDiff<'a> {
    let before: HashMap<&CellKey, &Cell> = previous.iter().map(|c| (&c.key, c)).collect();
    let after: HashMap<&CellKey, &Cell> = next.iter().map(|c| (&c.key, c)).collect();

    let mut diff = CellDiff::default();
    for cell in next {
        match before.get(&cell.key) {
            None => diff.created.push(cell),
            Some(old) if *old != cell => diff.updated.push(cell),
            Some(_) => {}
        }
    }
    diff.destroyed = previous
        .iter()
        .filter(|c| !after.contains_key(&c.key))
        .map(|c| &c.key)
        .collect();
    diff
}
