//! Services the embedding host provides to the visual.
//!
//! Each service is a trait so hosts can plug in their own implementation; the
//! defaults below are enough to drive the visual from a CLI or a desktop app.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

use crate::format::SignificantFormatter;
use crate::model::{CategoryColumn, SelectionId};

/// Maps a category name to a color, stable for the lifetime of the palette.
pub trait ColorPalette {
    fn color_for(&self, key: &str) -> String;
}

/// Default report theme colors, handed out in first-come order.
pub const THEME_COLORS: &[&str] = &[
    "#01B8AA", "#374649", "#FD625E", "#F2C80F", "#5F6B6D", "#8AD4EB", "#FE9666", "#A66999",
    "#3599B8", "#DFBFBF", "#4AC5BB", "#5F6B6D", "#FB8281", "#F4D25A", "#7F898A", "#A4DDEE",
    "#FDAB89", "#B687AC", "#28738A", "#A78F8F",
];

pub struct ThemePalette {
    colors: Vec<String>,
    assigned: Mutex<HashMap<String, usize>>,
}

impl ThemePalette {
    pub fn new(colors: impl IntoIterator<Item = String>) -> Self {
        let mut colors: Vec<String> = colors.into_iter().collect();
        if colors.is_empty() {
            colors.push("#000000".to_string());
        }
        Self {
            colors,
            assigned: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for ThemePalette {
    fn default() -> Self {
        Self::new(THEME_COLORS.iter().map(|c| c.to_string()))
    }
}

impl ColorPalette for ThemePalette {
    fn color_for(&self, key: &str) -> String {
        let mut assigned = self.assigned.lock();
        let next = assigned.len();
        let slot = *assigned.entry(key.to_string()).or_insert(next);
        self.colors[slot % self.colors.len()].clone()
    }
}

/// Builds the identity of one category row.
pub trait SelectionIdBuilder {
    fn for_category(&self, column: &CategoryColumn, row: usize) -> SelectionId;
}

/// Identities keyed by the column's query name and the row's category value.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategorySelectionIdBuilder;

impl SelectionIdBuilder for CategorySelectionIdBuilder {
    fn for_category(&self, column: &CategoryColumn, row: usize) -> SelectionId {
        let key = column
            .values
            .get(row)
            .map(|v| v.to_string())
            .unwrap_or_default();
        SelectionId {
            column: column.source.query_name.clone(),
            key,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionPoll {
    Pending,
    Ready(Vec<SelectionId>),
    /// The manager dropped its end without answering.
    Cancelled,
}

/// Deferred result of a selection toggle. Dropping it cancels interest in the result.
#[derive(Debug)]
pub struct PendingSelection {
    rx: Receiver<Vec<SelectionId>>,
}

impl PendingSelection {
    /// A pending result plus the sender the manager answers through.
    pub fn channel() -> (Sender<Vec<SelectionId>>, Self) {
        let (tx, rx) = bounded(1);
        (tx, Self { rx })
    }

    pub fn resolved(ids: Vec<SelectionId>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(ids);
        pending
    }

    pub fn poll(&self) -> SelectionPoll {
        match self.rx.try_recv() {
            Ok(ids) => SelectionPoll::Ready(ids),
            Err(TryRecvError::Empty) => SelectionPoll::Pending,
            Err(TryRecvError::Disconnected) => SelectionPoll::Cancelled,
        }
    }
}

/// Owns the cross-filter selection shared by every view of the report.
pub trait SelectionManager {
    /// Toggles `id`. Resolves to the full set of selected ids afterwards.
    fn select(&mut self, id: &SelectionId, multi_select: bool) -> PendingSelection;
    fn clear(&mut self) -> PendingSelection;
    fn selected(&self) -> Vec<SelectionId>;
}

/// In-process selection state; answers every toggle immediately.
#[derive(Debug, Default)]
pub struct LocalSelectionManager {
    selected: Vec<SelectionId>,
}

impl SelectionManager for LocalSelectionManager {
    fn select(&mut self, id: &SelectionId, multi_select: bool) -> PendingSelection {
        let present = self.selected.iter().position(|s| s == id);
        if multi_select {
            match present {
                Some(i) => {
                    self.selected.remove(i);
                }
                None => self.selected.push(id.clone()),
            }
        } else if present.is_some() && self.selected.len() == 1 {
            self.selected.clear();
        } else {
            self.selected = vec![id.clone()];
        }
        PendingSelection::resolved(self.selected.clone())
    }

    fn clear(&mut self) -> PendingSelection {
        self.selected.clear();
        PendingSelection::resolved(Vec::new())
    }

    fn selected(&self) -> Vec<SelectionId> {
        self.selected.clone()
    }
}

/// Formats numbers for display.
pub trait ValueFormatter {
    fn format(&self, value: f64) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipItem {
    pub display_name: String,
    pub value: String,
    pub color: String,
}

/// Presents tooltips produced on hover.
pub trait TooltipService {
    fn show(&mut self, items: &[TooltipItem], position: (f64, f64));
    fn hide(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTooltips;

impl TooltipService for NoopTooltips {
    fn show(&mut self, _items: &[TooltipItem], _position: (f64, f64)) {}
    fn hide(&mut self) {}
}

/// Bundle of host services handed to the visual on construction.
pub struct VisualHost {
    pub palette: Box<dyn ColorPalette>,
    pub selection_ids: Box<dyn SelectionIdBuilder>,
    pub selection: Box<dyn SelectionManager>,
    pub formatter: Box<dyn ValueFormatter>,
    pub tooltips: Box<dyn TooltipService>,
    /// False in views that do not support interactivity (e.g. dashboards).
    pub allow_interactions: bool,
}

impl VisualHost {
    pub fn new() -> Self {
        Self {
            palette: Box::new(ThemePalette::default()),
            selection_ids: Box::new(CategorySelectionIdBuilder),
            selection: Box::new(LocalSelectionManager::default()),
            formatter: Box::new(SignificantFormatter::new(3)),
            tooltips: Box::new(NoopTooltips),
            allow_interactions: true,
        }
    }

    pub fn with_palette(mut self, palette: impl ColorPalette + 'static) -> Self {
        self.palette = Box::new(palette);
        self
    }

    pub fn with_selection_manager(mut self, manager: impl SelectionManager + 'static) -> Self {
        self.selection = Box::new(manager);
        self
    }

    pub fn with_tooltips(mut self, tooltips: impl TooltipService + 'static) -> Self {
        self.tooltips = Box::new(tooltips);
        self
    }

    pub fn with_interactions(mut self, allow: bool) -> Self {
        self.allow_interactions = allow;
        self
    }
}

impl Default for VisualHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnMetadata, PrimitiveValue};

    #[test]
    fn palette_is_stable_per_key() {
        let palette = ThemePalette::default();
        let a = palette.color_for("A");
        let b = palette.color_for("B");
        assert_ne!(a, b);
        assert_eq!(palette.color_for("A"), a);
        assert_eq!(a, THEME_COLORS[0]);
        assert_eq!(b, THEME_COLORS[1]);
    }

    #[test]
    fn palette_wraps_around() {
        let palette = ThemePalette::new(vec!["#111".to_string(), "#222".to_string()]);
        assert_eq!(palette.color_for("a"), "#111");
        assert_eq!(palette.color_for("b"), "#222");
        assert_eq!(palette.color_for("c"), "#111");
    }

    #[test]
    fn selection_ids_compare_by_category_value() {
        let column = CategoryColumn {
            source: ColumnMetadata::named("t.Name"),
            values: vec![PrimitiveValue::from("A"), PrimitiveValue::from("B"), PrimitiveValue::from("A")],
            objects: None,
        };
        let ids = CategorySelectionIdBuilder;
        assert_eq!(ids.for_category(&column, 0), ids.for_category(&column, 2));
        assert_ne!(ids.for_category(&column, 0), ids.for_category(&column, 1));
    }

    #[test]
    fn local_manager_toggles_single_selection() {
        let a = SelectionId { column: "c".into(), key: "A".into() };
        let b = SelectionId { column: "c".into(), key: "B".into() };
        let mut manager = LocalSelectionManager::default();
        assert_eq!(manager.select(&a, false).poll(), SelectionPoll::Ready(vec![a.clone()]));
        assert_eq!(manager.select(&b, false).poll(), SelectionPoll::Ready(vec![b.clone()]));
        assert_eq!(manager.select(&b, false).poll(), SelectionPoll::Ready(vec![]));
        manager.select(&a, true);
        manager.select(&b, true);
        assert_eq!(manager.selected(), vec![a.clone(), b.clone()]);
        manager.select(&a, true);
        assert_eq!(manager.selected(), vec![b]);
        assert_eq!(manager.clear().poll(), SelectionPoll::Ready(vec![]));
    }

    #[test]
    fn pending_selection_reports_cancellation() {
        let (tx, pending) = PendingSelection::channel();
        assert_eq!(pending.poll(), SelectionPoll::Pending);
        drop(tx);
        assert_eq!(pending.poll(), SelectionPoll::Cancelled);
    }
}
