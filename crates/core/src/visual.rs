use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cell::*;
use crate::host::{PendingSelection, SelectionPoll, TooltipItem, VisualHost};
use crate::model::{DataPoint, UpdateOptions, ViewModel, Viewport};
use crate::scene::{RenderTarget, SceneError};
use crate::settings::{COLOR_OBJECTS, GENERAL_VIEW_OBJECTS, IMAGE_OBJECTS, OPACITY_MAX, OPACITY_MIN};
use crate::transform::{visual_transform, TransformError};
use crate::treemap::{squarify, Rect};

pub const SOLID_OPACITY: f64 = 1.0;
pub const TRANSPARENT_OPACITY: f64 = 0.3;
/// Fill and opacity of cells without a data point (the root). Fully
/// transparent: the root only pads the layout.
pub const FALLBACK_FILL: &str = "#000000";
pub const FALLBACK_OPACITY: f64 = 0.0;

#[derive(Debug, Error)]
pub enum VisualError {
    #[error("building view model: {0}")]
    Transform(#[from] TransformError),
    #[error("rendering: {0}")]
    Scene(#[from] SceneError),
}

/// How the host should treat the click event after the visual saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Selection toggle requested; the event must not propagate further.
    Handled,
    /// Not consumed (interactions disabled, or the binding is from a replaced cell set).
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
}

/// One entry of the format pane for a settings group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInstance {
    pub object_name: String,
    pub display_name: Option<String>,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub selector: Option<crate::model::SelectionId>,
    pub valid_values: BTreeMap<String, NumberRange>,
}

/// Node of the treemap partition: the root first, then one per data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutNode<'a> {
    pub rect: Rect,
    pub data_point: Option<&'a DataPoint>,
}

/// Amount subtracted from every value before layout so the smallest cells
/// stay visible next to the largest ones. Zero when all values are equal.
/// Always strictly below `data_min` otherwise.
pub fn normalization_floor(view_model: &ViewModel) -> f64 {
    let range = view_model.data_max - view_model.data_min;
    if range == 0.0 {
        return 0.0;
    }
    let exact = view_model.data_min - range * 0.1;
    // Half rounds up.
    let rounded = (exact + 0.5).floor();
    if rounded < view_model.data_min {
        rounded
    } else {
        exact
    }
}

pub fn layout_nodes(view_model: &ViewModel, viewport: Viewport) -> Vec<LayoutNode<'_>> {
    let area = Rect::new(0.0, 0.0, viewport.width, viewport.height);
    let floor = normalization_floor(view_model);
    let weights: Vec<f64> = view_model.data_points.iter().map(|p| p.value - floor).collect();
    let rects = squarify(&weights, area);

    let mut nodes = Vec::with_capacity(rects.len() + 1);
    nodes.push(LayoutNode {
        rect: area,
        data_point: None,
    });
    nodes.extend(
        view_model
            .data_points
            .iter()
            .zip(rects)
            .map(|(p, rect)| LayoutNode {
                rect,
                data_point: Some(p),
            }),
    );
    nodes
}

/// Pattern tile for fixed mode: half the minor viewport side, 4:3.
pub fn fixed_tile(viewport: Viewport) -> (f64, f64) {
    let width = viewport.width.min(viewport.height) / 2.0;
    (width, width / 1024.0 * 768.0)
}

/// Sends `diff` to the target, recording each change in `drawn` once the
/// target accepted it.
fn apply_diff(diff: &CellDiff<'_>, drawn: &mut Vec<Cell>, target: &mut dyn RenderTarget) -> Result<(), SceneError> {
    for cell in &diff.created {
        target.create_cell(cell)?;
        drawn.push((*cell).clone());
    }
    for cell in &diff.updated {
        target.update_cell(cell)?;
        if let Some(slot) = drawn.iter_mut().find(|c| c.key == cell.key) {
            *slot = (*cell).clone();
        }
    }
    for key in &diff.destroyed {
        target.destroy_cell(key)?;
        drawn.retain(|c| &c.key != *key);
    }
    Ok(())
}

struct PendingClick {
    cell_set: CellSetId,
    key: CellKey,
    selection: PendingSelection,
}

/// The treemap visual. Owns the current view model and rendered cell set,
/// both replaced wholesale on every update.
pub struct TreemapVisual {
    host: VisualHost,
    view_model: ViewModel,
    cells: CellSet,
    patterns: Vec<PatternDef>,
    pending: Vec<PendingClick>,
    next_set: u64,
}

impl TreemapVisual {
    pub fn new(host: VisualHost) -> Self {
        Self {
            host,
            view_model: ViewModel::default(),
            cells: CellSet::default(),
            patterns: Vec::new(),
            pending: Vec::new(),
            next_set: 1,
        }
    }

    pub fn view_model(&self) -> &ViewModel {
        &self.view_model
    }

    pub fn cells(&self) -> &CellSet {
        &self.cells
    }

    pub fn patterns(&self) -> &[PatternDef] {
        &self.patterns
    }

    pub fn host(&self) -> &VisualHost {
        &self.host
    }

    pub fn pending_selections(&self) -> usize {
        self.pending.len()
    }

    /// Runs one update cycle. Failures are logged and handed back to the host;
    /// the next cycle starts from scratch.
    pub fn update(&mut self, options: &UpdateOptions, target: &mut dyn RenderTarget) -> Result<(), VisualError> {
        let result = visual_transform(&options.data_views, &self.host)
            .map_err(VisualError::from)
            .and_then(|view_model| self.render(view_model, options.viewport, target));
        if let Err(e) = &result {
            warn!(error = %e, "update cycle failed");
        }
        result
    }

    fn render(&mut self, view_model: ViewModel, viewport: Viewport, target: &mut dyn RenderTarget) -> Result<(), VisualError> {
        target.resize(viewport)?;
        self.view_model = view_model;

        let next_set = CellSetId(self.next_set);
        self.next_set += 1;

        let (cells, patterns) = if self.view_model.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (self.build_cells(viewport), self.build_patterns(viewport))
        };

        self.sync_patterns(patterns, target)?;

        let diff = reconcile(&self.cells.cells, &cells);
        trace!(
            created = diff.created.len(),
            updated = diff.updated.len(),
            destroyed = diff.destroyed.len(),
            "reconciled cells"
        );
        // Mirrors what the target holds, so a failed pass leaves a set the
        // next cycle can reconcile against.
        let mut drawn = self.cells.cells.clone();
        if let Err(e) = apply_diff(&diff, &mut drawn, target) {
            self.cells = CellSet { id: next_set, cells: drawn };
            return Err(e.into());
        }

        let interactions = cells
            .iter()
            .filter_map(|c| {
                c.data_point.as_ref().map(|p| Interaction {
                    cell_set: next_set,
                    key: c.key.clone(),
                    rect: c.rect,
                    data_point: p.clone(),
                })
            })
            .collect();
        self.cells = CellSet { id: next_set, cells };
        target.bind_interactions(interactions)?;

        debug!(
            cells = self.cells.cells.len(),
            patterns = self.patterns.len(),
            width = viewport.width,
            height = viewport.height,
            "rendered treemap"
        );
        Ok(())
    }

    fn build_cells(&self, viewport: Viewport) -> Vec<Cell> {
        let vm = &self.view_model;
        let use_images = vm.use_images();
        let highlighted_opacity = vm.settings.general_view.fill_opacity();
        let mut ordinals: HashMap<&str, usize> = HashMap::new();

        layout_nodes(vm, viewport)
            .into_iter()
            .map(|node| match node.data_point {
                None => Cell {
                    key: CellKey::Root,
                    rect: node.rect,
                    fill: Fill::Solid(FALLBACK_FILL.to_string()),
                    opacity: FALLBACK_OPACITY,
                    data_point: None,
                },
                Some(point) => {
                    let ordinal = ordinals.entry(point.category.as_str()).or_insert(0);
                    let key = CellKey::Category {
                        name: point.category.clone(),
                        ordinal: *ordinal,
                    };
                    *ordinal += 1;
                    let fill = if use_images && point.image_url.is_some() {
                        Fill::Pattern(point.uri.clone())
                    } else {
                        Fill::Solid(point.color.clone())
                    };
                    let opacity = if point.highlighted {
                        highlighted_opacity
                    } else {
                        TRANSPARENT_OPACITY
                    };
                    Cell {
                        key,
                        rect: node.rect,
                        fill,
                        opacity,
                        data_point: Some(point.clone()),
                    }
                }
            })
            .collect()
    }

    fn build_patterns(&self, viewport: Viewport) -> Vec<PatternDef> {
        if !self.view_model.use_images() {
            return Vec::new();
        }
        let mode = if self.view_model.settings.image.resize {
            PatternMode::Resize
        } else {
            let (width, height) = fixed_tile(viewport);
            PatternMode::Fixed { width, height }
        };
        let mut seen = HashSet::new();
        self.view_model
            .data_points
            .iter()
            .filter_map(|p| {
                let href = p.image_url.as_ref()?;
                seen.insert(p.uri.as_str()).then(|| PatternDef {
                    id: p.uri.clone(),
                    href: href.clone(),
                    mode,
                })
            })
            .collect()
    }

    /// `self.patterns` follows every call that succeeded, even if a later one fails.
    fn sync_patterns(&mut self, next: Vec<PatternDef>, target: &mut dyn RenderTarget) -> Result<(), SceneError> {
        let stale: Vec<String> = self
            .patterns
            .iter()
            .filter(|old| !next.iter().any(|p| p.id == old.id))
            .map(|old| old.id.clone())
            .collect();
        for id in stale {
            target.remove_pattern(&id)?;
            self.patterns.retain(|p| p.id != id);
        }
        for pattern in &next {
            if !self.patterns.contains(pattern) {
                target.define_pattern(pattern)?;
                self.patterns.retain(|p| p.id != pattern.id);
                self.patterns.push(pattern.clone());
            }
        }
        self.patterns = next;
        Ok(())
    }

    /// Tooltip for a hovered cell, or `None` if the binding is stale.
    pub fn hover(&mut self, interaction: &Interaction, position: (f64, f64)) -> Option<Vec<TooltipItem>> {
        if interaction.cell_set != self.cells.id {
            return None;
        }
        let items = interaction.tooltip(self.host.formatter.as_ref());
        self.host.tooltips.show(&items, position);
        Some(items)
    }

    pub fn leave(&mut self) {
        self.host.tooltips.hide();
    }

    /// Asks the selection manager to toggle the clicked cell. Opacity changes
    /// only once the manager answers, see [`TreemapVisual::poll_selection`].
    pub fn click(&mut self, interaction: &Interaction, multi_select: bool) -> ClickOutcome {
        if !self.host.allow_interactions {
            return ClickOutcome::Ignored;
        }
        if interaction.cell_set != self.cells.id {
            debug!(key = %interaction.key, "click on a replaced cell set");
            return ClickOutcome::Ignored;
        }
        let selection = self
            .host
            .selection
            .select(&interaction.data_point.selection_id, multi_select);
        self.pending.push(PendingClick {
            cell_set: interaction.cell_set,
            key: interaction.key.clone(),
            selection,
        });
        ClickOutcome::Handled
    }

    /// Applies every selection result that has arrived, in click order.
    /// Results whose cell set has since been replaced are dropped.
    /// Returns how many results changed opacities.
    pub fn poll_selection(&mut self, target: &mut dyn RenderTarget) -> Result<usize, VisualError> {
        let mut queue = std::mem::take(&mut self.pending).into_iter();
        let mut applied = 0;
        while let Some(click) = queue.next() {
            match click.selection.poll() {
                SelectionPoll::Pending => self.pending.push(click),
                SelectionPoll::Cancelled => debug!(key = %click.key, "selection cancelled"),
                SelectionPoll::Ready(_) if click.cell_set != self.cells.id => {
                    trace!(key = %click.key, "dropping selection for replaced cells");
                }
                SelectionPoll::Ready(ids) => {
                    if let Err(e) = self.apply_selection(&click.key, !ids.is_empty(), target) {
                        self.pending.extend(queue);
                        warn!(error = %e, "applying selection failed");
                        return Err(e.into());
                    }
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    fn apply_selection(&mut self, clicked: &CellKey, any_selected: bool, target: &mut dyn RenderTarget) -> Result<(), SceneError> {
        for cell in self.cells.cells.iter_mut().filter(|c| c.data_point.is_some()) {
            let opacity = if !any_selected || &cell.key == clicked {
                SOLID_OPACITY
            } else {
                TRANSPARENT_OPACITY
            };
            if cell.opacity != opacity {
                cell.opacity = opacity;
                target.set_opacity(&cell.key, opacity)?;
            }
        }
        Ok(())
    }

    /// Current property values for the format pane.
    pub fn enumerate_object_instances(&self, object_name: &str) -> Vec<ObjectInstance> {
        let settings = &self.view_model.settings;
        let instance = |properties: BTreeMap<String, serde_json::Value>| ObjectInstance {
            object_name: object_name.to_string(),
            display_name: None,
            properties,
            selector: None,
            valid_values: BTreeMap::new(),
        };

        if IMAGE_OBJECTS.contains(&object_name) {
            vec![instance(BTreeMap::from([
                ("show".to_string(), settings.image.show.into()),
                ("resize".to_string(), settings.image.resize.into()),
            ]))]
        } else if COLOR_OBJECTS.contains(&object_name) {
            self.view_model
                .data_points
                .iter()
                .map(|p| ObjectInstance {
                    display_name: Some(p.category.clone()),
                    selector: Some(p.selection_id.clone()),
                    ..instance(BTreeMap::from([(
                        "fill".to_string(),
                        serde_json::json!({ "solid": { "color": p.color } }),
                    )]))
                })
                .collect()
        } else if GENERAL_VIEW_OBJECTS.contains(&object_name) {
            vec![ObjectInstance {
                valid_values: BTreeMap::from([(
                    "opacity".to_string(),
                    NumberRange {
                        min: OPACITY_MIN,
                        max: OPACITY_MAX,
                    },
                )]),
                ..instance(BTreeMap::from([(
                    "opacity".to_string(),
                    serde_json::json!(settings.general_view.opacity),
                )]))
            }]
        } else {
            Vec::new()
        }
    }
}
