use anyhow::Context;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use imagetreemap_core::host::{TooltipItem, TooltipService, VisualHost};
use imagetreemap_core::import::{data_view_from_csv, CsvMapping};
use imagetreemap_core::settings::{COLOR_OBJECTS, GENERAL_VIEW_OBJECTS, IMAGE_OBJECTS};
use imagetreemap_core::{DataView, DataViewObjects, Scene, SelectionId, TreemapVisual, UpdateOptions, Viewport};

/// Latest tooltip produced by the visual, drawn by the UI on the next frame.
#[derive(Clone, Default)]
pub struct TooltipSlot(Rc<RefCell<Option<Vec<TooltipItem>>>>);

impl TooltipSlot {
    pub fn current(&self) -> Option<Vec<TooltipItem>> {
        self.0.borrow().clone()
    }
}

impl TooltipService for TooltipSlot {
    fn show(&mut self, items: &[TooltipItem], _position: (f64, f64)) {
        *self.0.borrow_mut() = Some(items.to_vec());
    }

    fn hide(&mut self) {
        *self.0.borrow_mut() = None;
    }
}

pub struct AppState {
    pub source: Option<PathBuf>,
    pub category_column: String,
    pub value_column: String,
    pub image_column: String,
    pub data_view: Option<DataView>,
    pub objects: DataViewObjects,
    /// Per-category fills chosen in the format pane; outlive reloads.
    pub color_overrides: BTreeMap<SelectionId, String>,
    pub visual: TreemapVisual,
    pub scene: Scene,
    pub tooltip: TooltipSlot,
    pub error: Option<String>,
    viewport: Option<Viewport>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        let tooltip = TooltipSlot::default();
        Self {
            source: None,
            category_column: "category".to_string(),
            value_column: "value".to_string(),
            image_column: String::new(),
            data_view: None,
            objects: DataViewObjects::new(),
            color_overrides: BTreeMap::new(),
            visual: TreemapVisual::new(VisualHost::new().with_tooltips(tooltip.clone())),
            scene: Scene::new(),
            tooltip,
            error: None,
            viewport: None,
            dirty: true,
        }
    }

    fn mapping(&self) -> CsvMapping {
        let optional = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        CsvMapping {
            category: self.category_column.trim().to_string(),
            value: optional(&self.value_column),
            image: optional(&self.image_column),
        }
    }

    pub fn load_csv(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let file = std::fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let data_view = data_view_from_csv(file, &self.mapping()).with_context(|| format!("reading {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded data");
        self.data_view = Some(data_view);
        self.source = Some(path);
        self.dirty = true;
        Ok(())
    }

    pub fn reload(&mut self) {
        if let Some(path) = self.source.clone() {
            if let Err(e) = self.load_csv(path) {
                self.error = Some(format!("{e:#}"));
            }
        }
    }

    /// Runs an update cycle when the data, settings or canvas size changed.
    pub fn refresh(&mut self, viewport: Viewport) {
        if !self.dirty && self.viewport == Some(viewport) {
            return;
        }
        self.viewport = Some(viewport);
        self.dirty = false;

        let data_views = self.data_views();
        let options = UpdateOptions { data_views, viewport };
        self.error = self
            .visual
            .update(&options, &mut self.scene)
            .err()
            .map(|e| e.to_string());
    }

    /// Applies selection results that arrived since the last frame.
    pub fn poll(&mut self) {
        if let Err(e) = self.visual.poll_selection(&mut self.scene) {
            self.error = Some(e.to_string());
        }
    }

    fn set_property(&mut self, names: &[&str], property: &str, value: serde_json::Value) {
        let name = names
            .iter()
            .find(|n| self.objects.contains_key(**n))
            .unwrap_or(&names[0])
            .to_string();
        self.objects.entry(name).or_default().insert(property.to_string(), value);
        self.dirty = true;
    }

    pub fn set_show_images(&mut self, show: bool) {
        self.set_property(IMAGE_OBJECTS, "show", show.into());
    }

    pub fn set_resize(&mut self, resize: bool) {
        self.set_property(IMAGE_OBJECTS, "resize", resize.into());
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.set_property(GENERAL_VIEW_OBJECTS, "opacity", serde_json::json!(opacity));
    }

    pub fn set_category_color(&mut self, selector: &SelectionId, color: &str) {
        self.color_overrides.insert(selector.clone(), color.to_string());
        self.dirty = true;
    }

    /// The loaded data view with the current settings and color overrides applied.
    fn data_views(&self) -> Vec<DataView> {
        let Some(mut dv) = self.data_view.clone() else {
            return Vec::new();
        };
        dv.metadata.objects = Some(self.objects.clone());
        if self.color_overrides.is_empty() {
            return vec![dv];
        }
        if let Some(category) = dv.categorical.as_mut().and_then(|c| c.categories.first_mut()) {
            let rows = category.values.len();
            let objects = category.objects.get_or_insert_with(|| vec![None; rows]);
            for (value, row) in category.values.iter().zip(objects.iter_mut()) {
                let id = SelectionId {
                    column: category.source.query_name.clone(),
                    key: value.to_string(),
                };
                if let Some(color) = self.color_overrides.get(&id) {
                    row.get_or_insert_with(DataViewObjects::new)
                        .entry(COLOR_OBJECTS[0].to_string())
                        .or_default()
                        .insert("fill".to_string(), serde_json::json!({ "solid": { "color": color } }));
                }
            }
        }
        vec![dv]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagetreemap_core::{Categorical, CategoryColumn, ColumnMetadata, PrimitiveValue, ValueColumn};

    fn sales(names: &[&str]) -> DataView {
        let category = ColumnMetadata::named("t.Name").with_role("category");
        DataView {
            categorical: Some(Categorical {
                categories: vec![CategoryColumn {
                    source: category,
                    values: names.iter().map(|n| PrimitiveValue::from(*n)).collect(),
                    objects: None,
                }],
                values: vec![ValueColumn {
                    source: ColumnMetadata::named("t.Sales").with_role("measure"),
                    values: names.iter().map(|_| Some(1.0)).collect(),
                    highlights: None,
                }],
            }),
            ..DataView::default()
        }
    }

    #[test]
    fn color_overrides_survive_reloading_the_data() {
        let mut app = AppState::new();
        app.data_view = Some(sales(&["A", "B"]));
        app.refresh(Viewport::new(200.0, 100.0));
        let b = app.visual.view_model().data_points[1].selection_id.clone();
        app.set_category_color(&b, "#123456");

        // Reloading replaces the data view wholesale.
        app.data_view = Some(sales(&["C", "B", "A"]));
        app.refresh(Viewport::new(200.0, 100.0));

        let points = &app.visual.view_model().data_points;
        let color = |name: &str| points.iter().find(|p| p.category == name).map(|p| p.color.clone());
        assert_eq!(color("B").as_deref(), Some("#123456"));
        assert_ne!(color("A").as_deref(), Some("#123456"));
        assert_ne!(color("C").as_deref(), Some("#123456"));
    }
}
