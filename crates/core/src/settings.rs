use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{DataViewObject, DataViewObjects};

/// Bounds the format pane enforces on `generalView.opacity`.
pub const OPACITY_MIN: f64 = 10.0;
pub const OPACITY_MAX: f64 = 100.0;

/// Object names accepted for each settings group. The first name is the one
/// the format pane enumerates under.
pub const IMAGE_OBJECTS: &[&str] = &["enableImages", "image"];
pub const COLOR_OBJECTS: &[&str] = &["colorSelector", "color"];
pub const GENERAL_VIEW_OBJECTS: &[&str] = &["generalView"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub show: bool,
    pub resize: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            show: true,
            resize: false,
        }
    }
}

impl ImageSettings {
    pub fn uri_prefix(&self) -> &'static str {
        if self.resize {
            "resized"
        } else {
            "fixed"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub fill: String,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            fill: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralViewSettings {
    pub opacity: f64,
}

impl Default for GeneralViewSettings {
    fn default() -> Self {
        Self { opacity: OPACITY_MAX }
    }
}

impl GeneralViewSettings {
    /// Opacity in `0..=1` for highlighted cells. Out-of-range percentages are
    /// clamped to the format pane bounds; non-numbers fall back to opaque.
    pub fn fill_opacity(&self) -> f64 {
        if self.opacity.is_nan() {
            return 1.0;
        }
        self.opacity.clamp(OPACITY_MIN, OPACITY_MAX) / 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub image: ImageSettings,
    pub color: ColorSettings,
    pub general_view: GeneralViewSettings,
}

impl Settings {
    /// Reads the visual's settings out of the data view objects.
    ///
    /// Every property is optional; a missing or ill-typed property keeps its
    /// default (`image.show = true`, `image.resize = false`,
    /// `color.fill = "#ffffff"`, `generalView.opacity = 100`).
    pub fn parse(objects: Option<&DataViewObjects>) -> Self {
        let mut settings = Settings::default();
        let Some(objects) = objects else {
            return settings;
        };

        if let Some(image) = find_object(objects, IMAGE_OBJECTS) {
            if let Some(show) = bool_property(image, "show") {
                settings.image.show = show;
            }
            if let Some(resize) = bool_property(image, "resize") {
                settings.image.resize = resize;
            }
        }
        if let Some(color) = find_object(objects, COLOR_OBJECTS) {
            if let Some(fill) = color.get("fill").and_then(fill_color) {
                settings.color.fill = fill;
            }
        }
        if let Some(general) = find_object(objects, GENERAL_VIEW_OBJECTS) {
            if let Some(opacity) = number_property(general, "opacity") {
                settings.general_view.opacity = opacity;
            }
        }
        settings
    }
}

fn find_object<'a>(objects: &'a DataViewObjects, names: &[&str]) -> Option<&'a DataViewObject> {
    names.iter().find_map(|name| objects.get(*name))
}

fn bool_property(object: &DataViewObject, name: &str) -> Option<bool> {
    let value = object.get(name)?;
    let parsed = value.as_bool();
    if parsed.is_none() {
        debug!(property = name, %value, "ignoring non-boolean property");
    }
    parsed
}

fn number_property(object: &DataViewObject, name: &str) -> Option<f64> {
    let value = object.get(name)?;
    let parsed = value.as_f64();
    if parsed.is_none() {
        debug!(property = name, %value, "ignoring non-numeric property");
    }
    parsed
}

/// Accepts either a bare color string or the host's `{ "solid": { "color": .. } }` form.
pub fn fill_color(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("solid")
            .and_then(|solid| solid.get("color"))
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Per-row color override stored under the color object of a category row.
pub fn fill_override(objects: &DataViewObjects) -> Option<String> {
    find_object(objects, COLOR_OBJECTS)
        .and_then(|color| color.get("fill"))
        .and_then(fill_color)
}
