use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::settings::Settings;

/// Property bag attached to a data view, a column or a single row:
/// object name -> property name -> raw value.
pub type DataViewObjects = BTreeMap<String, DataViewObject>;
pub type DataViewObject = BTreeMap<String, serde_json::Value>;

/// A single cell of host data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl Default for PrimitiveValue {
    fn default() -> Self {
        PrimitiveValue::Null
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Bool(b) => write!(f, "{b}"),
            PrimitiveValue::Number(n) => write!(f, "{n}"),
            PrimitiveValue::Text(s) => f.write_str(s),
            PrimitiveValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for PrimitiveValue {
    fn from(s: &str) -> Self {
        PrimitiveValue::Text(s.to_string())
    }
}

impl From<f64> for PrimitiveValue {
    fn from(n: f64) -> Self {
        PrimitiveValue::Number(n)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MiscType {
    pub image_url: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueType {
    pub misc: MiscType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMetadata {
    pub display_name: String,
    pub query_name: String,
    pub roles: BTreeMap<String, bool>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub group_name: Option<String>,
}

impl ColumnMetadata {
    pub fn named(name: &str) -> Self {
        Self {
            display_name: name.to_string(),
            query_name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.insert(role.to_string(), true);
        self
    }

    pub fn image_url(mut self) -> Self {
        self.value_type.misc.image_url = true;
        self
    }

    pub fn is_image_url(&self) -> bool {
        self.value_type.misc.image_url
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryColumn {
    pub source: ColumnMetadata,
    pub values: Vec<PrimitiveValue>,
    /// Per-row overrides, parallel to `values` when present.
    pub objects: Option<Vec<Option<DataViewObjects>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueColumn {
    pub source: ColumnMetadata,
    pub values: Vec<Option<f64>>,
    /// Highlight mask parallel to `values`; `None` entries are not highlighted.
    pub highlights: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Categorical {
    pub categories: Vec<CategoryColumn>,
    pub values: Vec<ValueColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataViewMetadata {
    pub columns: Vec<ColumnMetadata>,
    pub objects: Option<DataViewObjects>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataView {
    pub metadata: DataViewMetadata,
    pub categorical: Option<Categorical>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Everything the host hands over for one update cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    #[serde(default)]
    pub data_views: Vec<DataView>,
    pub viewport: Viewport,
}

/// Identity of one data row for cross-filtering. Two ids are equal when they
/// point at the same category value of the same column, whatever row produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionId {
    pub column: String,
    pub key: String,
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub category: String,
    pub value: f64,
    pub color: String,
    pub image_url: Option<String>,
    /// Pattern key, unique per category within one view model.
    pub uri: String,
    pub resize: bool,
    pub highlighted: bool,
    pub selection_id: SelectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub data_points: Vec<DataPoint>,
    pub data_max: f64,
    pub data_min: f64,
    pub has_image_urls: bool,
    pub settings: Settings,
}

impl ViewModel {
    pub fn empty(settings: Settings) -> Self {
        Self {
            data_points: Vec::new(),
            data_max: 0.0,
            data_min: 0.0,
            has_image_urls: false,
            settings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }

    /// Pattern fills are used only when the data carries image URLs and the
    /// user has not switched images off.
    pub fn use_images(&self) -> bool {
        self.has_image_urls && self.settings.image.show
    }
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::empty(Settings::default())
    }
}
