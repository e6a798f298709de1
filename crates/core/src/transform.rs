use thiserror::Error;
use tracing::debug;

use crate::host::VisualHost;
use crate::model::*;
use crate::settings::{fill_override, Settings};

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("highlight mask of series `{series}` has {highlights} entries for {values} values")]
    HighlightLength {
        series: String,
        values: usize,
        highlights: usize,
    },
    #[error("category `{column}` has {objects} row objects for {rows} rows")]
    ObjectsLength {
        column: String,
        rows: usize,
        objects: usize,
    },
    #[error("row {row} has non-finite value {value}")]
    NonFinite { row: usize, value: f64 },
}

/// Where a row's image URL comes from.
enum ImageSource<'a> {
    None,
    /// A second category column tagged as image URL.
    Column(&'a CategoryColumn),
    /// Value series grouped by an image-URL column; series `i` carries row `i`.
    SeriesGroups,
}

impl ImageSource<'_> {
    fn is_present(&self) -> bool {
        !matches!(self, ImageSource::None)
    }
}

/// Builds the view model for one update cycle.
///
/// Missing pieces of the data view are treated as absent; only structural
/// violations (misaligned parallel arrays, infinite values) are errors.
pub fn visual_transform(data_views: &[DataView], host: &VisualHost) -> Result<ViewModel, TransformError> {
    let Some(data_view) = data_views.first() else {
        return Ok(ViewModel::default());
    };
    let settings = Settings::parse(data_view.metadata.objects.as_ref());
    let Some(categorical) = data_view.categorical.as_ref() else {
        return Ok(ViewModel::empty(settings));
    };
    let Some(category) = categorical.categories.first() else {
        return Ok(ViewModel::empty(settings));
    };
    let rows = category.values.len();
    if rows == 0 {
        return Ok(ViewModel::empty(settings));
    }

    validate(category, categorical)?;

    let image_source = match categorical.categories.get(1) {
        Some(column) if column.source.is_image_url() => ImageSource::Column(column),
        _ if data_view.metadata.columns.iter().any(ColumnMetadata::is_image_url)
            && categorical.values.iter().any(|v| v.source.group_name.is_some()) =>
        {
            ImageSource::SeriesGroups
        }
        _ => ImageSource::None,
    };

    let prefix = settings.image.uri_prefix();
    let mut data_points = Vec::with_capacity(rows);
    let mut data_max: Option<f64> = None;
    let mut data_min: Option<f64> = None;

    for i in 0..rows {
        let series = match image_source {
            ImageSource::SeriesGroups => categorical.values.get(i),
            _ => categorical.values.first(),
        };
        let value = match series {
            Some(series) => series.values.get(i).copied().flatten(),
            None if categorical.values.is_empty() => Some(1.0),
            None => None,
        };
        let Some(value) = value else { continue };
        if value.is_infinite() {
            return Err(TransformError::NonFinite { row: i, value });
        }
        if value.is_nan() || value <= 0.0 {
            continue;
        }

        let name = category.values[i].to_string();
        let image_url = match image_source {
            ImageSource::Column(column) => column.values.get(i).and_then(|v| match v {
                PrimitiveValue::Null => None,
                other => Some(other.to_string()),
            }),
            ImageSource::SeriesGroups => series.and_then(|s| s.source.group_name.clone()),
            ImageSource::None => None,
        }
        .filter(|url| !url.is_empty());

        let highlighted = series
            .and_then(|s| s.highlights.as_ref())
            .map_or(true, |mask| mask.get(i).copied().flatten().is_some());

        let color = category
            .objects
            .as_ref()
            .and_then(|objects| objects.get(i))
            .and_then(Option::as_ref)
            .and_then(fill_override)
            .unwrap_or_else(|| host.palette.color_for(&name));

        data_max = Some(data_max.map_or(value, |m| m.max(value)));
        data_min = Some(data_min.map_or(value, |m| m.min(value)));

        data_points.push(DataPoint {
            uri: format!("{prefix}-{}", urlencoding::encode(&name)),
            selection_id: host.selection_ids.for_category(category, i),
            category: name,
            value,
            color,
            image_url,
            resize: settings.image.resize,
            highlighted,
        });
    }

    if data_points.is_empty() {
        debug!(rows, "no rows with a positive value");
        return Ok(ViewModel::empty(settings));
    }

    let has_image_urls = image_source.is_present();
    let view_model = ViewModel {
        data_max: data_max.unwrap_or_default(),
        data_min: data_min.unwrap_or_default(),
        data_points,
        has_image_urls,
        settings,
    };
    debug!(
        rows,
        included = view_model.data_points.len(),
        data_min = view_model.data_min,
        data_max = view_model.data_max,
        has_image_urls,
        "built view model"
    );
    Ok(view_model)
}

fn validate(category: &CategoryColumn, categorical: &Categorical) -> Result<(), TransformError> {
    if let Some(objects) = &category.objects {
        if objects.len() != category.values.len() {
            return Err(TransformError::ObjectsLength {
                column: category.source.query_name.clone(),
                rows: category.values.len(),
                objects: objects.len(),
            });
        }
    }
    for series in &categorical.values {
        if let Some(highlights) = &series.highlights {
            if highlights.len() != series.values.len() {
                return Err(TransformError::HighlightLength {
                    series: series.source.query_name.clone(),
                    values: series.values.len(),
                    highlights: highlights.len(),
                });
            }
        }
    }
    Ok(())
}
