use std::io::Read;
use thiserror::Error;

use crate::model::*;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("column `{0}` not found")]
    MissingColumn(String),
    #[error("row {row}: `{value}` in column `{column}` is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// Which CSV headers feed which data role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvMapping {
    pub category: String,
    pub value: Option<String>,
    pub image: Option<String>,
}

impl CsvMapping {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: None,
            image: None,
        }
    }
}

/// Builds a categorical data view from CSV rows. Empty value cells become nulls.
pub fn data_view_from_csv(reader: impl Read, mapping: &CsvMapping) -> Result<DataView, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index_of = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
    };
    let category_idx = index_of(&mapping.category)?;
    let value_idx = mapping.value.as_deref().map(index_of).transpose()?;
    let image_idx = mapping.image.as_deref().map(index_of).transpose()?;

    let mut names = Vec::new();
    let mut values = Vec::new();
    let mut images = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();
        names.push(PrimitiveValue::from(field(category_idx)));
        if let (Some(i), Some(column)) = (value_idx, mapping.value.as_ref()) {
            let raw = field(i);
            let value = if raw.is_empty() {
                None
            } else {
                Some(raw.parse::<f64>().map_err(|_| ImportError::InvalidNumber {
                    row,
                    column: column.clone(),
                    value: raw.to_string(),
                })?)
            };
            values.push(value);
        }
        if let Some(i) = image_idx {
            let url = field(i);
            images.push(if url.is_empty() {
                PrimitiveValue::Null
            } else {
                PrimitiveValue::from(url)
            });
        }
    }

    let category_meta = ColumnMetadata::named(&mapping.category).with_role("category");
    let mut metadata = DataViewMetadata {
        columns: vec![category_meta.clone()],
        objects: None,
    };
    let mut categorical = Categorical {
        categories: vec![CategoryColumn {
            source: category_meta,
            values: names,
            objects: None,
        }],
        values: Vec::new(),
    };
    if let Some(name) = &mapping.image {
        let meta = ColumnMetadata::named(name).with_role("imageUrl").image_url();
        metadata.columns.push(meta.clone());
        categorical.categories.push(CategoryColumn {
            source: meta,
            values: images,
            objects: None,
        });
    }
    if let Some(name) = &mapping.value {
        let meta = ColumnMetadata::named(name).with_role("measure");
        metadata.columns.push(meta.clone());
        categorical.values.push(ValueColumn {
            source: meta,
            values,
            highlights: None,
        });
    }
    Ok(DataView {
        metadata,
        categorical: Some(categorical),
    })
}

pub fn data_view_from_json(reader: impl Read) -> Result<DataView, ImportError> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "name,sales,logo\nA,10,http://x/a.png\nB,,\nC,30,http://x/c.png\n";

    #[test]
    fn maps_columns_to_roles() {
        let mapping = CsvMapping {
            category: "name".into(),
            value: Some("sales".into()),
            image: Some("logo".into()),
        };
        let dv = data_view_from_csv(CSV.as_bytes(), &mapping).unwrap();
        let cat = dv.categorical.unwrap();
        assert_eq!(cat.categories.len(), 2);
        assert!(cat.categories[1].source.is_image_url());
        assert_eq!(cat.categories[1].values[1], PrimitiveValue::Null);
        assert_eq!(cat.values[0].values, vec![Some(10.0), None, Some(30.0)]);
        assert_eq!(dv.metadata.columns.len(), 3);
    }

    #[test]
    fn category_only() {
        let dv = data_view_from_csv(CSV.as_bytes(), &CsvMapping::new("name")).unwrap();
        let cat = dv.categorical.unwrap();
        assert_eq!(cat.categories.len(), 1);
        assert!(cat.values.is_empty());
    }

    #[test]
    fn unknown_column_and_bad_number() {
        let err = data_view_from_csv(CSV.as_bytes(), &CsvMapping::new("missing")).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(c) if c == "missing"));

        let mut mapping = CsvMapping::new("name");
        mapping.value = Some("logo".into());
        let err = data_view_from_csv(CSV.as_bytes(), &mapping).unwrap_err();
        assert!(matches!(err, ImportError::InvalidNumber { row: 0, .. }));
    }
}
