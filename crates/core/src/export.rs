use std::fmt::Write as _;

use crate::cell::{Fill, PatternMode};
use crate::scene::Scene;

pub fn to_csv(scene: &Scene, mut w: impl std::io::Write) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(&mut w);
    writer.write_record(["key", "category", "value", "x", "y", "width", "height", "fill", "opacity"])?;
    for c in &scene.cells {
        let fill = match &c.fill {
            Fill::Solid(color) => color.clone(),
            Fill::Pattern(id) => format!("url(#{id})"),
        };
        let (category, value) = c
            .data_point
            .as_ref()
            .map(|p| (p.category.clone(), p.value.to_string()))
            .unwrap_or_default();
        writer.write_record([
            c.key.to_string(),
            category,
            value,
            c.rect.x.to_string(),
            c.rect.y.to_string(),
            c.rect.w.to_string(),
            c.rect.h.to_string(),
            fill,
            c.opacity.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_json(scene: &Scene) -> serde_json::Value {
    serde_json::json!({
        "viewport": scene.viewport,
        "patterns": scene.patterns,
        "cells": scene.cells.iter().map(|c| serde_json::json!({
            "key": c.key.to_string(),
            "category": c.data_point.as_ref().map(|p| &p.category),
            "value": c.data_point.as_ref().map(|p| p.value),
            "rect": c.rect,
            "fill": c.fill,
            "opacity": c.opacity,
        })).collect::<Vec<_>>()
    })
}

/// Standalone SVG document of the scene, patterns in `<defs>`.
pub fn to_svg(scene: &Scene) -> String {
    let (width, height) = scene
        .viewport
        .map(|v| (v.width, v.height))
        .unwrap_or_default();
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" class="imageTreeMap" width="{}" height="{}">"#,
        num(width),
        num(height)
    );
    if !scene.patterns.is_empty() {
        out.push_str("  <defs>\n");
        for p in &scene.patterns {
            let id = escape(&p.id);
            let href = escape(&p.href);
            let _ = match p.mode {
                PatternMode::Fixed { width, height } => writeln!(
                    out,
                    r#"    <pattern id="{id}" patternUnits="userSpaceOnUse" width="{w}" height="{h}"><image xlink:href="{href}" width="{w}" height="{h}" preserveAspectRatio="xMinYMin slice"/></pattern>"#,
                    w = num(width),
                    h = num(height),
                ),
                PatternMode::Resize => writeln!(
                    out,
                    r#"    <pattern id="{id}" patternContentUnits="objectBoundingBox" width="1" height="1"><image xlink:href="{href}" width="1" height="1" preserveAspectRatio="none"/></pattern>"#,
                ),
            };
        }
        out.push_str("  </defs>\n");
    }
    out.push_str("  <g class=\"container\">\n");
    for c in &scene.cells {
        let fill = match &c.fill {
            Fill::Solid(color) => escape(color),
            Fill::Pattern(id) => format!("url(#{})", escape(id)),
        };
        let _ = writeln!(
            out,
            r#"    <rect class="cell" data-key="{}" transform="translate({}, {})" width="{}" height="{}" fill="{}" fill-opacity="{}"/>"#,
            escape(&c.key.to_string()),
            num(c.rect.x),
            num(c.rect.y),
            num(c.rect.w),
            num(c.rect.h),
            fill,
            num(c.opacity)
        );
    }
    out.push_str("  </g>\n</svg>\n");
    out
}

fn num(v: f64) -> String {
    let s = format!("{v:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellKey, PatternDef};
    use crate::model::Viewport;
    use crate::treemap::Rect;

    fn scene() -> Scene {
        Scene {
            viewport: Some(Viewport::new(200.0, 100.0)),
            cells: vec![Cell {
                key: CellKey::Category { name: "A&B".into(), ordinal: 0 },
                rect: Rect::new(0.0, 0.0, 200.0, 100.0),
                fill: Fill::Pattern("fixed-A%26B".into()),
                opacity: 0.5,
                data_point: None,
            }],
            patterns: vec![PatternDef {
                id: "fixed-A%26B".into(),
                href: "http://x/a.png?s=1&t=2".into(),
                mode: PatternMode::Fixed { width: 50.0, height: 37.5 },
            }],
            interactions: Vec::new(),
        }
    }

    #[test]
    fn svg_contains_patterns_and_cells() {
        let svg = to_svg(&scene());
        assert!(svg.contains(r#"width="200" height="100""#));
        assert!(svg.contains(r#"<pattern id="fixed-A%26B" patternUnits="userSpaceOnUse" width="50" height="37.5">"#));
        assert!(svg.contains("a.png?s=1&amp;t=2"));
        assert!(svg.contains(r#"data-key="A&amp;B""#));
        assert!(svg.contains(r#"fill="url(#fixed-A%26B)" fill-opacity="0.5""#));
    }

    #[test]
    fn csv_has_one_row_per_cell() {
        let mut buf = Vec::new();
        to_csv(&scene(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().contains("url(#fixed-A%26B)"));
    }

    #[test]
    fn json_lists_cells() {
        let json = to_json(&scene());
        assert_eq!(json["cells"][0]["key"], "A&B");
        assert_eq!(json["patterns"][0]["mode"]["kind"], "fixed");
    }
}
