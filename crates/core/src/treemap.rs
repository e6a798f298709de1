use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// Squarified treemap (Bruls, Huizing, van Wijk).
///
/// Returns one rectangle per weight, in input order. Items are placed largest
/// first, in rows along the shorter side of the remaining space; a row keeps
/// accepting items while that does not worsen its worst aspect ratio.
/// Weights that are not positive and finite get an empty rectangle at the origin
/// of `area`.
pub fn squarify(weights: &[f64], area: Rect) -> Vec<Rect> {
    let mut out = vec![Rect::new(area.x, area.y, 0.0, 0.0); weights.len()];
    let usable = |w: f64| w.is_finite() && w > 0.0;

    let total: f64 = weights.iter().copied().filter(|w| usable(*w)).sum();
    if total <= 0.0 || area.w <= 0.0 || area.h <= 0.0 {
        return out;
    }

    let mut order: Vec<usize> = (0..weights.len()).filter(|&i| usable(weights[i])).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));

    let scale = area.area() / total;
    let areas: Vec<f64> = weights
        .iter()
        .map(|&w| if usable(w) { w * scale } else { 0.0 })
        .collect();

    let mut free = area;
    let mut row: Vec<usize> = Vec::new();
    let mut next = 0;
    while next < order.len() {
        let side = free.w.min(free.h);
        let candidate = order[next];
        let current = worst_ratio(&row, &areas, side);
        row.push(candidate);
        if row.len() == 1 || worst_ratio(&row, &areas, side) <= current {
            next += 1;
        } else {
            row.pop();
            free = layout_row(&row, &areas, free, &mut out);
            row.clear();
        }
    }
    if !row.is_empty() {
        layout_row(&row, &areas, free, &mut out);
    }
    out
}

fn worst_ratio(row: &[usize], areas: &[f64], side: f64) -> f64 {
    if row.is_empty() || side <= 0.0 {
        return f64::INFINITY;
    }
    let sum: f64 = row.iter().map(|&i| areas[i]).sum();
    let side_sq = side * side;
    let sum_sq = sum * sum;
    row.iter()
        .map(|&i| {
            let a = areas[i];
            (side_sq * a / sum_sq).max(sum_sq / (side_sq * a))
        })
        .fold(0.0, f64::max)
}

/// Places `row` against the shorter side of `free` and returns what is left.
fn layout_row(row: &[usize], areas: &[f64], free: Rect, out: &mut [Rect]) -> Rect {
    let sum: f64 = row.iter().map(|&i| areas[i]).sum();
    if free.w >= free.h {
        // Column on the left, items stacked top to bottom.
        let thickness = if free.h > 0.0 { (sum / free.h).min(free.w) } else { 0.0 };
        let mut y = free.y;
        for &i in row {
            let h = if thickness > 0.0 { areas[i] / thickness } else { 0.0 };
            out[i] = Rect::new(free.x, y, thickness, h);
            y += h;
        }
        Rect::new(free.x + thickness, free.y, (free.w - thickness).max(0.0), free.h)
    } else {
        // Strip along the top, items left to right.
        let thickness = if free.w > 0.0 { (sum / free.w).min(free.h) } else { 0.0 };
        let mut x = free.x;
        for &i in row {
            let w = if thickness > 0.0 { areas[i] / thickness } else { 0.0 };
            out[i] = Rect::new(x, free.y, w, thickness);
            x += w;
        }
        Rect::new(free.x, free.y + thickness, free.w, (free.h - thickness).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    fn overlaps(a: &Rect, b: &Rect) -> bool {
        a.x + EPS < b.x + b.w && b.x + EPS < a.x + a.w && a.y + EPS < b.y + b.h && b.y + EPS < a.y + a.h
    }

    #[test]
    fn single_item_fills_area() {
        let rects = squarify(&[5.0], Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(rects, vec![Rect::new(0.0, 0.0, 200.0, 100.0)]);
    }

    #[test]
    fn classic_example_areas() {
        // Example from the squarified treemap paper: 6x4 box.
        let weights = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let rects = squarify(&weights, Rect::new(0.0, 0.0, 6.0, 4.0));
        for (w, r) in weights.iter().zip(&rects) {
            assert!((r.area() - w).abs() < EPS, "{w} vs {r:?}");
        }
        // The two largest items share the first column.
        assert!((rects[0].x - 0.0).abs() < EPS && (rects[1].x - 0.0).abs() < EPS);
        assert!((rects[0].w - 3.0).abs() < EPS);
    }

    #[test]
    fn output_keeps_input_order() {
        let rects = squarify(&[1.0, 3.0], Rect::new(0.0, 0.0, 4.0, 1.0));
        assert!((rects[0].area() - 1.0).abs() < EPS);
        assert!((rects[1].area() - 3.0).abs() < EPS);
        // Largest is placed first.
        assert_eq!(rects[1].x, 0.0);
    }

    #[test]
    fn unusable_weights_get_empty_rects() {
        let area = Rect::new(10.0, 20.0, 100.0, 50.0);
        let rects = squarify(&[0.0, -3.0, f64::NAN, 2.0], area);
        for r in &rects[..3] {
            assert_eq!(*r, Rect::new(10.0, 20.0, 0.0, 0.0));
        }
        assert!((rects[3].area() - area.area()).abs() < EPS);
    }

    #[test]
    fn empty_area_or_weights() {
        assert!(squarify(&[], Rect::new(0.0, 0.0, 10.0, 10.0)).is_empty());
        let rects = squarify(&[1.0, 2.0], Rect::new(0.0, 0.0, 0.0, 10.0));
        assert!(rects.iter().all(|r| r.area() == 0.0));
    }

    proptest! {
        #[test]
        fn areas_are_proportional_and_disjoint(
            weights in prop::collection::vec(0.1f64..1000.0, 1..40),
            w in 10.0f64..2000.0,
            h in 10.0f64..2000.0,
        ) {
            let area = Rect::new(0.0, 0.0, w, h);
            let rects = squarify(&weights, area);
            let total: f64 = weights.iter().sum();
            let covered: f64 = rects.iter().map(Rect::area).sum();
            prop_assert!((covered - area.area()).abs() < area.area() * 1e-6);
            for (weight, r) in weights.iter().zip(&rects) {
                let expected = weight / total * area.area();
                prop_assert!((r.area() - expected).abs() < area.area() * 1e-6);
                prop_assert!(r.x >= -EPS && r.y >= -EPS);
                prop_assert!(r.x + r.w <= w + 1e-6 && r.y + r.h <= h + 1e-6);
            }
            for i in 0..rects.len() {
                for j in (i + 1)..rects.len() {
                    prop_assert!(!overlaps(&rects[i], &rects[j]));
                }
            }
        }
    }
}
