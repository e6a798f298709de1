use eframe::egui::{self, Color32, Pos2, Rect, Sense, Ui};
use imagetreemap_core::cell::{Cell, Fill, PatternMode};
use imagetreemap_core::settings::{COLOR_OBJECTS, GENERAL_VIEW_OBJECTS, IMAGE_OBJECTS};
use imagetreemap_core::{ClickOutcome, Viewport};

use crate::state::AppState;

pub fn draw(app: &mut AppState, ctx: &egui::Context) {
    app.poll();

    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        top_bar(ui, app);
    });

    egui::SidePanel::right("format").resizable(true).default_width(260.0).show(ctx, |ui| {
        egui::ScrollArea::vertical().show(ui, |ui| format_pane(ui, app));
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        if let Some(err) = &app.error {
            ui.colored_label(Color32::RED, err);
        }
        if app.data_view.is_none() {
            ui.label("Open a CSV file to start");
            return;
        }
        canvas(ui, app);
    });
}

fn top_bar(ui: &mut Ui, app: &mut AppState) {
    ui.horizontal(|ui| {
        if ui.button("Open CSV").clicked() {
            if let Some(path) = rfd::FileDialog::new().add_filter("csv", &["csv"]).pick_file() {
                if let Err(e) = app.load_csv(path) {
                    app.error = Some(format!("{e:#}"));
                }
            }
        }
        if ui.button("Reload").clicked() {
            app.reload();
        }
        ui.separator();
        ui.label("Category:");
        ui.add(egui::TextEdit::singleline(&mut app.category_column).desired_width(90.0));
        ui.label("Value:");
        ui.add(egui::TextEdit::singleline(&mut app.value_column).desired_width(90.0));
        ui.label("Image URL:");
        ui.add(egui::TextEdit::singleline(&mut app.image_column).desired_width(90.0));
        if let Some(path) = &app.source {
            ui.separator();
            ui.label(path.display().to_string());
        }
    });
}

/// Settings editor built from what the visual enumerates for each group.
fn format_pane(ui: &mut Ui, app: &mut AppState) {
    ui.heading("Images");
    for instance in app.visual.enumerate_object_instances(IMAGE_OBJECTS[0]) {
        let mut show = instance.properties.get("show").and_then(|v| v.as_bool()).unwrap_or(true);
        let mut resize = instance.properties.get("resize").and_then(|v| v.as_bool()).unwrap_or(false);
        if ui.checkbox(&mut show, "Show images").changed() {
            app.set_show_images(show);
        }
        if ui.checkbox(&mut resize, "Stretch to cell").changed() {
            app.set_resize(resize);
        }
    }

    ui.separator();
    ui.heading("General");
    for instance in app.visual.enumerate_object_instances(GENERAL_VIEW_OBJECTS[0]) {
        let mut opacity = instance.properties.get("opacity").and_then(|v| v.as_f64()).unwrap_or(100.0);
        let range = instance
            .valid_values
            .get("opacity")
            .map(|r| r.min..=r.max)
            .unwrap_or(0.0..=100.0);
        if ui.add(egui::Slider::new(&mut opacity, range).text("Opacity")).changed() {
            app.set_opacity(opacity);
        }
    }

    ui.separator();
    ui.heading("Data colors");
    for instance in app.visual.enumerate_object_instances(COLOR_OBJECTS[0]) {
        let Some(selector) = &instance.selector else { continue };
        let hex = instance.properties["fill"]["solid"]["color"].as_str().unwrap_or("#000000");
        let mut color = parse_color(hex);
        ui.horizontal(|ui| {
            if egui::color_picker::color_edit_button_srgba(ui, &mut color, egui::color_picker::Alpha::Opaque).changed() {
                app.set_category_color(selector, &color.to_hex());
            }
            ui.label(instance.display_name.as_deref().unwrap_or_default());
        });
    }
}

fn canvas(ui: &mut Ui, app: &mut AppState) {
    let size = ui.available_size();
    let (response, painter) = ui.allocate_painter(size, Sense::click());
    let origin = response.rect.min;
    app.refresh(Viewport::new(size.x as f64, size.y as f64));

    for cell in &app.scene.cells {
        let rect = to_screen(origin, cell);
        match &cell.fill {
            Fill::Solid(color) => {
                painter.rect_filled(rect, 0.0, parse_color(color).gamma_multiply(cell.opacity as f32));
            }
            Fill::Pattern(id) => {
                if let Some(pattern) = app.scene.pattern(id) {
                    paint_pattern(ui, origin, rect, &pattern.href, pattern.mode, cell.opacity as f32);
                }
            }
        }
        if cell.data_point.is_some() {
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, Color32::from_gray(40)));
        }
    }

    let hovered = response
        .hover_pos()
        .and_then(|pos| app.scene.hit_test((pos.x - origin.x) as f64, (pos.y - origin.y) as f64).cloned());
    match &hovered {
        Some(interaction) => {
            let pos = response.hover_pos().unwrap_or(origin);
            app.visual.hover(interaction, (pos.x as f64, pos.y as f64));
        }
        None => app.visual.leave(),
    }

    if response.clicked() {
        if let Some(interaction) = &hovered {
            let multi = ui.input(|i| i.modifiers.command);
            if app.visual.click(interaction, multi) == ClickOutcome::Handled {
                ui.ctx().request_repaint();
            }
        }
    }

    if let Some(items) = app.tooltip.current() {
        response.on_hover_ui_at_pointer(|ui| {
            for item in items {
                ui.horizontal(|ui| {
                    ui.colored_label(parse_color(&item.color), "■");
                    ui.label(format!("{}: {}", item.display_name, item.value));
                });
            }
        });
    }
}

fn to_screen(origin: Pos2, cell: &Cell) -> Rect {
    Rect::from_min_size(
        origin + egui::vec2(cell.rect.x as f32, cell.rect.y as f32),
        egui::vec2(cell.rect.w as f32, cell.rect.h as f32),
    )
}

/// Fixed mode repeats tiles laid out from the canvas origin, each covered by
/// the image scaled to fill it from its top-left corner and cropped, and
/// clips them to the cell. Resize mode stretches one image over the cell.
fn paint_pattern(ui: &Ui, origin: Pos2, cell: Rect, href: &str, mode: PatternMode, opacity: f32) {
    let image = egui::Image::from_uri(href.to_string()).tint(Color32::WHITE.gamma_multiply(opacity));
    match mode {
        PatternMode::Resize => image.paint_at(ui, cell),
        PatternMode::Fixed { width, height } => {
            let tile = egui::vec2(width as f32, height as f32);
            if tile.x <= 0.0 || tile.y <= 0.0 {
                return;
            }
            let crop = image
                .load_for_size(ui.ctx(), tile)
                .ok()
                .and_then(|poll| poll.size())
                .map_or(egui::vec2(1.0, 1.0), |size| slice_crop(size, tile));

            let mut y = first_tile(origin.y, cell.min.y, tile.y);
            while y < cell.max.y {
                let mut x = first_tile(origin.x, cell.min.x, tile.x);
                while x < cell.max.x {
                    let bounds = Rect::from_min_size(Pos2::new(x, y), tile);
                    let visible = bounds.intersect(cell);
                    if visible.is_positive() {
                        let to_uv = |p: Pos2| {
                            Pos2::new(
                                (p.x - bounds.min.x) / tile.x * crop.x,
                                (p.y - bounds.min.y) / tile.y * crop.y,
                            )
                        };
                        image
                            .clone()
                            .uv(Rect::from_min_max(to_uv(visible.min), to_uv(visible.max)))
                            .paint_at(ui, visible);
                    }
                    x += tile.x;
                }
                y += tile.y;
            }
        }
    }
}

/// Start of the tile grid line at or before `start`, for a grid anchored at `origin`.
fn first_tile(origin: f32, start: f32, size: f32) -> f32 {
    origin + ((start - origin) / size).floor() * size
}

/// Part of an `image`-sized texture, in uv units, that shows in one tile when
/// the image is scaled to cover the tile and cropped at its right and bottom.
fn slice_crop(image: egui::Vec2, tile: egui::Vec2) -> egui::Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 {
        return egui::vec2(1.0, 1.0);
    }
    let scale = (tile.x / image.x).max(tile.y / image.y);
    egui::vec2(tile.x / (scale * image.x), tile.y / (scale * image.y))
}

fn parse_color(hex: &str) -> Color32 {
    Color32::from_hex(hex).unwrap_or(Color32::BLACK)
}
