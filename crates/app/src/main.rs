mod state;
mod ui;

use eframe::egui;
use state::AppState;
use tracing_subscriber::EnvFilter;

struct MyApp {
    state: AppState,
}

impl MyApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        let mut state = AppState::new();
        if let Some(path) = std::env::args_os().nth(1) {
            if let Err(e) = state.load_csv(path.into()) {
                state.error = Some(format!("{e:#}"));
            }
        }
        Self { state }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::draw(&mut self.state, ctx);
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Image Treemap",
        options,
        Box::new(|cc| Ok(Box::new(MyApp::new(cc)))),
    )
}
