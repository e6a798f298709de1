pub mod cell;
pub mod export;
pub mod format;
pub mod host;
pub mod import;
pub mod model;
pub mod scene;
pub mod settings;
pub mod transform;
pub mod treemap;
pub mod visual;

pub use model::*;
pub use scene::{RenderTarget, Scene};
pub use settings::Settings;
pub use visual::{ClickOutcome, TreemapVisual, VisualError};
