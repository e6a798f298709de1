use anyhow::{bail, Context};
use clap::Parser;
use imagetreemap_core::host::VisualHost;
use imagetreemap_core::import::{data_view_from_csv, data_view_from_json, CsvMapping};
use imagetreemap_core::settings::{GENERAL_VIEW_OBJECTS, IMAGE_OBJECTS};
use imagetreemap_core::{DataView, DataViewObject, DataViewObjects, Scene, TreemapVisual, UpdateOptions, Viewport};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imagetreemap-cli", about = "Render a category/value table as an image treemap")]
struct Args {
    /// CSV input with a header row
    #[arg(long, conflicts_with = "dataview")]
    csv: Option<PathBuf>,
    /// Categorical data view as JSON
    #[arg(long)]
    dataview: Option<PathBuf>,
    /// CSV header of the category column
    #[arg(long, default_value = "category")]
    category: String,
    /// CSV header of the value column
    #[arg(long)]
    value: Option<String>,
    /// CSV header of the image URL column
    #[arg(long)]
    image: Option<String>,
    #[arg(long, default_value_t = 800.0)]
    width: f64,
    #[arg(long, default_value_t = 600.0)]
    height: f64,
    /// JSON file with format pane objects (image, colorSelector, generalView)
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long)]
    show_images: Option<bool>,
    #[arg(long)]
    resize: Option<bool>,
    /// Cell opacity in percent
    #[arg(long)]
    opacity: Option<f64>,
    /// Output SVG path
    #[arg(long)]
    svg: Option<PathBuf>,
    /// Output JSON layout path
    #[arg(short, long)]
    json: Option<PathBuf>,
    /// Output CSV layout path
    #[arg(long = "csv-out")]
    csv_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut data_view = load_data_view(&args)?;
    let base = data_view.metadata.objects.take().unwrap_or_default();
    data_view.metadata.objects = Some(settings_objects(&args, base)?);

    let options = UpdateOptions {
        data_views: vec![data_view],
        viewport: Viewport::new(args.width, args.height),
    };
    let mut visual = TreemapVisual::new(VisualHost::new().with_interactions(false));
    let mut scene = Scene::new();
    visual.update(&options, &mut scene).context("rendering treemap")?;

    if let Some(path) = &args.svg {
        std::fs::write(path, imagetreemap_core::export::to_svg(&scene))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        let json = imagetreemap_core::export::to_json(&scene);
        std::fs::write(path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.csv_out {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        imagetreemap_core::export::to_csv(&scene, file)?;
    }

    let vm = visual.view_model();
    info!(
        cells = vm.data_points.len(),
        data_min = vm.data_min,
        data_max = vm.data_max,
        images = vm.use_images(),
        "rendered treemap"
    );
    Ok(())
}

fn load_data_view(args: &Args) -> anyhow::Result<DataView> {
    match (&args.csv, &args.dataview) {
        (Some(path), _) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let mapping = CsvMapping {
                category: args.category.clone(),
                value: args.value.clone(),
                image: args.image.clone(),
            };
            Ok(data_view_from_csv(file, &mapping)?)
        }
        (None, Some(path)) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Ok(data_view_from_json(file)?)
        }
        (None, None) => bail!("either --csv or --dataview is required"),
    }
}

/// Objects from the data view, then the settings file, then the individual flags.
fn settings_objects(args: &Args, mut objects: DataViewObjects) -> anyhow::Result<DataViewObjects> {
    if let Some(path) = &args.settings {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let overrides: DataViewObjects =
            serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
        for (name, properties) in overrides {
            objects.entry(name).or_default().extend(properties);
        }
    }
    if let Some(show) = args.show_images {
        object_mut(&mut objects, IMAGE_OBJECTS).insert("show".into(), show.into());
    }
    if let Some(resize) = args.resize {
        object_mut(&mut objects, IMAGE_OBJECTS).insert("resize".into(), resize.into());
    }
    if let Some(opacity) = args.opacity {
        object_mut(&mut objects, GENERAL_VIEW_OBJECTS).insert("opacity".into(), serde_json::json!(opacity));
    }
    Ok(objects)
}

/// The object already stored under one of `names`, or a new one under the first name.
fn object_mut<'a>(objects: &'a mut DataViewObjects, names: &[&str]) -> &'a mut DataViewObject {
    let name = names
        .iter()
        .find(|n| objects.contains_key(**n))
        .unwrap_or(&names[0])
        .to_string();
    objects.entry(name).or_default()
}
