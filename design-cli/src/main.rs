//! # Design Studio CLI
//!
//! Offline tooling over the design canvas engine: print export, image
//! quality checks, workspace rescaling and template instantiation.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use design_core::quality::assess_bytes;
use design_core::store::DEFAULT_SESSION;
use design_core::{
    EditorConfig, EditorState, FileStore, Orientation, ScenePersistence, SceneDocument,
    TemplateCatalog, Workspace,
};
use design_export::{
    detect_format, ExportConfig, PhysicalSpec, PrintExporter, PrintMetadata, RasterDecoder, Unit,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "design-studio", version, about = "Design canvas engine tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export a design to a print PDF.
    Export(ExportArgs),
    /// Report the print quality of an image on a workspace.
    Assess(AssessArgs),
    /// Rescale a design to a new workspace size.
    Rescale(RescaleArgs),
    /// List templates or instantiate one onto a workspace.
    Template(TemplateArgs),
}

/// Where a design document comes from.
#[derive(Debug, Args)]
struct DesignSource {
    /// Design document JSON file.
    #[arg(long, conflicts_with = "session")]
    design: Option<PathBuf>,

    /// Saved session to load from the data directory.
    #[arg(long)]
    session: Option<String>,

    /// Directory holding saved sessions.
    #[arg(long, env = "DESIGN_DATA_DIR", default_value = ".design-data")]
    data_dir: PathBuf,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    source: DesignSource,

    /// Physical width.
    #[arg(long)]
    width: f64,

    /// Physical height.
    #[arg(long)]
    height: f64,

    /// Unit of width and height (ft, in, cm, mm).
    #[arg(long, default_value = "ft")]
    unit: Unit,

    /// Target print resolution.
    #[arg(long)]
    target_dpi: Option<f64>,

    /// Rasterization oversampling factor.
    #[arg(long, env = "DESIGN_PIXEL_RATIO", default_value_t = 3.0)]
    pixel_ratio: f64,

    /// Product name for the specification page.
    #[arg(long, default_value = "")]
    product: String,

    /// Print material.
    #[arg(long, default_value = "")]
    material: String,

    /// Surface finish.
    #[arg(long, default_value = "")]
    finish: String,

    /// Number of copies.
    #[arg(long, default_value_t = 1)]
    quantity: u32,

    /// Skip loading system fonts.
    #[arg(long)]
    no_system_fonts: bool,

    /// Output PDF path.
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct AssessArgs {
    /// Image file.
    image: PathBuf,

    /// Workspace width in pixels.
    #[arg(long, default_value_t = 2400.0)]
    width: f64,

    /// Workspace height in pixels.
    #[arg(long, default_value_t = 1200.0)]
    height: f64,
}

#[derive(Debug, Args)]
struct RescaleArgs {
    #[command(flatten)]
    source: DesignSource,

    /// New workspace width in pixels.
    #[arg(long)]
    width: f64,

    /// New workspace height in pixels.
    #[arg(long)]
    height: f64,

    /// Output path; prints to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TemplateArgs {
    /// Template catalog JSON file.
    catalog: PathBuf,

    /// Template to instantiate; lists the catalog when omitted.
    #[arg(long)]
    name: Option<String>,

    /// Workspace orientation; defaults to the template's own.
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Output path; prints to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    Landscape,
    Portrait,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Landscape => Self::Landscape,
            OrientationArg::Portrait => Self::Portrait,
        }
    }
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,design_core=debug,design_export=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,design_core=debug,design_export=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Export(args) => export(args).await,
        Command::Assess(args) => assess(&args).await,
        Command::Rescale(args) => rescale(args).await,
        Command::Template(args) => template(args).await,
    }
}

async fn load_design(source: &DesignSource) -> anyhow::Result<SceneDocument> {
    if let Some(path) = &source.design {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read design {}", path.display()))?;
        return Ok(SceneDocument::from_json(&json)?);
    }

    let session = source.session.as_deref().unwrap_or(DEFAULT_SESSION);
    let store = FileStore::new(&source.data_dir, session)?;
    store
        .load()
        .await?
        .with_context(|| format!("No saved design at {}", store.path().display()))
}

async fn write_output(output: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{contents}"),
    }
    Ok(())
}

async fn export(args: ExportArgs) -> anyhow::Result<()> {
    let document = load_design(&args.source).await?;
    let mut editor = EditorState::new(EditorConfig::default());
    editor.restore(&document);

    let config = ExportConfig {
        pixel_ratio: args.pixel_ratio,
        load_system_fonts: !args.no_system_fonts,
        ..ExportConfig::default()
    };
    let exporter = PrintExporter::with_svg(config);
    let spec = PhysicalSpec {
        target_dpi: args.target_dpi,
        ..PhysicalSpec::new(args.width, args.height, args.unit)
    };
    let metadata = PrintMetadata {
        product: args.product,
        material: args.material,
        finish: args.finish,
        quantity: args.quantity,
    };

    let artifact = exporter
        .export(&editor.export_snapshot(), &spec, &metadata)
        .await?;
    tokio::fs::write(&args.output, &artifact.pdf)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    tracing::info!(
        "Exported {:.2}x{:.2}in page at {:.0} DPI to {}",
        artifact.page.width_in,
        artifact.page.height_in,
        artifact.achieved_dpi,
        args.output.display()
    );
    Ok(())
}

async fn assess(args: &AssessArgs) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;
    let extension = args.image.extension().and_then(|e| e.to_str());
    let format = detect_format(&bytes, extension);
    let workspace = Workspace::new(args.width, args.height);
    let (decoded, report) = assess_bytes(&RasterDecoder::new(), &bytes, &workspace);

    let output = serde_json::json!({
        "mimeType": format.mime(),
        "naturalWidth": decoded.as_ref().map(|d| d.natural_width),
        "naturalHeight": decoded.as_ref().map(|d| d.natural_height),
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn rescale(args: RescaleArgs) -> anyhow::Result<()> {
    let document = load_design(&args.source).await?;
    let mut editor = EditorState::new(EditorConfig::default());
    editor.restore(&document);

    let scaled = editor.resize_workspace(args.width, args.height)?;
    if !scaled {
        tracing::info!("Workspace change is within tolerance; geometry unchanged");
    }

    let json = editor.export_snapshot().document().to_json()?;
    write_output(args.output.as_deref(), &json).await
}

async fn template(args: TemplateArgs) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(&args.catalog)
        .await
        .with_context(|| format!("Failed to read catalog {}", args.catalog.display()))?;
    let catalog = TemplateCatalog::from_json(&json)?;

    let Some(name) = args.name else {
        for template in catalog.templates() {
            let (width, height) = template.authored_size();
            println!(
                "{}\t{:?}\t{width}x{height}",
                template.name, template.orientation
            );
        }
        return Ok(());
    };

    let template = catalog.get(&name)?;
    let orientation = args
        .orientation
        .map_or(template.orientation, Orientation::from);
    let mut editor = EditorState::new(EditorConfig {
        workspace: Workspace::canonical(orientation),
        ..EditorConfig::default()
    });
    editor.load_template(template)?;

    let json = editor.export_snapshot().document().to_json()?;
    write_output(args.output.as_deref(), &json).await
}
