use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use ifc_quantities::annotator::{whole_registry, VolumeAnnotator};
use ifc_quantities::config::Settings;
use ifc_quantities::export::{export_csv, export_json, quantity_rows, QuantityRow};
use ifc_quantities::logging;
use ifc_quantities::model::ModelRegistry;
use ifc_quantities::panel::{DirectoryDownloads, ExportOutcome, ExportPanel, ImportOutcome};
use ifc_quantities::ui::App;

#[derive(Parser, Debug)]
#[command(name = "ifc-quantities")]
#[command(about = "IFC Quantities - compute element volumes and export annotated IFC models")]
#[command(version)]
struct Args {
    /// IFC files to load
    files: Vec<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for exported and imported files (overrides the settings file)
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Compute volumes for every element of every loaded model
    #[arg(long)]
    annotate: bool,

    /// Recompute volumes for elements that already have one
    #[arg(long, requires = "annotate")]
    force: bool,

    /// Export every loaded model as model_<id>.ifc
    #[arg(long)]
    export: bool,

    /// Round-trip an IFC file through the exporter
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Write the volume report to CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Write the volume report to JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

impl Args {
    fn is_headless(&self) -> bool {
        self.annotate
            || self.export
            || self.import.is_some()
            || self.csv.is_some()
            || self.json.is_some()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(dir) = &args.out_dir {
        settings.output_dir.clone_from(dir);
    }

    if args.is_headless() {
        logging::init_stderr(&settings.log_level);
    } else {
        logging::init_file(&settings.log_file, &settings.log_level)?;
    }

    let mut registry = ModelRegistry::new();
    for file in &args.files {
        registry.load_file(file)?;
    }

    if !args.is_headless() {
        let terminal = ratatui::init();
        let result = App::new(registry, &settings).run(terminal);
        ratatui::restore();
        return result;
    }

    if args.annotate {
        let selection = whole_registry(&registry);
        let mut annotator = VolumeAnnotator::new(settings.annotator.clone());
        let report =
            annotator.compute_batch(&mut registry, &settings.measure, &selection, args.force)?;
        println!(
            "Annotated {} element(s), total volume {:.3} m3",
            report.attachments(),
            report.total_volume()
        );
        for failed in &report.failed {
            eprintln!("Skipped element #{} of {}: {}", failed.element, failed.model, failed.reason);
        }
    }

    let mut downloads = DirectoryDownloads::new(&settings.output_dir);
    let mut panel = ExportPanel::new();

    if args.export {
        for entry in panel.list_models(&registry) {
            panel.select(&registry, &entry.id);
            match panel.export_selected(&registry, &mut downloads) {
                ExportOutcome::Downloaded(path) => println!("Exported {}: {}", entry.name, path.display()),
                ExportOutcome::Failed(message) => eprintln!("Export of {} failed: {message}", entry.name),
                ExportOutcome::NoSelection | ExportOutcome::ModelNotFound(_) => {}
            }
        }
    }

    if let Some(path) = &args.import {
        match panel.import_file(path, &mut downloads) {
            ImportOutcome::Downloaded(saved) => println!("Processed file saved to {}", saved.display()),
            ImportOutcome::Failed(message) => eprintln!("Import failed: {message}"),
        }
    }

    if args.csv.is_some() || args.json.is_some() {
        let rows: Vec<QuantityRow> = registry
            .iter()
            .flat_map(|m| quantity_rows(m, &settings.annotator))
            .collect();

        if let Some(csv_path) = &args.csv {
            export_csv(&rows, csv_path)?;
            println!("Exported to CSV: {}", csv_path.display());
        }

        if let Some(json_path) = &args.json {
            export_json(&rows, json_path)?;
            println!("Exported to JSON: {}", json_path.display());
        }
    }

    Ok(())
}
