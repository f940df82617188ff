//! CLI for filling DOCX templates from key/value maps and CSV data.
//!
//! Orchestration only: load → fill form fields → populate the record table →
//! optional interactive edits → optional raw substitutions → save →
//! optional PDF export. Per-table failures are reported and the run
//! continues; only a missing input or an unloadable document aborts.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docx_fill::populate::StaticBindingFile;
use docx_fill::{convert, fields, populate, rows, substitute};
use docx_fill::{ColumnBinding, Dataset, Document, DynamicTarget};

#[derive(Parser, Debug)]
#[command(name = "docx-fill")]
#[command(about = "Fill DOCX template tables from key/value maps and CSV data")]
struct Cli {
    /// Template document to fill
    #[arg(long)]
    input: PathBuf,

    /// Output document path (deleted first if it exists)
    #[arg(long)]
    output: PathBuf,

    /// CSV file (header row + data rows) for the record table
    #[arg(long)]
    csv: Option<PathBuf>,

    /// JSON file of label -> value pairs for the form table
    #[arg(long)]
    fields: Option<PathBuf>,

    /// Index of the form table the field map applies to
    #[arg(long, default_value_t = 0)]
    fields_table: usize,

    /// Index of the record table the CSV populates
    #[arg(long, default_value_t = 1)]
    table: usize,

    /// First row of the record table to consider (rows above are headers)
    #[arg(long, default_value_t = 2)]
    start_row: usize,

    /// How CSV columns are bound to cells
    #[arg(long, value_enum, default_value = "in-place")]
    mode: Mode,

    /// JSON file of column name -> cell index (required with --mode static)
    #[arg(long)]
    bindings: Option<PathBuf>,

    /// Raw text replacement OLD=NEW, applied to every text node (repeatable)
    #[arg(long = "replace", value_parser = parse_replacement)]
    replacements: Vec<(String, String)>,

    /// Prompt for add/delete/sign edits before saving
    #[arg(long)]
    interactive: bool,

    /// Also export a PDF next to the output document
    #[arg(long)]
    pdf: bool,

    /// Dump table structure of the input and output documents
    #[arg(long)]
    analyze: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    /// Write each value into the cell after the one matching the column name
    NextCell,
    /// Overwrite the cell matching the column name in place
    InPlace,
    /// Use a fixed column -> cell-index map from --bindings
    Static,
}

fn parse_replacement(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(old, new)| (old.to_string(), new.to_string()))
        .ok_or_else(|| format!("expected OLD=NEW, got {s:?}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    for required in [Some(&cli.input), cli.csv.as_ref(), cli.fields.as_ref(), cli.bindings.as_ref()]
        .into_iter()
        .flatten()
    {
        if !required.exists() {
            eprintln!("Error: input file {required:?} does not exist.");
            std::process::exit(1);
        }
    }

    let mut doc = Document::load(&cli.input)?;
    if cli.analyze {
        println!("Input document:");
        analyze(&doc);
    }

    if let Some(fields_path) = &cli.fields {
        let map: HashMap<String, String> = serde_json::from_slice(
            &std::fs::read(fields_path).with_context(|| format!("reading {fields_path:?}"))?,
        )
        .with_context(|| format!("parsing field map {fields_path:?}"))?;
        match doc.table_mut(cli.fields_table) {
            Some(table) => {
                let written = fields::fill_fields(table, &map);
                info!("filled {written} fields in table {}", cli.fields_table);
            }
            None => warn!("no table at index {} for the field map", cli.fields_table),
        }
    }

    if let Some(csv_path) = &cli.csv {
        let dataset = Dataset::from_csv_path(csv_path)
            .with_context(|| format!("reading {csv_path:?}"))?;
        let binding = match cli.mode {
            Mode::NextCell => ColumnBinding::Dynamic {
                target: DynamicTarget::NextCell,
            },
            Mode::InPlace => ColumnBinding::Dynamic {
                target: DynamicTarget::InPlace,
            },
            Mode::Static => {
                let path = cli
                    .bindings
                    .as_ref()
                    .context("--mode static requires --bindings")?;
                let StaticBindingFile(map) = serde_json::from_slice(
                    &std::fs::read(path).with_context(|| format!("reading {path:?}"))?,
                )
                .with_context(|| format!("parsing bindings {path:?}"))?;
                ColumnBinding::Static(map)
            }
        };
        match doc.table_mut(cli.table) {
            Some(table) => {
                // A failure here must not block the rest of the run.
                if let Err(e) = populate::populate(table, &dataset, &binding, cli.start_row) {
                    warn!("populating table {} failed: {e}", cli.table);
                } else {
                    info!(
                        "populated table {} with {} records",
                        cli.table,
                        dataset.len()
                    );
                }
            }
            None => warn!("no table at index {} to populate", cli.table),
        }
    }

    if cli.interactive {
        interactive_loop(&mut doc)?;
    }

    if !cli.replacements.is_empty() {
        let count = substitute::substitute(&mut doc, &cli.replacements)?;
        info!("applied raw substitutions to {count} text nodes");
    }

    doc.save(&cli.output)
        .with_context(|| format!("saving {:?}", cli.output))?;
    println!("Modified document saved as: {}", cli.output.display());

    if cli.analyze {
        let saved = Document::load(&cli.output)?;
        println!("Output document:");
        analyze(&saved);
    }

    if cli.pdf {
        let out_dir = cli.output.parent().unwrap_or_else(|| Path::new("."));
        match convert::convert_to_pdf(&cli.output, out_dir) {
            Ok(pdf) => println!("PDF file created: {}", pdf.display()),
            // The DOCX is already on disk; conversion failure is reported only.
            Err(e) => eprintln!("Error during PDF conversion: {e}"),
        }
    }

    Ok(())
}

/// Dump every table's rows as trimmed cell text.
fn analyze(doc: &Document) {
    for t in 0..doc.table_count() {
        println!("Table {t}:");
        let Some(table) = doc.table(t) else { continue };
        for (r, row) in table.rows().enumerate() {
            let cells: Vec<String> = row.cells().map(|c| c.text().trim().to_string()).collect();
            println!(" Row {r}: {cells:?}");
        }
    }
}

fn interactive_loop(doc: &mut Document) -> anyhow::Result<()> {
    loop {
        println!("Choose an action: add / delete / sign / exit");
        let choice = prompt("> ")?;
        match choice.trim() {
            "add" => {
                let table = match prompt_index("Table index: ")? {
                    Some(i) => i,
                    None => continue,
                };
                let line = prompt("Comma-separated values: ")?;
                // No CSV escaping here; embedded commas split. Accepted.
                let values: Vec<String> =
                    line.trim().split(',').map(|v| v.trim().to_string()).collect();
                match doc.table_mut(table) {
                    Some(t) => {
                        if let Err(e) = rows::add_row(t, &values) {
                            eprintln!("Could not add row: {e}");
                        }
                    }
                    None => eprintln!("Invalid table index: {table}"),
                }
            }
            "delete" => {
                let (table, row) = match (
                    prompt_index("Table index: ")?,
                    prompt_index("Row index: ")?,
                ) {
                    (Some(t), Some(r)) => (t, r),
                    _ => continue,
                };
                match doc.table_mut(table) {
                    Some(t) => {
                        if let Err(e) = rows::delete_row(t, row) {
                            eprintln!("Could not delete row: {e}");
                        }
                    }
                    None => eprintln!("Invalid table index: {table}"),
                }
            }
            "sign" => {
                let (table, row, col) = match (
                    prompt_index("Table index: ")?,
                    prompt_index("Row index: ")?,
                    prompt_index("Column index: ")?,
                ) {
                    (Some(t), Some(r), Some(c)) => (t, r, c),
                    _ => continue,
                };
                let path = PathBuf::from(prompt("Image path: ")?.trim());
                if let Err(e) = doc.add_image(table, row, col, &path) {
                    eprintln!("Could not add image: {e}");
                }
            }
            "exit" => break,
            other => println!("Unknown action: {other:?}"),
        }
    }
    Ok(())
}

fn prompt(msg: &str) -> anyhow::Result<String> {
    print!("{msg}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn prompt_index(msg: &str) -> anyhow::Result<Option<usize>> {
    let line = prompt(msg)?;
    match line.trim().parse::<usize>() {
        Ok(i) => Ok(Some(i)),
        Err(_) => {
            eprintln!("Invalid index: {}", line.trim());
            Ok(None)
        }
    }
}
