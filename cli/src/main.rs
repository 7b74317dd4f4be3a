//! docstruct CLI - document structure reconstruction tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use docstruct::provider::{LayoutProvider, OcrProvider, PageSource};
use docstruct::render::{self, JsonFormat};
use docstruct::{
    align_blocks, extract_toc, AssemblerOptions, BBox, BlockAssembler,
    ColumnHeuristic, FixtureDir, PageInput, PageSelection, Pipeline, PipelineOptions,
    ReadingOrderProvider, TocOptions,
};

#[derive(Parser)]
#[command(name = "docstruct")]
#[command(version)]
#[command(about = "Rebuild blocks, TOC, and sections from OCR and layout output", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a fixture directory
    Run {
        /// Directory with page_NNNN.{png,ocr.json,layout.json}
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// JSON config file with pipeline options
        #[arg(long, value_name = "FILE", env = "DOCSTRUCT_CONFIG")]
        config: Option<PathBuf>,

        /// Number of text columns
        #[arg(long)]
        columns: Option<usize>,

        /// TOC pages (e.g., "2", "2-3")
        #[arg(long)]
        toc_pages: Option<String>,

        /// Pages to leave out (e.g., "1,120-124")
        #[arg(long)]
        skip_pages: Option<String>,

        /// Body font size; larger isolated lines become titles
        #[arg(long)]
        prose_font_size: Option<f32>,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Save table crops
        #[arg(long)]
        crops: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Assemble the blocks of one fixture page
    Assemble {
        /// Fixture directory
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Page number
        #[arg(short, long)]
        page: u32,

        /// Number of text columns
        #[arg(long, default_value = "1")]
        columns: usize,

        /// Body font size; larger isolated lines become titles
        #[arg(long)]
        prose_font_size: Option<f32>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Extract the table of contents from fixture pages
    Toc {
        /// Fixture directory
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// TOC pages (e.g., "2", "2-3")
        #[arg(long)]
        pages: String,

        /// Last page of the document (defaults to the fixture's page count)
        #[arg(long)]
        last_page: Option<u32>,

        /// Number of text columns on the TOC pages
        #[arg(long, default_value = "1")]
        columns: usize,

        /// Drop "CONTENTS" headings and lines at or below this font size
        #[arg(long)]
        noise_below: Option<f32>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the heuristic reading order of a region list
    Order {
        /// JSON array of regions with a "bbox" field
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Number of text columns
        #[arg(long, default_value = "1")]
        columns: usize,
    },

    /// Align blocks to a TOC and group them into sections
    Sections {
        /// Block list file, or a directory of per-page block files
        #[arg(value_name = "BLOCKS")]
        blocks: PathBuf,

        /// toc.json
        #[arg(long, value_name = "FILE")]
        toc: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run {
            input,
            output,
            config,
            columns,
            toc_pages,
            skip_pages,
            prose_font_size,
            workers,
            crops,
            compact,
        }) => {
            let overrides = Overrides {
                columns,
                toc_pages,
                skip_pages,
                prose_font_size,
                workers,
            };
            cmd_run(&input, output.as_deref(), config.as_deref(), overrides, crops, compact)
        }
        Some(Commands::Assemble {
            input,
            page,
            columns,
            prose_font_size,
            output,
        }) => cmd_assemble(&input, page, columns, prose_font_size, output.as_deref()),
        Some(Commands::Toc {
            input,
            pages,
            last_page,
            columns,
            noise_below,
            output,
        }) => cmd_toc(&input, &pages, last_page, columns, noise_below, output.as_deref()),
        Some(Commands::Order { input, columns }) => cmd_order(&input, columns),
        Some(Commands::Sections {
            blocks,
            toc,
            output,
        }) => cmd_sections(&blocks, toc.as_deref(), output.as_deref()),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: docstruct run <DIR> [-o OUTPUT]".yellow());
            println!("       docstruct --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Command-line values that override the config file.
struct Overrides {
    columns: Option<usize>,
    toc_pages: Option<String>,
    skip_pages: Option<String>,
    prose_font_size: Option<f32>,
    workers: Option<usize>,
}

impl Overrides {
    fn apply(self, mut options: PipelineOptions) -> Result<PipelineOptions, docstruct::Error> {
        if let Some(columns) = self.columns {
            options.num_columns = columns;
        }
        if let Some(pages) = self.toc_pages {
            options.toc_pages = PageSelection::parse(&pages)?;
        }
        if let Some(pages) = self.skip_pages {
            options.skip_pages = PageSelection::parse(&pages)?;
        }
        if let Some(size) = self.prose_font_size {
            options.prose_font_size = Some(size);
        }
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        Ok(options)
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn emit(json: &str, output: Option<&Path>) -> CliResult {
    if let Some(path) = output {
        fs::write(path, json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }
    Ok(())
}

fn cmd_run(
    input: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    overrides: Overrides,
    crops: bool,
    compact: bool,
) -> CliResult {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let name = input.file_name().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_structure", name))
    });

    let options = match config {
        Some(path) => PipelineOptions::from_json_file(path)?,
        None => PipelineOptions::default(),
    };
    let mut options = overrides.apply(options)?;
    if crops && options.crop_dir.is_none() {
        options.crop_dir = Some(output_dir.join("crops"));
    }

    log::debug!("Pipeline options: {:?}", options);

    let fixture = FixtureDir::open(input)?;
    let total = fixture.page_count()?;

    let pb = ProgressBar::new(u64::from(total));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")?
            .progress_chars("#>-"),
    );

    let progress = pb.clone();
    let pipeline = Pipeline::from_fixture(fixture, options)?
        .with_progress(Arc::new(move |_page| progress.inc(1)));
    let doc = pipeline.run()?;
    pb.finish_with_message("done");

    let manifest = render::write_artifacts(&output_dir, &doc, json_format(compact))?;

    println!("\n{}", "Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Pages".bold(), manifest.pages);
    println!("{}: {}", "Blocks".bold(), manifest.blocks);
    println!("{}: {}", "TOC entries".bold(), manifest.toc_entries);
    println!("{}: {}", "Sections".bold(), manifest.sections);

    if !manifest.failures.is_empty() {
        println!("\n{}", "Failed units".yellow().bold());
        for failure in &manifest.failures {
            println!("  {} {:?}: {}", "•".yellow(), failure.unit, failure.error);
        }
    }

    println!("\n{} {}", "Output written to".green().bold(), output_dir.display());
    Ok(())
}

/// Load one fixture page and order its lines with the column heuristic.
fn load_fixture_page(fixture: &FixtureDir, page: u32, columns: usize) -> Result<PageInput, docstruct::Error> {
    let image = fixture.page_image(page)?;
    let ocr = fixture.ocr_page(page)?;
    let layout = fixture.detect_page(page, image.as_deref())?;

    let boxes: Vec<BBox> = ocr.iter().map(|r| r.bbox).collect();
    let order = ColumnHeuristic::new(columns)?.order(&boxes)?;

    let mut input = PageInput::new(page)
        .with_ocr(ocr)
        .with_layout(layout)
        .with_reading_order(order);
    input.image = image;
    Ok(input)
}

fn cmd_assemble(
    input: &Path,
    page: u32,
    columns: usize,
    prose_font_size: Option<f32>,
    output: Option<&Path>,
) -> CliResult {
    let fixture = FixtureDir::open(input)?;
    let page_input = load_fixture_page(&fixture, page, columns)?;

    let mut options = AssemblerOptions::new();
    if let Some(size) = prose_font_size {
        options = options.with_prose_font_size(size);
    }
    let blocks = BlockAssembler::new(options).assemble_page(&page_input)?;

    emit(&render::to_json(&blocks, JsonFormat::Pretty)?, output)
}

fn cmd_toc(
    input: &Path,
    pages: &str,
    last_page: Option<u32>,
    columns: usize,
    noise_below: Option<f32>,
    output: Option<&Path>,
) -> CliResult {
    let fixture = FixtureDir::open(input)?;
    let last_page = match last_page {
        Some(last) => last,
        None => fixture.page_count()?,
    };

    let toc_pages = PageSelection::parse(pages)?
        .pages(last_page)
        .into_iter()
        .map(|page| load_fixture_page(&fixture, page, columns))
        .collect::<Result<Vec<_>, _>>()?;

    let options = match noise_below {
        Some(size) => TocOptions::new().with_noise_filter(Some(size)),
        None => TocOptions::new(),
    };
    let forest = extract_toc(&toc_pages, last_page, &options)?;

    eprintln!(
        "{} {} entries ({} top-level)",
        "TOC:".cyan().bold(),
        forest.len(),
        forest.root_count()
    );
    emit(&render::to_json(&forest.to_nodes(), JsonFormat::Pretty)?, output)
}

/// Any region record; only the box is used.
#[derive(Deserialize)]
struct Boxed {
    bbox: BBox,
}

fn cmd_order(input: &Path, columns: usize) -> CliResult {
    let regions: Vec<Boxed> = render::read_json(input)?;
    let boxes: Vec<BBox> = regions.into_iter().map(|r| r.bbox).collect();
    let order = ColumnHeuristic::new(columns)?.order(&boxes)?;

    println!("{}", serde_json::to_string(&order)?);
    Ok(())
}

fn cmd_sections(blocks: &Path, toc: Option<&Path>, output: Option<&Path>) -> CliResult {
    let blocks = render::read_blocks(blocks)?;
    let toc = match toc {
        Some(path) => render::read_toc(path)?,
        None => Vec::new(),
    };

    let (aligned, sections) = align_blocks(blocks, &toc);

    eprintln!(
        "{} {} text blocks, {} tables, {} sections",
        "Aligned:".cyan().bold(),
        aligned.text_blocks.len(),
        aligned.table_blocks.len(),
        sections.len()
    );
    emit(&render::to_json(&sections, JsonFormat::Pretty)?, output)
}

fn cmd_version() {
    println!("{} {}", "docstruct".cyan().bold(), docstruct::VERSION);
    println!("Document structure reconstruction tool");
    println!();
    println!("License: MIT");
}
