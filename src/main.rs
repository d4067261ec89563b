use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use cellar::config::{self, Settings};
use cellar::error::{CatalogError, Result};
use cellar::model::{Record, RecordDraft, RecordId};
use cellar::query::{QueryMode, View};
use cellar::{photo, Catalog, ImportMode};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Personal tasting-record catalog", long_about = None)]
struct Args {
    /// Directory holding the record slot (defaults to $CELLAR_HOME or ./.cellar)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Slot name inside the data directory
    #[clap(long, global = true)]
    slot: Option<String>,

    /// Fail queries with unsupported conditions instead of ignoring them
    #[clap(long, global = true)]
    strict: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Debug)]
enum Command {
    /// Record a new tasting
    Add(Fields),
    /// Replace the fields of an existing record; omitted fields keep their value
    Edit {
        id: RecordId,
        #[clap(flatten)]
        fields: Fields,
        /// Drop the stored photo
        #[clap(long, conflicts_with = "photo")]
        remove_photo: bool,
    },
    /// Remove a record
    Delete { id: RecordId },
    /// Print one record
    Show { id: RecordId },
    /// Print every record
    List,
    /// Run a query such as "WHERE category LIKE '%IPA%' ORDER BY score DESC"
    Query { text: String },
    /// Write the collection as pretty-printed JSON
    Export {
        #[clap(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Load records from an exported file
    Import {
        file: PathBuf,
        /// Replace the collection instead of merging new ids into it
        #[clap(long)]
        replace: bool,
    },
}

#[derive(ClapArgs, Clone, Debug, Default)]
struct Fields {
    #[clap(long)]
    name: Option<String>,
    #[clap(long)]
    category: Option<String>,
    #[clap(long)]
    origin: Option<String>,
    #[clap(long)]
    color: Option<String>,
    #[clap(long)]
    score: Option<String>,
    #[clap(long)]
    notes: Option<String>,
    /// Image file embedded into the record
    #[clap(long)]
    photo: Option<PathBuf>,
}

impl Fields {
    /// Overlay the given flags onto `draft`.
    fn apply(self, mut draft: RecordDraft) -> Result<RecordDraft> {
        if let Some(v) = self.name { draft.name = v; }
        if let Some(v) = self.category { draft.category = v; }
        if let Some(v) = self.origin { draft.origin = v; }
        if let Some(v) = self.color { draft.color = v; }
        if let Some(v) = self.score { draft.score = v; }
        if let Some(v) = self.notes { draft.notes = v; }
        if let Some(path) = self.photo {
            draft.photo = Some(photo::data_url(&path)?);
        }
        Ok(draft)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
    .with_env_filter(config::log_filter("warn,cellar=info"))
    .with_target(false)
    .with_level(true)
    .with_writer(std::io::stderr)
    .init();

    let args = Args::parse();
    let settings = settings_from(&args);

    match run(args.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("[\u{2717}] {}", e);
            ExitCode::FAILURE
        }
    }
}

fn settings_from(args: &Args) -> Settings {
    let mut settings = Settings::detect();
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(slot) = &args.slot {
        settings.slot = slot.clone();
    }
    if args.strict {
        settings.query_mode = QueryMode::Strict;
    }
    settings
}

fn run(command: Command, settings: &Settings) -> Result<()> {
    let mut catalog = Catalog::open(settings);

    match command {
        Command::Add(fields) => {
            let draft = fields.apply(RecordDraft::default())?;
            let id = catalog.submit(draft)?;
            println!("[\u{2713} OK] Saved {}", id);
        }
        Command::Edit { id, fields, remove_photo } => {
            let mut draft = fields.apply(catalog.begin_edit(id)?)?;
            if remove_photo {
                draft.photo = None;
            }
            catalog.submit(draft)?;
            println!("[\u{2713} OK] Updated {}", id);
        }
        Command::Delete { id } => {
            let removed = catalog.delete(id)?;
            println!("[\u{2713} OK] Deleted {} ({})", removed.name, id);
        }
        Command::Show { id } => {
            let record = catalog.get(id).ok_or(CatalogError::RecordNotFound(id))?;
            print_record(record);
        }
        Command::List => print_view(&catalog.view(), catalog.records().len()),
        Command::Query { text } => {
            let view = catalog.search(&text);
            print_view(&view, catalog.records().len());
        }
        Command::Export { dir } => {
            let path = catalog.export(&dir)?;
            println!("[\u{2713} OK] Exported {} records to {}", catalog.records().len(), path.display());
        }
        Command::Import { file, replace } => {
            let mode = if replace { ImportMode::Replace } else { ImportMode::Merge };
            let added = catalog.import(&file, mode)?;
            println!("[\u{2713} OK] Imported {} records", added);
        }
    }
    Ok(())
}

fn print_view(view: &View, total: usize) {
    if let Some(notice) = &view.notice {
        println!("[\u{26a0}\u{fe0f}] {}", notice);
    }
    if view.records.is_empty() {
        if total == 0 {
            println!("No records yet. Add the first one with 'cellar add'.");
        } else {
            println!("No records match the query.");
        }
        return;
    }
    println!("\n{} of {} records:", view.records.len(), total);
    for record in &view.records {
        print_record(record);
    }
}

fn print_record(record: &Record) {
    println!("  \u{2022} {} [{}]", record.name, record.id);
    println!("      Category: {} | Origin: {} | Color: {}", record.category, record.origin, record.color);
    println!("      Score: {}/10{}", record.score, if record.photo.is_some() { " | \u{1f4f7} photo" } else { "" });
    if !record.notes.is_empty() {
        println!("      {}", record.notes);
    }
}
