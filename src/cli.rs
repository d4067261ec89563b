use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use cellar::config::{self, Settings};
use cellar::model::{Record, FIELDS};
use cellar::parser::{self, Command};
use cellar::query::{QueryMode, View};
use cellar::Catalog;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Interactive query shell for the tasting catalog", long_about = None)]
struct Args {
    #[clap(long)]
    data_dir: Option<PathBuf>,

    #[clap(long)]
    strict: bool,
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
    .with_env_filter(config::log_filter("warn"))
    .with_target(false)
    .with_level(true)
    .with_writer(io::stderr)
    .init();

    let args = Args::parse();
    let mut settings = Settings::detect();
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if args.strict {
        settings.query_mode = QueryMode::Strict;
    }

    let mut catalog = Catalog::open(&settings);
    print_banner(&catalog, &settings);

    let stdin = io::stdin();
    let mut lines = stdin.lock();
    let mut buffer = String::new();

    loop {
        print!("cellar> ");
        io::stdout().flush()?;
        buffer.clear();

        if lines.read_line(&mut buffer)? == 0 { break; }
        if buffer.trim().is_empty() { continue; }

        match parser::parse_command(&buffer) {
            Ok(Command::Exit) => break,
            Ok(cmd) => execute_command(&mut catalog, cmd),
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if buffer.trim().to_uppercase().starts_with("GET") || buffer.trim().to_uppercase().starts_with("DELETE") {
                    println!("    \u{2139}\u{fe0f}  Hint: Use the full id printed by LIST, e.g. GET '0190a6b2-7c1e-7d4a-9f3b-2a1c5e8d9b10'");
                } else {
                    println!("    \u{2139}\u{fe0f}  Hint: Queries start with SELECT, FIND, WHERE or ORDER BY. Type 'HELP' for more.");
                }
            }
        }
    }
    Ok(())
}

fn print_banner(catalog: &Catalog, settings: &Settings) {
    println!("\n==================================================");
    println!("   Cellar - tasting notes, queried");
    println!("==================================================\n");
    println!("[\u{2713}] {} records loaded from {}", catalog.records().len(), settings.slot_path().display());
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. QUERY:   SELECT * FROM records WHERE category LIKE '%IPA%' ORDER BY score DESC");
    println!("            WHERE origin = 'Belgium' AND score > 7");
    println!("            ORDER BY name");
    println!("2. LIST:    Re-run the current query (or show everything)");
    println!("3. CLEAR:   Forget the current query");
    println!("4. GET:     GET 'id'");
    println!("5. DELETE:  DELETE 'id'");
    println!("6. EXPORT:  EXPORT [\"directory\"]");
    println!("7. EXIT:    Quit");
    println!("\nQueryable fields: {}\n", FIELDS.join(", "));
}

fn execute_command(catalog: &mut Catalog, cmd: Command) {
    match cmd {
        Command::Help => print_help(),
        Command::Query(text) => {
            let view = catalog.search(&text);
            print_view(&view, catalog.records().len());
        }
        Command::List => print_view(&catalog.view(), catalog.records().len()),
        Command::Clear => {
            catalog.clear_search();
            println!("[\u{2713}] Query cleared.");
        }
        Command::Get { id } => match catalog.get(id) {
            Some(record) => print_record(record),
            None => println!("[\u{2717}] ID Not Found."),
        },
        Command::Delete { id } => match catalog.delete(id) {
            Ok(removed) => {
                println!("[\u{2713} OK] Deleted {} ({})", removed.name, id);
                print_view(&catalog.view(), catalog.records().len());
            }
            Err(e) => println!("[\u{26a0}\u{fe0f} Error] {}", e),
        },
        Command::Export { dir } => {
            let dir = dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            match catalog.export(&dir) {
                Ok(path) => println!("[\u{2713} OK] Exported to {}", path.display()),
                Err(e) => println!("[\u{26a0}\u{fe0f} Error] {}", e),
            }
        }
        Command::Exit => {}
    }
}

fn print_view(view: &View, total: usize) {
    if let Some(notice) = &view.notice {
        println!("[\u{26a0}\u{fe0f}] {}", notice);
    }
    println!("\nFound {} of {} records:", view.records.len(), total);
    for record in &view.records {
        println!("  \u{2022} {} | {} | {} | {} | score {} [{}]",
                 record.name, record.category, record.origin, record.color, record.score, record.id);
    }
    println!();
}

fn print_record(record: &Record) {
    println!("Name:     {}", record.name);
    println!("Category: {}", record.category);
    println!("Origin:   {}", record.origin);
    println!("Color:    {}", record.color);
    println!("Score:    {}/10", record.score);
    if !record.notes.is_empty() {
        println!("Notes:    {}", record.notes);
    }
    if record.photo.is_some() {
        println!("Photo:    \u{2713} embedded");
    }
}
