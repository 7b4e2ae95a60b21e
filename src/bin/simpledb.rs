//! Interactive encyclopedia over a SimpleDB file.
//!
//! Reads one command per line from stdin:
//!
//! ```text
//! insert <key> <value...>   store a value
//! lorem <key>               store a large lorem ipsum text
//! search <key>              print the value stored under key
//! import <path>             insert every non-empty line of a text file
//! stats                     print header and cache statistics
//! help                      list commands
//! exit                      close the database and quit
//! ```
//!
//! The database path is the first argument (default `encyclopedia.simpledb`).

use anyhow::{bail, Context, Result};
use simpledb::{Database, InsertOutcome};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

const DEFAULT_PATH: &str = "encyclopedia.simpledb";

const LOREM_PARAGRAPH: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis \
nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure \
dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. \
Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit anim \
id est laborum.\n";

/// Enough paragraphs to span several default-sized entry pages.
const LOREM_REPEAT: usize = 160;

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PATH.to_string());
    let mut db = Database::open(&path).with_context(|| format!("failed to open {}", path))?;
    println!("Opened {} ({} entries)", path, db.len());
    print_help();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        if let Err(e) = run_command(&mut db, line) {
            println!("Error: {:#}", e);
        }
    }

    db.close().context("failed to close database")?;
    Ok(())
}

fn run_command(db: &mut Database, line: &str) -> Result<()> {
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "insert" => {
            let (key, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if key.is_empty() {
                bail!("usage: insert <key> <value...>");
            }
            report_insert(key, db.insert(value.trim(), key)?);
        }
        "lorem" => {
            if rest.is_empty() {
                bail!("usage: lorem <key>");
            }
            let text = LOREM_PARAGRAPH.repeat(LOREM_REPEAT);
            report_insert(rest, db.insert(&text, rest)?);
        }
        "search" => {
            if rest.is_empty() {
                bail!("usage: search <key>");
            }
            match db.content(rest)? {
                Some(value) => {
                    println!("\"{}\" means: \"{}\"", rest, String::from_utf8_lossy(&value))
                }
                None => println!("No result for \"{}\"", rest),
            }
        }
        "import" => {
            if rest.is_empty() {
                bail!("usage: import <path>");
            }
            let imported = import(db, rest)?;
            println!("Imported {} entries from {}", imported, rest);
        }
        "stats" => print_stats(db),
        "help" => print_help(),
        other => bail!("unknown command {:?}, try \"help\"", other),
    }
    Ok(())
}

/// Insert every trimmed, non-empty line of `path` with itself as key and
/// value. Lines that fail are reported and skipped.
fn import(db: &mut Database, path: &str) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path))?;
    let mut imported = 0;

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let word = line.trim();
        if word.is_empty() {
            continue;
        }
        match db.insert(word, word) {
            Ok(InsertOutcome::Inserted) => imported += 1,
            Ok(InsertOutcome::DuplicateIgnored) => {}
            Err(e) => println!("Line {}: {}", number + 1, e),
        }
    }
    Ok(imported)
}

fn report_insert(key: &str, outcome: InsertOutcome) {
    match outcome {
        InsertOutcome::Inserted => println!("Stored \"{}\"", key),
        InsertOutcome::DuplicateIgnored => println!("\"{}\" already exists, kept the old value", key),
    }
}

fn print_stats(db: &Database) {
    let header = db.header();
    let cache = db.cache_stats();
    println!("Entries:     {}", header.key_count);
    println!("Pages:       {}", header.page_count);
    println!("Page size:   {}", header.page_size);
    println!("Order:       {}", header.order);
    println!("Root page:   {}", header.root_page);
    println!("Log tail:    {}", header.last_entry_page);
    println!(
        "Cache:       {} lookups, {:.1}% hits",
        cache.lookups,
        cache.hit_rate() * 100.0
    );
}

fn print_help() {
    println!("Commands:");
    println!("  insert <key> <value...>");
    println!("  lorem <key>");
    println!("  search <key>");
    println!("  import <path>");
    println!("  stats");
    println!("  help");
    println!("  exit");
}
