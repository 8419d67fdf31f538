use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use payfeed::{FIXTURE_PASSWORD, initialize_db, reset_to_fixture};

/// A utility for creating a test database seeded with the fixture users and transactions.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual and end-to-end testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Inserting fixture data...");
    let summary = reset_to_fixture(&conn)?;

    for user in &summary.users {
        println!("  {} (password \"{FIXTURE_PASSWORD}\")", user.username);
    }
    println!(
        "Created {} users, {} contacts and {} transactions.",
        summary.users.len(),
        summary.contact_count,
        summary.transaction_count
    );

    println!("Success!");

    Ok(())
}
