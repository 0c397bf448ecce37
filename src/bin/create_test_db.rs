use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use expense_tracker_rs::{NewRecord, RecordUpdate, initialize_db, store};

/// A utility for creating a demo database for expense-view.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The number of days of expenses to generate, counting back from today.
    #[arg(long, default_value_t = 120)]
    days: i64,
}

const EXPENSES: [(&str, f64, Option<&str>, &str); 10] = [
    ("Rent", 18000.0, Some("Essentials"), "Housing"),
    ("Groceries", 2450.75, Some("Essentials"), "Food"),
    ("Electricity bill", 1320.0, Some("Essentials"), "Utilities"),
    ("Metro card top-up", 500.0, Some("Essentials"), "Transport"),
    ("Movie night", 640.0, Some("Leisure"), "Movies"),
    ("Dinner with friends", 1875.5, Some("Leisure"), "Food"),
    ("Board game", 1299.0, Some("Leisure"), ""),
    ("Mutual fund SIP", 5000.0, Some("Savings"), "Investments"),
    ("Gift for Amma", 2200.0, None, ""),
    ("Coffee", 180.0, None, ""),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'expenses.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'expenses.db').");
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

    println!("Creating expenses for the last {} days...", args.days);

    let today = OffsetDateTime::now_utc().date();
    let mut count = 0;

    for day in 0..args.days.max(0) {
        let date = today - Duration::days(day);

        for (index, (description, amount, category, secondary)) in EXPENSES.iter().enumerate() {
            // Spread the expenses out so each day only has a few.
            if (day as usize + index) % 4 != 0 {
                continue;
            }

            let record = store::create_record(
                NewRecord::build(description, *amount, date).category(*category),
                &conn,
            )?;

            if !secondary.is_empty() {
                store::update_record(
                    &record.id,
                    RecordUpdate::from_record(&record).categories(None, Some(*secondary)),
                    &conn,
                )?;
            }

            count += 1;
        }
    }

    println!("Created {count} expenses.");

    println!("Success!");

    Ok(())
}
