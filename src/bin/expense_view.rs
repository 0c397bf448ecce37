use std::{
    error::Error as StdError,
    fs,
    path::PathBuf,
    process::exit,
    sync::{Arc, Mutex},
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use time::{Date, macros::format_description};
use tracing_subscriber::filter::LevelFilter;

use expense_tracker_rs::{
    Error, ExpenseTracker, NewRecord, RecordId, RecordUpdate, SqliteRecordStore, ViewConfig,
    currency::format_currency,
    date_range::{RangePreset, today_in},
    initialize_db,
    logging::setup_logging,
    pipeline::pagination::PaginationIndicator,
    query::{CategoryFilter, SortKey},
    record::Record,
};

/// Browse, summarise and edit the expenses in a SQLite database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// File path to the expense SQLite database.
    #[arg(long)]
    db_path: PathBuf,

    /// The canonical timezone used to work out today's date.
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// The symbol put in front of amounts.
    #[arg(long, default_value = "₹")]
    currency: String,

    /// The most verbose log level to print, overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::WARN)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of expenses.
    List {
        #[command(flatten)]
        view: ViewArgs,

        /// The page to show.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// The number of expenses per page.
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Show the spending per category.
    Summary {
        #[command(flatten)]
        range: RangeArgs,

        /// Break this primary category down into its secondary categories.
        #[arg(long)]
        primary: Option<String>,

        /// With --primary, list the expenses in this secondary category.
        #[arg(long, requires = "primary")]
        secondary: Option<String>,
    },
    /// Record a new expense.
    Add {
        /// What the money was spent on.
        description: String,

        /// The amount spent.
        amount: f64,

        /// The day of the expense (YYYY-MM-DD), defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// The category to file the expense under.
        #[arg(long)]
        category: Option<String>,
    },
    /// Change an existing expense.
    Update {
        /// The ID of the expense.
        id: String,

        /// The new description.
        #[arg(long)]
        description: Option<String>,

        /// The new amount.
        #[arg(long)]
        amount: Option<f64>,

        /// The new day of the expense (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// The new primary category.
        #[arg(long)]
        primary: Option<String>,

        /// The new secondary category.
        #[arg(long)]
        secondary: Option<String>,
    },
    /// Delete one or more expenses.
    Delete {
        /// The IDs of the expenses.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// File one or more expenses under new categories.
    Recategorize {
        /// The primary category.
        primary: String,

        /// The secondary category.
        secondary: String,

        /// The IDs of the expenses.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// File the expenses still waiting for a category, matching them to
    /// earlier expenses with the same description.
    Categorize,
    /// Write the matching expenses as CSV.
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Write the matching expenses as a printable HTML report.
    Print {
        #[command(flatten)]
        view: ViewArgs,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RangeArgs {
    /// A preset date range.
    #[arg(long, value_enum, default_value_t = PresetArg::Week)]
    preset: PresetArg,

    /// The first day of a custom range (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date, requires = "to")]
    from: Option<Date>,

    /// The last day of a custom range (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date, requires = "from")]
    to: Option<Date>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    #[command(flatten)]
    range: RangeArgs,

    /// Only show expenses whose description or categories contain this text.
    #[arg(long)]
    search: Option<String>,

    /// Only show expenses in this primary category.
    #[arg(long)]
    primary: Option<String>,

    /// Only show expenses in this secondary category.
    #[arg(long)]
    secondary: Option<String>,

    /// The sort order, e.g. date-desc, amount-asc or name-asc.
    #[arg(long, default_value_t = SortKey::NEWEST_FIRST)]
    sort: SortKey,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PresetArg {
    Week,
    Month,
    Quarter,
    All,
}

impl From<PresetArg> for RangePreset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Week => RangePreset::Week,
            PresetArg::Month => RangePreset::Month,
            PresetArg::Quarter => RangePreset::Quarter,
            PresetArg::All => RangePreset::AllTime,
        }
    }
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2025-01-31: {error}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError>> {
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    let config = ViewConfig {
        local_timezone: cli.timezone.clone(),
        currency_symbol: cli.currency.clone(),
        ..Default::default()
    };
    let today = today_in(&config.local_timezone)?;

    let connection = Connection::open(&cli.db_path)?;
    initialize_db(&connection)?;
    let store = SqliteRecordStore::new(Arc::new(Mutex::new(connection)), &config.local_timezone);
    let mut tracker = ExpenseTracker::new(Arc::new(store), config, today)?;

    if let Err(error) = run(cli.command, &mut tracker, today).await {
        eprintln!("{}", error.user_message());
        exit(1);
    }

    Ok(())
}

async fn run(
    command: Command,
    tracker: &mut ExpenseTracker<SqliteRecordStore>,
    today: Date,
) -> Result<(), Error> {
    match command {
        Command::List {
            view,
            page,
            page_size,
        } => {
            apply_view(tracker, &view).await?;

            if let Some(page_size) = page_size {
                tracker.view_mut().set_page_size(page_size)?;
            }
            tracker.view_mut().set_page(page);

            print_page(tracker);
        }
        Command::Summary {
            range,
            primary,
            secondary,
        } => {
            load_range(tracker, &range).await?;

            match primary {
                Some(primary) => {
                    tracker.open_drilldown(&primary).await;
                    if let Some(secondary) = secondary {
                        tracker.toggle_drilldown_secondary(&secondary).await;
                    }
                    print_drilldown(tracker);
                }
                None => print_summary(tracker),
            }
        }
        Command::Add {
            description,
            amount,
            date,
            category,
        } => {
            let new_record = NewRecord::build(&description, amount, date.unwrap_or(today))
                .category(category.as_deref());
            let record = tracker.create_record(new_record).await?;
            println!("Created expense {}", record.id);
        }
        Command::Update {
            id,
            description,
            amount,
            date,
            primary,
            secondary,
        } => {
            tracker.select_preset(RangePreset::AllTime).await;
            let id = RecordId::new(&id);
            let record = tracker
                .view()
                .records()
                .iter()
                .find(|record| record.id == id)
                .ok_or(Error::UpdateMissingRecord)?;

            let mut update = RecordUpdate::from_record(record);
            if let Some(description) = description {
                update.description = description;
            }
            if let Some(amount) = amount {
                update.amount = amount;
            }
            if let Some(date) = date {
                update.date = date;
            }
            let primary = primary.or_else(|| update.primary_category.clone());
            let secondary = secondary.or_else(|| update.secondary_category.clone());
            let update = update.categories(primary.as_deref(), secondary.as_deref());

            tracker.update_record(&id, update).await?;
            println!("Updated expense {id}");
        }
        Command::Delete { ids } => {
            select_ids(tracker, &ids).await?;
            let deleted = tracker.bulk_delete().await?;
            println!("Deleted {deleted} expenses");
        }
        Command::Recategorize {
            primary,
            secondary,
            ids,
        } => {
            select_ids(tracker, &ids).await?;
            let updated = tracker.bulk_recategorize(&primary, &secondary).await?;
            println!("Recategorized {updated} expenses");
        }
        Command::Categorize => {
            let filed = tracker.categorize_pending().await?;
            println!("Categorized {filed} expenses");
        }
        Command::Export { view, output } => {
            apply_view(tracker, &view).await?;
            write_output(output, &tracker.export_csv()?)?;
        }
        Command::Print { view, output } => {
            apply_view(tracker, &view).await?;
            write_output(output, &tracker.print_report()?)?;
        }
    }

    Ok(())
}

async fn load_range(
    tracker: &mut ExpenseTracker<SqliteRecordStore>,
    range: &RangeArgs,
) -> Result<(), Error> {
    match (range.from, range.to) {
        (Some(from), Some(to)) => tracker.select_date_range(from, to).await?,
        _ => tracker.select_preset(range.preset.into()).await,
    }

    if let Some(error) = tracker.records_status().error() {
        return Err(Error::RequestRejected(error.to_owned()));
    }

    Ok(())
}

async fn apply_view(
    tracker: &mut ExpenseTracker<SqliteRecordStore>,
    args: &ViewArgs,
) -> Result<(), Error> {
    load_range(tracker, &args.range).await?;

    let view = tracker.view_mut();
    view.set_category_filter(CategoryFilter::new(
        args.primary.as_deref().unwrap_or_default(),
        args.secondary.as_deref().unwrap_or_default(),
    ));
    view.set_sort_key(args.sort);
    if let Some(search) = &args.search {
        view.set_search_text(search);
    }

    Ok(())
}

async fn select_ids(
    tracker: &mut ExpenseTracker<SqliteRecordStore>,
    ids: &[String],
) -> Result<(), Error> {
    tracker.select_preset(RangePreset::AllTime).await;

    for id in ids {
        if !tracker.view_mut().toggle_selection(&RecordId::new(id), true) {
            eprintln!("No expense with ID {id}, skipping it");
        }
    }

    if tracker.view().selection().is_empty() {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn write_output(output: Option<PathBuf>, contents: &str) -> Result<(), Error> {
    match output {
        Some(path) => fs::write(&path, contents)
            .map_err(|error| Error::IoError(format!("{}: {error}", path.display()))),
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}

fn print_page(tracker: &ExpenseTracker<SqliteRecordStore>) {
    let view = tracker.view();
    let symbol = &tracker.config().currency_symbol;

    if view.ordered_records().is_empty() {
        println!("No expenses found for {}", tracker.range().label());
        return;
    }

    for record in view.displayed_page() {
        print_record(record, symbol);
    }

    println!();
    println!("{}", view.page_info().showing_label());
    println!("Total: {}", format_currency(view.total_amount(), symbol));

    let pager = render_indicators(&view.indicators());
    if !pager.is_empty() {
        println!("{pager}");
    }
}

fn print_record(record: &Record, symbol: &str) {
    let categories = match (
        record.primary_category.as_str(),
        record.secondary_category.as_str(),
    ) {
        ("", "") => "-".to_owned(),
        (primary, "") => primary.to_owned(),
        (primary, secondary) => format!("{primary} / {secondary}"),
    };

    println!(
        "{:>6}  {}  {:<32} {:>14}  {}",
        record.id,
        record.occurred_at.date(),
        record.description,
        format_currency(record.amount, symbol),
        categories
    );
}

fn render_indicators(indicators: &[PaginationIndicator]) -> String {
    indicators
        .iter()
        .map(|indicator| match indicator {
            PaginationIndicator::FirstButton => "«".to_owned(),
            PaginationIndicator::BackButton(_) => "‹".to_owned(),
            PaginationIndicator::Page(page) => page.to_string(),
            PaginationIndicator::CurrPage(page) => format!("[{page}]"),
            PaginationIndicator::Ellipsis => "…".to_owned(),
            PaginationIndicator::NextButton(_) => "›".to_owned(),
            PaginationIndicator::LastButton(_) => "»".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_summary(tracker: &ExpenseTracker<SqliteRecordStore>) {
    let summary = tracker.summary();
    let symbol = &tracker.config().currency_symbol;

    if let Some(error) = summary.error() {
        eprintln!("{error}");
        return;
    }

    println!("Spending for {}", tracker.range().label());
    for row in &summary.data().rows {
        println!(
            "{:<32} {:>14} {:>7}",
            row.category,
            format_currency(row.amount, symbol),
            row.percent_label()
        );
    }
    println!("Total: {}", format_currency(summary.data().total, symbol));
}

fn print_drilldown(tracker: &ExpenseTracker<SqliteRecordStore>) {
    let Some(drilldown) = tracker.drilldown() else {
        return;
    };
    let symbol = &tracker.config().currency_symbol;

    println!("Breakdown of {}", drilldown.primary_category());
    match drilldown.rollup.error() {
        Some(error) => eprintln!("{error}"),
        None => {
            for row in &drilldown.rollup.data().rows {
                let marker = if drilldown.selected_secondary() == Some(row.category.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {:<30} {:>14} {:>4} {:>7}",
                    row.category,
                    format_currency(row.amount, symbol),
                    row.count,
                    row.percent_label()
                );
            }
        }
    }

    println!();
    match drilldown.listing.error() {
        Some(error) => eprintln!("{error}"),
        None => {
            for record in drilldown.listing.data() {
                print_record(record, symbol);
            }
            println!("Total: {}", format_currency(drilldown.listing_total(), symbol));
        }
    }
}
