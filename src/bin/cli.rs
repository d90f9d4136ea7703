//! Library desk CLI
//!
//! Staff front end over the circulation core. Reads `libdesk.toml` unless
//! `--config` points elsewhere.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use libdesk::{
    clock::{Clock, SystemClock},
    error::{AppError, Result},
    interchange,
    models::{Book, BookPatch, Config, NewBook, NewStudent, Student, StudentPatch, StudentStatus},
    query::{
        self, AvailabilityFilter, BookQuery, BookSearchField, BookSortField, DateFilter,
        GroupQuery, GroupSearchField, GroupSortField, SortOrder, StudentQuery,
        StudentSearchField, StudentSortField, StudentStatusFilter, TransactionQuery,
        TransactionSortField, TransactionStatusFilter,
    },
    services::{
        self, CatalogService, CirculationService, LookupReply, LookupService, ReminderKind,
        RosterService,
    },
    storage::{self, LibraryStorage},
    utils::console,
};

/// libdesk - library circulation desk
#[derive(Parser, Debug)]
#[command(name = "libdesk", version, about = "Library circulation desk")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "libdesk.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress console tables and summaries
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the catalog
    Books {
        #[command(subcommand)]
        action: BooksCommand,
    },

    /// Manage the student roster
    Students {
        #[command(subcommand)]
        action: StudentsCommand,
    },

    /// Issue a book to a student
    Issue {
        /// Access number of the copy
        isbn: String,
        /// Registration number of the borrower
        reg_number: String,
        /// Due date (YYYY-MM-DD); defaults to the return period
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Issue a book to a staff member
    IssueStaff {
        isbn: String,
        staff_id: String,
        staff_name: String,
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Return a book
    Return { isbn: String },

    /// Return a book lent to staff
    ReturnStaff {
        isbn: String,
        /// Who processed the return
        #[arg(long, default_value = "staff")]
        processed_by: String,
    },

    /// Overdue borrows
    Overdue {
        #[command(subcommand)]
        action: OverdueCommand,
    },

    /// Transaction history
    Transactions {
        #[command(subcommand)]
        action: TransactionsCommand,
    },

    /// Public catalog grouped by title and author
    Catalog {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t)]
        field: GroupSearchField,
        #[arg(long, value_enum, default_value_t)]
        sort: GroupSortField,
        #[arg(long, value_enum, default_value_t)]
        order: SortOrder,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Check whether a title or access number is in
    Lookup { query: String },

    /// Prepare WhatsApp reminder links
    Notify {
        #[arg(value_enum)]
        kind: ReminderKind,
    },

    /// Borrows due within the next two days
    Upcoming,

    /// Library overview
    Dashboard,

    /// Circulation settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// Validate the configuration and the availability invariant
    Validate,
}

#[derive(Args, Debug)]
struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Rows per page (9, 18, 27 or 36); defaults to `library.page_size`
    #[arg(long, value_parser = page_size_arg)]
    page_size: Option<usize>,
}

fn page_size_arg(text: &str) -> std::result::Result<usize, String> {
    query::parse_page_size(text).map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
enum BooksCommand {
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t)]
        field: BookSearchField,
        #[arg(long, value_enum, default_value_t)]
        availability: AvailabilityFilter,
        #[arg(long, value_enum, default_value_t)]
        sort: BookSortField,
        #[arg(long, value_enum, default_value_t)]
        order: SortOrder,
        #[command(flatten)]
        page: PageArgs,
    },
    Add {
        isbn: String,
        name: String,
        author: String,
    },
    Edit {
        isbn: String,
        #[arg(long)]
        new_isbn: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    Delete {
        isbn: String,
    },
    /// Import books from CSV (ISBN,Name,Author,Available)
    Import {
        file: PathBuf,
        /// Only show the classification
        #[arg(long)]
        dry_run: bool,
    },
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Override availability of several copies
    Availability {
        #[arg(required = true)]
        isbns: Vec<String>,
        /// Mark as borrowed instead of available
        #[arg(long)]
        unavailable: bool,
    },
}

#[derive(Args, Debug)]
struct StudentFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    section: Option<String>,
    #[arg(long)]
    year: Option<u32>,
    #[arg(long)]
    semester: Option<u32>,
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t)]
        field: StudentSearchField,
        #[arg(long)]
        year: Option<u32>,
        #[arg(long, value_enum, default_value_t)]
        status: StudentStatusFilter,
        #[arg(long, value_enum, default_value_t)]
        sort: StudentSortField,
        #[arg(long, value_enum, default_value_t)]
        order: SortOrder,
        #[command(flatten)]
        page: PageArgs,
    },
    Add {
        reg_number: String,
        #[command(flatten)]
        fields: StudentFields,
    },
    Edit {
        reg_number: String,
        #[arg(long)]
        new_reg_number: Option<String>,
        /// active, inactive or graduated
        #[arg(long)]
        status: Option<StudentStatus>,
        #[command(flatten)]
        fields: StudentFields,
    },
    /// Import students from CSV
    Import {
        file: PathBuf,
    },
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Borrow history of one student
    History {
        reg_number: String,
    },
}

#[derive(Subcommand, Debug)]
enum OverdueCommand {
    List {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Attach remarks to a transaction
    Remark {
        transaction_id: String,
        remarks: String,
        #[arg(long, default_value = "staff")]
        by: String,
    },
}

#[derive(Subcommand, Debug)]
enum TransactionsCommand {
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t)]
        status: TransactionStatusFilter,
        /// today, week, month or all
        #[arg(long, default_value = "all")]
        range: String,
        /// Start of a custom date range
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End of a custom date range, inclusive
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t)]
        sort: TransactionSortField,
        #[arg(long, value_enum, default_value = "desc")]
        order: SortOrder,
        #[command(flatten)]
        page: PageArgs,
    },
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Get,
    /// Set the default return period in days (1-365)
    Set { days: u32 },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    console::set_quiet(cli.quiet);

    let config = Config::load_or_default(&cli.config).with_env_overrides();
    log::debug!("Loaded configuration from {}", cli.config.display());

    if let Err(e) = run(cli.command, config).await {
        log::error!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, config: Config) -> Result<()> {
    let storage = storage::from_config(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let circulation = CirculationService::new(storage.clone(), clock.clone())
        .with_fallback_days(config.library.default_return_days);
    let page_size = |args: &PageArgs| args.page_size.unwrap_or(config.library.page_size);

    match command {
        Command::Books { action } => {
            let catalog = CatalogService::new(storage.clone());
            run_books(action, &catalog, storage.as_ref(), config.library.page_size).await?;
        }

        Command::Students { action } => {
            let roster = RosterService::new(storage.clone());
            run_students(
                action,
                &roster,
                storage.as_ref(),
                clock.as_ref(),
                config.library.page_size,
            )
            .await?;
        }

        Command::Issue {
            isbn,
            reg_number,
            due,
        } => {
            let book = find_book(storage.as_ref(), &isbn).await?;
            let student = find_student(storage.as_ref(), &reg_number).await?;
            let tx = match due {
                Some(day) => {
                    circulation
                        .borrow_until(&book.id, &student.id, end_of_day(day))
                        .await?
                }
                None => circulation.borrow(&book.id, &student.id).await?,
            };
            console::success(&format!(
                "Issued \"{}\" to {} until {}",
                book.name,
                student.reg_number,
                interchange::format_date(tx.due_date)
            ));
        }

        Command::IssueStaff {
            isbn,
            staff_id,
            staff_name,
            due,
        } => {
            let book = find_book(storage.as_ref(), &isbn).await?;
            let tx = circulation
                .issue_to_staff(&book.id, &staff_id, &staff_name, due.map(end_of_day))
                .await?;
            console::success(&format!(
                "Issued \"{}\" to staff member {staff_name} until {}",
                book.name,
                interchange::format_date(tx.due_date)
            ));
        }

        Command::Return { isbn } => {
            let book = find_book(storage.as_ref(), &isbn).await?;
            circulation.return_book(&book.id).await?;
            console::success(&format!("Returned \"{}\"", book.name));
        }

        Command::ReturnStaff { isbn, processed_by } => {
            let book = find_book(storage.as_ref(), &isbn).await?;
            circulation.return_from_staff(&book.id, &processed_by).await?;
            console::success(&format!("Returned \"{}\" from staff", book.name));
        }

        Command::Overdue { action } => {
            let now = clock.now();
            match action {
                OverdueCommand::List { search } => {
                    let transactions = storage.list_transactions().await?;
                    let rows: Vec<Vec<String>> = query::overdue_matching(&transactions, &search, now)
                        .into_iter()
                        .map(|t| {
                            vec![
                                t.id.clone(),
                                t.book_name().to_string(),
                                t.student_reg_number().to_string(),
                                t.student_name().to_string(),
                                interchange::format_date(t.due_date),
                                t.days_overdue(now).to_string(),
                            ]
                        })
                        .collect();
                    console::header(&format!("Overdue books ({})", rows.len()));
                    console::table(
                        &["Transaction", "Book", "Reg No", "Student", "Due", "Days"],
                        &rows,
                    );
                }
                OverdueCommand::Export { output } => {
                    let transactions = storage.list_transactions().await?;
                    write_output(output.as_deref(), &interchange::export_overdue(&transactions, now))?;
                }
                OverdueCommand::Remark {
                    transaction_id,
                    remarks,
                    by,
                } => {
                    circulation.add_remarks(&transaction_id, &remarks, &by).await?;
                    console::success("Remarks saved");
                }
            }
        }

        Command::Transactions { action } => {
            let now = clock.now();
            let transactions = storage.list_transactions().await?;
            match action {
                TransactionsCommand::List {
                    search,
                    status,
                    range,
                    from,
                    to,
                    sort,
                    order,
                    page,
                } => {
                    let dates = parse_range(&range, from, to)?;
                    let view = TransactionQuery {
                        search,
                        status,
                        dates,
                        sort_by: sort,
                        order,
                    }
                    .apply(&transactions, now);

                    let totals = query::totals(&transactions, now);
                    let shown = query::paginate(view, page.page, page_size(&page))?;
                    let rows: Vec<Vec<String>> = shown
                        .items
                        .iter()
                        .map(|t| {
                            vec![
                                t.book_name().to_string(),
                                t.student_reg_number().to_string(),
                                interchange::format_date(t.borrowed_date),
                                interchange::format_date(t.due_date),
                                t.return_date.map_or("-".into(), interchange::format_date),
                                format!("{:?}", t.derived_status(now)),
                            ]
                        })
                        .collect();

                    console::header("Transactions");
                    console::table(&["Book", "Reg No", "Borrowed", "Due", "Returned", "Status"], &rows);
                    print_page_footer(&shown);
                    console::summary(
                        "Totals",
                        &[
                            ("Total", totals.total.to_string()),
                            ("Borrowed", totals.borrowed.to_string()),
                            ("Overdue", totals.overdue.to_string()),
                            ("Returned", totals.returned.to_string()),
                        ],
                    );
                }
                TransactionsCommand::Export { output } => {
                    write_output(
                        output.as_deref(),
                        &interchange::export_transactions(&transactions, now),
                    )?;
                }
            }
        }

        Command::Catalog {
            search,
            field,
            sort,
            order,
            page,
        } => {
            let books = storage.list_books().await?;
            let groups = GroupQuery {
                search,
                search_field: field,
                sort_by: sort,
                order,
            }
            .apply(query::group_books(&books));
            let shown = query::paginate(groups, page.page, page_size(&page))?;
            let rows: Vec<Vec<String>> = shown
                .items
                .iter()
                .map(|g| {
                    vec![
                        g.name.clone(),
                        g.author.clone(),
                        g.count.to_string(),
                        g.isbn_list.join(", "),
                    ]
                })
                .collect();
            console::header("Catalog");
            console::table(&["Title", "Author", "Copies", "Access numbers"], &rows);
            print_page_footer(&shown);
        }

        Command::Lookup { query } => {
            let lookup = LookupService::new(storage.clone(), clock.clone(), config.library.lookup_limit);
            match lookup.lookup(&query).await? {
                LookupReply::Hits(hits) => {
                    for hit in hits {
                        console::line(&format!("[{}] {hit}", hit.isbn));
                    }
                }
                reply => console::line(reply.message().unwrap_or_default()),
            }
        }

        Command::Notify { kind } => {
            let transactions = storage.list_transactions().await?;
            let reminders =
                services::build_reminders(&transactions, kind, clock.now(), &config.library);
            console::header(&format!("{kind:?} reminders ({})", reminders.len()));
            for reminder in &reminders {
                console::line(&format!(
                    "{} - \"{}\" ({} days)",
                    reminder.student_name, reminder.book_name, reminder.days
                ));
                console::sub_item(&reminder.link);
            }
        }

        Command::Upcoming => {
            let now = clock.now();
            let transactions = storage.list_transactions().await?;
            let due = services::upcoming_returns(&transactions, now, config.library.upcoming_returns_hours);
            console::header(&format!("Upcoming returns ({})", due.len()));
            for tx in due {
                console::line(&format!(
                    "\"{}\" - {} ({}): Due in {} hours",
                    tx.book_name(),
                    tx.student_name(),
                    tx.student_reg_number(),
                    tx.hours_until_due(now)
                ));
            }
        }

        Command::Dashboard => {
            let snapshot = services::load_snapshot(storage.as_ref()).await?;
            let stats = services::dashboard_stats(&snapshot, clock.now());
            console::summary(
                "Books",
                &[
                    ("Total", stats.total_books.to_string()),
                    ("Available", stats.available_books.to_string()),
                    ("Borrowed", stats.borrowed_books.to_string()),
                    ("Overdue", stats.overdue_books.to_string()),
                ],
            );
            let monthly: Vec<(&str, String)> = stats
                .monthly
                .iter()
                .map(|m| {
                    (
                        m.label.as_str(),
                        format!("{} borrowed, {} returned", m.borrowed, m.returned),
                    )
                })
                .collect();
            console::summary("Monthly activity", &monthly);
            let departments: Vec<(&str, String)> = stats
                .departments
                .iter()
                .map(|(name, count)| (name.as_str(), count.to_string()))
                .collect();
            console::summary("Students by department", &departments);
            console::summary(
                "Students",
                &[
                    ("Total", stats.students.total.to_string()),
                    ("Active", stats.students.active.to_string()),
                    ("Inactive", stats.students.inactive.to_string()),
                    ("Graduated", stats.students.graduated.to_string()),
                ],
            );
        }

        Command::Settings { action } => match action {
            SettingsCommand::Get => {
                let days = circulation.return_period().await;
                console::line(&format!("Default return period: {days} days"));
            }
            SettingsCommand::Set { days } => {
                circulation.update_return_period(days).await?;
                console::success(&format!("Default return period set to {days} days"));
            }
        },

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");

            let snapshot = services::load_snapshot(storage.as_ref()).await?;
            let mismatched =
                services::availability_mismatches(&snapshot.books, &snapshot.transactions);
            if mismatched.is_empty() {
                log::info!("✓ Availability matches open borrows");
            } else {
                for book in &mismatched {
                    log::warn!(
                        "Availability mismatch: {} ({}) marked {}",
                        book.isbn,
                        book.name,
                        book.availability_label()
                    );
                }
                return Err(AppError::validation(format!(
                    "{} book(s) disagree with their open borrows",
                    mismatched.len()
                )));
            }
            log::info!("All validations passed!");
        }
    }

    Ok(())
}

async fn run_books(
    action: BooksCommand,
    catalog: &CatalogService,
    storage: &dyn LibraryStorage,
    default_page_size: usize,
) -> Result<()> {
    match action {
        BooksCommand::List {
            search,
            field,
            availability,
            sort,
            order,
            page,
        } => {
            let books = catalog.books().await?;
            let view = BookQuery {
                search,
                search_field: field,
                availability,
                sort_by: sort,
                order,
            }
            .apply(&books);
            let shown = query::paginate(view, page.page, page.page_size.unwrap_or(default_page_size))?;
            let rows: Vec<Vec<String>> = shown
                .items
                .iter()
                .map(|b| {
                    vec![
                        b.isbn.clone(),
                        b.name.clone(),
                        b.author.clone(),
                        b.availability_label().to_string(),
                    ]
                })
                .collect();
            console::header("Books");
            console::table(&["Access No", "Name", "Author", "Available"], &rows);
            print_page_footer(&shown);
        }
        BooksCommand::Add { isbn, name, author } => {
            let book = catalog.add_book(NewBook::new(isbn, name, author)).await?;
            console::success(&format!("Added {} ({})", book.isbn, book.name));
        }
        BooksCommand::Edit {
            isbn,
            new_isbn,
            name,
            author,
        } => {
            let book = find_book(storage, &isbn).await?;
            let patch = BookPatch {
                isbn: new_isbn,
                name,
                author,
                is_available: None,
            };
            let edited = catalog.edit_book(&book.id, patch).await?;
            console::success(&format!("Updated {} ({})", edited.isbn, edited.name));
        }
        BooksCommand::Delete { isbn } => {
            let book = find_book(storage, &isbn).await?;
            catalog.delete_book(&book.id).await?;
            console::success(&format!("Deleted {} ({})", book.isbn, book.name));
        }
        BooksCommand::Import { file, dry_run } => {
            let text = std::fs::read_to_string(&file)?;
            let preview = catalog.preview_import(&text).await?;
            if preview.is_empty() {
                log::warn!("No book rows found in {}", file.display());
                return Ok(());
            }

            let rows: Vec<Vec<String>> = preview
                .records
                .iter()
                .map(|r| {
                    vec![
                        r.line.to_string(),
                        r.isbn.clone(),
                        r.name.clone(),
                        r.status.to_string(),
                        r.message.unwrap_or_default().to_string(),
                    ]
                })
                .collect();
            console::table(&["Line", "Access No", "Name", "Status", "Note"], &rows);
            let counts = preview.counts();
            console::summary(
                "Import preview",
                &[
                    ("Valid", counts.valid.to_string()),
                    ("Duplicate", counts.duplicate.to_string()),
                    ("Invalid", counts.invalid.to_string()),
                ],
            );

            if dry_run || counts.valid == 0 {
                return Ok(());
            }
            let imported = catalog
                .confirm_import(&preview, |pct| console::progress("Importing", pct))
                .await?;
            console::success(&format!("Imported {imported} book(s)"));
        }
        BooksCommand::Export { output } => {
            let books = catalog.books().await?;
            write_output(output.as_deref(), &interchange::export_books(&books))?;
        }
        BooksCommand::Availability { isbns, unavailable } => {
            let mut ids = Vec::with_capacity(isbns.len());
            for isbn in &isbns {
                match find_book(storage, isbn).await {
                    Ok(book) => ids.push(book.id),
                    Err(e) => log::warn!("{e}"),
                }
            }
            let outcome = catalog.set_availability(&ids, !unavailable).await;
            console::summary(
                "Availability update",
                &[
                    ("Updated", outcome.updated.to_string()),
                    ("Failed", (outcome.failed + isbns.len() - ids.len()).to_string()),
                ],
            );
        }
    }
    Ok(())
}

async fn run_students(
    action: StudentsCommand,
    roster: &RosterService,
    storage: &dyn LibraryStorage,
    clock: &dyn Clock,
    default_page_size: usize,
) -> Result<()> {
    match action {
        StudentsCommand::List {
            search,
            field,
            year,
            status,
            sort,
            order,
            page,
        } => {
            let students = roster.students().await?;
            let view = StudentQuery {
                search,
                search_field: field,
                year,
                status,
                sort_by: sort,
                order,
            }
            .apply(&students);
            let shown = query::paginate(view, page.page, page.page_size.unwrap_or(default_page_size))?;
            let rows: Vec<Vec<String>> = shown
                .items
                .iter()
                .map(|s| {
                    vec![
                        s.reg_number.clone(),
                        s.display_name().to_string(),
                        s.department_or_unknown().to_string(),
                        s.section.clone().unwrap_or_default(),
                        s.year.map(|y| y.to_string()).unwrap_or_default(),
                        s.status.to_string(),
                    ]
                })
                .collect();
            console::header("Students");
            console::table(&["Reg No", "Name", "Department", "Section", "Year", "Status"], &rows);
            print_page_footer(&shown);
        }
        StudentsCommand::Add { reg_number, fields } => {
            let student = roster
                .add_student(NewStudent {
                    reg_number,
                    name: fields.name,
                    department: fields.department,
                    section: fields.section,
                    year: fields.year,
                    semester: fields.semester,
                    contact_number: fields.contact,
                    email: fields.email,
                    ..NewStudent::default()
                })
                .await?;
            console::success(&format!("Added student {}", student.reg_number));
        }
        StudentsCommand::Edit {
            reg_number,
            new_reg_number,
            status,
            fields,
        } => {
            let student = find_student(storage, &reg_number).await?;
            let patch = StudentPatch {
                reg_number: new_reg_number,
                name: fields.name,
                department: fields.department,
                section: fields.section,
                year: fields.year,
                semester: fields.semester,
                contact_number: fields.contact,
                email: fields.email,
                status,
                ..StudentPatch::default()
            };
            let edited = roster.edit_student(&student.id, patch).await?;
            console::success(&format!("Updated student {}", edited.reg_number));
        }
        StudentsCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            let summary = roster.import_students(&text).await?;
            console::summary(
                "Student import",
                &[
                    ("Added", summary.success.to_string()),
                    ("Duplicates", summary.duplicates.to_string()),
                    ("Errors", summary.errors.to_string()),
                ],
            );
        }
        StudentsCommand::Export { output } => {
            let students = roster.students().await?;
            write_output(output.as_deref(), &interchange::export_students(&students))?;
        }
        StudentsCommand::History { reg_number } => {
            let student = find_student(storage, &reg_number).await?;
            let now = clock.now();
            let rows: Vec<Vec<String>> = roster
                .history(&student.id)
                .await?
                .iter()
                .map(|t| {
                    vec![
                        t.book_name().to_string(),
                        interchange::format_date(t.borrowed_date),
                        interchange::format_date(t.due_date),
                        t.return_date.map_or("-".into(), interchange::format_date),
                        format!("{:?}", t.derived_status(now)),
                    ]
                })
                .collect();
            console::header(&format!(
                "History of {} ({})",
                student.display_name(),
                student.reg_number
            ));
            console::table(&["Book", "Borrowed", "Due", "Returned", "Status"], &rows);
        }
    }
    Ok(())
}

/// Resolve a copy by access number, falling back to its id.
async fn find_book(storage: &dyn LibraryStorage, key: &str) -> Result<Book> {
    let key = key.trim();
    storage
        .list_books()
        .await?
        .into_iter()
        .find(|b| b.isbn == key || b.id == key)
        .ok_or_else(|| AppError::not_found("Book", key))
}

async fn find_student(storage: &dyn LibraryStorage, reg_number: &str) -> Result<Student> {
    let reg_number = reg_number.trim();
    storage
        .find_student_by_reg(reg_number)
        .await?
        .ok_or_else(|| AppError::not_found("Student", reg_number))
}

/// Due dates given on the command line run to the end of that day.
fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(23, 59, 59)
        .map_or_else(|| day.and_time(chrono::NaiveTime::MIN).and_utc(), |t| t.and_utc())
}

fn parse_range(range: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateFilter> {
    if from.is_some() || to.is_some() {
        return Ok(DateFilter::Custom { from, to });
    }
    match range.trim().to_lowercase().as_str() {
        "all" => Ok(DateFilter::All),
        "today" => Ok(DateFilter::Today),
        "week" => Ok(DateFilter::Week),
        "month" => Ok(DateFilter::Month),
        other => Err(AppError::validation(format!("unknown date range '{other}'"))),
    }
}

fn print_page_footer<T>(page: &query::Page<T>) {
    console::separator();
    console::line(&format!(
        "Showing {}-{} of {} (page {} of {})",
        page.first_index(),
        page.last_index(),
        page.total_items,
        page.page,
        page.total_pages.max(1)
    ));
}

/// Write export text to a file, or stdout when no path is given.
fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
