//! Bookstore CLI - browse the catalog, manage a cart and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session survives between invocations)
//! BOOKSTORE_PASSWORD=... bookstore login -e reader@example.com
//!
//! # Browse and fill the cart
//! bookstore books list
//! bookstore cart add 6f1c2d0e-8a4b-4c3d-9e2f-1a2b3c4d5e6f
//! bookstore cart set 6f1c2d0e-8a4b-4c3d-9e2f-1a2b3c4d5e6f 3
//!
//! # Place one order per cart line
//! bookstore checkout
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKSTORE_API_BASE` - API base URL
//! - `BOOKSTORE_DATA_DIR` - Directory holding the session, cookies and cart
//! - `BOOKSTORE_PASSWORD` - Password for `login` and `signup`
//! - `BOOKSTORE_LOG_FORMAT` - `text` (default) or `json`
//! - `BOOKSTORE_SENTRY_DSN` - Report warnings and errors to Sentry
//! - `RUST_LOG` - Log filter

#![cfg_attr(not(test), forbid(unsafe_code))]

use bookstore_core::{AuthorId, BookId, OrderId, Price};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(author, version, about = "Bookstore command-line client")]
struct Cli {
    /// Log output format
    #[arg(long, env = "BOOKSTORE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Sentry DSN for error reporting
    #[arg(long, env = "BOOKSTORE_SENTRY_DSN", hide_env_values = true, global = true)]
    sentry_dsn: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long, env = "BOOKSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long, env = "BOOKSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse and manage books
    Books {
        #[command(subcommand)]
        action: BookAction,
    },
    /// Browse and manage authors
    Authors {
        #[command(subcommand)]
        action: AuthorAction,
    },
    /// View your orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place one order per cart line
    Checkout,
}

#[derive(Subcommand)]
enum BookAction {
    /// List every book
    List,
    /// Show one book
    Show { id: BookId },
    /// Add a book to the catalog (admin)
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        author: AuthorId,

        /// Price in pounds, e.g. `12.99`
        #[arg(short, long)]
        price: Price,

        #[arg(short, long)]
        description: Option<String>,

        /// RFC 3339 timestamp, e.g. `2020-01-01T00:00:00Z`
        #[arg(long)]
        published: Option<DateTime<Utc>>,
    },
    /// Change a book (admin)
    Update {
        id: BookId,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        author: Option<AuthorId>,

        #[arg(short, long)]
        price: Option<Price>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        published: Option<DateTime<Utc>>,
    },
    /// Remove a book (admin)
    Delete { id: BookId },
}

#[derive(Subcommand)]
enum AuthorAction {
    /// List every author
    List,
    /// Show an author and their books
    Show { id: AuthorId },
    /// Add an author (admin)
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        bio: Option<String>,
    },
    /// Change an author (admin)
    Update {
        id: AuthorId,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        bio: Option<String>,
    },
    /// Remove an author (admin)
    Delete { id: AuthorId },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: OrderId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its total
    Show,
    /// Add one copy of a book
    Add { id: BookId },
    /// Remove a book's line
    Remove { id: BookId },
    /// Set a line's quantity; zero or less removes it
    Set {
        id: BookId,

        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookstore=info,bookstore_client=info".into());

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(cli.sentry_dsn.as_deref());
    init_tracing(cli.log_format);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli.command).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::from_env()?;

    match command {
        Commands::Signup {
            name,
            email,
            password,
        } => commands::account::signup(&ctx, name, email, password.into()).await?,
        Commands::Login { email, password } => {
            commands::account::login(&ctx, email, password.into()).await?;
        }
        Commands::Logout => commands::account::logout(&ctx).await,
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::Books { action } => match action {
            BookAction::List => commands::catalog::list_books(&ctx).await?,
            BookAction::Show { id } => commands::catalog::show_book(&ctx, id).await?,
            BookAction::Create {
                title,
                author,
                price,
                description,
                published,
            } => {
                let book = bookstore_client::api::NewBook {
                    title,
                    author_id: author,
                    description,
                    price,
                    published_date: published,
                };
                commands::catalog::create_book(&ctx, &book).await?;
            }
            BookAction::Update {
                id,
                title,
                author,
                price,
                description,
                published,
            } => {
                let update = bookstore_client::api::BookUpdate {
                    title,
                    author_id: author,
                    description,
                    price,
                    published_date: published,
                };
                commands::catalog::update_book(&ctx, id, &update).await?;
            }
            BookAction::Delete { id } => commands::catalog::delete_book(&ctx, id).await?,
        },
        Commands::Authors { action } => match action {
            AuthorAction::List => commands::catalog::list_authors(&ctx).await?,
            AuthorAction::Show { id } => commands::catalog::show_author(&ctx, id).await?,
            AuthorAction::Create { name, bio } => {
                let author = bookstore_client::api::NewAuthor { name, bio };
                commands::catalog::create_author(&ctx, &author).await?;
            }
            AuthorAction::Update { id, name, bio } => {
                let update = bookstore_client::api::AuthorUpdate { name, bio };
                commands::catalog::update_author(&ctx, id, &update).await?;
            }
            AuthorAction::Delete { id } => commands::catalog::delete_author(&ctx, id).await?,
        },
        Commands::Orders { action } => match action {
            OrderAction::List => commands::orders::list(&ctx).await?,
            OrderAction::Show { id } => commands::orders::show(&ctx, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx),
            CartAction::Add { id } => commands::cart::add(&ctx, id).await?,
            CartAction::Remove { id } => commands::cart::remove(&ctx, id)?,
            CartAction::Set { id, quantity } => commands::cart::set(&ctx, id, quantity)?,
            CartAction::Clear => commands::cart::clear(&ctx)?,
        },
        Commands::Checkout => commands::cart::checkout(&ctx).await?,
    }
    Ok(())
}
