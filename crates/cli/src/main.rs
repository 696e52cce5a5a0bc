//! Kubti CLI - Cart client for the Kubti store.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a token issued by the store
//! kubti login --token eyJhbGciOi...
//!
//! # Show the cart (server items first, then items kept on this device)
//! kubti cart show
//!
//! # Change a quantity; 0 removes the item
//! kubti cart set 17 3
//!
//! # Place an order
//! kubti checkout --address "12 Lake Road" --city Pune --state Maharashtra \
//!     --pincode 411001 --phone 9876543210
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `status` - Manage the stored access token
//! - `cart` - Show, add, change, remove and clear cart items
//! - `checkout` - Place an order for the whole cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use kubti_cart::CartConfig;
use kubti_core::{DeliveryAddress, EntryKey};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use commands::Context;
use commands::cart::LocalProduct;
use error::CliError;

#[derive(Parser)]
#[command(name = "kubti")]
#[command(author, version, about = "Kubti cart client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an access token for backend requests
    Login {
        /// Bearer token issued at sign-in
        #[arg(short, long)]
        token: String,
    },
    /// Forget the stored access token
    Logout,
    /// Show whether a token is stored
    Status,
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the cart
    Checkout(CheckoutArgs),
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart entries and totals
    Show {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add a store product to the server cart
    Add {
        /// Backend product ID
        product_id: i64,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Pack size (e.g. 4L)
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Add a catalog-fixed product to the cart on this device
    AddLocal {
        /// Catalog ID of the product
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        /// Listed unit price
        #[arg(long)]
        price: Decimal,

        /// Price before markdown
        #[arg(long)]
        original_price: Option<Decimal>,

        /// Whole-number discount percentage
        #[arg(long)]
        discount: Option<u32>,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(short, long)]
        size: Option<String>,

        /// Custom request note (e.g. a colour shade)
        #[arg(long)]
        note: Option<String>,
    },
    /// Set the quantity of an entry; below 1 removes it
    Set {
        /// Entry key as shown by `cart show` (`local:<id>` for items on this device)
        key: EntryKey,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove an entry
    Remove {
        /// Entry key as shown by `cart show`
        key: EntryKey,
    },
    /// Remove every entry
    Clear,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Street address
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    state: String,
    #[arg(long)]
    pincode: String,
    #[arg(long)]
    phone: String,
}

impl From<CheckoutArgs> for DeliveryAddress {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            delivery_address: args.address,
            delivery_city: args.city,
            delivery_state: args.state,
            delivery_pincode: args.pincode,
            delivery_phone: args.phone,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(std::borrow::Cow::Owned(config.sentry_environment.clone())),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = CartConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Logs go to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kubti_cart=warn,kubti_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(text) => {
            let mut stdout = std::io::stdout().lock();
            if writeln!(stdout, "{text}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<String, CliError> {
    let ctx = Context::open(config).await?;

    match cli.command {
        Commands::Login { token } => commands::session::login(&ctx, &token).await,
        Commands::Logout => commands::session::logout(&ctx).await,
        Commands::Status => Ok(commands::session::status(&ctx).await),
        Commands::Cart { action } => {
            let cart = ctx.loaded_cart(config).await?;
            match action {
                CartAction::Show { json } => commands::cart::show(&cart, json).await,
                CartAction::Add {
                    product_id,
                    quantity,
                    size,
                } => commands::cart::add(&cart, product_id, quantity, size).await,
                CartAction::AddLocal {
                    id,
                    name,
                    price,
                    original_price,
                    discount,
                    quantity,
                    size,
                    note,
                } => {
                    let product = LocalProduct {
                        id,
                        name,
                        price,
                        original_price,
                        discount_percent: discount,
                        size,
                        note,
                    };
                    commands::cart::add_local(&cart, product, quantity).await
                }
                CartAction::Set { key, quantity } => {
                    commands::cart::set(&cart, &key, quantity).await
                }
                CartAction::Remove { key } => commands::cart::remove(&cart, &key).await,
                CartAction::Clear => commands::cart::clear(&cart).await,
            }
        }
        Commands::Checkout(args) => {
            let cart = ctx.loaded_cart(config).await?;
            commands::checkout::place_order(&cart, args.into()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_entry_keys() {
        let cli = Cli::try_parse_from(["kubti", "cart", "set", "17", "-1"]).unwrap();
        let Commands::Cart {
            action: CartAction::Set { key, quantity },
        } = cli.command
        else {
            panic!("expected cart set");
        };
        assert_eq!(key, "17".parse::<EntryKey>().unwrap());
        assert!(matches!(key, EntryKey::Server(_)));
        assert_eq!(quantity, -1);

        let cli = Cli::try_parse_from(["kubti", "cart", "remove", "allwood-teak"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Remove {
                    key: EntryKey::Local(_)
                }
            }
        ));
    }

    #[test]
    fn test_parse_numeric_local_key() {
        let cli = Cli::try_parse_from(["kubti", "cart", "set", "local:17", "0"]).unwrap();
        let Commands::Cart {
            action: CartAction::Set { key, .. },
        } = cli.command
        else {
            panic!("expected cart set");
        };
        assert!(matches!(&key, EntryKey::Local(id) if id.as_str() == "17"));
        assert_eq!(key.to_string(), "local:17");
    }

    #[test]
    fn test_parse_add_local_price() {
        let cli = Cli::try_parse_from([
            "kubti", "cart", "add-local", "--id", "allwood-teak", "--name", "Allwood Teak",
            "--price", "245.50", "--quantity", "2",
        ])
        .unwrap();
        let Commands::Cart {
            action: CartAction::AddLocal { price, quantity, .. },
        } = cli.command
        else {
            panic!("expected cart add-local");
        };
        assert_eq!(price, Decimal::new(24550, 2));
        assert_eq!(quantity, 2);
    }
}
