//! Till register
//!
//! A line-oriented register over stdin: scan products, adjust the cart, take
//! payment and record the sale.

use std::{
    io::{self, Write},
    process,
};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use till::{
    catalog::LOW_STOCK_THRESHOLD,
    checkout::{HttpSaleSubmitter, HttpSubmitterConfig, LocalSaleLog, SaleSubmitter},
    fixtures::{Fixture, FixtureError},
    session::{Register, ScanOutcome},
};

use crate::{
    commands::{Command, HELP},
    config::TillConfig,
};

mod commands;
mod config;
mod observability;

/// Errors that stop the register.
#[derive(Debug, Error)]
enum AppError {
    /// The catalog could not be loaded.
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Terminal input or output failed.
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

/// Whether to keep reading commands.
enum Flow {
    Continue,
    Quit,
}

/// Till register entry point
#[tokio::main]
async fn main() {
    let config = TillConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(2);
    });

    if let Err(init_error) = observability::init(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Logging error: {init_error}");
        }

        process::exit(1);
    }

    if let Err(run_error) = run(config).await {
        error!("register stopped: {run_error}");

        process::exit(1);
    }
}

async fn run(config: TillConfig) -> Result<(), AppError> {
    let mut fixture = Fixture::with_base_path(&config.register.fixtures_dir);

    fixture.load_catalog(&config.register.catalog)?;

    let currency = fixture.currency()?;

    let mut register = Register::new(
        fixture.into_catalog(),
        currency,
        config.register.location_id,
    );

    register.set_customer(config.register.customer_id);

    let submitter: Box<dyn SaleSubmitter> = if config.api.offline {
        Box::new(LocalSaleLog::new())
    } else {
        Box::new(HttpSaleSubmitter::new(HttpSubmitterConfig {
            base_url: config.api.api_url,
            token: config.api.api_token,
        }))
    };

    info!(
        catalog = %config.register.catalog,
        products = register.catalog().len(),
        currency = currency.iso_alpha_code,
        offline = config.api.offline,
        "register open"
    );

    let mut out = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    writeln!(out, "Till ready. Type `help` for commands.")?;

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "! {err}")?;
                continue;
            }
        };

        if let Flow::Quit = handle(&mut register, submitter.as_ref(), command, &mut out).await? {
            break;
        }

        out.flush()?;
    }

    Ok(())
}

async fn handle(
    register: &mut Register<'_>,
    submitter: &dyn SaleSubmitter,
    command: Command,
    out: &mut impl Write,
) -> Result<Flow, io::Error> {
    let shows_payment = matches!(command, Command::Pay | Command::Tender(_) | Command::Exact);

    let outcome = match command {
        Command::Scan(query) => match register.scan(&query) {
            Ok(ScanOutcome::WeightRequired(_)) => {
                if let Some(product) = register.pending_weight() {
                    writeln!(out, "Weigh {}: w <kg>", product.name)?;
                }

                return Ok(Flow::Continue);
            }
            other => other.map(|_| ()),
        },
        Command::Weigh(kilograms) => register.enter_weight(kilograms).map(|_| ()),
        Command::Increment => register.increment_selected().map(|_| ()),
        Command::Decrement => register.decrement_selected().map(|_| ()),
        Command::Remove => register.remove_selected().map(|_| ()),
        Command::Up => {
            register.select_previous();
            Ok(())
        }
        Command::Down => {
            register.select_next();
            Ok(())
        }
        Command::Select(row) => register.select(row.saturating_sub(1)).map(|_| ()),
        Command::Pay => register.begin_payment().map(|_| ()),
        Command::Tender(amount) => register.tender(amount),
        Command::Exact => register.tender_exact(),
        Command::List => Ok(()),
        Command::Done => {
            match register.checkout(submitter).await {
                Ok(sale) => {
                    if let Err(err) = sale.receipt.write_to(&mut *out) {
                        warn!(%err, "failed to print receipt");
                    }
                }
                Err(err) => writeln!(out, "! {err}")?,
            }

            return Ok(Flow::Continue);
        }
        Command::Cancel => {
            if let Some(product) = register.cancel_weight() {
                writeln!(out, "Dropped {}", product.name)?;
            } else if register.cancel_payment() {
                writeln!(out, "Payment cancelled")?;
            }

            return Ok(Flow::Continue);
        }
        Command::Stock => {
            write_low_stock(register, out)?;
            return Ok(Flow::Continue);
        }
        Command::Browse(category) => {
            write_browse(register, category.as_deref(), out)?;
            return Ok(Flow::Continue);
        }
        Command::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
    };

    match outcome {
        Ok(()) if shows_payment => write_payment(register, out)?,
        Ok(()) => write_cart(register, out)?,
        Err(err) => writeln!(out, "! {err}")?,
    }

    Ok(Flow::Continue)
}

fn write_cart(register: &Register<'_>, out: &mut impl Write) -> io::Result<()> {
    let cart = register.cart();

    if cart.is_empty() {
        writeln!(out, "(empty)")?;
    }

    for (idx, line) in cart.iter().enumerate() {
        let marker = if register.selected() == Some(idx) { '>' } else { ' ' };

        writeln!(
            out,
            "{marker} {:>2}. {:<20} {:>10} x {:>10} = {:>10}",
            idx + 1,
            line.name(),
            line.quantity().to_string(),
            line.unit_price().to_string(),
            line.subtotal().to_string(),
        )?;
    }

    writeln!(out, "  Total: {}", cart.total())
}

fn write_payment(register: &Register<'_>, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "  Total: {}", register.cart().total())?;

    if let Some(payment) = register.payment() {
        writeln!(out, "  Tendered: {}", payment.entry().as_str())?;
    }

    match register.change_due() {
        Ok(change) => writeln!(out, "  Change: {}", change.due)?,
        Err(err) => writeln!(out, "  {err}")?,
    }

    let suggestions: Vec<String> = register
        .suggested_tenders()
        .iter()
        .map(ToString::to_string)
        .collect();

    writeln!(out, "  Quick cash: {}", suggestions.join("  "))
}

fn write_low_stock(register: &Register<'_>, out: &mut impl Write) -> io::Result<()> {
    let mut any = false;

    for product in register.catalog().low_stock(LOW_STOCK_THRESHOLD) {
        any = true;

        writeln!(
            out,
            "  {:<8} {:<20} {}",
            product.code.as_str(),
            product.name,
            product.stock.unwrap_or_default()
        )?;
    }

    if !any {
        writeln!(out, "  Stock levels are fine")?;
    }

    Ok(())
}

fn write_browse(
    register: &Register<'_>,
    category: Option<&str>,
    out: &mut impl Write,
) -> io::Result<()> {
    let Some(category) = category else {
        return writeln!(out, "  {}", register.catalog().categories().join(", "));
    };

    for product in register.catalog().by_category(category) {
        writeln!(
            out,
            "  {:<8} {:<20} {}{}",
            product.code.as_str(),
            product.name,
            product.price,
            if product.is_weighted() { " /kg" } else { "" },
        )?;
    }

    Ok(())
}
