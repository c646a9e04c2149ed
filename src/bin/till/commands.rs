//! Register commands
//!
//! One command per input line. Anything that is not a keyword is treated as a
//! scanned barcode or typed product name.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while reading a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command needs an argument.
    #[error("`{0}` needs an amount")]
    MissingArgument(&'static str),

    /// The argument is not a number.
    #[error("not a number: {0}")]
    InvalidNumber(String),
}

/// A register command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scan a barcode or product name.
    Scan(String),

    /// Weigh the held product, in kilograms.
    Weigh(Decimal),

    /// Add one to the selected row.
    Increment,

    /// Take one from the selected row.
    Decrement,

    /// Remove the selected row.
    Remove,

    /// Move the selection up.
    Up,

    /// Move the selection down.
    Down,

    /// Select a row, counting from one.
    Select(usize),

    /// Start taking payment.
    Pay,

    /// Set the tendered amount.
    Tender(Decimal),

    /// Tender exactly the total.
    Exact,

    /// Complete the sale.
    Done,

    /// Drop the held weighed product, or abandon the payment.
    Cancel,

    /// Show the cart.
    List,

    /// Show products running low.
    Stock,

    /// Show the products in a category, or list categories.
    Browse(Option<String>),

    /// Show available commands.
    Help,

    /// Leave the register.
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a command's numeric argument is missing or malformed.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();

        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match (word.to_ascii_lowercase().as_str(), rest) {
            ("w" | "weigh", _) => Self::Weigh(number("weigh", rest)?),
            ("tender", _) => Self::Tender(number("tender", rest)?),
            ("select", _) => Self::Select(
                rest.parse()
                    .map_err(|_err| CommandError::InvalidNumber(rest.to_string()))?,
            ),
            ("browse", "") => Self::Browse(None),
            ("browse", category) => Self::Browse(Some(category.to_string())),
            ("+", "") => Self::Increment,
            ("-", "") => Self::Decrement,
            ("del", "") => Self::Remove,
            ("up", "") => Self::Up,
            ("down", "") => Self::Down,
            ("pay", "") => Self::Pay,
            ("exact", "") => Self::Exact,
            ("done", "") => Self::Done,
            ("cancel", "") => Self::Cancel,
            ("list", "") => Self::List,
            ("stock", "") => Self::Stock,
            ("help" | "?", "") => Self::Help,
            ("quit" | "exit", "") => Self::Quit,
            _ => Self::Scan(line.to_string()),
        };

        Ok(Some(command))
    }
}

fn number(command: &'static str, arg: &str) -> Result<Decimal, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }

    arg.parse()
        .map_err(|_err| CommandError::InvalidNumber(arg.to_string()))
}

/// Help text listing every command.
pub const HELP: &str = "\
<code or name>   scan a product
w <kg>           weigh the held product
+ / -            add or take one from the selected row
del              remove the selected row
up / down        move the selection
select <n>       select row n
pay              start taking payment
tender <amount>  set the amount handed over
exact            tender exactly the total
done             complete the sale
cancel           drop the held product or abandon payment
list             show the cart
browse [cat]     list categories, or products in one
stock            show products running low
quit             leave the register";
