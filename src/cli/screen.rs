//! Interactive converter screen read from stdin.

use super::ui;
use crate::core::config::AppConfig;
use crate::core::screen::{Outcome, Ticket};
use crate::core::{RateProvider, RateTable, Screen, Status};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  amount <value>     set the amount to convert
  from <code>        select the source currency
  to <code>          select the target currency
  swap               exchange source and target
  convert [amount]   fetch rates and convert
  search <text>      find currencies containing <text>
  list               show all currencies
  show               show the current selection and last result
  help               show this help
  quit               leave the converter";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Amount(String),
    From(String),
    To(String),
    Swap,
    Convert(Option<String>),
    Search(String),
    List,
    Show,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim())),
        None => (line, None),
    };
    let required = |what: &str| {
        arg.filter(|a| !a.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("`{name}` needs {what}"))
    };

    match name.to_lowercase().as_str() {
        "" => Ok(Command::Empty),
        "amount" | "a" => required("an amount").map(Command::Amount),
        "from" | "f" => required("a currency code").map(Command::From),
        "to" | "t" => required("a currency code").map(Command::To),
        "swap" | "s" => Ok(Command::Swap),
        "convert" | "c" => Ok(Command::Convert(
            arg.filter(|a| !a.is_empty()).map(str::to_string),
        )),
        "search" | "/" => required("some text").map(Command::Search),
        "list" | "l" => Ok(Command::List),
        "show" => Ok(Command::Show),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command `{other}`, type `help`")),
    }
}

/// A rate response routed back to the screen.
enum Fetched {
    Currencies(Result<RateTable>),
    Conversion(Ticket, Result<RateTable>),
}

pub async fn run(config: &AppConfig, provider: &dyn RateProvider) -> Result<()> {
    let mut screen = Screen::new(config);

    println!("{}", ui::style_text("Currency Converter", ui::StyleType::Title));
    println!("{HELP}\n");

    drive(&mut screen, provider, BufReader::new(tokio::io::stdin())).await?;

    debug!("Leaving converter screen");
    Ok(())
}

/// Reads commands from `input` until `quit` or end of input.
///
/// Rate requests run alongside input handling and are applied to `screen` as
/// they complete. At end of input the outstanding requests are awaited.
pub async fn drive<R>(screen: &mut Screen, provider: &dyn RateProvider, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut in_flight: FuturesUnordered<BoxFuture<'_, Fetched>> = FuturesUnordered::new();
    let mut list_pending = false;
    if let Some(base) = screen.begin_mount() {
        list_pending = true;
        in_flight.push(
            async move { Fetched::Currencies(provider.fetch_rates(&base).await) }.boxed(),
        );
    }

    let mut spinner: Option<ProgressBar> = None;
    let mut lines = input.lines();
    let mut input_open = true;

    sync_spinner(&mut spinner, screen.is_loading() || list_pending);
    show_prompt(screen)?;

    while input_open || !in_flight.is_empty() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read input")? {
                    None => {
                        println!();
                        input_open = false;
                    }
                    Some(line) => match parse_command(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => {
                            if let Some(ticket) = handle(screen, command) {
                                in_flight.push(
                                    async move {
                                        let fetched =
                                            provider.fetch_rates(&ticket.request.source).await;
                                        Fetched::Conversion(ticket, fetched)
                                    }
                                    .boxed(),
                                );
                            }
                        }
                        Err(message) => {
                            println!("{}", ui::style_text(&message, ui::StyleType::Warning))
                        }
                    },
                }
            }
            Some(fetched) = in_flight.next(), if !in_flight.is_empty() => {
                match fetched {
                    Fetched::Currencies(fetched) => {
                        list_pending = false;
                        screen.finish_mount(fetched);
                    }
                    Fetched::Conversion(ticket, fetched) => {
                        if screen.finish_convert(ticket, fetched)
                            && screen.status() == Status::Settled(Outcome::Success)
                        {
                            sync_spinner(&mut spinner, false);
                            println!();
                            print_result(screen);
                        }
                    }
                }
            }
            else => break,
        }

        sync_spinner(&mut spinner, screen.is_loading() || list_pending);
        flush_notice(screen);
        if input_open {
            show_prompt(screen)?;
        }
    }

    sync_spinner(&mut spinner, false);
    Ok(())
}

/// Applies `command` to the screen. Returns the ticket of a conversion that
/// still needs its rates fetched.
fn handle(screen: &mut Screen, command: Command) -> Option<Ticket> {
    match command {
        Command::Amount(amount) => screen.set_amount(&amount),
        Command::From(code) => {
            screen.select_source(&code);
        }
        Command::To(code) => {
            screen.select_target(&code);
        }
        Command::Swap => screen.swap(),
        Command::Convert(amount) => {
            if let Some(amount) = amount {
                screen.set_amount(&amount);
            }
            return screen.begin_convert();
        }
        Command::Search(query) => {
            let matches = screen.search(&query);
            if matches.is_empty() {
                println!("No currencies match `{query}`.");
            } else {
                println!("{}", matches.join(" "));
            }
        }
        Command::List => {
            let codes: Vec<&str> = screen.currencies().iter().map(String::as_str).collect();
            if codes.is_empty() {
                println!("No currencies loaded.");
            } else {
                println!("{}", super::list::render_codes(&codes, 8));
            }
        }
        Command::Show => {
            println!(
                "Amount: {}  From: {}  To: {}",
                screen.amount(),
                screen.source(),
                screen.target()
            );
            print_result(screen);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit | Command::Empty => {}
    }
    None
}

/// Shows the spinner while `busy`, clears it otherwise.
fn sync_spinner(spinner: &mut Option<ProgressBar>, busy: bool) {
    match (busy, spinner.take()) {
        (true, None) => *spinner = Some(ui::new_spinner("Fetching rates...")),
        (true, Some(pb)) => *spinner = Some(pb),
        (false, Some(pb)) => pb.finish_and_clear(),
        (false, None) => {}
    }
}

fn show_prompt(screen: &Screen) -> Result<()> {
    print!("{} ", prompt(screen));
    std::io::stdout().flush().context("Failed to flush stdout")
}

fn prompt(screen: &Screen) -> String {
    let amount = if screen.amount().is_empty() {
        "-"
    } else {
        screen.amount()
    };
    ui::style_text(
        &format!("[{} {} -> {}] >", amount, screen.source(), screen.target()),
        ui::StyleType::Subtle,
    )
}

fn print_result(screen: &Screen) {
    match screen.result() {
        Some(result) => println!(
            "{}",
            ui::style_text(&result.to_string(), ui::StyleType::Result)
        ),
        None => println!("No conversion yet."),
    }
}

fn flush_notice(screen: &mut Screen) {
    if let Some(notice) = screen.take_notice() {
        ui::print_notice(&notice);
    }
}
