use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

fn step_file_arg() -> Arg {
    Arg::new("file")
        .help("Path to a JSON file holding the step payload")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("konfirmi")
        .about("Business verification and wallet portal")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the Konfirmi API")
                .default_value("https://api.konfirmi.dev")
                .env("KONFIRMI_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("portal")
                .long("portal")
                .help("Portal to act as: customer or admin")
                .default_value("customer")
                .env("KONFIRMI_PORTAL")
                .value_parser(["customer", "admin"])
                .global(true),
        )
        .arg(
            Arg::new("session-file")
                .long("session-file")
                .help("Path of the persisted session file")
                .default_value(".konfirmi-session.json")
                .env("KONFIRMI_SESSION_FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("KONFIRMI_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and persist the portal token")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .help("Account email")
                        .env("KONFIRMI_EMAIL")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("Account password (prefer the env var over the flag)")
                        .env("KONFIRMI_PASSWORD")
                        .required(true),
                ),
        )
        .subcommand(Command::new("logout").about("Clear the persisted session"))
        .subcommand(Command::new("me").about("Show the signed-in profile"))
        .subcommand(Command::new("status").about("Show the business verification status"))
        .subcommand(
            Command::new("submit-business-info")
                .about("Submit verification step 1: business information")
                .arg(step_file_arg()),
        )
        .subcommand(
            Command::new("submit-compliance")
                .about("Submit verification step 2: compliance answers")
                .arg(step_file_arg()),
        )
        .subcommand(
            Command::new("submit-contact-person")
                .about("Submit verification step 3: contact person")
                .arg(step_file_arg()),
        )
        .subcommand(
            Command::new("complete").about("Finalize the verification submission for review"),
        )
        .subcommand(Command::new("balance").about("Show the wallet balance"))
        .subcommand(Command::new("usage").about("Show API usage statistics"))
        .subcommand(
            Command::new("topup")
                .about("Start a wallet top-up and print the hosted payment URL")
                .arg(
                    Arg::new("amount")
                        .help("Amount in naira (₦100 to ₦1,000,000)")
                        .required(true)
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("callback-url")
                        .long("callback-url")
                        .help("URL the payment page redirects back to"),
                ),
        )
        .subcommand(
            Command::new("topup-verify")
                .about("Confirm a top-up by reference or callback URL")
                .arg(
                    Arg::new("reference")
                        .help("Payment reference, or the full callback URL")
                        .required(true),
                )
                .arg(
                    Arg::new("attempts")
                        .long("attempts")
                        .help("Maximum verification attempts before giving up")
                        .default_value("20")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("delay-secs")
                        .long("delay-secs")
                        .help("Seconds to wait between attempts")
                        .default_value("3")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
}
