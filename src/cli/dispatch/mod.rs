use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    // Closure to return subcommand matches
    let sub_m = |subcommand| -> Result<&clap::ArgMatches> {
        matches
            .subcommand_matches(subcommand)
            .context("arguments not found")
    };

    let required = |m: &clap::ArgMatches, name: &str| -> Result<String> {
        m.get_one::<String>(name)
            .map(String::to_string)
            .with_context(|| format!("missing required argument: --{name}"))
    };

    match matches.subcommand_name() {
        Some("login") => {
            let m = sub_m("login")?;
            Ok(Action::Login {
                email: required(m, "email")?,
                password: SecretString::from(required(m, "password")?),
            })
        }
        Some("logout") => Ok(Action::Logout),
        Some("me") => Ok(Action::Me),
        Some("status") => Ok(Action::Status),
        Some("submit-business-info") => Ok(Action::SubmitBusinessInfo {
            file: step_file(sub_m("submit-business-info")?)?,
        }),
        Some("submit-compliance") => Ok(Action::SubmitCompliance {
            file: step_file(sub_m("submit-compliance")?)?,
        }),
        Some("submit-contact-person") => Ok(Action::SubmitContactPerson {
            file: step_file(sub_m("submit-contact-person")?)?,
        }),
        Some("complete") => Ok(Action::Complete),
        Some("balance") => Ok(Action::Balance),
        Some("usage") => Ok(Action::Usage),
        Some("topup") => {
            let m = sub_m("topup")?;
            Ok(Action::TopUp {
                amount: m
                    .get_one::<u64>("amount")
                    .copied()
                    .context("missing required argument: amount")?,
                callback_url: m.get_one::<String>("callback-url").map(String::to_string),
            })
        }
        Some("topup-verify") => {
            let m = sub_m("topup-verify")?;
            Ok(Action::TopUpVerify {
                reference: required(m, "reference")?,
                attempts: m.get_one::<u32>("attempts").copied().unwrap_or(20),
                delay_secs: m.get_one::<u64>("delay-secs").copied().unwrap_or(3),
            })
        }
        _ => Err(anyhow::anyhow!("missing subcommand")),
    }
}

fn step_file(m: &clap::ArgMatches) -> Result<PathBuf> {
    m.get_one::<PathBuf>("file")
        .cloned()
        .context("missing required argument: file")
}
