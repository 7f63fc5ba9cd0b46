pub mod portal;

use secrecy::SecretString;
use std::path::PathBuf;

/// Everything the binary can be asked to do.
#[derive(Debug)]
pub enum Action {
    Login {
        email: String,
        password: SecretString,
    },
    Logout,
    Me,
    Status,
    SubmitBusinessInfo {
        file: PathBuf,
    },
    SubmitCompliance {
        file: PathBuf,
    },
    SubmitContactPerson {
        file: PathBuf,
    },
    Complete,
    Balance,
    Usage,
    TopUp {
        amount: u64,
        callback_url: Option<String>,
    },
    TopUpVerify {
        reference: String,
        attempts: u32,
        delay_secs: u64,
    },
}
