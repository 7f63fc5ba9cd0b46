use crate::api::ApiClient;
use crate::auth::Auth;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::session::{FileSessionStore, Portal, SessionStore};
use crate::verification::{
    extract_record,
    status::StatusCache,
    submission::{
        BusinessInfo, ComplianceAnswers, ContactPerson, StepInput, Submission, SubmissionGate,
        SubmissionState,
    },
    VerificationRecord,
};
use crate::wallet::{
    fetch_balance,
    topup::{self, PollPolicy, TopUpOutcome},
    usage::fetch_usage,
};
use anyhow::{bail, Context, Result};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct PortalContext {
    client: Arc<ApiClient>,
    auth: Auth,
    portal: Portal,
}

impl PortalContext {
    fn new(globals: &GlobalArgs) -> Result<Self> {
        let store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::open(globals.session_file.clone()));
        let client = Arc::new(ApiClient::new(&globals.api_url, globals.portal, store.clone())?);
        let auth = Auth::new(client.clone(), store, globals.portal);

        Ok(Self {
            client,
            auth,
            portal: globals.portal,
        })
    }

    fn route(&self, suffix: &str) -> String {
        match self.portal {
            Portal::Customer => format!("/customer/{suffix}"),
            Portal::Admin => format!("/admin/{suffix}"),
        }
    }

    async fn current_record(&self) -> Result<VerificationRecord> {
        let value = self
            .client
            .get(&self.client.prefixed("/verification/status"))
            .await?;
        Ok(extract_record(&value))
    }

    async fn resume_submission(&self, state: SubmissionState) -> Result<Submission> {
        let record = self.current_record().await?;
        match Submission::resume_at(self.client.clone(), &record, state) {
            SubmissionGate::Open(submission) => Ok(submission),
            SubmissionGate::ReadOnly(record) => bail!(
                "Verification is already in progress or decided (status: {:?})",
                record.status
            ),
        }
    }
}

fn read_step_file<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", file.display()))
}

/// Handle the requested portal action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let context = PortalContext::new(globals)?;

    match action {
        Action::Login { email, password } => {
            let outcome = context.auth.login(&email, password.expose_secret()).await;
            if !outcome.ok {
                bail!(outcome
                    .message
                    .unwrap_or_else(|| "Login failed".to_string()));
            }
            println!("Signed in to the {:?} portal", context.portal);
        }
        Action::Logout => {
            context.auth.logout();
            println!("Signed out");
        }
        Action::Me => match context.auth.load_me().await {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => bail!("No active session, sign in first"),
        },
        Action::Status => {
            context.client.set_current_path(&context.route("verification"));
            let cache = StatusCache::new();
            cache.refresh(&context.client).await;
            if let Some(error) = cache.error() {
                bail!(error);
            }
            let record = cache.record().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Action::SubmitBusinessInfo { file } => {
            context.client.set_current_path(&context.route("verification"));
            let draft: BusinessInfo = read_step_file(&file)?;
            let record = context.current_record().await?;
            let mut submission = match Submission::begin(context.client.clone(), &record) {
                SubmissionGate::Open(submission) => submission,
                SubmissionGate::ReadOnly(record) => bail!(
                    "Verification is already in progress or decided (status: {:?})",
                    record.status
                ),
            };
            submission.submit(StepInput::BusinessInfo(draft)).await?;
            println!("Business information accepted, next: compliance answers");
        }
        Action::SubmitCompliance { file } => {
            context.client.set_current_path(&context.route("verification"));
            let draft: ComplianceAnswers = read_step_file(&file)?;
            let mut submission = context.resume_submission(SubmissionState::Compliance).await?;
            submission.submit(StepInput::Compliance(draft)).await?;
            println!("Compliance answers accepted, next: contact person");
        }
        Action::SubmitContactPerson { file } => {
            context.client.set_current_path(&context.route("verification"));
            let draft: ContactPerson = read_step_file(&file)?;
            let mut submission = context
                .resume_submission(SubmissionState::ContactPerson)
                .await?;
            submission.submit(StepInput::ContactPerson(draft)).await?;
            println!("Contact person accepted, next: review and complete");
        }
        Action::Complete => {
            context.client.set_current_path(&context.route("verification"));
            let mut submission = context.resume_submission(SubmissionState::Review).await?;
            submission.submit(StepInput::Complete).await?;

            // The resulting status is server-derived; show the fresh one.
            let record = context.current_record().await.unwrap_or_default();
            println!(
                "Submission complete, current status: {:?}",
                record.status
            );
        }
        Action::Balance => {
            context.client.set_current_path(&context.route("wallet"));
            match fetch_balance(&context.client).await? {
                Some(amount) => println!("Wallet balance: {}", amount.formatted),
                None => println!("No balance available"),
            }
        }
        Action::Usage => {
            context.client.set_current_path(&context.route("usage"));
            match fetch_usage(&context.client).await? {
                Some(usage) => println!("{}", serde_json::to_string_pretty(&usage)?),
                None => println!("No usage statistics available"),
            }
        }
        Action::TopUp {
            amount,
            callback_url,
        } => {
            context.client.set_current_path(&context.route("wallet"));
            let session = topup::initiate(&context.client, amount, callback_url.as_deref())
                .await
                .map_err(|err| anyhow::anyhow!(err.to_string()))?;

            println!("Top-up of {} initiated", session.amount.formatted);
            println!("Complete payment at: {}", session.payment_url);
            println!(
                "Afterwards run: konfirmi topup-verify {}",
                session.reference
            );
        }
        Action::TopUpVerify {
            reference,
            attempts,
            delay_secs,
        } => {
            let policy = PollPolicy {
                max_attempts: attempts,
                delay: Duration::from_secs(delay_secs),
            };

            // The argument may be the bare reference or the full callback URL.
            let outcome = if reference.contains("://") {
                topup::resolve_callback(&context.client, &reference, policy).await?
            } else {
                topup::confirm(&context.client, &reference, policy).await?
            };

            match outcome {
                TopUpOutcome::Success {
                    reference,
                    amount_formatted,
                } => println!("Top-up confirmed: {amount_formatted} credited ({reference})"),
                TopUpOutcome::Failed { message } => {
                    bail!("Payment failed: {message}. Retry from the wallet or return to the dashboard.")
                }
                TopUpOutcome::TimedOut { attempts } => {
                    bail!("Payment still pending after {attempts} checks, check the wallet later")
                }
            }
        }
    }

    Ok(())
}
