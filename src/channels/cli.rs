//! CLI channel: stdin/stdout REPL for local use.
//!
//! Walks the user through profile intake, then chats. Slash commands open and
//! dismiss the booking wizards and clear the history.

use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::conversation::{ActionKind, LogEvent, Role};
use crate::error::{ChannelError, IntakeError};
use crate::profile::ProfileForm;
use crate::render::{self, RenderedMessage};
use crate::session::{Session, SessionStore, WizardStatus};
use crate::wizard::{
    ContactPreference, IncomeBracket, InsuranceDetails, MedicalDetails, TimeSlot, Urgency,
};

const HELP: &str = "Commands:
  /book <id>    book the service with this id
  /apply <id>   apply for the policy with this id
  /cancel       dismiss the open form or search
  /clear        clear the chat history
  /help         show this help
  /quit         exit";

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Say(String),
    Book(String),
    Apply(String),
    Cancel,
    Clear,
    Help,
    Quit,
    Empty,
}

impl FromStr for CliCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let with_id = |make: fn(String) -> CliCommand| {
            if arg.is_empty() {
                Err(format!("/{name} needs an id"))
            } else {
                Ok(make(arg.to_string()))
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "book" => with_id(CliCommand::Book),
            "apply" => with_id(CliCommand::Apply),
            "cancel" => Ok(Self::Cancel),
            "clear" => Ok(Self::Clear),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command /{other}, try /help")),
        }
    }
}

/// Terminal front end over a [`SessionStore`].
pub struct CliChannel {
    store: Arc<SessionStore>,
}

impl CliChannel {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Run against the process stdin until `/quit` or EOF.
    pub async fn run(&self) -> Result<(), ChannelError> {
        self.run_with(BufReader::new(tokio::io::stdin())).await
    }

    pub async fn run_with<R>(&self, reader: R) -> Result<(), ChannelError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();

        eprintln!("Welcome to Arogya AI. Tell us a little about yourself first.\n");
        let form = intake(&mut lines).await?;
        let session = self.store.create(&form).await.map_err(|e| ChannelError::Closed {
            name: "cli".to_string(),
            reason: e.to_string(),
        })?;

        for message in session.engine().messages().await {
            print_message(&render::render(&message, &session.engine().catalog().await));
        }
        eprintln!("{HELP}\n");

        let printer = spawn_printer(session.clone());
        let result = self.chat(&mut lines, &session).await;

        // let pending replies land before tearing down
        session.settle().await;
        printer.abort();
        if let Err(e) = self.store.remove(session.id).await {
            debug!(error = %e, "Session already removed");
        }
        result
    }

    async fn chat<R>(&self, lines: &mut Lines<R>, session: &Session) -> Result<(), ChannelError>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            eprint!("> ");
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };

            let command = match line.parse::<CliCommand>() {
                Ok(command) => command,
                Err(message) => {
                    eprintln!("{message}");
                    continue;
                }
            };

            match command {
                CliCommand::Empty => {}
                CliCommand::Quit => return Ok(()),
                CliCommand::Help => eprintln!("{HELP}"),
                CliCommand::Clear => session.engine().clear().await,
                CliCommand::Cancel => match session.cancel_wizard().await {
                    Ok(kind) => eprintln!("Dismissed the {kind} form."),
                    Err(_) => session.engine().abandon_subflow().await,
                },
                CliCommand::Say(text) => {
                    session.engine().handle_utterance(&text).await;
                }
                CliCommand::Book(id) => {
                    if let Err(e) = session.open_medical(&id).await {
                        eprintln!("{e}");
                        continue;
                    }
                    let Some(details) = medical_form(lines).await? else {
                        continue;
                    };
                    match session.submit_medical(details).await {
                        Ok(status) => print_status(&status),
                        Err(e) => eprintln!("Booking failed: {e}"),
                    }
                }
                CliCommand::Apply(id) => {
                    if let Err(e) = session.open_insurance(&id).await {
                        eprintln!("{e}");
                        continue;
                    }
                    let Some(details) = insurance_form(lines, &session.profile().name).await?
                    else {
                        continue;
                    };
                    match session.submit_insurance(details).await {
                        Ok(status) => print_status(&status),
                        Err(e) => eprintln!("Application failed: {e}"),
                    }
                }
            }
        }
    }
}

fn closed() -> ChannelError {
    ChannelError::Closed {
        name: "cli".to_string(),
        reason: "stdin closed".to_string(),
    }
}

async fn ask<R>(lines: &mut Lines<R>, prompt: &str) -> Result<String, ChannelError>
where
    R: AsyncBufRead + Unpin,
{
    eprint!("{prompt}: ");
    let line = lines.next_line().await?.ok_or_else(closed)?;
    Ok(line.trim().to_string())
}

/// Ask until `parse` accepts the answer. A blank answer yields `default`, if any.
async fn ask_parsed<R, T>(
    lines: &mut Lines<R>,
    prompt: &str,
    default: Option<T>,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ChannelError>
where
    R: AsyncBufRead + Unpin,
    T: Clone,
{
    loop {
        let answer = ask(lines, prompt).await?;
        if answer.is_empty() {
            if let Some(default) = default.clone() {
                return Ok(default);
            }
        }
        match parse(&answer) {
            Ok(value) => return Ok(value),
            Err(message) => eprintln!("  {message}"),
        }
    }
}

fn non_blank(answer: &str) -> Option<String> {
    (!answer.is_empty()).then(|| answer.to_string())
}

/// The intake field an error is about.
fn intake_field(err: &IntakeError) -> &'static str {
    match err {
        IntakeError::MissingField(field) => *field,
        IntakeError::InvalidAge(_) => "age",
        IntakeError::InvalidGender(_) => "gender",
        IntakeError::InvalidEmail(_) => "email",
        IntakeError::InvalidPhone(_) => "phone",
    }
}

async fn intake<R>(lines: &mut Lines<R>) -> Result<ProfileForm, ChannelError>
where
    R: AsyncBufRead + Unpin,
{
    let mut form = ProfileForm::default();
    let fields: [(&'static str, &str); 5] = [
        ("name", "Name"),
        ("age", "Age"),
        ("gender", "Gender (male/female/other)"),
        ("phone", "Phone"),
        ("email", "Email"),
    ];

    for (field, prompt) in fields {
        loop {
            let answer = ask(lines, prompt).await?;
            match field {
                "name" => form.name = answer,
                "age" => form.age = answer,
                "gender" => form.gender = answer,
                "phone" => form.phone = answer,
                _ => form.email = answer,
            }
            // fields are validated in order, so an error on a later field means this one passed
            match form.validate() {
                Err(e) if intake_field(&e) == field => eprintln!("  {e}"),
                _ => break,
            }
        }
    }

    form.medical_history = non_blank(&ask(lines, "Medical history (optional)").await?);
    form.current_symptoms = non_blank(&ask(lines, "Current symptoms (optional)").await?);
    Ok(form)
}

/// Collect the appointment form. `None` if the user typed `/cancel`.
async fn medical_form<R>(lines: &mut Lines<R>) -> Result<Option<MedicalDetails>, ChannelError>
where
    R: AsyncBufRead + Unpin,
{
    eprintln!("Booking form (type /cancel at any prompt to stop).");
    let symptoms = ask(lines, "Symptoms").await?;
    if symptoms == "/cancel" {
        return Ok(None);
    }
    let urgency = ask_parsed(lines, "Urgency (normal/urgent/emergency)", Some(Urgency::Normal), |s| {
        s.parse::<Urgency>()
    })
    .await?;
    let preferred_date = ask_parsed(lines, "Preferred date (YYYY-MM-DD)", None, |s| {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
    })
    .await?;
    let slots = TimeSlot::ALL.map(|t| t.as_str()).join(", ");
    let preferred_time =
        ask_parsed(lines, &format!("Preferred time ({slots})"), None, |s| {
            s.parse::<TimeSlot>()
        })
        .await?;
    let emergency_contact = non_blank(&ask(lines, "Emergency contact (optional)").await?);
    let additional_notes = non_blank(&ask(lines, "Additional notes (optional)").await?);

    Ok(Some(MedicalDetails {
        symptoms,
        urgency,
        preferred_date,
        preferred_time,
        emergency_contact,
        additional_notes,
    }))
}

/// Collect the application form. `None` if the user typed `/cancel`.
async fn insurance_form<R>(
    lines: &mut Lines<R>,
    profile_name: &str,
) -> Result<Option<InsuranceDetails>, ChannelError>
where
    R: AsyncBufRead + Unpin,
{
    eprintln!("Application form (type /cancel at any prompt to stop).");
    let name = ask(lines, &format!("Full name [{profile_name}]")).await?;
    if name == "/cancel" {
        return Ok(None);
    }
    let full_name = non_blank(&name).unwrap_or_else(|| profile_name.to_string());
    let date_of_birth = ask_parsed(lines, "Date of birth (YYYY-MM-DD)", None, |s| {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
    })
    .await?;
    let occupation = ask(lines, "Occupation").await?;
    let brackets = IncomeBracket::ALL.map(|b| b.as_str()).join(", ");
    let annual_income =
        ask_parsed(lines, &format!("Annual income ({brackets})"), None, |s| {
            s.parse::<IncomeBracket>()
        })
        .await?;
    let existing_conditions = non_blank(&ask(lines, "Existing conditions (optional)").await?);
    let family_members = ask_parsed(lines, "Family members to cover [1]", Some(1u32), |s| {
        s.parse::<u32>().map_err(|e| e.to_string())
    })
    .await?;
    let preferred_coverage = non_blank(&ask(lines, "Preferred coverage (optional)").await?);
    let contact_preference = ask_parsed(
        lines,
        "Contact preference (email/phone/both)",
        Some(ContactPreference::Email),
        |s| s.parse::<ContactPreference>(),
    )
    .await?;

    Ok(Some(InsuranceDetails {
        full_name,
        date_of_birth,
        occupation,
        annual_income,
        existing_conditions,
        family_members,
        preferred_coverage,
        contact_preference,
    }))
}

fn print_message(message: &RenderedMessage) {
    let text = render::plain_text(message);
    match message.role {
        Role::User => return,
        Role::Ai => println!("\nArogya: {text}"),
        Role::System => println!("\nℹ️  {text}"),
    }
    if let Some(button) = &message.action {
        let command = match button.kind {
            ActionKind::BookService => "book",
            ActionKind::ChoosePolicy => "apply",
        };
        if button.available {
            println!("   [{}: /{} {}]", button.label, command, button.target_id);
        } else {
            println!("   [{} no longer available]", button.label);
        }
    }
}

fn print_status(status: &WizardStatus) {
    eprintln!("⏳ Processing {} for {}...", status.kind, status.item_name);
    for item in &status.checklist {
        eprintln!("   • {item}");
    }
    if let Some(step) = status.step {
        eprintln!("   {} ({}%)", step.label, step.progress);
    }
    if let Some(message) = &status.step_message {
        eprintln!("   {message}");
    }
}

/// Print log events as they arrive.
fn spawn_printer(session: Arc<Session>) -> JoinHandle<()> {
    let mut rx = session.engine().log().subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(LogEvent::Appended(message)) => {
                    let catalog = session.engine().catalog().await;
                    print_message(&render::render(&message, &catalog));
                }
                Ok(LogEvent::Cleared(messages)) => {
                    println!("\n── history cleared ──");
                    let catalog = session.engine().catalog().await;
                    for message in render::render_all(&messages, &catalog) {
                        print_message(&message);
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(missed = n, "Terminal lagged behind log"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::AdvisoryClient;
    use crate::config::Timings;
    use crate::error::LlmError;
    use crate::llm::LlmProvider;
    use async_trait::async_trait;

    struct EchoLlm;

    #[async_trait]
    impl LlmProvider for EchoLlm {
        fn model_name(&self) -> &str {
            "echo"
        }

        fn provider_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok("Rest well.".to_string())
        }
    }

    fn channel() -> (CliChannel, Arc<SessionStore>) {
        let advisory = AdvisoryClient::new(Arc::new(EchoLlm));
        let store = Arc::new(SessionStore::new(advisory, Timings::immediate()));
        (CliChannel::new(store.clone()), store)
    }

    #[test]
    fn parses_commands() {
        assert_eq!("hello".parse(), Ok(CliCommand::Say("hello".to_string())));
        assert_eq!("  ".parse(), Ok(CliCommand::Empty));
        assert_eq!("/book 3".parse(), Ok(CliCommand::Book("3".to_string())));
        assert_eq!("/APPLY  p-1 ".parse(), Ok(CliCommand::Apply("p-1".to_string())));
        assert_eq!("/quit".parse(), Ok(CliCommand::Quit));
        assert!("/book".parse::<CliCommand>().is_err());
        assert!("/dance".parse::<CliCommand>().is_err());
    }

    #[tokio::test]
    async fn intake_reasks_invalid_fields() {
        let input: &[u8] = b"Asha\nabc\n200\n34\nfemale\n12\n555 0101\nasha@example.com\n\nheadache\n";
        let mut lines = BufReader::new(input).lines();
        let form = intake(&mut lines).await.unwrap();

        assert_eq!(form.age, "34");
        assert_eq!(form.phone, "555 0101");
        assert_eq!(form.medical_history, None);
        assert_eq!(form.current_symptoms.as_deref(), Some("headache"));
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn eof_during_intake_closes_the_channel() {
        let (cli, store) = channel();
        let input: &[u8] = b"Asha\n";
        let err = cli.run_with(input).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed { .. }));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn full_run_chats_and_ends_the_session() {
        let (cli, store) = channel();
        let input: &[u8] =
            b"Asha\n34\nfemale\n5550101\nasha@example.com\n\n\nhow do I sleep better?\n/book 9\n/quit\n";
        cli.run_with(input).await.unwrap();
        assert_eq!(store.len().await, 0);
    }
}
