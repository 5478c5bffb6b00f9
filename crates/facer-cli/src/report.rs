//! User-facing status lines for each workflow outcome.

use colored::Colorize;
use facer_core::{BatchReport, CollectionId, EnrollOutcome, RecognizeOutcome, SetupEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tone: Tone,
    pub text: String,
}

impl Message {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }

    pub fn print(&self) {
        let line = match self.tone {
            Tone::Info => self.text.blue(),
            Tone::Success => self.text.green(),
            Tone::Warning => self.text.yellow(),
            Tone::Failure => self.text.red(),
        };
        println!("{line}");
    }
}

pub fn setup_event(event: &SetupEvent<'_>) -> Message {
    match event {
        SetupEvent::TableCreated(collection) => {
            Message::new(Tone::Info, format!("DynamoDB table {collection} created."))
        }
        SetupEvent::TableNotCreated { error, .. } => Message::new(
            Tone::Warning,
            format!("Sorry, something went wrong: {error}. Try again or see an admin for help."),
        ),
        SetupEvent::TableNotReady { collection, error } => Message::new(
            Tone::Warning,
            format!("DynamoDB table {collection} was created but is not ready yet: {error}."),
        ),
        SetupEvent::CollectionCreated(collection) => {
            Message::new(Tone::Info, format!("Collection {collection} created."))
        }
        SetupEvent::Working { file } => Message::new(Tone::Info, format!("Working on {file}")),
        SetupEvent::Enrolled(outcome) => enrolled(outcome),
        SetupEvent::FileFailed { file, error } => {
            Message::new(Tone::Failure, format!("Could not add {file}: {error}"))
        }
    }
}

pub fn enrolled(outcome: &EnrollOutcome) -> Message {
    match outcome {
        EnrollOutcome::Enrolled(entry) => Message::new(
            Tone::Info,
            format!("All done. {} has been successfully added.", entry.name),
        ),
        EnrollOutcome::NoFaceDetected { name } => Message::new(
            Tone::Warning,
            format!(
                "Sorry, something went wrong while adding {name}. Try again or see an admin for help."
            ),
        ),
    }
}

pub fn recognized(outcome: &RecognizeOutcome, collection: &CollectionId) -> Message {
    match outcome {
        RecognizeOutcome::Recognized { entry, .. } => Message::new(
            Tone::Success,
            format!("Welcome {}! You can now proceed.", entry.name),
        ),
        RecognizeOutcome::UnknownIdentity { face_id, .. } => Message::new(
            Tone::Warning,
            format!(
                "Your face matched {face_id} in {collection}, but no name is on record. See an admin for help."
            ),
        ),
        RecognizeOutcome::NotRecognized => Message::new(
            Tone::Warning,
            "Sorry, we couldn't recognize you. Try again or see an admin for help.",
        ),
    }
}

/// Closing line for a keep-going batch; `None` when nothing failed.
pub fn batch_summary(report: &BatchReport) -> Option<Message> {
    if report.failed.is_empty() {
        return None;
    }
    Some(Message::new(
        Tone::Warning,
        format!(
            "{} added, {} without a face, {} failed.",
            report.enrolled.len(),
            report.no_face.len(),
            report.failed.len()
        ),
    ))
}
