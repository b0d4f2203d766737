use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

pub trait EaselErrorExt {
    fn display(self);
    fn problem(self, why: String) -> Self;
}

impl<T> EaselErrorExt for Result<T, EaselError> {
    fn display(self) {
        if let Err(err) = self {
            err.display();
        }
    }

    fn problem(mut self, why: String) -> Self {
        if let Some(err) = self.as_mut().err() {
            err.why.push(why);
        }

        self
    }
}

impl EaselErrorExt for EaselError {
    fn display(self) {
        tracing::error!("{}", self.reasons());
    }

    fn problem(mut self, why: String) -> Self {
        self.why.push(why);
        self
    }
}

#[derive(Debug)]
pub struct EaselError {
    kind: ErrorKind,
    why: Vec<String>,
}

impl EaselError {
    pub fn because(kind: ErrorKind, reason: String) -> Self {
        EaselError {
            kind,
            why: vec![reason],
        }
    }

    pub fn new(kind: ErrorKind) -> Self {
        EaselError {
            kind,
            why: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Outermost context first, the underlying cause last.
    pub fn reasons(&self) -> String {
        let mut msg = self
            .why
            .iter()
            .rev()
            .fold(String::new(), |acc, why| format!("{acc}{why}: "));
        msg.push_str(&self.kind.to_string());
        msg
    }
}

impl Display for EaselError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.kind)
    }
}

impl Error for EaselError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ErrorKind::IoError(err) => Some(err),
            ErrorKind::SqlError(err) => Some(err),
            ErrorKind::JsonError(err) => Some(err),
            ErrorKind::ConfigError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    IoError(std::io::Error),
    SqlError(rusqlite::Error),
    JsonError(serde_json::Error),
    ConfigError(Box<dyn Error + Send + Sync>),
    MalformedTransform(String),
    UnknownElementType(String),
    InvalidInput(&'static str),
    InvalidState(&'static str),
    NoSuchNote(i64),
    NoSuchStroke,
}

impl From<std::io::Error> for EaselError {
    fn from(err: std::io::Error) -> Self {
        EaselError::new(ErrorKind::IoError(err))
    }
}

impl From<rusqlite::Error> for EaselError {
    fn from(err: rusqlite::Error) -> Self {
        EaselError::new(ErrorKind::SqlError(err))
    }
}

impl From<serde_json::Error> for EaselError {
    fn from(err: serde_json::Error) -> Self {
        EaselError::new(ErrorKind::JsonError(err))
    }
}

impl From<ron::Error> for EaselError {
    fn from(err: ron::Error) -> Self {
        EaselError::new(ErrorKind::ConfigError(Box::new(err)))
    }
}

impl From<ron::error::SpannedError> for EaselError {
    fn from(err: ron::error::SpannedError) -> Self {
        EaselError::new(ErrorKind::ConfigError(Box::new(err)))
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ErrorKind::IoError(err) => write!(f, "{err}"),
            ErrorKind::SqlError(err) => write!(f, "{err}"),
            ErrorKind::JsonError(err) => write!(f, "{err}"),
            ErrorKind::ConfigError(err) => write!(f, "{err}"),
            ErrorKind::MalformedTransform(text) => write!(f, "Malformed transform \"{text}\""),
            ErrorKind::UnknownElementType(ty) => write!(f, "Unknown element type {ty}"),
            ErrorKind::InvalidInput(what) => write!(f, "Invalid input: {what}"),
            ErrorKind::InvalidState(what) => write!(f, "Invalid input state: {what}"),
            ErrorKind::NoSuchNote(id) => write!(f, "No note with id {id}"),
            ErrorKind::NoSuchStroke => write!(f, "No such in-progress stroke"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reasons_read_outermost_first() {
        let err: Result<(), EaselError> = Err(EaselError::new(ErrorKind::NoSuchNote(4)));
        let err = err
            .problem(String::from("loading elements"))
            .problem(String::from("opening note"))
            .unwrap_err();

        assert_eq!(
            err.reasons(),
            "opening note: loading elements: No note with id 4"
        );
    }

    #[test]
    fn because_keeps_reason() {
        let err = EaselError::because(
            ErrorKind::InvalidInput("time went backwards"),
            String::from("adding input"),
        );
        assert!(matches!(err.kind(), ErrorKind::InvalidInput(_)));
        assert_eq!(err.reasons(), "adding input: Invalid input: time went backwards");
    }
}
