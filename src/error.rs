use std::fmt;

#[derive(Debug)]
pub enum TypeflowError {
    Parse(String),
    Style(String),
    Shaping(String),
    Io(std::io::Error),
}

impl fmt::Display for TypeflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeflowError::Parse(message) => write!(f, "malformed length literal: {}", message),
            TypeflowError::Style(message) => write!(f, "style error: {}", message),
            TypeflowError::Shaping(message) => write!(f, "shaping error: {}", message),
            TypeflowError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for TypeflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TypeflowError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TypeflowError {
    fn from(value: std::io::Error) -> Self {
        TypeflowError::Io(value)
    }
}
