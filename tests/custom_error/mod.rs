use std::error::Error;

#[derive(Debug, PartialEq, Eq)]
pub struct CustomError {
    pub code: u16,
}

impl std::fmt::Display for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request failed with status {}", self.code)
    }
}

impl Error for CustomError {}
