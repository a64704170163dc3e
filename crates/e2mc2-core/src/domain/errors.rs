use std::error::Error;
use std::fmt::{Display, Formatter};

pub type E2mc2Result<T> = Result<T, E2mc2Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum E2mc2ErrorCategory {
    Format,
    MissingData,
    Parse,
    MissingOutput,
    InputValidation,
    IoSystem,
    Computation,
}

impl E2mc2ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidation => 2,
            Self::Format => 3,
            Self::MissingData => 4,
            Self::Parse => 5,
            Self::MissingOutput => 6,
            Self::IoSystem => 7,
            Self::Computation => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Format => "FormatError",
            Self::MissingData => "MissingDataError",
            Self::Parse => "ParseError",
            Self::MissingOutput => "MissingOutputError",
            Self::InputValidation => "InputValidationError",
            Self::IoSystem => "IoSystemError",
            Self::Computation => "ComputationError",
        }
    }
}

impl Display for E2mc2ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct E2mc2Error {
    category: E2mc2ErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl E2mc2Error {
    pub fn new(
        category: E2mc2ErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::Format, placeholder, message)
    }

    pub fn missing_data(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::MissingData, placeholder, message)
    }

    pub fn parse(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::Parse, placeholder, message)
    }

    pub fn missing_output(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::MissingOutput, placeholder, message)
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::InputValidation, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::IoSystem, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(E2mc2ErrorCategory::Computation, placeholder, message)
    }

    pub const fn category(&self) -> E2mc2ErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for E2mc2Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for E2mc2Error {}

#[cfg(test)]
mod tests {
    use super::{E2mc2Error, E2mc2ErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (E2mc2ErrorCategory::InputValidation, 2, "InputValidationError"),
            (E2mc2ErrorCategory::Format, 3, "FormatError"),
            (E2mc2ErrorCategory::MissingData, 4, "MissingDataError"),
            (E2mc2ErrorCategory::Parse, 5, "ParseError"),
            (E2mc2ErrorCategory::MissingOutput, 6, "MissingOutputError"),
            (E2mc2ErrorCategory::IoSystem, 7, "IoSystemError"),
            (E2mc2ErrorCategory::Computation, 8, "ComputationError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), name);
        }
    }

    #[test]
    fn error_renders_diagnostic_lines() {
        let error = E2mc2Error::parse("PARSE.ECI_VALUE", "invalid ECI value 'abc' at line 3");

        assert_eq!(error.exit_code(), 5);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [PARSE.ECI_VALUE] invalid ECI value 'abc' at line 3"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 5");
        assert_eq!(
            error.to_string(),
            "ParseError [PARSE.ECI_VALUE] invalid ECI value 'abc' at line 3"
        );
    }
}
