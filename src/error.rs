#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// No terminal-resize notification exists on this platform, or the
    /// notifier was disabled for this environment.
    PlatformUnsupported,
    /// The platform refused to install the handler.
    RegistrationDenied(String),
}

impl RegisterError {
    #[cfg(unix)]
    pub(crate) fn denied(err: impl std::fmt::Display) -> Self {
        RegisterError::RegistrationDenied(err.to_string())
    }
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::PlatformUnsupported => {
                write!(f, "terminal resize notifications are not supported here")
            }
            RegisterError::RegistrationDenied(msg) => {
                write!(f, "resize handler registration denied: {}", msg)
            }
        }
    }
}

impl std::error::Error for RegisterError {}
