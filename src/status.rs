/// Holds the two user-facing message slots: one error, one success.
///
/// Each slot reflects only the most recent completed or failed operation.
/// Which slot an action clears before it runs is decided by the action
/// itself, not here.
#[derive(Clone, Debug, Default)]
pub struct StatusChannel {
    error: Option<String>,
    success: Option<String>,
}

impl StatusChannel {
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn set_success(&mut self, message: impl Into<String>) {
        self.success = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn clear_success(&mut self) {
        self.success = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }
}
