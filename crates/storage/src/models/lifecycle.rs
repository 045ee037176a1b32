use crate::error::{Result, StorageError};

/// A status field whose legal moves are an explicit transition table.
pub trait Lifecycle: Copy + PartialEq + Sized + 'static {
    /// Human name of the field, used in rejection messages.
    const KIND: &'static str;

    fn as_str(&self) -> &'static str;

    fn valid_transitions(&self) -> &'static [Self];

    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Validates `self -> next` against the table.
    fn transition_to(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            return Ok(next);
        }

        let reason = if self.is_terminal() {
            format!("'{}' is a terminal state", self.as_str())
        } else {
            let targets: Vec<&str> = self.valid_transitions().iter().map(|s| s.as_str()).collect();
            format!("valid targets: {}", targets.join(", "))
        };

        Err(StorageError::Validation(format!(
            "invalid {} transition '{}' -> '{}' ({})",
            Self::KIND,
            self.as_str(),
            next.as_str(),
            reason
        )))
    }
}
