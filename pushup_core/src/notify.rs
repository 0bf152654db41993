//! Reminder notifications.

/// A reminder raised when the countdown reaches zero
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reminder {
    pub title: String,
    pub body: String,
    pub reps: u32,
}

impl Reminder {
    pub fn for_reps(reps: u32) -> Self {
        Self {
            title: "Pushup Time! 💪".to_string(),
            body: format!("Do {} pushups now!", reps),
            reps,
        }
    }
}

/// Shows a reminder and reports whether the user did the set.
///
/// `true` means "done", `false` means "skip".
pub trait ReminderSink {
    fn confirm(&mut self, reminder: &Reminder) -> bool;
}

/// Answers every reminder the same way
#[derive(Clone, Copy, Debug)]
pub struct FixedAnswer(pub bool);

impl ReminderSink for FixedAnswer {
    fn confirm(&mut self, reminder: &Reminder) -> bool {
        tracing::debug!("Answering {:?} with {}", reminder.title, self.0);
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_text() {
        let reminder = Reminder::for_reps(12);
        assert_eq!(reminder.title, "Pushup Time! 💪");
        assert_eq!(reminder.body, "Do 12 pushups now!");
        assert_eq!(reminder.reps, 12);
    }
}
