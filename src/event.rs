use crate::status::{ErrorCondition, NotificationType, PhaseType, Status, StatusType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    PageCompleted,
    Error(ErrorCondition),
    CoolingStarted,
    CoolingFinished,
    Ready,
    Printing,
}

impl StatusEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, StatusEvent::Error(_))
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusEvent::PageCompleted => write!(f, "Page completed"),
            StatusEvent::Error(condition) => write!(f, "{}", condition),
            StatusEvent::CoolingStarted => write!(f, "Cooling started"),
            StatusEvent::CoolingFinished => write!(f, "Cooling finished"),
            StatusEvent::Ready => write!(f, "Ready"),
            StatusEvent::Printing => write!(f, "Printing"),
        }
    }
}

/// How a page ended, as seen on the back-channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Completed,
    Ready,
    Failed(Vec<ErrorCondition>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Polling stops on a terminal status
    pub terminal: bool,
    pub events: Vec<StatusEvent>,
    outcome: Option<PageOutcome>,
}

impl Classification {
    fn terminal(outcome: PageOutcome, events: Vec<StatusEvent>) -> Self {
        Classification {
            terminal: true,
            events,
            outcome: Some(outcome),
        }
    }

    fn pending(events: Vec<StatusEvent>) -> Self {
        Classification {
            terminal: false,
            events,
            outcome: None,
        }
    }

    pub fn errors(&self) -> Vec<ErrorCondition> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StatusEvent::Error(condition) => Some(*condition),
                _ => None,
            })
            .collect()
    }

    /// The page outcome of a terminal classification.
    pub fn outcome(&self) -> Option<PageOutcome> {
        self.outcome.clone()
    }
}

/// Classify a status frame whose `print_head_mark` has already been checked.
///
/// An error status is terminal even when none of the known bits is set;
/// the outcome is then a failure with no listed condition.
pub fn classify(status: &Status) -> Classification {
    match status.status_type() {
        StatusType::Completed => {
            Classification::terminal(PageOutcome::Completed, vec![StatusEvent::PageCompleted])
        }
        StatusType::Error => {
            let conditions = status.error_conditions();
            let events = conditions.iter().copied().map(StatusEvent::Error).collect();
            Classification::terminal(PageOutcome::Failed(conditions), events)
        }
        StatusType::Notification => match status.notification_type() {
            NotificationType::CoolingStarted => {
                Classification::pending(vec![StatusEvent::CoolingStarted])
            }
            NotificationType::CoolingFinished => {
                Classification::pending(vec![StatusEvent::CoolingFinished])
            }
            _ => Classification::pending(vec![]),
        },
        StatusType::PhaseChange => match status.phase_type() {
            PhaseType::Waiting => {
                Classification::terminal(PageOutcome::Ready, vec![StatusEvent::Ready])
            }
            PhaseType::Printing => Classification::pending(vec![StatusEvent::Printing]),
            PhaseType::Unknown(_) => Classification::pending(vec![]),
        },
        StatusType::Reply | StatusType::Unknown(_) => Classification::pending(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::STATUS_SIZE;
    use crate::status::tests::ql570_reply;

    fn status_with(status_type: u8, f: impl FnOnce(&mut [u8; STATUS_SIZE])) -> Status {
        let mut data = ql570_reply();
        data[18] = status_type;
        f(&mut data);
        Status::new(data)
    }

    #[test]
    fn test_completed_is_terminal() {
        let c = classify(&status_with(0x01, |_| {}));
        assert!(c.terminal);
        assert_eq!(c.events, vec![StatusEvent::PageCompleted]);
        assert_eq!(c.outcome(), Some(PageOutcome::Completed));
    }

    #[test]
    fn test_error_reports_every_set_bit() {
        let c = classify(&status_with(0x02, |d| {
            d[8] = 0x01 | 0x80; // no media, fan malfunction
        }));
        assert!(c.terminal);
        assert_eq!(
            c.events,
            vec![
                StatusEvent::Error(ErrorCondition::NoMedia),
                StatusEvent::Error(ErrorCondition::FanMalfunction),
            ]
        );
        assert_eq!(
            c.outcome(),
            Some(PageOutcome::Failed(vec![
                ErrorCondition::NoMedia,
                ErrorCondition::FanMalfunction,
            ]))
        );
    }

    #[test]
    fn test_error_across_both_bitsets() {
        let c = classify(&status_with(0x02, |d| {
            d[8] = 0x04;
            d[9] = 0x01 | 0x04 | 0x10;
        }));
        assert_eq!(
            c.errors(),
            vec![
                ErrorCondition::CutterJam,
                ErrorCondition::WrongMedia,
                ErrorCondition::TransmissionError,
                ErrorCondition::CoverOpen,
            ]
        );
    }

    #[test]
    fn test_error_without_known_bits_still_fails() {
        let c = classify(&status_with(0x02, |_| {}));
        assert!(c.terminal);
        assert_eq!(c.outcome(), Some(PageOutcome::Failed(vec![])));
    }

    #[test]
    fn test_notifications_keep_polling() {
        let started = classify(&status_with(0x05, |d| d[22] = 0x03));
        assert!(!started.terminal);
        assert_eq!(started.events, vec![StatusEvent::CoolingStarted]);

        let finished = classify(&status_with(0x05, |d| d[22] = 0x04));
        assert!(!finished.terminal);
        assert_eq!(finished.events, vec![StatusEvent::CoolingFinished]);

        let other = classify(&status_with(0x05, |d| d[22] = 0x00));
        assert!(!other.terminal);
        assert!(other.events.is_empty());
    }

    #[test]
    fn test_phase_change() {
        let printing = classify(&status_with(0x06, |d| d[19] = 0x01));
        assert!(!printing.terminal);
        assert_eq!(printing.events, vec![StatusEvent::Printing]);
        assert_eq!(printing.outcome(), None);

        let waiting = classify(&status_with(0x06, |d| d[19] = 0x00));
        assert!(waiting.terminal);
        assert_eq!(waiting.outcome(), Some(PageOutcome::Ready));
    }

    #[test]
    fn test_reply_is_silent() {
        let c = classify(&status_with(0x00, |d| d[8] = 0x01));
        assert!(!c.terminal);
        assert!(c.events.is_empty());
    }
}
