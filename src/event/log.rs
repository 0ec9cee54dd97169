use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::command::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub description: String,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Event {
    /// Short relative time, e.g. "12s ago"
    pub fn age_label(&self) -> String {
        let secs = now_millis().saturating_sub(self.timestamp) / 1000;
        match secs {
            0 => "just now".to_string(),
            s if s < 60 => format!("{}s ago", s),
            s => format!("{}m ago", s / 60),
        }
    }
}

/// Ring buffer of recently dispatched commands
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(500)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            max_events: max_events.max(1),
        }
    }

    /// Log a command as an event
    pub fn log(&mut self, command: &Command) {
        if !command.is_loggable() {
            return;
        }
        self.record(command.description());
    }

    /// Log a free-form action (preset edits and other non-command actions)
    pub fn record(&mut self, description: String) {
        self.events.push_back(Event {
            id: self.next_id,
            timestamp: now_millis(),
            description,
        });
        self.next_id += 1;

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.back()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_events() {
        let mut log = EventLog::with_capacity(2);
        log.log(&Command::Play);
        log.log(&Command::Stop);
        log.log(&Command::ToggleMute(0));
        assert_eq!(log.events.len(), 2);
        assert_eq!(log.latest().unwrap().description, "Toggle mute track 1");
        assert_eq!(log.latest().unwrap().id, 3);
    }

    #[test]
    fn skips_unloggable_commands() {
        let mut log = EventLog::new();
        log.log(&Command::NudgeVolume { track: 0, delta: 0.05 });
        assert!(log.latest().is_none());
    }

    #[test]
    fn age_label_counts_seconds_then_minutes() {
        let mut event = Event {
            id: 1,
            timestamp: now_millis(),
            description: "Play".into(),
        };
        assert_eq!(event.age_label(), "just now");
        event.timestamp = now_millis() - 5_000;
        assert_eq!(event.age_label(), "5s ago");
        event.timestamp = now_millis() - 150_000;
        assert_eq!(event.age_label(), "2m ago");
    }

    #[test]
    fn ids_keep_counting_after_trim() {
        let mut log = EventLog::with_capacity(1);
        log.record("one".into());
        log.record("two".into());
        let latest = log.latest().unwrap();
        assert_eq!((latest.id, latest.description.as_str()), (2, "two"));
    }
}
