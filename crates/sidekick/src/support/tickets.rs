use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::NaiveDateTime;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SupportError;
use crate::clock;

static TICKET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TKT-\d{14}(?:-\d+)?$").unwrap());

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        })
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: NaiveDateTime,
    pub note: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub customer_email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticket {}:", self.id)?;
        writeln!(f, "  Subject: {}", self.subject)?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Priority: {}", self.priority)?;
        writeln!(f, "  Created: {}", self.created_at.format(TIMESTAMP_FORMAT))?;
        writeln!(f, "  Description: {}", self.description)?;
        if !self.notes.is_empty() {
            writeln!(f, "\n  Notes:")?;
            for note in &self.notes {
                writeln!(
                    f,
                    "    - {}: {}",
                    note.timestamp.format(TIMESTAMP_FORMAT),
                    note.note
                )?;
            }
        }
        Ok(())
    }
}

/// What an update changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub note_added: bool,
}

impl TicketUpdate {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && !self.note_added
    }

    /// "Ticket X updated: ..." or the no-op message.
    pub fn describe(&self, id: &str) -> String {
        if self.is_empty() {
            return format!("No updates made to ticket {id}");
        }
        let mut changes = Vec::with_capacity(2);
        if let Some(status) = self.status {
            changes.push(format!("status changed to {status}"));
        }
        if self.note_added {
            changes.push("note added".to_owned());
        }
        format!("Ticket {id} updated: {}", changes.join(", "))
    }
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Tickets stored as one pretty-printed JSON file each.
pub struct TicketStore {
    dir: PathBuf,
    clock: Clock,
}

impl TicketStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SupportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            clock: Arc::new(clock::now),
        })
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn create(
        &self,
        subject: &str,
        description: &str,
        priority: Priority,
        customer_email: Option<&str>,
    ) -> Result<Ticket, SupportError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(SupportError::EmptySubject);
        }
        let now = (self.clock)();
        let base = format!("TKT-{}", now.format("%Y%m%d%H%M%S"));

        let mut suffix = 1;
        loop {
            let id = if suffix == 1 {
                base.clone()
            } else {
                format!("{base}-{suffix}")
            };
            let file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.path_of(&id))
            {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let ticket = Ticket {
                id,
                subject: subject.to_owned(),
                description: description.to_owned(),
                priority,
                status: TicketStatus::Open,
                customer_email: customer_email
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_owned),
                created_at: now,
                updated_at: now,
                notes: Vec::new(),
            };
            write_ticket(file, &ticket)?;
            info!("created ticket {} ({priority})", ticket.id);
            return Ok(ticket);
        }
    }

    pub fn get(&self, id: &str) -> Result<Ticket, SupportError> {
        let path = self.existing_path(id)?;
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Sets the status and/or appends a note. Nothing is written when
    /// neither is given.
    pub fn update(
        &self,
        id: &str,
        status: Option<TicketStatus>,
        note: Option<&str>,
    ) -> Result<TicketUpdate, SupportError> {
        let mut ticket = self.get(id)?;
        let note = note.map(str::trim).filter(|note| !note.is_empty());
        let update = TicketUpdate {
            status,
            note_added: note.is_some(),
        };
        if update.is_empty() {
            return Ok(update);
        }

        let now = (self.clock)();
        if let Some(status) = status {
            ticket.status = status;
        }
        if let Some(note) = note {
            ticket.notes.push(Note {
                timestamp: now,
                note: note.to_owned(),
            });
        }
        ticket.updated_at = now;

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.path_of(&ticket.id))?;
        write_ticket(file, &ticket)?;
        debug!("updated ticket {id}");
        Ok(update)
    }

    fn path_of(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn existing_path(&self, id: &str) -> Result<PathBuf, SupportError> {
        let id = id.trim();
        if !TICKET_ID.is_match(id) {
            return Err(SupportError::InvalidTicketId(id.to_owned()));
        }
        let path = self.path_of(id);
        if !path.is_file() {
            return Err(SupportError::TicketNotFound(id.to_owned()));
        }
        Ok(path)
    }
}

fn write_ticket(mut file: fs::File, ticket: &Ticket) -> Result<(), SupportError> {
    let json = serde_json::to_vec_pretty(ticket)?;
    file.write_all(&json)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn fixed() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
    }

    fn store(dir: &Path) -> TicketStore {
        TicketStore::open(dir).unwrap().with_clock(fixed)
    }

    #[test]
    fn test_create_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let ticket = store
            .create("Login fails", "Cannot sign in", Priority::High, Some("a@b.c"))
            .unwrap();
        assert_eq!(ticket.id, "TKT-20250314092653");
        assert!(dir.path().join("TKT-20250314092653.json").is_file());

        let loaded = store.get(&ticket.id).unwrap();
        assert_eq!(loaded, ticket);
        assert_eq!(
            loaded.to_string(),
            "Ticket TKT-20250314092653:\n  Subject: Login fails\n  Status: open\n  \
             Priority: high\n  Created: 2025-03-14T09:26:53\n  Description: Cannot sign in\n"
        );
    }

    #[test]
    fn test_ids_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let first = store.create("a", "", Priority::Low, None).unwrap();
        let second = store.create("b", "", Priority::Low, None).unwrap();
        let third = store.create("c", "", Priority::Low, None).unwrap();
        assert_eq!(first.id, "TKT-20250314092653");
        assert_eq!(second.id, "TKT-20250314092653-2");
        assert_eq!(third.id, "TKT-20250314092653-3");
        assert_eq!(store.get(&second.id).unwrap().subject, "b");
    }

    #[test]
    fn test_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let id = store.create("Refund", "", Priority::Medium, None).unwrap().id;

        let update = store.update(&id, None, Some("  ")).unwrap();
        assert_eq!(update.describe(&id), format!("No updates made to ticket {id}"));

        let update = store
            .update(&id, Some(TicketStatus::InProgress), Some("Looking into it"))
            .unwrap();
        assert_eq!(
            update.describe(&id),
            format!("Ticket {id} updated: status changed to in_progress, note added")
        );
        let ticket = store.get(&id).unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert!(ticket.to_string().ends_with(
            "\n  Notes:\n    - 2025-03-14T09:26:53: Looking into it\n"
        ));
    }

    #[test]
    fn test_unknown_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.get("TKT-20000101000000"),
            Err(SupportError::TicketNotFound(_))
        ));
        assert!(matches!(
            store.get("../secrets"),
            Err(SupportError::InvalidTicketId(_))
        ));
        assert!(matches!(
            store.create(" ", "", Priority::Low, None),
            Err(SupportError::EmptySubject)
        ));
    }
}
