//! Private messages: sending, container listings, threads and two-sided
//! soft deletion.
//!
//! Each party owns one deletion flag. A message disappears from a party's
//! views once their flag is set and is erased from the table in the same
//! unit of work that sets the second flag.

use amity_shared::{AmityError, MessageContainer, PageRequest, PagedList};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{self, Message, MessageSummary, User};
use crate::paging::SqlPageSource;
use crate::photos::PhotoVisibility;
use crate::unit_of_work::UnitOfWork;
use crate::users;

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.sender_username, m.recipient_id, m.recipient_username,
     m.content, m.date_read, m.message_sent, m.sender_deleted, m.recipient_deleted";

const SUMMARY_COLUMNS: &str = "m.id, m.sender_id, m.sender_username, sp.url, m.recipient_id,
     m.recipient_username, rp.url, m.content, m.date_read, m.message_sent";

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeleteOutcome {
    /// The requester's flag was set; the other party still sees the message.
    Marked,
    /// Both flags are now set and the row is gone.
    Erased,
    /// The requester had already deleted their side; nothing changed.
    AlreadyDeleted,
}

/// `messages m` joined with each party's main photo under public visibility.
fn summary_from() -> String {
    let public = PhotoVisibility::Public;
    format!(
        "messages m
         LEFT JOIN photos sp ON sp.user_id = m.sender_id AND sp.is_main = 1 AND {}
         LEFT JOIN photos rp ON rp.user_id = m.recipient_id AND rp.is_main = 1 AND {}",
        public.predicate("sp"),
        public.predicate("rp"),
    )
}

/// One page of `username`'s messages in `container`, newest first.
pub fn list_for_user(
    conn: &Connection,
    username: &str,
    container: MessageContainer,
    request: PageRequest,
) -> Result<PagedList<MessageSummary>> {
    let who = || [Value::Text(username.to_string())];

    let source = SqlPageSource::new(conn, SUMMARY_COLUMNS, summary_from(), row_to_summary);
    let source = match container {
        MessageContainer::Inbox => source
            .and_where("m.recipient_username = ?", who())
            .and_where("m.recipient_deleted = 0", []),
        MessageContainer::Outbox => source
            .and_where("m.sender_username = ?", who())
            .and_where("m.sender_deleted = 0", []),
        MessageContainer::Unread => source
            .and_where("m.recipient_username = ?", who())
            .and_where("m.date_read IS NULL", [])
            .and_where("m.recipient_deleted = 0", []),
    }
    .order_by("m.message_sent DESC, m.rowid DESC");

    let page = PagedList::create(&source, request)?;
    tracing::debug!(
        username,
        %container,
        total = page.total_count,
        "listed messages"
    );
    Ok(page)
}

pub fn message_by_id(conn: &Connection, id: Uuid) -> Result<Option<Message>> {
    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1"),
            params![id.to_string()],
            row_to_message,
        )
        .optional()?;
    Ok(message)
}

/// Caller-facing shape of a single message, with both parties' main photos.
pub fn summary_by_id(conn: &Connection, id: Uuid) -> Result<Option<MessageSummary>> {
    let summary = conn
        .query_row(
            &format!("SELECT {SUMMARY_COLUMNS} FROM {} WHERE m.id = ?1", summary_from()),
            params![id.to_string()],
            row_to_summary,
        )
        .optional()?;
    Ok(summary)
}

impl Database {
    /// The conversation between `requester` and `other` as the requester
    /// sees it, oldest first.
    ///
    /// Reading a thread is what marks messages read: every returned message
    /// addressed to the requester that has no read timestamp is stamped with
    /// the current time, and that write is committed before the thread is
    /// returned. A commit failure fails the whole read.
    pub fn get_thread(&mut self, requester: &str, other: &str) -> Result<Vec<MessageSummary>> {
        let mut uow = self.unit_of_work()?;
        let mut thread = thread_for(uow.conn(), requester, other)?;

        let now = models::now();
        let mut stamped = 0;
        for message in thread
            .iter_mut()
            .filter(|m| m.date_read.is_none() && m.recipient_username.eq_ignore_ascii_case(requester))
        {
            stamped += uow.stage(
                "UPDATE messages SET date_read = ?1 WHERE id = ?2 AND date_read IS NULL",
                params![models::format_ts(&now), message.id.to_string()],
            )?;
            message.date_read = Some(now);
        }

        if stamped > 0 {
            if !uow.complete()? {
                return Err(AmityError::upstream("Failed to mark messages as read").into());
            }
            tracing::info!(requester, other, stamped, "thread messages marked read");
        }

        Ok(thread)
    }
}

fn thread_for(conn: &Connection, requester: &str, other: &str) -> Result<Vec<MessageSummary>> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM {}
         WHERE (m.sender_username = ?1 AND m.recipient_username = ?2 AND m.sender_deleted = 0)
            OR (m.sender_username = ?2 AND m.recipient_username = ?1 AND m.recipient_deleted = 0)
         ORDER BY m.message_sent ASC, m.rowid ASC",
        summary_from()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![requester, other], row_to_summary)?;

    let mut thread = Vec::new();
    for row in rows {
        thread.push(row?);
    }
    Ok(thread)
}

impl UnitOfWork<'_> {
    /// Stage a new message from `sender` to `recipient_username`.
    pub fn send_message(&mut self, sender: &User, recipient_username: &str, content: &str) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(AmityError::validation("message content is required").into());
        }
        if sender.username.eq_ignore_ascii_case(recipient_username) {
            return Err(AmityError::validation("You cannot send messages to yourself").into());
        }
        let recipient = users::user_by_username(self.conn(), recipient_username)?
            .ok_or_else(|| AmityError::validation(format!("recipient '{recipient_username}' does not exist")))?;

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            sender_username: sender.username.clone(),
            recipient_id: recipient.id,
            recipient_username: recipient.username,
            content: content.to_string(),
            date_read: None,
            message_sent: models::now(),
            sender_deleted: false,
            recipient_deleted: false,
        };

        self.stage(
            "INSERT INTO messages (id, sender_id, sender_username, recipient_id, recipient_username,
                                   content, date_read, message_sent, sender_deleted, recipient_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, 0, 0)",
            params![
                message.id.to_string(),
                message.sender_id.to_string(),
                message.sender_username,
                message.recipient_id.to_string(),
                message.recipient_username,
                message.content,
                models::format_ts(&message.message_sent),
            ],
        )?;

        tracing::info!(
            message_id = %message.id,
            sender = %message.sender_username,
            recipient = %message.recipient_username,
            "message sent"
        );
        Ok(message)
    }

    /// Delete `message_id` from `requester`'s side.
    pub fn delete_message(&mut self, message_id: Uuid, requester: &str) -> Result<DeleteOutcome> {
        let mut message = message_by_id(self.conn(), message_id)?
            .ok_or_else(|| AmityError::not_found(format!("message {message_id}")))?;

        let is_sender = message.sender_username.eq_ignore_ascii_case(requester);
        let is_recipient = message.recipient_username.eq_ignore_ascii_case(requester);
        if !is_sender && !is_recipient {
            return Err(AmityError::not_found(format!("message {message_id}")).into());
        }

        if (is_sender && message.sender_deleted) || (is_recipient && message.recipient_deleted) {
            return Ok(DeleteOutcome::AlreadyDeleted);
        }

        if is_sender {
            message.sender_deleted = true;
            self.stage(
                "UPDATE messages SET sender_deleted = 1 WHERE id = ?1",
                params![message_id.to_string()],
            )?;
        } else {
            message.recipient_deleted = true;
            self.stage(
                "UPDATE messages SET recipient_deleted = 1 WHERE id = ?1",
                params![message_id.to_string()],
            )?;
        }

        if message.sender_deleted && message.recipient_deleted {
            self.stage("DELETE FROM messages WHERE id = ?1", params![message_id.to_string()])?;
            tracing::info!(message_id = %message_id, "message erased by both parties");
            return Ok(DeleteOutcome::Erased);
        }

        tracing::debug!(message_id = %message_id, requester, "message deleted for one party");
        Ok(DeleteOutcome::Marked)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let recipient_str: String = row.get(3)?;
    let read_str: Option<String> = row.get(6)?;
    let sent_str: String = row.get(7)?;

    Ok(Message {
        id: models::parse_uuid(0, &id_str)?,
        sender_id: models::parse_uuid(1, &sender_str)?,
        sender_username: row.get(2)?,
        recipient_id: models::parse_uuid(3, &recipient_str)?,
        recipient_username: row.get(4)?,
        content: row.get(5)?,
        date_read: read_str.map(|s| models::parse_ts(6, &s)).transpose()?,
        message_sent: models::parse_ts(7, &sent_str)?,
        sender_deleted: row.get(8)?,
        recipient_deleted: row.get(9)?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageSummary> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let recipient_str: String = row.get(4)?;
    let read_str: Option<String> = row.get(8)?;
    let sent_str: String = row.get(9)?;

    Ok(MessageSummary {
        id: models::parse_uuid(0, &id_str)?,
        sender_id: models::parse_uuid(1, &sender_str)?,
        sender_username: row.get(2)?,
        sender_photo_url: row.get(3)?,
        recipient_id: models::parse_uuid(4, &recipient_str)?,
        recipient_username: row.get(5)?,
        recipient_photo_url: row.get(6)?,
        content: row.get(7)?,
        date_read: read_str.map(|s| models::parse_ts(8, &s)).transpose()?,
        message_sent: models::parse_ts(9, &sent_str)?,
    })
}
