//! Reads a rendered Markdown transcript back into a [`SessionRecord`].
//!
//! Only documents laid out by [`crate::render`] are understood. Anything
//! that does not fit that layout is rejected instead of being guessed at,
//! so an append never rewrites a document it could not read faithfully.

use crate::error::{FollowError, FollowResult};
use crate::message::{Message, Role};
use crate::render::{
    AI_HEADING, DATE_PREFIX, FEEDBACK_HEADING, NOT_AVAILABLE, RULE, SESSION_ID_PREFIX,
    TITLE_PREFIX, UNKNOWN_MODE, USER_HEADING,
};
use crate::session::{Feedback, SessionRecord};

/// Parses a transcript produced by [`crate::render`].
///
/// Placeholder header values (`Unknown`, `N/A`) come back as absent. Any
/// heading other than the user marker comes back as [`Role::Assistant`].
pub fn parse_transcript(markdown: &str) -> FollowResult<SessionRecord> {
    let rest = markdown
        .strip_prefix(TITLE_PREFIX)
        .ok_or_else(|| FollowError::Parse("missing session title".to_string()))?;

    let header_end = format!("\n\n{RULE}\n\n");
    let split = rest
        .find(&header_end)
        .ok_or_else(|| FollowError::Parse("missing header rule".to_string()))?;
    let (header, body) = (&rest[..split], &rest[split + header_end.len()..]);

    // Header values may themselves contain blank lines, so the fields are
    // located by their labels rather than by splitting on paragraphs.
    let date_marker = format!("\n\n{DATE_PREFIX}");
    let id_marker = format!("\n\n{SESSION_ID_PREFIX}");
    let date_at = header
        .find(&date_marker)
        .ok_or_else(|| FollowError::Parse("missing date line".to_string()))?;
    let id_at = header
        .rfind(&id_marker)
        .filter(|&idx| idx >= date_at + date_marker.len())
        .ok_or_else(|| FollowError::Parse("missing session id line".to_string()))?;

    let mut record = SessionRecord {
        mode: unless_placeholder(&header[..date_at], UNKNOWN_MODE),
        date: unless_placeholder(&header[date_at + date_marker.len()..id_at], NOT_AVAILABLE),
        session_id: unless_placeholder(&header[id_at + id_marker.len()..], NOT_AVAILABLE),
        ..SessionRecord::default()
    };

    let (messages, feedback) = split_feedback(body);
    record.messages = parse_messages(messages)?;
    record.feedback = feedback.map(parse_feedback).transpose()?;
    Ok(record)
}

fn unless_placeholder(value: &str, placeholder: &str) -> Option<String> {
    (value != placeholder).then(|| value.to_string())
}

fn split_feedback(body: &str) -> (&str, Option<&str>) {
    let marker = format!("{RULE}\n\n{FEEDBACK_HEADING}\n\n");
    match body.rfind(&marker) {
        Some(idx) if idx == 0 || body[..idx].ends_with("\n\n") => {
            (&body[..idx], Some(&body[idx + marker.len()..]))
        }
        _ => (body, None),
    }
}

/// Start offset, role and heading length of every message heading.
fn heading_starts(part: &str) -> Vec<(usize, Role, usize)> {
    let user = format!("{USER_HEADING}\n");
    let ai = format!("{AI_HEADING}\n");

    part.match_indices("### ")
        .map(|(idx, _)| idx)
        .filter(|&idx| idx == 0 || part[..idx].ends_with("\n\n"))
        .filter_map(|idx| {
            let tail = &part[idx..];
            if tail.starts_with(&user) {
                Some((idx, Role::User, user.len()))
            } else if tail.starts_with(&ai) {
                Some((idx, Role::Assistant, ai.len()))
            } else {
                None
            }
        })
        .collect()
}

fn parse_messages(part: &str) -> FollowResult<Vec<Message>> {
    let starts = heading_starts(part);

    let first = starts.first().map_or(part.len(), |(idx, _, _)| *idx);
    if !part[..first].trim().is_empty() {
        return Err(FollowError::Parse(
            "text before the first message heading".to_string(),
        ));
    }

    let mut messages = Vec::with_capacity(starts.len());
    for (i, (start, role, heading_len)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(part.len(), |(next, _, _)| *next);
        let block = &part[start + heading_len..end];
        let (content, timestamp) = split_timestamp(block);
        messages.push(Message {
            role: role.clone(),
            content: content.to_string(),
            timestamp: timestamp.map(str::to_string),
        });
    }
    Ok(messages)
}

/// Separates a trailing `*timestamp*` paragraph from the message content.
fn split_timestamp(block: &str) -> (&str, Option<&str>) {
    let body = block.strip_suffix("\n\n").unwrap_or(block);
    if let Some(pos) = body.rfind("\n\n*") {
        let tail = &body[pos + 2..];
        if tail.len() > 2 && tail.ends_with('*') && !tail.contains('\n') {
            return (&body[..pos], Some(&tail[1..tail.len() - 1]));
        }
    }
    (body, None)
}

/// Reads `**key:** value` paragraphs. A paragraph that is not an entry
/// continues the value of the entry before it.
fn parse_feedback(section: &str) -> FollowResult<Feedback> {
    let mut feedback = Feedback::new();
    let section = section.strip_suffix("\n\n").unwrap_or(section);
    if section.is_empty() {
        return Ok(feedback);
    }

    let mut current: Option<(String, String)> = None;
    for paragraph in section.split("\n\n") {
        let entry = paragraph
            .strip_prefix("**")
            .and_then(|p| p.split_once(":** "));
        if let Some((key, value)) = entry {
            if let Some((k, v)) = current.replace((key.to_string(), value.to_string())) {
                feedback.insert(k, v);
            }
        } else if let Some((_, value)) = current.as_mut() {
            value.push_str("\n\n");
            value.push_str(paragraph);
        } else {
            return Err(FollowError::Parse(format!(
                "malformed feedback entry: {paragraph}"
            )));
        }
    }
    if let Some((k, v)) = current {
        feedback.insert(k, v);
    }
    Ok(feedback)
}
