//! Chat line event extraction.
//!
//! Two shapes are recognized, case-insensitively and anywhere in the line:
//!
//! ```text
//! You have killed <N> <Subject>[ (hard mode)| (hm)| in normal mode| in hard mode].
//! A golden beam shines over one of your items, You receive: <count>x <Item>
//! ```
//!
//! The subject is the shortest text that is followed by either a mode clause
//! and `.` or a bare `.`. Mode clauses are tried in [`MODE_CLAUSES`] order at
//! each candidate position, so at most one clause ever applies. A line that
//! carries both a parenthetical and a trailing clause resolves through the
//! trailing one, with the parenthetical left inside the subject text.

use serde::{Deserialize, Serialize};

use crate::pets::is_pet_item;
use crate::types::Mode;

const KILL_PHRASE: &str = "you have killed ";
const GOLDEN_BEAM_PHRASE: &str = "a golden beam shines over one of your items, you receive: ";

// ─── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillCountEvent {
    pub kill_count: u64,
    /// Subject as written in the line; normalized downstream.
    pub subject_raw: String,
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAcquiredEvent {
    pub quantity: u64,
    /// Trimmed, lowercased.
    pub item_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatEvent {
    KillCount(KillCountEvent),
    ItemAcquired(ItemAcquiredEvent),
}

// ─── Mode clause rule table ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeMarker {
    /// `(hard mode)` / `(hm)` suffix.
    Parenthetical,
    /// `in normal mode` / `in hard mode` clause.
    Trailing,
}

#[derive(Debug, Clone, Copy)]
pub struct ModeClause {
    /// Lowercase, including the leading space.
    pub text: &'static str,
    pub marker: ModeMarker,
}

pub const MODE_CLAUSES: &[ModeClause] = &[
    ModeClause {
        text: " (hard mode)",
        marker: ModeMarker::Parenthetical,
    },
    ModeClause {
        text: " (hm)",
        marker: ModeMarker::Parenthetical,
    },
    ModeClause {
        text: " in normal mode",
        marker: ModeMarker::Trailing,
    },
    ModeClause {
        text: " in hard mode",
        marker: ModeMarker::Trailing,
    },
];

impl ModeClause {
    pub fn resolve(&self) -> Mode {
        match self.marker {
            ModeMarker::Parenthetical => Mode::Hard,
            ModeMarker::Trailing if self.text.contains("hard") => Mode::Hard,
            ModeMarker::Trailing => Mode::Normal,
        }
    }
}

// ─── Extraction ─────────────────────────────────────────────────────

/// Classify a chat line. Pure: the same text always yields the same result.
///
/// Golden beam lines naming an item outside the pet allow-list yield `None`.
pub fn extract(line: &str) -> Option<ChatEvent> {
    if let Some(kill) = parse_kill(line) {
        return Some(ChatEvent::KillCount(kill));
    }
    parse_golden_beam(line)
        .filter(|drop| is_pet_item(&drop.item_name))
        .map(ChatEvent::ItemAcquired)
}

/// Parse a kill count line.
pub fn parse_kill(line: &str) -> Option<KillCountEvent> {
    // ASCII lowercasing keeps byte offsets aligned with `line`.
    let lower = line.to_ascii_lowercase();
    lower
        .match_indices(KILL_PHRASE)
        .find_map(|(at, phrase)| parse_kill_at(line, &lower, at + phrase.len()))
}

fn parse_kill_at(line: &str, lower: &str, pos: usize) -> Option<KillCountEvent> {
    let (kill_count, mut cursor) = parse_count(line, pos)?;
    cursor = expect(lower, cursor, " ")?;

    let tail = &line[cursor..];
    let lower_tail = &lower[cursor..];
    for (idx, ch) in tail.char_indices() {
        if ch == '\n' || ch == '\r' {
            break;
        }
        let end = idx + ch.len_utf8();
        if let Some(mode) = mode_terminator(&lower_tail[end..]) {
            return Some(KillCountEvent {
                kill_count,
                subject_raw: tail[..end].to_string(),
                mode,
            });
        }
    }
    None
}

/// What may follow the subject: a mode clause then `.`, or `.` alone.
fn mode_terminator(rest: &str) -> Option<Mode> {
    for clause in MODE_CLAUSES {
        if let Some(after) = rest.strip_prefix(clause.text)
            && after.starts_with('.')
        {
            return Some(clause.resolve());
        }
    }
    rest.starts_with('.').then_some(Mode::None)
}

/// Parse a golden beam line regardless of the allow-list.
pub fn parse_golden_beam(line: &str) -> Option<ItemAcquiredEvent> {
    let lower = line.to_ascii_lowercase();
    lower
        .match_indices(GOLDEN_BEAM_PHRASE)
        .find_map(|(at, phrase)| parse_golden_beam_at(line, &lower, at + phrase.len()))
}

fn parse_golden_beam_at(line: &str, lower: &str, pos: usize) -> Option<ItemAcquiredEvent> {
    let (quantity, cursor) = parse_count(line, pos)?;
    let cursor = expect(lower, cursor, "x ")?;
    let item = line[cursor..].lines().next().unwrap_or_default().trim();
    if item.is_empty() {
        return None;
    }
    Some(ItemAcquiredEvent {
        quantity,
        item_name: item.to_lowercase(),
    })
}

/// One or more ASCII digits at `pos`. Returns the value and the offset past it.
fn parse_count(line: &str, pos: usize) -> Option<(u64, usize)> {
    let len = line[pos..].bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }
    let value = line[pos..pos + len].parse().ok()?;
    Some((value, pos + len))
}

fn expect(lower: &str, pos: usize, literal: &str) -> Option<usize> {
    lower[pos..].starts_with(literal).then_some(pos + literal.len())
}

// ─── Tests ──────────────────────────────────────────────────────────
