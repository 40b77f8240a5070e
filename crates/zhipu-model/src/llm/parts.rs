//! Incremental assembly of response parts from streamed deltas.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::assemble::generate_tool_call_id;
use super::types::{ModelResponsePart, TextPart, ToolCallArgs, ToolCallPart};

/// Vendor key used to correlate deltas belonging to the same part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "index", rename_all = "snake_case")]
pub enum Slot {
    /// All text content shares one slot
    Text,
    /// Tool call, keyed by the vendor-assigned index
    ToolCall(u32),
}

/// Incremental update produced while streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_kind", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta {
        /// Position of the part in the assembled response
        part_index: usize,
        slot: Slot,
        content: String,
    },
    ToolCallDelta {
        part_index: usize,
        slot: Slot,
        tool_name: Option<String>,
        args_delta: Option<String>,
        tool_call_id: Option<String>,
    },
}

impl StreamEvent {
    pub fn part_index(&self) -> usize {
        match self {
            StreamEvent::TextDelta { part_index, .. } => *part_index,
            StreamEvent::ToolCallDelta { part_index, .. } => *part_index,
        }
    }

    pub fn slot(&self) -> Slot {
        match self {
            StreamEvent::TextDelta { slot, .. } => *slot,
            StreamEvent::ToolCallDelta { slot, .. } => *slot,
        }
    }
}

#[derive(Debug, Clone)]
enum PartInProgress {
    Text(String),
    ToolCall {
        tool_name: Option<String>,
        args: String,
        tool_call_id: Option<String>,
        /// Used only if the vendor never sends an id
        fallback_id: String,
    },
}

/// Merges deltas into whole parts, keyed by slot, in first-seen order
#[derive(Debug, Default)]
pub struct PartsManager {
    parts: Vec<PartInProgress>,
    slots: HashMap<Slot, usize>,
}

impl PartsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to the text slot. Empty fragments produce no event.
    pub fn handle_text_delta(&mut self, content: String) -> Option<StreamEvent> {
        if content.is_empty() {
            return None;
        }

        let part_index = match self.slots.get(&Slot::Text) {
            Some(&i) => i,
            None => self.insert(Slot::Text, PartInProgress::Text(String::new())),
        };

        if let PartInProgress::Text(text) = &mut self.parts[part_index] {
            text.push_str(&content);
        }

        Some(StreamEvent::TextDelta {
            part_index,
            slot: Slot::Text,
            content,
        })
    }

    /// Merge one tool-call delta.
    ///
    /// Name: last non-empty value wins. Arguments: appended in arrival order.
    /// Call id: first non-empty value wins. A delta carrying none of the three
    /// is a no-op and produces no event.
    pub fn handle_tool_call_delta(
        &mut self,
        index: u32,
        tool_name: Option<String>,
        args_delta: Option<String>,
        tool_call_id: Option<String>,
    ) -> Option<StreamEvent> {
        let tool_name = tool_name.filter(|s| !s.is_empty());
        let args_delta = args_delta.filter(|s| !s.is_empty());
        let tool_call_id = tool_call_id.filter(|s| !s.is_empty());

        if tool_name.is_none() && args_delta.is_none() && tool_call_id.is_none() {
            return None;
        }

        let slot = Slot::ToolCall(index);
        let part_index = match self.slots.get(&slot) {
            Some(&i) => i,
            None => self.insert(
                slot,
                PartInProgress::ToolCall {
                    tool_name: None,
                    args: String::new(),
                    tool_call_id: None,
                    fallback_id: generate_tool_call_id(),
                },
            ),
        };

        if let PartInProgress::ToolCall {
            tool_name: name,
            args,
            tool_call_id: id,
            ..
        } = &mut self.parts[part_index]
        {
            if let Some(n) = &tool_name {
                *name = Some(n.clone());
            }
            if let Some(a) = &args_delta {
                args.push_str(a);
            }
            if id.is_none() {
                id.clone_from(&tool_call_id);
            }
        }

        Some(StreamEvent::ToolCallDelta {
            part_index,
            slot,
            tool_name,
            args_delta,
            tool_call_id,
        })
    }

    fn insert(&mut self, slot: Slot, part: PartInProgress) -> usize {
        let index = self.parts.len();
        self.parts.push(part);
        self.slots.insert(slot, index);
        index
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Snapshot of everything assembled so far
    pub fn parts(&self) -> Vec<ModelResponsePart> {
        self.parts
            .iter()
            .map(|p| match p {
                PartInProgress::Text(text) => ModelResponsePart::Text(TextPart {
                    content: text.clone(),
                }),
                PartInProgress::ToolCall {
                    tool_name,
                    args,
                    tool_call_id,
                    fallback_id,
                } => ModelResponsePart::ToolCall(ToolCallPart {
                    tool_name: tool_name.clone().unwrap_or_default(),
                    args: ToolCallArgs::Raw(args.clone()),
                    tool_call_id: tool_call_id.clone().unwrap_or_else(|| fallback_id.clone()),
                }),
            })
            .collect()
    }
}
