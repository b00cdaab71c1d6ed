use crate::channel::TranscriptEvent;
use serde::{Deserialize, Serialize};

/// A confirmed transcript segment. Finals never change once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSegment {
    pub slice_index: u64,
    pub text: String,
}

/// Reconciles the stream of partial and final transcript events into the
/// running live transcript.
///
/// The running transcript is the ordered concatenation of all final
/// segments received so far; at most one in-flight partial fragment is
/// displayed appended after it, and that fragment carries no durability.
/// Events are applied strictly in arrival order.
#[derive(Debug, Default, Clone)]
pub struct TranscriptReconciler {
    finals: Vec<FinalSegment>,
    pending_partial: Option<(u64, String)>,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &TranscriptEvent) {
        if event.is_final {
            self.finals.push(FinalSegment {
                slice_index: event.slice_index,
                text: event.text.clone(),
            });
            // A final for slice N supersedes any pending partial for
            // slice <= N. A partial for a later slice stays in flight.
            if let Some((pending_index, _)) = self.pending_partial {
                if pending_index <= event.slice_index {
                    self.pending_partial = None;
                }
            }
        } else {
            self.pending_partial = Some((event.slice_index, event.text.clone()));
        }
    }

    /// Confirmed text only.
    pub fn committed(&self) -> String {
        self.finals
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Confirmed text plus the in-flight partial, as displayed live.
    pub fn rendered(&self) -> String {
        let committed = self.committed();
        match &self.pending_partial {
            Some((_, partial)) if committed.is_empty() => partial.clone(),
            Some((_, partial)) => format!("{committed} {partial}"),
            None => committed,
        }
    }

    pub fn final_segments(&self) -> &[FinalSegment] {
        &self.finals
    }

    pub fn pending_partial(&self) -> Option<&str> {
        self.pending_partial
            .as_ref()
            .map(|(_, text)| text.as_str())
    }

    pub fn clear(&mut self) {
        self.finals.clear();
        self.pending_partial = None;
    }
}
