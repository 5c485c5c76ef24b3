//! Streaming output accumulator.

use crate::channel::PhaseEvent;
use crate::domain::PhaseRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Appended,
    NotOutput,
    NoCurrentPhase,
    /// The event names a phase other than the current one.
    OtherPhase,
}

/// Appends output chunks to the current phase, in arrival order.
#[derive(Debug, Default)]
pub struct OutputAccumulator;

impl OutputAccumulator {
    pub fn accept(&self, current: Option<&mut PhaseRecord>, event: &PhaseEvent) -> ChunkOutcome {
        let Some(chunk) = event.output_chunk() else {
            return ChunkOutcome::NotOutput;
        };
        let Some(record) = current else {
            return ChunkOutcome::NoCurrentPhase;
        };
        if event
            .phase_number
            .is_some_and(|n| n != record.phase_number)
        {
            return ChunkOutcome::OtherPhase;
        }

        record.output.push_str(chunk);
        ChunkOutcome::Appended
    }
}
