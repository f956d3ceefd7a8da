//! Shift-aware, round-robin, pause-aware operator selection (spec §4.G).
//! The engine itself is a pure function over already-fetched data — no
//! I/O — so it stays unit-testable without a database, following the
//! teacher's `hitl::assessor` precedent of keeping risk assessment a pure
//! function over passed-in inputs.

use std::collections::HashSet;

use ticketops_common::types::{AssignmentCounter, OperatorConfig, OperatorId};
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentBranch {
    Weekend,
    WeekendOutOfHours,
    TagAfternoon,
    TagDay,
    Schedule,
    FallbackAssignable,
    FallbackFirstConfigured,
}

#[derive(Debug, Clone, Copy)]
pub struct AssignmentDecision {
    pub operator_id: OperatorId,
    pub branch: AssignmentBranch,
}

/// Everything `get_next_assignee` needs, gathered by the caller (spec §9,
/// "Deps" style dependency injection instead of re-entering a global
/// context).
pub struct AssignmentInput<'a> {
    pub is_weekend: bool,
    pub in_finde_hours: bool,
    pub persona_guardia_finde: OperatorId,
    pub ticket_note: Option<&'a str>,
    pub afternoon_shift_ids: &'a [OperatorId],
    pub day_shift_ids: &'a [OperatorId],
    /// Operators whose `assignment`-type schedule currently contains `now`.
    pub schedule_eligible_ids: &'a [OperatorId],
    pub operators: &'a [OperatorConfig],
    pub counters: &'a [AssignmentCounter],
}

pub struct AssignmentEngine;

impl AssignmentEngine {
    #[instrument(skip(input))]
    pub fn get_next_assignee(input: &AssignmentInput<'_>) -> AssignmentDecision {
        // 1. Weekend branch: always the on-call guard, no counter tiebreak.
        if input.is_weekend {
            let branch = if input.in_finde_hours {
                AssignmentBranch::Weekend
            } else {
                warn!(operator_id = input.persona_guardia_finde, "weekend assignment out of FINDE hours");
                AssignmentBranch::WeekendOutOfHours
            };
            return AssignmentDecision {
                operator_id: input.persona_guardia_finde,
                branch,
            };
        }

        // 2. Tag branch (weekday only).
        if let Some(note) = input.ticket_note {
            if note.contains("[TT]") {
                if let Some(operator_id) = Self::smallest_counter_among(input, input.afternoon_shift_ids) {
                    return AssignmentDecision { operator_id, branch: AssignmentBranch::TagAfternoon };
                }
            } else if note.contains("[TD]") {
                if let Some(operator_id) = Self::smallest_counter_among(input, input.day_shift_ids) {
                    return AssignmentDecision { operator_id, branch: AssignmentBranch::TagDay };
                }
            }
        }

        // 3. Schedule branch (weekday, no tag, or tag candidates all ineligible).
        if let Some(operator_id) = Self::smallest_counter_among(input, input.schedule_eligible_ids) {
            return AssignmentDecision { operator_id, branch: AssignmentBranch::Schedule };
        }

        // 4. Fallback: all assignable operators.
        let assignable_ids: Vec<OperatorId> = input
            .operators
            .iter()
            .filter(|op| op.assignable())
            .map(|op| op.person_id)
            .collect();
        if let Some(operator_id) = Self::smallest_counter_among(input, &assignable_ids) {
            return AssignmentDecision { operator_id, branch: AssignmentBranch::FallbackAssignable };
        }

        // Everyone is paused: return the first configured person and warn.
        let first = input
            .operators
            .iter()
            .map(|op| op.person_id)
            .min()
            .unwrap_or(input.persona_guardia_finde);
        warn!(operator_id = first, "no assignable operators, falling back to first configured");
        AssignmentDecision { operator_id: first, branch: AssignmentBranch::FallbackFirstConfigured }
    }

    /// Among `candidate_ids`, filtered to eligible operators, the one with
    /// the smallest `ticket_count`; ties broken by smallest `person_id`.
    fn smallest_counter_among(input: &AssignmentInput<'_>, candidate_ids: &[OperatorId]) -> Option<OperatorId> {
        let eligible: HashSet<OperatorId> = input
            .operators
            .iter()
            .filter(|op| op.assignable())
            .map(|op| op.person_id)
            .collect();

        candidate_ids
            .iter()
            .copied()
            .filter(|id| eligible.contains(id))
            .min_by_key(|id| {
                let count = input
                    .counters
                    .iter()
                    .find(|c| c.person_id == *id)
                    .map(|c| c.ticket_count)
                    .unwrap_or(0);
                (count, *id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: OperatorId, assignable: bool) -> OperatorConfig {
        OperatorConfig {
            person_id: id,
            name: format!("op-{id}"),
            whatsapp_number: None,
            is_active: assignable,
            is_paused: !assignable,
            assignment_paused: false,
            notifications_enabled: true,
            paused_at: None,
            paused_reason: None,
        }
    }

    fn counter(id: OperatorId, count: i64) -> AssignmentCounter {
        AssignmentCounter { person_id: id, ticket_count: count, last_assigned: None }
    }

    #[test]
    fn weekend_branch_ignores_counters() {
        let operators = vec![op(10, true)];
        let counters = vec![];
        let input = AssignmentInput {
            is_weekend: true,
            in_finde_hours: true,
            persona_guardia_finde: 10,
            ticket_note: None,
            afternoon_shift_ids: &[],
            day_shift_ids: &[],
            schedule_eligible_ids: &[],
            operators: &operators,
            counters: &counters,
        };
        let decision = AssignmentEngine::get_next_assignee(&input);
        assert_eq!(decision.operator_id, 10);
        assert_eq!(decision.branch, AssignmentBranch::Weekend);
    }

    #[test]
    fn tag_branch_picks_smallest_counter() {
        let operators = vec![op(27, true), op(38, true)];
        let counters = vec![counter(27, 5), counter(38, 2)];
        let input = AssignmentInput {
            is_weekend: false,
            in_finde_hours: false,
            persona_guardia_finde: 10,
            ticket_note: Some("Urgente [TT] favor atender"),
            afternoon_shift_ids: &[27, 38],
            day_shift_ids: &[],
            schedule_eligible_ids: &[],
            operators: &operators,
            counters: &counters,
        };
        let decision = AssignmentEngine::get_next_assignee(&input);
        assert_eq!(decision.operator_id, 38);
        assert_eq!(decision.branch, AssignmentBranch::TagAfternoon);
    }

    #[test]
    fn falls_through_to_first_configured_when_all_paused() {
        let operators = vec![op(10, false), op(27, false)];
        let counters = vec![];
        let input = AssignmentInput {
            is_weekend: false,
            in_finde_hours: false,
            persona_guardia_finde: 99,
            ticket_note: None,
            afternoon_shift_ids: &[],
            day_shift_ids: &[],
            schedule_eligible_ids: &[],
            operators: &operators,
            counters: &counters,
        };
        let decision = AssignmentEngine::get_next_assignee(&input);
        assert_eq!(decision.operator_id, 10);
        assert_eq!(decision.branch, AssignmentBranch::FallbackFirstConfigured);
    }

    #[test]
    fn schedule_branch_respects_eligibility_filter() {
        let operators = vec![op(10, true), op(11, false)];
        let counters = vec![counter(10, 3), counter(11, 0)];
        let input = AssignmentInput {
            is_weekend: false,
            in_finde_hours: false,
            persona_guardia_finde: 99,
            ticket_note: None,
            afternoon_shift_ids: &[],
            day_shift_ids: &[],
            schedule_eligible_ids: &[10, 11],
            operators: &operators,
            counters: &counters,
        };
        let decision = AssignmentEngine::get_next_assignee(&input);
        // 11 has the lower counter but is paused/inactive; 10 must win.
        assert_eq!(decision.operator_id, 10);
        assert_eq!(decision.branch, AssignmentBranch::Schedule);
    }
}
