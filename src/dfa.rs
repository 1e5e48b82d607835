//! Table-driven DFA: a character-indexed transition matrix built from a
//! declarative list of transitions and final states, run with longest-match
//! semantics. Ported from the C++ original's `compiler::dfa::build_dfa`.

use crate::error::GrammarError;

/// A non-ASCII or negative state id is encoded as `-1` meaning "no
/// transition", matching the original's `std::int16_t` sentinel.
pub const NO_TRANSITION: i32 = -1;

/// One declarative transition: from `from`, on every byte in `pattern`, go
/// to `to`. `default_to`, if given, fills the *entire* row for `from` before
/// any pattern is applied — so it only behaves as "every other byte" when
/// paired with a disjoint pattern from a different transition out of the
/// same state; pairing it with the same pattern it's meant to cover is a
/// no-op at best and silently swallows every other byte at worst. A simple
/// self-loop ("stay in this state on more of the same bytes") wants a plain
/// `new`, not `with_default`.
#[derive(Debug, Clone)]
pub struct TransitionInfo<'a> {
    pub from: usize,
    pub to: usize,
    pub pattern: &'a str,
    pub default_to: Option<usize>,
}

impl<'a> TransitionInfo<'a> {
    pub fn new(from: usize, to: usize, pattern: &'a str) -> Self {
        Self {
            from,
            to,
            pattern,
            default_to: None,
        }
    }

    pub fn with_default(from: usize, to: usize, pattern: &'a str, default_to: usize) -> Self {
        Self {
            from,
            to,
            pattern,
            default_to: Some(default_to),
        }
    }
}

/// `state` becomes a final (accepting) state yielding terminal `terminal`.
#[derive(Debug, Clone)]
pub struct FinalStateInfo<T> {
    pub state: usize,
    pub terminal: T,
}

impl<T> FinalStateInfo<T> {
    pub fn new(state: usize, terminal: T) -> Self {
        Self { state, terminal }
    }
}

/// Bytes the original's C++ build kills back to `NO_TRANSITION` regardless
/// of any explicit transition targeting them: non-printable control bytes,
/// excluding tab/newline/carriage-return which are meaningful whitespace.
fn is_dead_control_byte(b: u8) -> bool {
    (b < 32 && b != b'\t' && b != b'\n' && b != b'\r') || b == 127
}

/// The outcome of running the DFA from a given start position: the last
/// final state seen (and where), and where the run eventually stopped.
#[derive(Debug, Clone, Copy)]
pub struct DfaRun {
    pub final_state: i32,
    pub final_pos: usize,
    pub cur_state: i32,
    pub cur_pos: usize,
}

/// A built, immutable DFA: `num_states x 128` transition matrix plus a
/// final-state terminal table.
#[derive(Debug, Clone)]
pub struct Dfa<T> {
    transitions: Vec<[i32; 128]>,
    finals: Vec<Option<T>>,
}

impl<T: Copy> Dfa<T> {
    /// Construct and validate a DFA from declarative transitions and final
    /// states, per spec.md §4.1 steps 1-8.
    pub fn build(
        transitions: &[TransitionInfo],
        finals: &[FinalStateInfo<T>],
    ) -> Result<Self, GrammarError> {
        let num_states = 1 + transitions
            .iter()
            .flat_map(|t| {
                [
                    t.from,
                    t.to,
                    t.default_to.unwrap_or(0),
                ]
            })
            .max()
            .unwrap_or(0)
            .max(finals.iter().map(|f| f.state).max().unwrap_or(0));

        validate_transitions(transitions, num_states)?;
        validate_final_states(finals, num_states)?;

        let mut matrix = vec![[NO_TRANSITION; 128]; num_states];

        for t in transitions {
            if let Some(default_to) = t.default_to {
                matrix[t.from] = [default_to as i32; 128];
            }
        }
        for t in transitions {
            for byte in t.pattern.bytes() {
                if (byte as usize) < 128 {
                    matrix[t.from][byte as usize] = t.to as i32;
                }
            }
        }
        for row in matrix.iter_mut() {
            for (byte, slot) in row.iter_mut().enumerate() {
                if is_dead_control_byte(byte as u8) {
                    *slot = NO_TRANSITION;
                }
            }
        }

        let mut final_states = vec![None; num_states];
        for f in finals {
            final_states[f.state] = Some(f.terminal);
        }

        Ok(Self {
            transitions: matrix,
            finals: final_states,
        })
    }

    /// Run the DFA starting at `cur_position`, tracking the last final
    /// state visited, and stopping on the first dead transition or end of
    /// input.
    pub fn pass(&self, input: &[u8], cur_position: usize) -> DfaRun {
        let mut status = DfaRun {
            final_state: NO_TRANSITION,
            final_pos: usize::MAX,
            cur_state: 0,
            cur_pos: cur_position,
        };

        while status.cur_pos < input.len() {
            let symbol = input[status.cur_pos];
            if (symbol as usize) >= 128 {
                break;
            }
            let next = self.transitions[status.cur_state as usize][symbol as usize];
            if next == NO_TRANSITION {
                break;
            }
            if self.finals[next as usize].is_some() {
                status.final_state = next;
                status.final_pos = status.cur_pos;
            }
            status.cur_state = next;
            status.cur_pos += 1;
        }

        status
    }

    pub fn final_terminal(&self, state: i32) -> Option<T> {
        if state < 0 {
            None
        } else {
            self.finals[state as usize]
        }
    }

    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }
}

fn validate_transitions(transitions: &[TransitionInfo], num_states: usize) -> Result<(), GrammarError> {
    let mut default_for: Vec<Option<usize>> = vec![None; num_states];
    for t in transitions {
        match default_for[t.from] {
            None => default_for[t.from] = t.default_to,
            Some(existing) => {
                if t.default_to.is_some() && t.default_to != Some(existing) {
                    return Err(GrammarError::InvalidTransition(format!(
                        "multiple default targets found for state {}",
                        t.from
                    )));
                }
            }
        }
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_states];
    for t in transitions {
        adjacency[t.from].push(t.to);
        if let Some(d) = t.default_to {
            adjacency[t.from].push(d);
        }
    }

    let mut visited = vec![false; num_states];
    let mut stack = vec![0usize];
    let mut visited_count = 0;
    while let Some(node) = stack.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        visited_count += 1;
        stack.extend(adjacency[node].iter().copied());
    }

    if visited_count != num_states {
        let unreachable = visited
            .iter()
            .position(|seen| !seen)
            .expect("count mismatch implies an unvisited state exists");
        return Err(GrammarError::UnreachableState(unreachable));
    }

    Ok(())
}

fn validate_final_states<T>(
    finals: &[FinalStateInfo<T>],
    num_states: usize,
) -> Result<(), GrammarError> {
    let mut seen = vec![false; num_states];
    for f in finals {
        if f.state >= num_states {
            return Err(GrammarError::InvalidTransition(format!(
                "final-state entry for state {} is out of range",
                f.state
            )));
        }
        if seen[f.state] {
            return Err(GrammarError::DuplicateFinalState(f.state));
        }
        seen[f.state] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum T {
        Id,
        Num,
    }

    fn digits_dfa() -> Dfa<T> {
        Dfa::build(
            &[
                TransitionInfo::new(0, 1, "0123456789"),
                TransitionInfo::new(1, 1, "0123456789"),
            ],
            &[FinalStateInfo::new(1, T::Num)],
        )
        .unwrap()
    }

    #[test]
    fn longest_match_consumes_all_digits() {
        let dfa = digits_dfa();
        let run = dfa.pass(b"1234abc", 0);
        assert_eq!(run.final_pos, 3);
        assert_eq!(dfa.final_terminal(run.final_state), Some(T::Num));
    }

    #[test]
    fn no_transition_from_start_is_reported() {
        let dfa = digits_dfa();
        let run = dfa.pass(b"abc", 0);
        assert_eq!(run.cur_pos, 0);
        assert_eq!(run.final_state, NO_TRANSITION);
    }

    #[test]
    fn unreachable_state_is_rejected() {
        let err = Dfa::build(
            &[TransitionInfo::new(0, 1, "a"), TransitionInfo::new(2, 1, "b")],
            &[FinalStateInfo::new(1, T::Id)],
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::UnreachableState(_)));
    }

    #[test]
    fn duplicate_final_state_is_rejected() {
        let err = Dfa::build(
            &[TransitionInfo::new(0, 1, "a")],
            &[FinalStateInfo::new(1, T::Id), FinalStateInfo::new(1, T::Num)],
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateFinalState(1)));
    }

    #[test]
    fn conflicting_default_targets_are_rejected() {
        let err = Dfa::build(
            &[
                TransitionInfo::with_default(0, 1, "a", 2),
                TransitionInfo::with_default(0, 1, "b", 3),
            ],
            &[FinalStateInfo::new(1, T::Id)],
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidTransition(_)));
    }

    #[test]
    fn control_bytes_stay_dead_even_with_default() {
        let dfa = Dfa::build(
            &[TransitionInfo::with_default(0, 1, "", 1)],
            &[FinalStateInfo::new(1, T::Id)],
        )
        .unwrap();
        let run = dfa.pass(&[0x01], 0);
        assert_eq!(run.cur_pos, 0);
    }
}
