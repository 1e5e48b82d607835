//! Thompson construction of an NFA from a regex AST, using an arena of
//! states addressed by index so cycles (`*`, `+`) are representable without
//! reference counting, per spec.md §4.6.

use crate::error::SemanticError;
use std::fmt::Debug;

/// Index of a state inside an `NfaArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub usize);

/// What a labeled edge matches: a single character or a set of characters
/// (built from `_class`'s characters and `MINUS` ranges, or `.` for "any").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    Char(char),
    Any,
    Set(Vec<char>),
}

impl CharClass {
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Char(x) => *x == c,
            CharClass::Any => true,
            CharClass::Set(set) => set.contains(&c),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NfaState {
    pub epsilon_out: Vec<StateId>,
    pub labeled_out: Vec<(CharClass, StateId)>,
}

/// A process-wide (per-construction) owner of NFA states.
///
/// Supports allocation, explicit removal with swap-removal compaction (all
/// `StateId`s above the removed index shift down by one, and every edge
/// referencing a shifted or removed state is fixed up), and a sweep that
/// drops every state unreachable from a given root.
#[derive(Debug, Default)]
pub struct NfaArena {
    states: Vec<NfaState>,
}

impl NfaArena {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn alloc(&mut self) -> StateId {
        self.states.push(NfaState::default());
        StateId(self.states.len() - 1)
    }

    pub fn get(&self, id: StateId) -> &NfaState {
        &self.states[id.0]
    }

    pub fn get_mut(&mut self, id: StateId) -> &mut NfaState {
        &mut self.states[id.0]
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from.0].epsilon_out.push(to);
    }

    pub fn add_labeled(&mut self, from: StateId, label: CharClass, to: StateId) {
        self.states[from.0].labeled_out.push((label, to));
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Remove `id` via swap-removal, fixing up every reference to the
    /// swapped-in state (previously at the last index) and every reference
    /// to `id` itself (now dangling — callers must not remove a state still
    /// reachable from a root they care about).
    pub fn remove(&mut self, id: StateId) {
        let last = StateId(self.states.len() - 1);
        self.states.swap_remove(id.0);
        if id != last {
            for state in self.states.iter_mut() {
                retarget(&mut state.epsilon_out, last, id);
                for (_, target) in state.labeled_out.iter_mut() {
                    if *target == last {
                        *target = id;
                    }
                }
            }
        }
    }

    /// Drop every state not reachable from `root`, returning the new id for
    /// `root` (index 0 is not guaranteed to be `root` once swap-removal
    /// compaction runs, so the updated id is handed back).
    pub fn sweep(&mut self, root: StateId) -> StateId {
        let mut reachable = vec![false; self.states.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if reachable[id.0] {
                continue;
            }
            reachable[id.0] = true;
            for e in &self.states[id.0].epsilon_out {
                stack.push(*e);
            }
            for (_, t) in &self.states[id.0].labeled_out {
                stack.push(*t);
            }
        }

        let dead: Vec<StateId> = (0..self.states.len())
            .rev()
            .filter(|i| !reachable[*i])
            .map(StateId)
            .collect();

        let mut current_root = root;
        for id in dead {
            if id == current_root {
                continue;
            }
            let last = StateId(self.states.len() - 1);
            if current_root == last {
                current_root = id;
            }
            self.remove(id);
        }
        current_root
    }
}

fn retarget(edges: &mut [StateId], from: StateId, to: StateId) {
    for e in edges.iter_mut() {
        if *e == from {
            *e = to;
        }
    }
}

/// An `{entry, exit}` fragment of a partially built NFA, per Thompson
/// construction's composition rules (spec.md §4.6).
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub entry: StateId,
    pub exit: StateId,
}

pub fn char_fragment(arena: &mut NfaArena, c: char) -> Fragment {
    labeled_fragment(arena, CharClass::Char(c))
}

pub fn dot_fragment(arena: &mut NfaArena) -> Fragment {
    labeled_fragment(arena, CharClass::Any)
}

pub fn class_fragment(arena: &mut NfaArena, class: Vec<char>) -> Fragment {
    labeled_fragment(arena, CharClass::Set(class))
}

fn labeled_fragment(arena: &mut NfaArena, label: CharClass) -> Fragment {
    let entry = arena.alloc();
    let exit = arena.alloc();
    arena.add_labeled(entry, label, exit);
    Fragment { entry, exit }
}

pub fn empty_fragment(arena: &mut NfaArena) -> Fragment {
    let entry = arena.alloc();
    let exit = arena.alloc();
    arena.add_epsilon(entry, exit);
    Fragment { entry, exit }
}

pub fn concat_fragment(arena: &mut NfaArena, fragments: &[Fragment]) -> Fragment {
    assert!(!fragments.is_empty(), "CONCAT requires at least one child");
    for pair in fragments.windows(2) {
        arena.add_epsilon(pair[0].exit, pair[1].entry);
    }
    Fragment {
        entry: fragments[0].entry,
        exit: fragments[fragments.len() - 1].exit,
    }
}

pub fn or_fragment(arena: &mut NfaArena, fragments: &[Fragment]) -> Fragment {
    assert!(!fragments.is_empty(), "OR requires at least one child");
    let entry = arena.alloc();
    let exit = arena.alloc();
    for f in fragments {
        arena.add_epsilon(entry, f.entry);
        arena.add_epsilon(f.exit, exit);
    }
    Fragment { entry, exit }
}

pub fn star_fragment(arena: &mut NfaArena, inner: Fragment) -> Fragment {
    let entry = arena.alloc();
    let exit = arena.alloc();
    arena.add_epsilon(entry, inner.entry);
    arena.add_epsilon(inner.exit, exit);
    arena.add_epsilon(entry, exit);
    arena.add_epsilon(inner.exit, inner.entry);
    Fragment { entry, exit }
}

pub fn plus_fragment(arena: &mut NfaArena, inner: Fragment) -> Fragment {
    let entry = arena.alloc();
    let exit = arena.alloc();
    arena.add_epsilon(entry, inner.entry);
    arena.add_epsilon(inner.exit, exit);
    arena.add_epsilon(inner.exit, inner.entry);
    Fragment { entry, exit }
}

pub fn question_fragment(arena: &mut NfaArena, inner: Fragment) -> Fragment {
    let entry = arena.alloc();
    let exit = arena.alloc();
    arena.add_epsilon(entry, inner.entry);
    arena.add_epsilon(inner.exit, exit);
    arena.add_epsilon(entry, exit);
    Fragment { entry, exit }
}

/// Expand an inclusive `low..=high` range into its member characters,
/// reporting `SemanticError` (and skipping the range) if `low > high`, per
/// spec.md §4.6's `_class` rule.
pub fn expand_range(low: char, high: char) -> Result<Vec<char>, SemanticError> {
    if low > high {
        return Err(SemanticError::invalid_range(low, high));
    }
    Ok((low as u32..=high as u32).filter_map(char::from_u32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_chains_three_fragments() {
        let mut arena = NfaArena::new();
        let a = char_fragment(&mut arena, 'a');
        let b = char_fragment(&mut arena, 'b');
        let c = char_fragment(&mut arena, 'c');
        let whole = concat_fragment(&mut arena, &[a, b, c]);
        assert_eq!(whole.entry, a.entry);
        assert_eq!(whole.exit, c.exit);
        assert_eq!(arena.get(a.exit).epsilon_out, vec![b.entry]);
    }

    #[test]
    fn or_fanout_reaches_every_branch() {
        let mut arena = NfaArena::new();
        let a = char_fragment(&mut arena, 'a');
        let b = char_fragment(&mut arena, 'b');
        let whole = or_fragment(&mut arena, &[a, b]);
        assert_eq!(arena.get(whole.entry).epsilon_out.len(), 2);
        assert_eq!(arena.get(whole.exit).epsilon_out.len(), 0);
    }

    #[test]
    fn star_allows_skip_and_loop_back() {
        let mut arena = NfaArena::new();
        let a = char_fragment(&mut arena, 'a');
        let whole = star_fragment(&mut arena, a);
        assert!(arena.get(whole.entry).epsilon_out.contains(&whole.exit));
        assert!(arena.get(a.exit).epsilon_out.contains(&a.entry));
    }

    #[test]
    fn nfa_state_count_is_linear_in_ast_size() {
        // 3 CHAR nodes concatenated: each CHAR contributes 2 states, CONCAT
        // contributes none of its own.
        let mut arena = NfaArena::new();
        let frags: Vec<_> = "abc".chars().map(|c| char_fragment(&mut arena, c)).collect();
        concat_fragment(&mut arena, &frags);
        assert_eq!(arena.len(), 6);
    }

    #[test]
    fn sweep_drops_unreachable_states() {
        let mut arena = NfaArena::new();
        let a = char_fragment(&mut arena, 'a');
        let _unreachable = char_fragment(&mut arena, 'z');
        assert_eq!(arena.len(), 4);
        let root = arena.sweep(a.entry);
        assert_eq!(arena.len(), 2);
        assert!(arena.get(root).labeled_out.iter().any(|(l, _)| *l == CharClass::Char('a')));
    }

    #[test]
    fn invalid_range_is_reported() {
        assert!(expand_range('z', 'a').is_err());
        assert_eq!(expand_range('a', 'c').unwrap(), vec!['a', 'b', 'c']);
    }
}
