//! Arena of CTE scopes.
//!
//! Each `WITH` clause pushes one frame whose parent is the enclosing frame.
//! Frames stay in the arena after they are popped; only the current pointer
//! moves, so frame ids remain valid for the whole expansion.

use crate::ast::{Ident, Query, Span};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

/// One CTE declared by a `WITH` clause, already expanded.
#[derive(Debug, Clone)]
pub struct CteBinding {
    pub name: SmolStr,
    /// The defining query with every CTE reference inlined and, when its
    /// arity is known, output columns renamed to the declared aliases.
    pub body: Query,
    /// Declared aliases that could not be applied because the body projects
    /// a wildcard; they travel with each reference instead.
    pub carried_columns: Vec<Ident>,
    pub declared_at: Span,
}

#[derive(Debug, Clone)]
struct Frame {
    parent: Option<FrameId>,
    /// Number of frames on the stack once this one is pushed.
    level: usize,
    bindings: Vec<CteBinding>,
}

#[derive(Debug, Clone, Default)]
pub struct CteScopes {
    frames: Vec<Frame>,
    current: Option<FrameId>,
}

impl CteScopes {
    pub fn push(&mut self, bindings: Vec<CteBinding>) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            parent: self.current,
            level: self.depth() + 1,
            bindings,
        });
        self.current = Some(id);
        id
    }

    pub fn pop(&mut self) {
        if let Some(FrameId(idx)) = self.current {
            self.current = self.frames[idx].parent;
        }
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.current.map_or(0, |FrameId(idx)| self.frames[idx].level)
    }

    /// Finds the innermost visible binding for `name` and the stack level of
    /// the frame that declared it.
    pub fn lookup(&self, name: &str) -> Option<(&CteBinding, usize)> {
        let mut cursor = self.current;
        while let Some(FrameId(idx)) = cursor {
            let frame = &self.frames[idx];
            if let Some(binding) = frame.bindings.iter().find(|b| b.name == name) {
                return Some((binding, frame.level));
            }
            cursor = frame.parent;
        }
        None
    }

    pub fn reset(&mut self) {
        self.frames.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;

    fn binding(name: &str) -> CteBinding {
        let body = parse_query("SELECT 1").unwrap_or_else(|d| panic!("{d:?}"));
        CteBinding {
            name: name.into(),
            body,
            carried_columns: Vec::new(),
            declared_at: 0..0,
        }
    }

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut scopes = CteScopes::default();
        assert_eq!(scopes.depth(), 0);
        scopes.push(vec![binding("a"), binding("b")]);
        scopes.push(vec![binding("a")]);
        assert_eq!(scopes.depth(), 2);
        assert_eq!(scopes.lookup("a").map(|(_, level)| level), Some(2));
        assert_eq!(scopes.lookup("b").map(|(_, level)| level), Some(1));

        scopes.pop();
        assert_eq!(scopes.lookup("a").map(|(_, level)| level), Some(1));
        scopes.pop();
        assert!(scopes.lookup("a").is_none());
        scopes.pop();
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn sibling_frames_do_not_see_each_other() {
        let mut scopes = CteScopes::default();
        scopes.push(vec![binding("x")]);
        scopes.pop();
        scopes.push(vec![binding("y")]);
        assert!(scopes.lookup("x").is_none());
        assert!(scopes.lookup("y").is_some());
        scopes.reset();
        assert_eq!(scopes.depth(), 0);
    }
}
