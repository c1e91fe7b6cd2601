use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::pos::Position;

/// Type-safe index into the name arena. Indices are handed out in strictly
/// increasing order, so a `Name` doubles as the "fresh name id" of the
/// lexer/parser contract.
pub type Name = Idx<NameData>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameData {
    pub text: SmolStr,
    /// Position of the first occurrence in this parse.
    pub first_seen: Position,
}

/// Identifier interner. A lexeme is allocated once; every later occurrence
/// within the same parse resolves to the same `Name`.
#[derive(Default)]
pub struct Names {
    arena: Arena<NameData>,
    index: FxHashMap<SmolStr, Name>,
}

impl Names {
    pub fn intern(&mut self, text: &str, pos: &Position) -> Name {
        if let Some(&name) = self.index.get(text) {
            return name;
        }
        let key = SmolStr::new(text);
        let name = self.arena.alloc(NameData {
            text: key.clone(),
            first_seen: pos.clone(),
        });
        self.index.insert(key, name);
        name
    }

    #[inline]
    pub fn text(&self, name: Name) -> &str {
        self.arena[name].text.as_str()
    }

    #[inline]
    pub fn data(&self, name: Name) -> &NameData {
        &self.arena[name]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}
