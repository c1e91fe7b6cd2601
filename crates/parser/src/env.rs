use std::cell::RefCell;

use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Typename,
    Identifier,
}

/// Scoped symbol environment: the parser's half of the typedef feedback loop.
///
/// The parser registers declarator names as it reduces declarations; the
/// lexer consults [`Env::is_typename`] on every identifier it classifies.
/// Interior mutability lets both sides share one `Rc<Env>` on a single
/// thread, which is the only supported execution model.
pub struct Env {
    symbols: RefCell<Vec<FxHashMap<String, Symbol>>>,
}

impl Env {
    pub fn with_core() -> Env {
        Env {
            symbols: RefCell::new(vec![FxHashMap::default()]),
        }
    }

    pub fn with_gnu() -> Env {
        let mut globals = FxHashMap::default();
        globals.insert("__builtin_va_list".to_owned(), Symbol::Typename);
        Env {
            symbols: RefCell::new(vec![globals]),
        }
    }

    pub fn enter_scope(&self) {
        self.symbols.borrow_mut().push(FxHashMap::default());
    }

    pub fn leave_scope(&self) {
        self.symbols
            .borrow_mut()
            .pop()
            .expect("more scope pops than pushes");
    }

    /// Innermost binding wins: a block-scope variable shadows an outer
    /// typedef of the same name.
    pub fn is_typename(&self, ident: &str) -> bool {
        for scope in self.symbols.borrow().iter().rev() {
            if let Some(symbol) = scope.get(ident) {
                return *symbol == Symbol::Typename;
            }
        }
        false
    }

    pub fn add_symbol(&self, s: &str, symbol: Symbol) {
        let mut symbols = self.symbols.borrow_mut();
        let scope = symbols
            .last_mut()
            .expect("at least one scope should be always present");
        scope.insert(s.to_string(), symbol);
    }

    pub fn add_typename(&self, s: &str) {
        self.add_symbol(s, Symbol::Typename)
    }
}
