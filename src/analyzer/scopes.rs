use super::{DefineError, Kind, Symbol, SymbolTable, VarType};

/// Where an identifier was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    Subroutine(&'a Symbol),
    Class(&'a Symbol),
    /// Not a variable in scope; callers treat it as a class name.
    NotFound,
}

impl<'a> Resolution<'a> {
    pub fn symbol(&self) -> Option<&'a Symbol> {
        match self {
            Resolution::Subroutine(s) | Resolution::Class(s) => Some(s),
            Resolution::NotFound => None,
        }
    }
}

/// The class-scope table lives for a whole class; the subroutine-scope
/// table is cleared at every subroutine. Subroutine scope shadows class scope.
#[derive(Debug, Default)]
pub struct Scopes {
    class: SymbolTable,
    subroutine: SymbolTable,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_class_var(
        &mut self,
        name: &str,
        kind: Kind,
        ty: VarType,
    ) -> Result<u16, DefineError> {
        debug_assert!(matches!(kind, Kind::Static | Kind::Field));
        self.class.define(name, kind, ty)
    }

    pub fn define_subroutine_var(
        &mut self,
        name: &str,
        kind: Kind,
        ty: VarType,
    ) -> Result<u16, DefineError> {
        debug_assert!(matches!(kind, Kind::Argument | Kind::Local));
        self.subroutine.define(name, kind, ty)
    }

    pub fn start_subroutine(&mut self) {
        self.subroutine.start_subroutine();
    }

    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        if let Some(symbol) = self.subroutine.get(name) {
            Resolution::Subroutine(symbol)
        } else if let Some(symbol) = self.class.get(name) {
            Resolution::Class(symbol)
        } else {
            Resolution::NotFound
        }
    }

    pub fn var_count(&self, kind: Kind) -> u16 {
        match kind {
            Kind::Static | Kind::Field => self.class.var_count(kind),
            Kind::Argument | Kind::Local => self.subroutine.var_count(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subroutine_scope_shadows_class_scope() {
        let mut scopes = Scopes::new();
        scopes
            .define_class_var("x", Kind::Field, VarType::Int)
            .unwrap();
        scopes
            .define_subroutine_var("x", Kind::Local, VarType::Boolean)
            .unwrap();

        let Resolution::Subroutine(symbol) = scopes.resolve("x") else {
            panic!("expected subroutine scope");
        };
        assert_eq!(symbol.kind, Kind::Local);

        scopes.start_subroutine();
        let Resolution::Class(symbol) = scopes.resolve("x") else {
            panic!("expected class scope");
        };
        assert_eq!(symbol.kind, Kind::Field);
        assert_eq!(symbol.ty, VarType::Int);
    }

    #[test]
    fn not_found() {
        let scopes = Scopes::new();
        assert_eq!(scopes.resolve("Output"), Resolution::NotFound);
        assert_eq!(scopes.resolve("Output").symbol(), None);
    }

    #[test]
    fn class_counts_survive_subroutines() {
        let mut scopes = Scopes::new();
        scopes
            .define_class_var("a", Kind::Field, VarType::Int)
            .unwrap();
        scopes
            .define_class_var("b", Kind::Field, VarType::Int)
            .unwrap();
        scopes
            .define_class_var("count", Kind::Static, VarType::Int)
            .unwrap();
        scopes
            .define_subroutine_var("i", Kind::Local, VarType::Int)
            .unwrap();
        scopes.start_subroutine();

        assert_eq!(scopes.var_count(Kind::Field), 2);
        assert_eq!(scopes.var_count(Kind::Static), 1);
        assert_eq!(scopes.var_count(Kind::Local), 0);
        assert_eq!(scopes.resolve("i"), Resolution::NotFound);
        assert!(matches!(scopes.resolve("count"), Resolution::Class(_)));
    }
}
