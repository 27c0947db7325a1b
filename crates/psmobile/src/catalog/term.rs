//! Default-term resolution.

use super::types::Term;

/// Supplies the term used whenever a caller doesn't name one.
///
/// The current term is fixed when the resolver is built, so every command in
/// the process agrees on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermResolver {
    current: Term,
}

impl TermResolver {
    pub fn new(current: Term) -> Self {
        Self { current }
    }

    /// Builds a resolver whose current term is whatever is in session today.
    pub fn from_today() -> Self {
        Self::new(Term::for_date(chrono::Local::now().date_naive()))
    }

    pub fn current_term(&self) -> &Term {
        &self.current
    }

    /// Returns `explicit` untouched if given, otherwise the current term.
    pub fn resolve(&self, explicit: Option<Term>) -> Term {
        explicit.unwrap_or_else(|| self.current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_explicit_term() {
        let resolver = TermResolver::new(Term::parse("2254").unwrap());
        for code in ["2221", "2224", "2227", "2254", "2991"] {
            let term = Term::parse(code).unwrap();
            assert_eq!(resolver.resolve(Some(term.clone())), term);
        }
    }

    #[test]
    fn test_resolve_defaults_to_current_term() {
        let resolver = TermResolver::new(Term::parse("2257").unwrap());
        assert_eq!(resolver.resolve(None).as_str(), "2257");
        assert_eq!(resolver.resolve(None), *resolver.current_term());
    }
}
