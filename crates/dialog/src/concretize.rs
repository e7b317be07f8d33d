//! Placeholder classification.

/// What a `VarRef` name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// `$contact(<name>)`: looked up in the address book.
    Contact(&'a str),
    /// `$context.<key>`: read from the user context.
    Context(&'a str),
    /// Anything else (`$event`, `$event.title`, ...): left for code generation.
    Symbol,
}

pub fn classify(name: &str) -> Placeholder<'_> {
    if let Some(contact) = name
        .strip_prefix("$contact(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return Placeholder::Contact(contact);
    }
    match name.strip_prefix("$context.") {
        Some(key) if !key.is_empty() => Placeholder::Context(key),
        _ => Placeholder::Symbol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_placeholders() {
        assert_eq!(classify("$contact(bob)"), Placeholder::Contact("bob"));
        assert_eq!(
            classify("$context.location.home"),
            Placeholder::Context("location.home")
        );
        assert_eq!(classify("$event.title"), Placeholder::Symbol);
        assert_eq!(classify("$contact(bob"), Placeholder::Symbol);
        assert_eq!(classify("$context."), Placeholder::Symbol);
    }
}
