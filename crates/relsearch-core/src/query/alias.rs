//! Table alias allocation.

/// Prefix for aliases of correlated `exists` sub-queries.
pub const EXISTS_ALIAS_PREFIX: &str = "wherehas_";

/// Prefix for aliases of order-by joins.
pub const JOIN_ALIAS_PREFIX: &str = "joined_";

/// Hands out `<prefix><n>` aliases with a strictly increasing `n`.
///
/// One allocator lives for one compilation. Aliases are never returned or
/// reused, so abandoned branches simply leave gaps in the sequence.
#[derive(Debug, Clone)]
pub struct AliasAllocator {
    prefix: &'static str,
    next: u64,
}

impl AliasAllocator {
    /// Create an allocator starting at zero.
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 0 }
    }

    /// Allocator for `exists` sub-query aliases.
    pub fn for_exists() -> Self {
        Self::new(EXISTS_ALIAS_PREFIX)
    }

    /// Allocator for join aliases.
    pub fn for_joins() -> Self {
        Self::new(JOIN_ALIAS_PREFIX)
    }

    /// Allocate the next alias.
    pub fn allocate(&mut self) -> String {
        let alias = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        alias
    }

    /// Number of aliases handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_are_monotonic() {
        let mut aliases = AliasAllocator::for_exists();
        assert_eq!(aliases.allocate(), "wherehas_0");
        assert_eq!(aliases.allocate(), "wherehas_1");
        assert_eq!(aliases.allocate(), "wherehas_2");
        assert_eq!(aliases.issued(), 3);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut a = AliasAllocator::for_joins();
        let mut b = AliasAllocator::for_joins();
        assert_eq!(a.allocate(), "joined_0");
        assert_eq!(a.allocate(), "joined_1");
        assert_eq!(b.allocate(), "joined_0");
    }
}
