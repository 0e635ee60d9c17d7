//! Caller-supplied limits.
//!
//! A single integer field means different things depending on the operation:
//! content-streaming operations read it as a byte budget where zero asks for
//! metadata only, listing operations read it as a match count where zero
//! means "no limit".

/// An upper bound on bytes or items produced for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    #[default]
    Unlimited,
    AtMost(u64),
}

impl Limit {
    /// Byte limit for blob content: negative is unlimited, zero is metadata only.
    pub fn bytes(raw: i64) -> Self {
        if raw < 0 {
            Limit::Unlimited
        } else {
            Limit::AtMost(raw as u64)
        }
    }

    /// Item limit for listings: zero or negative is unlimited.
    pub fn count(raw: i64) -> Self {
        if raw <= 0 {
            Limit::Unlimited
        } else {
            Limit::AtMost(raw as u64)
        }
    }

    /// Clamp `n` to this limit.
    pub fn cap(&self, n: u64) -> u64 {
        match self {
            Limit::Unlimited => n,
            Limit::AtMost(max) => n.min(*max),
        }
    }

    /// Whether `produced` items or bytes have used the whole limit.
    pub fn is_reached(&self, produced: u64) -> bool {
        match self {
            Limit::Unlimited => false,
            Limit::AtMost(max) => produced >= *max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_limits() {
        assert_eq!(Limit::bytes(-1), Limit::Unlimited);
        assert_eq!(Limit::bytes(0), Limit::AtMost(0));
        assert_eq!(Limit::bytes(10).cap(4), 4);
        assert_eq!(Limit::bytes(10).cap(40), 10);
        assert_eq!(Limit::bytes(-5).cap(40), 40);
    }

    #[test]
    fn test_count_limits() {
        assert_eq!(Limit::count(0), Limit::Unlimited);
        assert_eq!(Limit::count(-3), Limit::Unlimited);
        assert!(Limit::count(2).is_reached(2));
        assert!(!Limit::count(2).is_reached(1));
        assert!(!Limit::Unlimited.is_reached(u64::MAX));
    }
}
