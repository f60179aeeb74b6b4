//! Signal name tables.
//!
//! The daemon accepts signals by canonical name (without the `SIG`
//! prefix), while callers work with numeric identifiers. The reverse
//! table is process-wide, built once at first use and never mutated.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Canonical signal name → number.
pub static SIGNAL_MAP: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    HashMap::from([
        ("HUP", 1),
        ("INT", 2),
        ("QUIT", 3),
        ("ILL", 4),
        ("TRAP", 5),
        ("ABRT", 6),
        ("BUS", 7),
        ("FPE", 8),
        ("KILL", 9),
        ("USR1", 10),
        ("SEGV", 11),
        ("USR2", 12),
        ("PIPE", 13),
        ("ALRM", 14),
        ("TERM", 15),
        ("STKFLT", 16),
        ("CHLD", 17),
        ("CONT", 18),
        ("STOP", 19),
        ("TSTP", 20),
        ("TTIN", 21),
        ("TTOU", 22),
        ("URG", 23),
        ("XCPU", 24),
        ("XFSZ", 25),
        ("VTALRM", 26),
        ("PROF", 27),
        ("WINCH", 28),
        ("IO", 29),
        ("PWR", 30),
        ("SYS", 31),
    ])
});

static SIG_TO_NAME: Lazy<HashMap<i32, &'static str>> =
    Lazy::new(|| SIGNAL_MAP.iter().map(|(name, num)| (*num, *name)).collect());

/// Canonical name for a numeric signal, if known.
pub fn name_for(signal: i32) -> Option<&'static str> {
    SIG_TO_NAME.get(&signal).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_for_known_signals() {
        assert_eq!(name_for(9), Some("KILL"));
        assert_eq!(name_for(15), Some("TERM"));
        assert_eq!(name_for(28), Some("WINCH"));
    }

    #[test]
    fn test_name_for_unknown_signal() {
        assert_eq!(name_for(0), None);
        assert_eq!(name_for(64), None);
    }

    #[test]
    fn test_tables_are_inverse() {
        for (name, num) in SIGNAL_MAP.iter() {
            assert_eq!(name_for(*num), Some(*name));
        }
    }
}
