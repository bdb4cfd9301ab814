//! Volume name grammar.

use std::sync::LazyLock;

use regex::Regex;

// At least two characters, first must not be a dot. Compiled once and
// shared read-only across requests.
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-_][A-Za-z0-9\-_.]+$").unwrap());

/// Whether `name` is acceptable as a volume name.
///
/// Operations receiving a name that fails this check reject it before
/// touching the filesystem.
pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}
