//! Per-type coercion rules.
//!
//! Each scalar rule sees only inputs that failed the identity check and
//! decides, from the mode and source in [`State`](crate::dispatch::State),
//! whether to convert or fail. Container rules recurse through the
//! dispatcher for their elements.

pub mod boolean;
pub mod choice;
pub mod collections;
pub mod numeric;
pub mod temporal;
pub mod text;
pub mod uuids;

/// Render expected alternatives as `'a'`, `'a' or 'b'`, `'a', 'b' or 'c'`.
pub fn expected_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::expected_list;

    #[test]
    fn test_expected_list() {
        let items = |xs: &[&str]| xs.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        assert_eq!(expected_list(&items(&["'a'"])), "'a'");
        assert_eq!(expected_list(&items(&["'a'", "'b'"])), "'a' or 'b'");
        assert_eq!(expected_list(&items(&["1", "2", "3"])), "1, 2 or 3");
    }
}
