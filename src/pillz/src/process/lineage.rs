use crate::constants::OPAQUE_PARENTS;

/// Picks the pid whose children share the anchor's pill.
///
/// That is the anchor's parent, unless the parent is missing, is the anchor itself
/// (init-reparented orphans can report that), or is one of [`OPAQUE_PARENTS`]: a
/// shell or a session manager has children that have nothing to do with the anchor.
/// In those cases the anchor is the root of its own tree.
pub fn valid_parent(anchor: u32, parent: Option<u32>, parent_name: Option<&str>) -> u32 {
    match (parent, parent_name) {
        (Some(parent), Some(name)) if parent != anchor && parent != 0 && !is_opaque(name) => {
            parent
        }
        _ => anchor,
    }
}

pub fn is_opaque(name: &str) -> bool {
    OPAQUE_PARENTS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::launcher(Some(40), Some("steam"), 40)]
    #[case::shell(Some(40), Some("bash"), 100)]
    #[case::session_manager(Some(1), Some("systemd"), 100)]
    #[case::unresolved_name(Some(40), None, 100)]
    #[case::no_parent(None, None, 100)]
    #[case::own_parent(Some(100), Some("game.exe"), 100)]
    #[case::kernel_parent(Some(0), Some("swapper"), 100)]
    fn test_valid_parent(
        #[case] parent: Option<u32>,
        #[case] parent_name: Option<&str>,
        #[case] expected: u32,
    ) {
        assert_eq!(valid_parent(100, parent, parent_name), expected);
    }
}
