const ADDRESS_START: char = '<';
const ADDRESS_END: char = '>';

/// Pull the mailbox out of an argument such as `FROM:<user@domain.com>`.
///
/// The argument must hold exactly one `<` and one `>` with at least one
/// character between them. Nothing else about the address is checked.
pub fn extract_address(arg: &str) -> Option<&str> {
    if arg.matches(ADDRESS_START).count() != 1 || arg.matches(ADDRESS_END).count() != 1 {
        return None;
    }

    let start = arg.find(ADDRESS_START)? + ADDRESS_START.len_utf8();
    let end = arg.find(ADDRESS_END)?;
    if end <= start {
        return None;
    }

    Some(&arg[start..end])
}

/// Case-insensitive `starts_with` for ASCII keywords like `FROM:`.
pub fn has_prefix(arg: &str, prefix: &str) -> bool {
    arg.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}
