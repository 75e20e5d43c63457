//! Upload size limits.

const KIB: u64 = 1024;

/// Parse a size limit such as `2M`, `512K`, `1G` or `100` into bytes.
///
/// Suffixes are case-insensitive. Empty or unrecognized input yields `0`.
pub fn parse_size(raw: &str) -> u64 {
    let raw = raw.trim();
    let Some(last) = raw.chars().last() else {
        return 0;
    };

    let (number, multiplier) = match last.to_ascii_lowercase() {
        'k' => (&raw[..raw.len() - 1], KIB),
        'm' => (&raw[..raw.len() - 1], KIB * KIB),
        'g' => (&raw[..raw.len() - 1], KIB * KIB * KIB),
        c if c.is_ascii_digit() => (raw, 1),
        _ => return 0,
    };

    number
        .trim()
        .parse::<u64>()
        .map(|n| n.saturating_mul(multiplier))
        .unwrap_or(0)
}

/// The tightest of several independent upload ceilings, in bytes.
pub fn effective_max_upload<'a>(limits: impl IntoIterator<Item = &'a str>) -> u64 {
    limits.into_iter().map(parse_size).min().unwrap_or(0)
}

/// The effective upload ceiling rounded up to whole KiB, for display.
pub fn max_upload_kb<'a>(limits: impl IntoIterator<Item = &'a str>) -> u64 {
    effective_max_upload(limits).div_ceil(KIB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("2M"), 2097152);
        assert_eq!(parse_size("512K"), 524288);
        assert_eq!(parse_size("1G"), 1073741824);
        assert_eq!(parse_size("100"), 100);
    }

    #[test]
    fn test_parse_size_case_insensitive() {
        assert_eq!(parse_size("2m"), parse_size("2M"));
        assert_eq!(parse_size("512k"), parse_size("512K"));
        assert_eq!(parse_size("1g"), parse_size("1G"));
    }

    #[test]
    fn test_parse_size_unrecognized() {
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("   "), 0);
        assert_eq!(parse_size("M"), 0);
        assert_eq!(parse_size("abc"), 0);
        assert_eq!(parse_size("10X"), 0);
        assert_eq!(parse_size("-1"), 0);
    }

    #[test]
    fn test_parse_size_whitespace_and_overflow() {
        assert_eq!(parse_size(" 8M "), 8 * 1024 * 1024);
        assert_eq!(parse_size("99999999999999999999"), 0);
        assert_eq!(parse_size("18446744073709551615G"), u64::MAX);
    }

    #[test]
    fn test_effective_max_upload() {
        assert_eq!(effective_max_upload(["8M", "2M"]), 2 * 1024 * 1024);
        assert_eq!(effective_max_upload(["1G"]), 1073741824);
        assert_eq!(effective_max_upload(["8M", ""]), 0);
        assert_eq!(effective_max_upload(Vec::<&str>::new()), 0);
    }

    #[test]
    fn test_max_upload_kb() {
        assert_eq!(max_upload_kb(["8M", "2M"]), 2048);
        assert_eq!(max_upload_kb(["1000"]), 1);
        assert_eq!(max_upload_kb(["1025"]), 2);
        assert_eq!(max_upload_kb(["0"]), 0);
    }
}
