use serde::Serialize;

/// Resolved page bounds for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: u64,
    pub total_pages: u64,
    pub offset: u64,
    pub page_size: u64,
    pub total_count: u64,
}

/// Clamps `requested_page` into `1..=total_pages`; an empty listing still has one page.
pub fn paginate(total_count: u64, requested_page: i64, page_size: u64) -> Page {
    let page_size = page_size.max(1);
    let total_pages = total_count.div_ceil(page_size).max(1);
    let page = (requested_page.max(1) as u64).min(total_pages);

    Page {
        page,
        total_pages,
        offset: (page - 1) * page_size,
        page_size,
        total_count,
    }
}

/// Lenient page-number parsing: leading digits win (`"3abc"` is 3), anything else is page 1.
/// Digit runs too large for `i64` saturate so they still clamp to the last page.
pub fn parse_page_param(raw: &str) -> i64 {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    let digits = &digits[..end];
    if digits.is_empty() {
        return 1;
    }

    match digits.parse::<i64>() {
        Ok(n) => sign * n,
        Err(_) if sign < 0 => i64::MIN,
        Err(_) => i64::MAX,
    }
}
