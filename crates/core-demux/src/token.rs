//! Integer tokenizer for whitespace-separated records
//!
//! A token is optional leading ASCII whitespace, an optional `+`, then one or
//! more decimal digits. Parsing stops at the first byte that is not a digit,
//! so anything else between tokens makes the following parse fail.

/// Parse one unsigned token from the front of `input`.
///
/// Returns the value and the unconsumed remainder, or `None` when no digits
/// follow the whitespace or the value overflows `u64`.
pub fn parse_u64(input: &[u8]) -> Option<(u64, &[u8])> {
    let mut pos = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());

    if input.get(pos) == Some(&b'+') {
        pos += 1;
    }

    let digits = input[pos..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }

    let mut value: u64 = 0;
    for &b in &input[pos..pos + digits] {
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
    }

    Some((value, &input[pos + digits..]))
}

/// Skip `skip` leading tokens of `line` and parse the next one.
///
/// `None` means the line has too few well-formed tokens.
pub fn field(line: &[u8], skip: usize) -> Option<u64> {
    let mut rest = line;
    for _ in 0..skip {
        let (_, tail) = parse_u64(rest)?;
        rest = tail;
    }
    parse_u64(rest).map(|(value, _)| value)
}
