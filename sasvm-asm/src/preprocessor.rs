//! Lexical normalization: lower-case, strip comments/whitespace, resolve
//! labels in a single forward pass, and canonicalize numeric literals to
//! two-character upper-case hex. The output is plain text the assembler
//! can walk line-by-line without knowing about labels at all.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

static COMMENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r";.*").unwrap());

/// Matches a double- or single-quoted string literal, used to recognize
/// `db` character operands and to keep label substitution out of them.
static STRING_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());

fn is_label_line(line: &str) -> bool {
    line.ends_with(':') && !line.contains('"') && !line.contains('\'')
}

/// Whether `token` is a whole quoted string literal (used by both the
/// byte-count pass here and the assembler's `db` writer).
pub(crate) fn is_quoted(token: &str) -> bool {
    STRING_PATTERN.is_match(token) && token.len() >= 2
}

/// Strips a quoted token's surrounding quote characters, returning its
/// inner text unchanged (no escape processing).
pub(crate) fn unquote(token: &str) -> &str {
    &token[1..token.len() - 1]
}

/// Number of bytes a `db` operand list will occupy in memory: quoted
/// strings expand one byte per character, bare literals are one byte each.
fn db_operand_bytes(operands: &str) -> usize {
    operands
        .split(',')
        .map(|token| {
            let token = token.trim();
            if is_quoted(token) {
                unquote(token).chars().count()
            } else {
                1
            }
        })
        .sum()
}

/// Lower-cases, strips comments, trims, and collapses internal whitespace
/// down to the single separating space between mnemonic and operands.
/// Blank lines are dropped. Returns `(original_line_number, text)` pairs.
fn clean_lines(source: &str) -> Vec<(usize, String)> {
    let lowered = source.to_lowercase();
    let mut result = Vec::new();
    for (index, raw_line) in lowered.lines().enumerate() {
        let without_comment = COMMENT_PATTERN.replace(raw_line, "");
        let trimmed = without_comment.trim();
        if trimmed.is_empty() {
            continue;
        }
        result.push((index + 1, collapse_whitespace(trimmed)));
    }
    result
}

/// Keeps the first whitespace run as a single space, drops every other
/// whitespace character in the line (the mnemonic/operand-list separator
/// survives; spaces after commas inside the operand list do not).
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut seen_separator = false;
    for ch in line.chars() {
        if ch.is_whitespace() {
            if !seen_separator {
                out.push(' ');
                seen_separator = true;
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Resolves an `org` directive's argument during label resolution, before
/// the dedicated numeral-normalization pass has run. Tries the same
/// recognized-numeral shapes [`convert_numeral`] does (so `org 10h` works
/// the same whether or not normalization has already stripped the `h`),
/// falling back to a bare hex parse.
fn resolve_org_address(arg: &str) -> Option<usize> {
    match convert_numeral(arg.trim()) {
        NumeralOutcome::Converted(hex) => usize::from_str_radix(&hex, 16).ok(),
        _ => usize::from_str_radix(arg.trim(), 16).ok(),
    }
}

fn next_pointer(pointer: usize, line: &str) -> usize {
    if let Some(arg) = line.strip_prefix("org ") {
        resolve_org_address(arg).unwrap_or(pointer)
    } else if let Some(operands) = line.strip_prefix("db ") {
        pointer + db_operand_bytes(operands)
    } else {
        pointer + 2
    }
}

/// A label's byte address, recorded in discovery order so label
/// substitution mirrors the single-forward-pass resolution that produced
/// it (first match wins, just like the pass that assigned addresses).
struct LabelTable {
    entries: Vec<(String, u8)>,
}

impl LabelTable {
    fn new() -> LabelTable {
        LabelTable { entries: Vec::new() }
    }

    fn insert(&mut self, name: String, address: u8) {
        self.entries.push((name, address));
    }
}

/// Single forward pass: strips label declarations out of the line stream,
/// recording each label's address, and keeps any instruction/directive
/// that shared the label's line.
fn resolve_labels(lines: Vec<(usize, String)>) -> (Vec<(usize, String)>, LabelTable) {
    let mut labels = LabelTable::new();
    let mut body = Vec::new();
    let mut pointer: usize = 0;

    for (line_no, line) in lines {
        if is_label_line(&line) {
            let (name, rest) = line.split_once(':').unwrap();
            let address = (pointer % 256) as u8;
            labels.insert(name.to_string(), address);
            let rest = rest.trim();
            if !rest.is_empty() {
                pointer = next_pointer(pointer, rest);
                body.push((line_no, rest.to_string()));
            }
        } else {
            pointer = next_pointer(pointer, &line);
            body.push((line_no, line));
        }
    }

    (body, labels)
}

/// Replaces the first label name found in each line's operand text with
/// `<addr>h`, skipping lines that carry a quoted string (label references
/// never appear inside `db` character literals).
fn substitute_labels(lines: Vec<(usize, String)>, labels: &LabelTable) -> Vec<(usize, String)> {
    lines
        .into_iter()
        .map(|(line_no, line)| {
            if STRING_PATTERN.is_match(&line) {
                return (line_no, line);
            }
            let substituted = match line.split_once(' ') {
                Some((mnemonic, operands)) => {
                    let replaced = labels
                        .entries
                        .iter()
                        .find(|(name, _)| operands.contains(name.as_str()))
                        .map(|(name, address)| operands.replacen(name.as_str(), &format!("{:02X}h", address), 1))
                        .unwrap_or_else(|| operands.to_string());
                    format!("{} {}", mnemonic, replaced)
                }
                None => line,
            };
            (line_no, substituted)
        })
        .collect()
}

enum NumeralOutcome {
    NotNumeral,
    Converted(String),
    Malformed,
}

fn wrap_hex(value: i64, bracketed: bool) -> String {
    let wrapped = (((value % 256) + 256) % 256) as u8;
    let hex = format!("{:02X}", wrapped);
    if bracketed {
        format!("[{}]", hex)
    } else {
        hex
    }
}

/// Converts a single operand token to two upper-case hex digits, trying
/// each recognized numeral shape in order. Tokens that don't look like a
/// numeral at all (register names, bracketed register-indirect operands)
/// are left alone rather than treated as an error.
fn convert_numeral(token: &str) -> NumeralOutcome {
    if is_quoted(token) {
        return NumeralOutcome::NotNumeral;
    }

    let bracketed = token.starts_with('[') && token.ends_with(']') && token.len() >= 2;
    let inner = if bracketed { &token[1..token.len() - 1] } else { token };

    let (digits, radix) = if let Some(stripped) = inner.strip_suffix('b') {
        (stripped, 2)
    } else if let Some(stripped) = inner.strip_prefix("0x") {
        (stripped, 16)
    } else if let Some(stripped) = inner.strip_prefix('$') {
        (stripped, 16)
    } else if let Some(stripped) = inner.strip_suffix('h') {
        (stripped, 16)
    } else if let Some(stripped) = inner.strip_prefix('-') {
        return match stripped.parse::<i64>() {
            Ok(value) => NumeralOutcome::Converted(wrap_hex(-value, bracketed)),
            Err(_) => NumeralOutcome::Malformed,
        };
    } else if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
        (inner, 10)
    } else {
        return NumeralOutcome::NotNumeral;
    };

    match i64::from_str_radix(digits, radix) {
        Ok(value) => NumeralOutcome::Converted(wrap_hex(value, bracketed)),
        Err(_) => NumeralOutcome::Malformed,
    }
}

/// Converts every operand token on every line, leaving the mnemonic word
/// untouched. `db`'s quoted-string operands pass through [`convert_numeral`]
/// unchanged (it recognizes and skips them) since they are character data,
/// not numerals.
fn normalize_numerals(lines: Vec<(usize, String)>) -> Result<Vec<(usize, String)>, Error> {
    let mut out = Vec::with_capacity(lines.len());
    for (line_no, line) in lines {
        let Some((mnemonic, operands)) = line.split_once(' ') else {
            out.push((line_no, line));
            continue;
        };
        let mut converted_operands = Vec::new();
        for token in operands.split(',') {
            match convert_numeral(token) {
                NumeralOutcome::Converted(hex) => converted_operands.push(hex),
                NumeralOutcome::NotNumeral => converted_operands.push(token.to_string()),
                NumeralOutcome::Malformed => {
                    return Err(Error::MalformedLiteral {
                        line: line_no,
                        token: token.to_string(),
                    })
                }
            }
        }
        out.push((line_no, format!("{} {}", mnemonic, converted_operands.join(","))));
    }
    Ok(out)
}

/// Runs the full pipeline, returning `(original_line_number, text)` pairs
/// so the assembler can report errors against the source the user wrote,
/// not the post-label-resolution line count.
pub(crate) fn preprocess(source: &str) -> Result<Vec<(usize, String)>, Error> {
    let cleaned = clean_lines(source);
    let (body, labels) = resolve_labels(cleaned);
    let substituted = substitute_labels(body, &labels);
    normalize_numerals(substituted)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn convert_numeral_handles_every_recognized_base() {
        assert_eq!(hex_of("0xa0"), "A0");
        assert_eq!(hex_of("$a0"), "A0");
        assert_eq!(hex_of("a0h"), "A0");
        assert_eq!(hex_of("10000001b"), "81");
    }

    fn hex_of(token: &str) -> String {
        match convert_numeral(token) {
            NumeralOutcome::Converted(hex) => hex,
            _ => panic!("expected {:?} to convert", token),
        }
    }

    #[test]
    fn convert_numeral_leaves_register_tokens_unchanged() {
        assert!(matches!(convert_numeral("r1"), NumeralOutcome::NotNumeral));
        assert!(matches!(convert_numeral("r[2]"), NumeralOutcome::NotNumeral));
    }

    #[test]
    fn convert_numeral_flags_values_that_look_like_a_base_but_are_not() {
        assert!(matches!(convert_numeral("102b"), NumeralOutcome::Malformed));
        assert!(matches!(convert_numeral("0xzz"), NumeralOutcome::Malformed));
    }

    #[test]
    fn preserves_brackets_around_a_converted_address() {
        assert_eq!(hex_of("[20h]"), "[20]");
    }

    #[test]
    fn label_resolution_substitutes_forward_and_backward_references() {
        let source = "loop:\n  move rf, r2\n  jmple r2<=r0, loop\n  halt";
        let lines = preprocess(source).expect("valid source");
        let joined: Vec<&str> = lines.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(joined[1], "jmple r2<=r0,00");
    }

    #[test]
    fn db_byte_count_mixes_quoted_strings_and_literals() {
        assert_eq!(db_operand_bytes("\"hi\",1"), 3);
    }

    #[test]
    fn malformed_literal_reports_its_source_line_number() {
        let source = "load r1, 0xzzh";
        let err = preprocess(source).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedLiteral {
                line: 1,
                token: "0xzzh".to_string()
            }
        );
    }
}
