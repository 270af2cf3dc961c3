//! Content template rendering
//!
//! Supported syntax:
//! - `${key}` and `$key` references (keys inside braces may contain dots)
//! - `$!{key}` / `$!key` quiet references, rendered empty when undefined
//! - `\$` escapes a dollar sign
//! - `#[[ ... ]]#` unparsed blocks, emitted verbatim
//! - `#set( $name = 'literal' )` binds `name` for the rest of the template;
//!   double-quoted values are rendered first. A directive alone on its line
//!   takes the whole line with it.
//!
//! Undefined loud references are left in the output as written.

use crate::context::PropertyContext;
use std::borrow::Cow;
use thiserror::Error;

/// Errors raised while parsing a template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unterminated reference at line {line}")]
    UnterminatedReference { line: usize },

    #[error("Empty reference at line {line}")]
    EmptyReference { line: usize },

    #[error("Unterminated unparsed block at line {line}")]
    UnterminatedBlock { line: usize },
}

/// One parsed piece of a template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Reference {
        key: &'a str,
        quiet: bool,
        /// Source text, re-emitted when the key is undefined
        raw: &'a str,
    },
    Set {
        key: &'a str,
        value: &'a str,
        interpolate: bool,
    },
}

/// A parsed `#set` directive and the offset just past its closing parenthesis
struct SetDirective<'a> {
    key: &'a str,
    value: &'a str,
    interpolate: bool,
    end: usize,
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_identifier_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_blanks(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// `#set( $name = 'value' )` at `start`; anything else is plain text
fn parse_set(source: &str, start: usize) -> Option<SetDirective<'_>> {
    let bytes = source.as_bytes();
    let mut i = skip_blanks(bytes, start + "#set".len());
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i = skip_blanks(bytes, i + 1);
    if bytes.get(i) != Some(&b'$') {
        return None;
    }
    i += 1;
    let braced = bytes.get(i) == Some(&b'{');
    if braced {
        i += 1;
    }
    if !bytes.get(i).copied().is_some_and(is_identifier_start) {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && is_identifier_char(bytes[i]) {
        i += 1;
    }
    let key = &source[name_start..i];
    if braced {
        if bytes.get(i) != Some(&b'}') {
            return None;
        }
        i += 1;
    }
    i = skip_blanks(bytes, i);
    if bytes.get(i) != Some(&b'=') {
        return None;
    }
    i = skip_blanks(bytes, i + 1);
    let quote = *bytes.get(i)?;
    if quote != b'\'' && quote != b'"' {
        return None;
    }
    let value_start = i + 1;
    let value_end = value_start + source[value_start..].find(quote as char)?;
    let value = &source[value_start..value_end];
    if value.contains('\n') {
        return None;
    }
    i = skip_blanks(bytes, value_end + 1);
    if bytes.get(i) != Some(&b')') {
        return None;
    }
    Some(SetDirective {
        key,
        value,
        interpolate: quote == b'"',
        end: i + 1,
    })
}

fn flush<'a>(segments: &mut Vec<Segment<'a>>, source: &'a str, from: usize, to: usize) {
    if from < to {
        segments.push(Segment::Text(&source[from..to]));
    }
}

fn parse(source: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'$') => {
                flush(&mut segments, source, text_start, i);
                segments.push(Segment::Text("$"));
                i += 2;
                text_start = i;
            }
            b'#' if source[i..].starts_with("#[[") => {
                let body_start = i + 3;
                let end = source[body_start..]
                    .find("]]#")
                    .ok_or(TemplateError::UnterminatedBlock {
                        line: line_at(source, i),
                    })?;
                flush(&mut segments, source, text_start, i);
                segments.push(Segment::Text(&source[body_start..body_start + end]));
                i = body_start + end + 3;
                text_start = i;
            }
            b'#' if source[i..].starts_with("#set") => match parse_set(source, i) {
                Some(set) => {
                    let line_start = source[..i].rfind('\n').map_or(0, |p| p + 1);
                    let line_end = source[set.end..]
                        .find('\n')
                        .map_or(bytes.len(), |p| set.end + p);
                    let alone = line_start >= text_start
                        && source[line_start..i].trim().is_empty()
                        && source[set.end..line_end].trim().is_empty();
                    if alone {
                        flush(&mut segments, source, text_start, line_start);
                        i = (line_end + 1).min(bytes.len());
                    } else {
                        flush(&mut segments, source, text_start, i);
                        i = set.end;
                    }
                    segments.push(Segment::Set {
                        key: set.key,
                        value: set.value,
                        interpolate: set.interpolate,
                    });
                    text_start = i;
                }
                None => i += 1,
            },
            b'$' => {
                let quiet = bytes.get(i + 1) == Some(&b'!');
                let name_start = if quiet { i + 2 } else { i + 1 };

                if bytes.get(name_start) == Some(&b'{') {
                    let close = source[name_start..]
                        .find('}')
                        .map(|p| name_start + p)
                        .ok_or(TemplateError::UnterminatedReference {
                            line: line_at(source, i),
                        })?;
                    let key = source[name_start + 1..close].trim();
                    if key.is_empty() {
                        return Err(TemplateError::EmptyReference {
                            line: line_at(source, i),
                        });
                    }
                    if key.contains('\n') {
                        return Err(TemplateError::UnterminatedReference {
                            line: line_at(source, i),
                        });
                    }
                    flush(&mut segments, source, text_start, i);
                    segments.push(Segment::Reference {
                        key,
                        quiet,
                        raw: &source[i..=close],
                    });
                    i = close + 1;
                    text_start = i;
                } else if bytes.get(name_start).copied().is_some_and(is_identifier_start) {
                    let mut end = name_start + 1;
                    while end < bytes.len() && is_identifier_char(bytes[end]) {
                        end += 1;
                    }
                    flush(&mut segments, source, text_start, i);
                    segments.push(Segment::Reference {
                        key: &source[name_start..end],
                        quiet,
                        raw: &source[i..end],
                    });
                    i = end;
                    text_start = i;
                } else {
                    // lone dollar sign
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    flush(&mut segments, source, text_start, bytes.len());
    Ok(segments)
}

/// Render `source` against `context`
pub fn render(source: &str, context: &PropertyContext) -> Result<String, TemplateError> {
    let segments = parse(source)?;
    let mut scope = Cow::Borrowed(context);
    let mut out = String::with_capacity(source.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Reference { key, quiet, raw } => match scope.get(key) {
                Some(value) => out.push_str(value),
                None if quiet => {}
                None => out.push_str(raw),
            },
            Segment::Set {
                key,
                value,
                interpolate,
            } => {
                let value = if interpolate {
                    render(value, &scope)?
                } else {
                    value.to_string()
                };
                scope.to_mut().insert(key, value);
            }
        }
    }
    Ok(out)
}

/// Keys referenced by `source`, in order of first appearance
///
/// Keys bound by an earlier `#set` are not references.
pub fn references(source: &str) -> Result<Vec<String>, TemplateError> {
    let mut keys: Vec<String> = Vec::new();
    let mut bound: Vec<&str> = Vec::new();
    for segment in parse(source)? {
        match segment {
            Segment::Reference { key, .. } => {
                if !bound.contains(&key) && !keys.iter().any(|k| k == key) {
                    keys.push(key.to_string());
                }
            }
            Segment::Set { key, .. } => bound.push(key),
            Segment::Text(_) => {}
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PropertyContext {
        PropertyContext::from_properties([
            ("package", "com.acme"),
            ("artifactId", "shop"),
            ("project.build.sourceEncoding", "UTF-8"),
        ])
    }

    #[test]
    fn test_braced_and_bare_references() {
        let out = render("package ${package};\n// $artifactId\n", &ctx()).unwrap();
        assert_eq!(out, "package com.acme;\n// shop\n");
    }

    #[test]
    fn test_dotted_keys_inside_braces() {
        let out = render("<enc>${project.build.sourceEncoding}</enc>", &ctx()).unwrap();
        assert_eq!(out, "<enc>UTF-8</enc>");
    }

    #[test]
    fn test_undefined_loud_reference_left_literal() {
        let out = render("a ${missing} b $missing c", &ctx()).unwrap();
        assert_eq!(out, "a ${missing} b $missing c");
    }

    #[test]
    fn test_quiet_reference_renders_empty() {
        let out = render("[$!{missing}][$!artifactId]", &ctx()).unwrap();
        assert_eq!(out, "[][shop]");
    }

    #[test]
    fn test_escape_and_lone_dollar() {
        let out = render(r"cost: 5$ and \${package}", &ctx()).unwrap();
        assert_eq!(out, "cost: 5$ and ${package}");
    }

    #[test]
    fn test_bare_reference_stops_at_dot() {
        let out = render("$artifactId.jar", &ctx()).unwrap();
        assert_eq!(out, "shop.jar");
    }

    #[test]
    fn test_unparsed_block_is_verbatim() {
        let out = render("#[[${package}]]# ${package}", &ctx()).unwrap();
        assert_eq!(out, "${package} com.acme");
    }

    #[test]
    fn test_set_lines_bind_and_disappear() {
        let source = "#set( $symbol_pound = '#' )\n#set( $symbol_dollar = '$' )\n#set( $symbol_escape = '\\' )\npackage ${package};\n\n// ${symbol_dollar}{home} ${symbol_pound}1 ${symbol_escape}n\npublic class App {}\n";
        let out = render(source, &ctx()).unwrap();
        assert_eq!(
            out,
            "package com.acme;\n\n// ${home} #1 \\n\npublic class App {}\n"
        );
    }

    #[test]
    fn test_inline_set_keeps_surrounding_text() {
        let out = render("a #set($x = 'y')$x b\n  #set( ${z} = \"${artifactId}-app\" )  \n$z", &ctx())
            .unwrap();
        assert_eq!(out, "a y b\nshop-app");
    }

    #[test]
    fn test_set_overrides_context_for_rest_of_template() {
        let out = render("$artifactId #set( $artifactId = 'other' )$artifactId", &ctx()).unwrap();
        assert_eq!(out, "shop other");
    }

    #[test]
    fn test_malformed_set_is_plain_text() {
        let out = render("#settings #set x", &ctx()).unwrap();
        assert_eq!(out, "#settings #set x");
    }

    #[test]
    fn test_unterminated_reference_is_error() {
        let err = render("line one\nvalue = ${package", &ctx()).unwrap_err();
        assert_eq!(err, TemplateError::UnterminatedReference { line: 2 });
    }

    #[test]
    fn test_empty_reference_is_error() {
        assert_eq!(
            render("${ }", &ctx()).unwrap_err(),
            TemplateError::EmptyReference { line: 1 }
        );
    }

    #[test]
    fn test_references_are_deduplicated() {
        let keys = references("${a}-$b-${a}-$!{c}").unwrap();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_bindings_are_not_references() {
        let keys = references("#set( $d = '$' )\n${d}{x} ${e}").unwrap();
        assert_eq!(keys, vec!["e"]);
    }
}
