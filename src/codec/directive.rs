//! `##` directive line parsing.
//!
//! A directive is optional leading whitespace, `##`, a name token, then
//! optional whitespace and a payload. Names are case-sensitive and only
//! trailing whitespace is stripped from payloads; `##GFF-Version` is an
//! unknown directive, not a misspelled known one.

use crate::types::Directive;

/// Outcome of parsing a `##` line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDirective {
    /// `##FASTA`: the rest of the input is sequence data. The parser turns
    /// this into a [`crate::GffItem::Fasta`] handoff.
    Fasta,
    /// Any other directive.
    Directive(Directive),
}

/// Parse a `##` directive line, returning `None` for lines that do not
/// match the directive shape (no `##`, three or more `#`, or no name
/// token).
///
/// # Examples
///
/// ```
/// use gffstream::codec::{parse_directive, ParsedDirective};
/// use gffstream::Directive;
///
/// let parsed = parse_directive("##gff-version 3").unwrap();
/// assert_eq!(
///     parsed,
///     ParsedDirective::Directive(Directive::GffVersion { version: "3".into() })
/// );
///
/// assert_eq!(parse_directive("##FASTA"), Some(ParsedDirective::Fasta));
/// assert_eq!(parse_directive("# plain comment"), None);
/// assert_eq!(parse_directive("###"), None);
/// ```
pub fn parse_directive(line: &str) -> Option<ParsedDirective> {
    let rest = line.trim_start().strip_prefix("##")?;
    if rest.starts_with('#') {
        return None;
    }

    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.is_empty() {
        return None;
    }
    let value = rest[name_end..].trim_start().trim_end();

    let directive = match name {
        "FASTA" => return Some(ParsedDirective::Fasta),
        "gff-version" => Directive::GffVersion {
            version: value.to_string(),
        },
        "sequence-region" => parse_sequence_region(value)
            .unwrap_or_else(|| verbatim(name, value)),
        "genome-build" => parse_genome_build(value)
            .unwrap_or_else(|| verbatim(name, value)),
        _ => verbatim(name, value),
    };
    Some(ParsedDirective::Directive(directive))
}

fn verbatim(name: &str, value: &str) -> Directive {
    Directive::Other {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_sequence_region(value: &str) -> Option<Directive> {
    let mut parts = value.split_whitespace();
    let seq_id = parts.next()?;
    let start = parse_loose_number(parts.next()?)?;
    let end = parse_loose_number(parts.next()?)?;
    Some(Directive::SequenceRegion {
        seq_id: seq_id.to_string(),
        start,
        end,
    })
}

fn parse_genome_build(value: &str) -> Option<Directive> {
    let mut parts = value.split_whitespace();
    let source = parts.next()?;
    let buildname = parts.next()?;
    Some(Directive::GenomeBuild {
        source: source.to_string(),
        buildname: buildname.to_string(),
    })
}

/// Parse an integer after stripping non-digit characters, so values like
/// `1,497,228` are accepted.
fn parse_loose_number(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(line: &str) -> Directive {
        match parse_directive(line) {
            Some(ParsedDirective::Directive(d)) => d,
            other => panic!("expected a directive for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_gff_version() {
        assert_eq!(
            directive("##gff-version 3.1.26"),
            Directive::GffVersion {
                version: "3.1.26".to_string()
            }
        );
    }

    #[test]
    fn test_sequence_region_strips_separators() {
        assert_eq!(
            directive("##sequence-region ctg123 1 1,497,228"),
            Directive::SequenceRegion {
                seq_id: "ctg123".to_string(),
                start: 1,
                end: 1_497_228,
            }
        );
    }

    #[test]
    fn test_sequence_region_short_payload_falls_back() {
        assert_eq!(
            directive("##sequence-region ctg123"),
            Directive::Other {
                name: "sequence-region".to_string(),
                value: "ctg123".to_string(),
            }
        );
    }

    #[test]
    fn test_genome_build() {
        assert_eq!(
            directive("##genome-build NCBI B36"),
            Directive::GenomeBuild {
                source: "NCBI".to_string(),
                buildname: "B36".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_directive_preserved_verbatim() {
        assert_eq!(
            directive("##species http://www.ncbi.nlm.nih.gov/Taxonomy  "),
            Directive::Other {
                name: "species".to_string(),
                value: "http://www.ncbi.nlm.nih.gov/Taxonomy".to_string(),
            }
        );
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_eq!(
            directive("##GFF-VERSION 3"),
            Directive::Other {
                name: "GFF-VERSION".to_string(),
                value: "3".to_string(),
            }
        );
        // Lowercase fasta is not the FASTA marker either.
        assert!(matches!(
            parse_directive("##fasta"),
            Some(ParsedDirective::Directive(Directive::Other { .. }))
        ));
    }

    #[test]
    fn test_leading_whitespace_allowed() {
        assert_eq!(
            directive("  ##gff-version 3"),
            Directive::GffVersion {
                version: "3".to_string()
            }
        );
    }

    #[test]
    fn test_not_directives() {
        assert_eq!(parse_directive("# comment"), None);
        assert_eq!(parse_directive("###"), None);
        assert_eq!(parse_directive("####x"), None);
        assert_eq!(parse_directive("##"), None);
        assert_eq!(parse_directive("## "), None);
        assert_eq!(parse_directive("chr1\t.\tgene"), None);
    }

    #[test]
    fn test_payload_keeps_internal_whitespace() {
        assert_eq!(
            directive("##note  two  spaces  inside "),
            Directive::Other {
                name: "note".to_string(),
                value: "two  spaces  inside".to_string(),
            }
        );
    }
}
