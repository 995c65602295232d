//! Feature line (nine tab-separated columns) parsing and formatting.

use crate::codec::attributes::{format_attributes, parse_attributes};
use crate::codec::escape::{escape, unescape};
use crate::error::{GffError, Result};
use crate::types::{GffLine, Strand};

/// Parse one feature row into a [`GffLine`].
///
/// The line is split on tabs into nine fields (a trailing `\n`/`\r` is
/// stripped first); fewer than nine fields is a parse error. The first
/// eight fields are individually percent-unescaped, with `.` meaning
/// absent; the ninth is the attribute column.
///
/// # Examples
///
/// ```
/// use gffstream::codec::parse_feature_line;
///
/// let line = parse_feature_line("ctg123\t.\tmRNA\t1050\t9000\t.\t+\t.\tID=mRNA1\n")?;
/// assert_eq!(line.seq_id.as_deref(), Some("ctg123"));
/// assert_eq!(line.start, Some(1050));
/// assert_eq!(line.score, None);
/// # Ok::<(), gffstream::GffError>(())
/// ```
pub fn parse_feature_line(line: &str) -> Result<GffLine> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.splitn(9, '\t').collect();
    if fields.len() < 9 {
        return Err(GffError::line_parse(format!(
            "expected 9 tab-separated fields, found {}",
            fields.len()
        )));
    }

    let text = |raw: &str| -> Option<String> {
        if raw == "." {
            None
        } else {
            Some(unescape(raw))
        }
    };

    let start = parse_number::<u64>(fields[3], "start")?;
    let end = parse_number::<u64>(fields[4], "end")?;
    let score = parse_number::<f64>(fields[5], "score")?;

    let strand = match fields[6] {
        "." => None,
        raw => Some(raw.parse::<Strand>()?),
    };

    let phase = match fields[7] {
        "." => None,
        "0" => Some(0),
        "1" => Some(1),
        "2" => Some(2),
        raw => {
            return Err(GffError::line_parse(format!(
                "invalid phase '{raw}' (expected 0, 1, 2 or '.')"
            )))
        }
    };

    Ok(GffLine {
        seq_id: text(fields[0]),
        source: text(fields[1]),
        feature_type: text(fields[2]),
        start,
        end,
        score,
        strand,
        phase,
        attributes: parse_attributes(fields[8]),
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<Option<T>> {
    if raw == "." {
        return Ok(None);
    }
    unescape(raw)
        .parse::<T>()
        .map(Some)
        .map_err(|_| GffError::line_parse(format!("invalid {field} '{raw}'")))
}

/// Format a [`GffLine`] as exactly one LF-terminated GFF3 row.
///
/// Absent fields are written as `.`; text fields are percent-escaped; the
/// attribute column uses the stable key order of
/// [`crate::codec::format_attributes`], so repeated formatting is
/// byte-stable.
pub fn format_feature_line(line: &GffLine) -> String {
    let text = |field: &Option<String>| -> String {
        field.as_deref().map(escape).unwrap_or_else(|| ".".to_string())
    };
    let num = |field: &Option<u64>| -> String {
        field.map(|n| n.to_string()).unwrap_or_else(|| ".".to_string())
    };

    let score = line
        .score
        .map(format_score)
        .unwrap_or_else(|| ".".to_string());
    let strand = line
        .strand
        .map(|s| s.symbol().to_string())
        .unwrap_or_else(|| ".".to_string());
    let phase = line
        .phase
        .map(|p| p.to_string())
        .unwrap_or_else(|| ".".to_string());

    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        text(&line.seq_id),
        text(&line.source),
        text(&line.feature_type),
        num(&line.start),
        num(&line.end),
        score,
        strand,
        phase,
        format_attributes(&line.attributes),
    )
}

/// Integral scores keep one decimal place so a parsed `0.0` formats back
/// to `0.0` rather than `0`.
fn format_score(score: f64) -> String {
    if score.is_finite() && score.fract() == 0.0 {
        format!("{score:.1}")
    } else {
        score.to_string()
    }
}
