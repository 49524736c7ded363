//! Parsing of the comma-separated altitude list.

use crate::error::{InputError, MalformedField};

/// Parse `"1,2,3"` into altitudes.
///
/// Whitespace around a field is ignored. Every malformed field (empty segment,
/// trailing comma, non-integer text) is logged as a warning; if there is at
/// least one, the whole list is rejected rather than silently skipping or
/// zeroing values, which would shift every later sample's distance.
///
/// ```
/// use ferrovis::{parse_altitudes, InputError};
///
/// assert_eq!(parse_altitudes("5, 1,-3")?, vec![5, 1, -3]);
/// assert!(matches!(parse_altitudes("1,,2"), Err(InputError::Malformed(_))));
/// # Ok::<(), InputError>(())
/// ```
pub fn parse_altitudes(text: &str) -> Result<Vec<i64>, InputError> {
    if text.trim().is_empty() {
        return Err(InputError::Empty);
    }

    let mut altitudes = Vec::new();
    let mut malformed = Vec::new();
    for (position, field) in text.split(',').enumerate() {
        let trimmed = field.trim();
        let parsed = if trimmed.is_empty() {
            Err("empty field".to_string())
        } else {
            trimmed.parse::<i64>().map_err(|e| e.to_string())
        };

        match parsed {
            Ok(altitude) => altitudes.push(altitude),
            Err(reason) => {
                tracing::warn!(position, field, %reason, "wrong input format");
                malformed.push(MalformedField {
                    position,
                    text: field.to_string(),
                    reason,
                });
            }
        }
    }

    if malformed.is_empty() {
        Ok(altitudes)
    } else {
        Err(InputError::Malformed(malformed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_list() {
        assert_eq!(parse_altitudes("1,2,3,4,5").unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_altitudes("42").unwrap(), vec![42]);
        assert_eq!(parse_altitudes(" -7 , 0,12 ").unwrap(), vec![-7, 0, 12]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_altitudes(""), Err(InputError::Empty));
        assert_eq!(parse_altitudes("   "), Err(InputError::Empty));
    }

    #[test]
    fn every_bad_field_is_reported() {
        let Err(InputError::Malformed(fields)) = parse_altitudes(",1,x,2,") else {
            panic!("expected malformed input");
        };
        let positions: Vec<usize> = fields.iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![0, 2, 4]);
        assert_eq!(fields[0].reason, "empty field");
        assert_eq!(fields[1].text, "x");
    }

    #[test]
    fn overflow_is_malformed() {
        let err = parse_altitudes("1,99999999999999999999").unwrap_err();
        assert!(matches!(err, InputError::Malformed(ref f) if f[0].position == 1));
    }
}
