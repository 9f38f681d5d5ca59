use crate::error::{ProcessingError, Result};
use crate::utils::constants::{FILE_ID_TRAILING_SEGMENT, FILE_ID_URI_SEGMENTS, STATION_URI_SEGMENTS};

fn segments_at(uri: &str, indices: &[usize]) -> Result<Vec<String>> {
    let segments: Vec<&str> = uri.split('/').collect();
    indices
        .iter()
        .map(|&index| {
            segments
                .get(index)
                .map(|segment| segment.to_string())
                .ok_or_else(|| ProcessingError::InvalidSourceUri {
                    uri: uri.to_string(),
                    reason: format!(
                        "expected at least {} path segments, found {}",
                        index + 1,
                        segments.len()
                    ),
                })
        })
        .collect()
}

/// Station identifier embedded in a document's source_uri
///
/// # Examples
/// ```
/// use swob_qa_processor::utils::station_from_uri;
///
/// let uri = "/data/raw/msc/observations/xml/partners/2019/20190101/bc-env-snow/1A01P/orig/file.xml";
/// assert_eq!(station_from_uri(uri).unwrap(), "1A01P_bc-env-snow");
/// ```
pub fn station_from_uri(uri: &str) -> Result<String> {
    Ok(segments_at(uri, &STATION_URI_SEGMENTS)?.join("_"))
}

/// Identifier unique to one observation file: station, date and trailing component
pub fn unique_file_id(uri: &str) -> Result<String> {
    let mut parts = segments_at(uri, &FILE_ID_URI_SEGMENTS)?;
    parts.extend(segments_at(uri, &[FILE_ID_TRAILING_SEGMENT])?);
    Ok(parts.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str =
        "/data/raw/msc/observations/xml/partners/2019/20190101/bc-env-snow/1A01P/orig/2019-01-01-0000-1A01P-AUTO-swob.xml";

    #[test]
    fn test_station_from_uri() {
        assert_eq!(station_from_uri(URI).unwrap(), "1A01P_bc-env-snow");
    }

    #[test]
    fn test_unique_file_id() {
        assert_eq!(
            unique_file_id(URI).unwrap(),
            "1A01P_bc-env-snow_20190101_2019-01-01-0000-1A01P-AUTO-swob.xml"
        );
    }

    #[test]
    fn test_short_uri_is_rejected() {
        let short = "/data/raw/file.xml";
        assert!(matches!(
            station_from_uri(short),
            Err(ProcessingError::InvalidSourceUri { .. })
        ));
        assert!(unique_file_id(short).is_err());
    }

    #[test]
    fn test_unique_file_id_needs_trailing_segment() {
        // Long enough for the station, one segment short of a file id
        let uri = "/a/b/c/d/e/f/g/h/i/j/k";
        assert_eq!(station_from_uri(uri).unwrap(), "j_i");
        assert!(unique_file_id(uri).is_err());
    }
}
