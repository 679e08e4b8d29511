//! Failure reason classification
//!
//! Raw failure text from the processing backend or the transport layer is
//! never shown to users. Each reason is classified into a small fixed
//! taxonomy by case-insensitive substring match, evaluated in order with
//! first match winning.

/// Request or transfer failure
pub const MSG_TRANSFER: &str = "Cannot process this file. Please verify the file is valid.";
/// Empty or unextractable content
pub const MSG_NO_CONTENT: &str = "No content could be extracted. Please upload a different file.";
/// Invalid or corrupt structured format
pub const MSG_BAD_FORMAT: &str = "The file format is invalid. Please upload a different file.";
/// Scanned/image-only input
pub const MSG_SCANNED: &str =
    "Scanned documents are not supported. Please upload a file containing text.";
/// Connectivity failure
pub const MSG_NETWORK: &str = "Network error. Please check your connection.";
/// Unclassified fallback
pub const MSG_GENERIC: &str = "Upload failed. Please try again.";

/// Substring buckets in evaluation order; first match wins.
const BUCKETS: &[(&[&str], &str)] = &[
    (&["request", "transfer"], MSG_TRANSFER),
    (&["empty", "no content", "no text", "extract"], MSG_NO_CONTENT),
    (
        &["invalid", "corrupt", "malformed", "parse", "unsupported format"],
        MSG_BAD_FORMAT,
    ),
    (&["scan", "image-only", "image only", "ocr"], MSG_SCANNED),
    (
        &["network", "connection", "connect", "timed out", "timeout"],
        MSG_NETWORK,
    ),
];

/// Map a raw failure reason to its user-facing message
pub fn classify_failure(raw_reason: &str) -> &'static str {
    let lowered = raw_reason.to_lowercase();

    for (needles, message) in BUCKETS {
        if needles.iter().any(|needle| lowered.contains(needle)) {
            return message;
        }
    }

    MSG_GENERIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_failures() {
        assert_eq!(classify_failure("request failed: 502 Bad Gateway"), MSG_TRANSFER);
        assert_eq!(classify_failure("Transfer aborted by peer"), MSG_TRANSFER);
    }

    #[test]
    fn empty_content_failures() {
        assert_eq!(classify_failure("document is empty"), MSG_NO_CONTENT);
        assert_eq!(classify_failure("could not extract any fields"), MSG_NO_CONTENT);
    }

    #[test]
    fn format_failures() {
        assert_eq!(classify_failure("pdf parse invalid structure"), MSG_BAD_FORMAT);
        assert_eq!(classify_failure("corrupt xref table"), MSG_BAD_FORMAT);
    }

    #[test]
    fn scanned_input_failures() {
        assert_eq!(classify_failure("scanned document, no text layer"), MSG_SCANNED);
        assert_eq!(classify_failure("image-only PDF"), MSG_SCANNED);
    }

    #[test]
    fn connectivity_failures() {
        assert_eq!(classify_failure("network unreachable"), MSG_NETWORK);
        assert_eq!(classify_failure("connection reset"), MSG_NETWORK);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify_failure("REQUEST TIMED OUT"), MSG_TRANSFER);
    }

    #[test]
    fn first_match_wins_over_later_buckets() {
        // "network" appears in the reason, but the earlier format bucket
        // matches "invalid" first; evaluation order decides, not specificity.
        assert_eq!(
            classify_failure("invalid payload from network peer"),
            MSG_BAD_FORMAT
        );
    }

    #[test]
    fn unrecognized_reasons_fall_through_to_generic() {
        assert_eq!(classify_failure("err_code_7731"), MSG_GENERIC);
        assert_eq!(classify_failure(""), MSG_GENERIC);
    }
}
