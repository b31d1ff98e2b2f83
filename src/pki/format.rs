//! PEM normalisation for certificates returned by the CA.
//!
//! FreeIPA hands certificates back as bare base64 DER. Everything leaving
//! the engine is wrapped in the standard delimiters so cert-manager can
//! store it verbatim.

/// Standard PEM certificate header.
pub const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// Standard PEM certificate footer.
pub const PEM_FOOTER: &str = "-----END CERTIFICATE-----";

/// Separator between PEM blocks of a CA bundle (one blank line).
pub const BUNDLE_SEPARATOR: &str = "\n\n";

/// Wrap `raw` in the PEM certificate header and footer, adding whichever
/// is missing.
///
/// The input is never inspected beyond its prefix and suffix; malformed
/// material is passed through wrapped as-is. Applying the function twice
/// yields the same string as applying it once.
pub fn normalize(raw: &str) -> String {
    let mut cert = String::with_capacity(raw.len() + PEM_HEADER.len() + PEM_FOOTER.len() + 2);

    if !raw.starts_with(PEM_HEADER) {
        cert.push_str(PEM_HEADER);
        cert.push('\n');
    }
    cert.push_str(raw);
    if !raw.ends_with(PEM_FOOTER) {
        cert.push('\n');
        cert.push_str(PEM_FOOTER);
    }

    cert
}

/// Normalise every entry and join them into a single CA bundle.
pub fn bundle<I, S>(entries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| normalize(entry.as_ref()))
        .collect::<Vec<_>>()
        .join(BUNDLE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAPPED: &str = "-----BEGIN CERTIFICATE-----\ncert\n-----END CERTIFICATE-----";

    #[test]
    fn no_header_no_footer() {
        assert_eq!(normalize("cert"), WRAPPED);
    }

    #[test]
    fn with_header_no_footer() {
        assert_eq!(normalize("-----BEGIN CERTIFICATE-----\ncert"), WRAPPED);
    }

    #[test]
    fn no_header_with_footer() {
        assert_eq!(normalize("cert\n-----END CERTIFICATE-----"), WRAPPED);
    }

    #[test]
    fn with_header_with_footer() {
        assert_eq!(normalize(WRAPPED), WRAPPED);
    }

    #[test]
    fn empty_input_is_still_wrapped() {
        assert_eq!(normalize(""), "-----BEGIN CERTIFICATE-----\n\n-----END CERTIFICATE-----");
    }

    #[test]
    fn bundle_separates_blocks_with_blank_line() {
        let joined = bundle(["ca1", "ca2"]);
        assert_eq!(
            joined,
            "-----BEGIN CERTIFICATE-----\nca1\n-----END CERTIFICATE-----\n\n\
             -----BEGIN CERTIFICATE-----\nca2\n-----END CERTIFICATE-----"
        );
    }

    #[test]
    fn bundle_of_nothing_is_empty() {
        assert_eq!(bundle(Vec::<String>::new()), "");
    }
}
