//! Certificate signing request decoding.

use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

const CSR_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// Fields of a decoded CSR that the provisioner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCsr {
    /// The PEM text as submitted, forwarded untouched to the CA.
    pub pem: String,

    /// Subject common name, empty when the subject carries none.
    pub common_name: String,
}

/// Decode a PEM encoded PKCS#10 request.
///
/// Returns a human readable reason on failure; the caller wraps it into
/// the decode error for its issuer.
pub fn decode(request: &[u8]) -> Result<DecodedCsr, String> {
    let pem_text = std::str::from_utf8(request)
        .map_err(|e| format!("certificate request is not valid UTF-8: {}", e))?;

    let (_, pem) = parse_x509_pem(request)
        .map_err(|e| format!("error decoding certificate request PEM block: {}", e))?;

    if !CSR_LABELS.contains(&pem.label.as_str()) {
        return Err(format!("unexpected PEM block type {:?}", pem.label));
    }

    let (_, csr) = X509CertificationRequest::from_der(&pem.contents)
        .map_err(|e| format!("error parsing certificate request: {}", e))?;

    let common_name = match csr.certification_request_info.subject.iter_common_name().next() {
        Some(attr) => attr
            .as_str()
            .map_err(|e| format!("subject common name is not a string: {}", e))?
            .to_string(),
        None => String::new(),
    };

    Ok(DecodedCsr { pem: pem_text.to_string(), common_name })
}
