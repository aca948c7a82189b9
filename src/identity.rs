// ABOUTME: Derives a machine identity string from an X.509 certificate
// ABOUTME: Subject Common Name first, then first DNS SAN, then a caller fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Certificate identity extraction
//!
//! Parse failures are returned as [`CredentialError`] values; the caller
//! decides what to fall back to.

use x509_parser::extensions::GeneralName;
use x509_parser::parse_x509_certificate;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::X509Certificate;

use crate::errors::CredentialError;

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Identity for a DER-encoded certificate
///
/// # Errors
/// Returns [`CredentialError::CertificateParse`] if `der` is not an X.509 certificate
pub fn identity_from_der(der: &[u8], fallback: &str) -> Result<String, CredentialError> {
    let (_, certificate) = parse_x509_certificate(der)
        .map_err(|e| CredentialError::CertificateParse(e.to_string()))?;
    Ok(identity_from_certificate(&certificate, fallback))
}

/// Identity for a parsed certificate: CN, else first DNS SAN, else `fallback`
#[must_use]
pub fn identity_from_certificate(certificate: &X509Certificate<'_>, fallback: &str) -> String {
    common_name(certificate)
        .or_else(|| first_dns_name(certificate))
        .unwrap_or_else(|| fallback.to_owned())
}

/// Non-empty Subject Common Name
#[must_use]
pub fn common_name(certificate: &X509Certificate<'_>) -> Option<String> {
    certificate
        .subject()
        .iter_common_name()
        .filter_map(|attr| attr.as_str().ok())
        .find(|cn| !cn.is_empty())
        .map(str::to_owned)
}

/// First DNS entry of the Subject Alternative Name extension
#[must_use]
pub fn first_dns_name(certificate: &X509Certificate<'_>) -> Option<String> {
    let san = certificate.subject_alternative_name().ok()??;
    san.value.general_names.iter().find_map(|name| match name {
        GeneralName::DNSName(dns) => Some((*dns).to_owned()),
        _ => None,
    })
}

/// DER bytes of the first PEM certificate block in `pem`
///
/// # Errors
/// Returns [`CredentialError::CertificatePem`] if the input does not start with
/// a PEM `CERTIFICATE` block
pub fn leaf_der_from_pem(pem: &[u8]) -> Result<Vec<u8>, CredentialError> {
    let (_, block) =
        parse_x509_pem(pem).map_err(|e| CredentialError::CertificatePem(e.to_string()))?;
    if block.label != PEM_CERTIFICATE_LABEL {
        return Err(CredentialError::CertificatePem(format!(
            "expected {PEM_CERTIFICATE_LABEL} block, found {}",
            block.label
        )));
    }
    Ok(block.contents)
}
