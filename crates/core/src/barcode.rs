//! Maps a decoded QR/barcode payload onto canonical fields.
//!
//! Aadhaar and PAN cards embed an attribute-bearing XML blob; passports use
//! a PDF417 barcode with a different encoding, so their payload is kept
//! opaque under a single "barcode_data" key.

use crate::error::ExtractError;
use crate::models::DocType;
use roxmltree::Document;
use std::collections::BTreeMap;

/// Aadhaar address sub-fields, concatenated in this order when the payload
/// has no pre-composed address attribute. Missing parts stay as empty
/// strings so the joined layout is stable.
const ADDRESS_PARTS: [&str; 9] = [
    "house", "street", "loc", "vtc", "po", "dist", "subdist", "state", "pc",
];

/// Parses a decoded payload into canonical fields for the declared type.
///
/// Returns `ExtractError::Payload` when an aadhaar/pan payload is not the
/// expected XML; the pipeline treats that as "no data from this stage".
pub fn parse_structured_payload(
    doc_type: DocType,
    payload: &str,
) -> Result<BTreeMap<String, Option<String>>, ExtractError> {
    if doc_type == DocType::Passport {
        let mut fields = BTreeMap::new();
        fields.insert("barcode_data".to_string(), Some(payload.to_string()));
        return Ok(fields);
    }

    let document =
        Document::parse(payload).map_err(|error| ExtractError::Payload(error.to_string()))?;
    let root = document.root_element();
    let attr = |name: &str| root.attribute(name).map(str::to_string);

    let mut fields = BTreeMap::new();
    fields.insert("Name".to_string(), attr("name"));
    fields.insert("DOB".to_string(), attr("dob"));
    fields.insert("Gender".to_string(), attr("gender"));

    match doc_type {
        DocType::Aadhaar => {
            fields.insert("Aadhaar Number".to_string(), attr("uid"));
            fields.insert(
                "Father/Husband Name".to_string(),
                Some(clean_guardian_name(root.attribute("co").unwrap_or(""))),
            );
            fields.insert("Address".to_string(), Some(compose_address(&root)));
        }
        DocType::Pan => {
            fields.insert("PAN Number".to_string(), attr("pan"));
            fields.insert("Father Name".to_string(), attr("fathers_name"));
        }
        DocType::Passport => unreachable!("handled above"),
    }

    Ok(fields)
}

/// Strips a leading "S/O:" or "D/O:" marker from the guardian name. The
/// marker must carry the colon; a bare "D/O" is left alone.
fn clean_guardian_name(raw: &str) -> String {
    let trimmed = raw.trim();
    for prefix in ["S/O:", "D/O:"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Prefers the payload's pre-composed address attribute verbatim; otherwise
/// joins the sub-fields in fixed order, keeping empties.
fn compose_address(root: &roxmltree::Node<'_, '_>) -> String {
    if let Some(explicit) = root.attribute("Address") {
        if !explicit.is_empty() {
            return explicit.to_string();
        }
    }

    ADDRESS_PARTS
        .iter()
        .map(|part| root.attribute(*part).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}
