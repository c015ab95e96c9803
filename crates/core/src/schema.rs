//! Canonical field sets per document type, and the alias table that maps
//! the many spellings seen across extraction sources onto database columns.
//!
//! Field names are deliberately defined once here; extraction and save code
//! must not hard-code their own copies.

use crate::models::DocType;

/// Schema keys for aadhaar records. The barcode path fills a subset of these
/// (plus "Father/Husband Name", which the alias table folds back in).
pub const AADHAAR_FIELDS: &[&str] = &[
    "Name",
    "Gender",
    "DOB",
    "Aadhaar Number",
    "S/O (Son Of)",
    "Address",
    "Mobile Number",
    "Aadhaar Issue Date",
];

pub const PAN_FIELDS: &[&str] = &["Name", "Father Name", "DOB", "PAN Number"];

pub const PASSPORT_FIELDS: &[&str] = &[
    "Name",
    "DOB",
    "Passport Number",
    "Expiry Date",
    "Nationality",
];

pub fn canonical_fields(doc_type: DocType) -> &'static [&'static str] {
    match doc_type {
        DocType::Aadhaar => AADHAAR_FIELDS,
        DocType::Pan => PAN_FIELDS,
        DocType::Passport => PASSPORT_FIELDS,
    }
}

/// A database column together with every record key that may feed it.
/// Aliases are checked in order; the first non-empty value wins.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub aliases: &'static [&'static str],
}

pub const SAVE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        column: "full_name",
        aliases: &["Name", "name", "Full Name", "full_name"],
    },
    ColumnSpec {
        column: "dob",
        aliases: &["DOB", "dob", "Date of Birth", "date_of_birth"],
    },
    ColumnSpec {
        column: "gender",
        aliases: &["Gender", "gender"],
    },
    ColumnSpec {
        column: "aadhaar_number",
        aliases: &["Aadhaar Number", "aadhaar_no", "aadhaar"],
    },
    ColumnSpec {
        column: "pan_number",
        aliases: &["PAN Number", "pan_no", "pan"],
    },
    ColumnSpec {
        column: "passport_number",
        aliases: &["Passport Number", "passport_no", "passport", "barcode_data"],
    },
    ColumnSpec {
        column: "father_husband_name",
        aliases: &[
            "Father/Husband Name",
            "Father Name",
            "father_name",
            "fathers_name",
            "Husband Name",
            "S/O (Son Of)",
        ],
    },
    ColumnSpec {
        column: "address",
        aliases: &["Address", "address"],
    },
    ColumnSpec {
        column: "expiry_date",
        aliases: &["Expiry Date", "expiry_date", "expiry"],
    },
    ColumnSpec {
        column: "nationality",
        aliases: &["Nationality", "nationality"],
    },
];

/// Columns that must be unique across saved records.
pub const IDENTITY_COLUMNS: &[&str] = &["aadhaar_number", "pan_number", "passport_number"];
