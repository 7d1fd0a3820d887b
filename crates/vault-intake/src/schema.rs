//! Applicant schema shared by the evaluation relay and the form client.
//!
//! Both surfaces run the same [`validate`] so their verdicts cannot drift. The
//! relay's run is the one that counts; the form runs it only to give feedback
//! before a round trip.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// The eleven fields of an application, in declaration order. Violations are
/// reported in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ApplicationField {
    NameFirst = 0,
    NameLast,
    AddressLine1,
    AddressLine2,
    AddressCity,
    AddressState,
    AddressPostalCode,
    AddressCountryCode,
    DocumentSsn,
    EmailAddress,
    BirthDate,
}

const FIELD_COUNT: usize = 11;

impl ApplicationField {
    pub const ALL: [ApplicationField; FIELD_COUNT] = [
        ApplicationField::NameFirst,
        ApplicationField::NameLast,
        ApplicationField::AddressLine1,
        ApplicationField::AddressLine2,
        ApplicationField::AddressCity,
        ApplicationField::AddressState,
        ApplicationField::AddressPostalCode,
        ApplicationField::AddressCountryCode,
        ApplicationField::DocumentSsn,
        ApplicationField::EmailAddress,
        ApplicationField::BirthDate,
    ];

    /// Wire name of the field.
    pub fn key(&self) -> &'static str {
        match self {
            ApplicationField::NameFirst => "name_first",
            ApplicationField::NameLast => "name_last",
            ApplicationField::AddressLine1 => "address_line_1",
            ApplicationField::AddressLine2 => "address_line_2",
            ApplicationField::AddressCity => "address_city",
            ApplicationField::AddressState => "address_state",
            ApplicationField::AddressPostalCode => "address_postal_code",
            ApplicationField::AddressCountryCode => "address_country_code",
            ApplicationField::DocumentSsn => "document_ssn",
            ApplicationField::EmailAddress => "email_address",
            ApplicationField::BirthDate => "birth_date",
        }
    }

    /// Human label shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationField::NameFirst => "First Name",
            ApplicationField::NameLast => "Last Name",
            ApplicationField::AddressLine1 => "Address Line 1",
            ApplicationField::AddressLine2 => "Address Line 2",
            ApplicationField::AddressCity => "City",
            ApplicationField::AddressState => "State",
            ApplicationField::AddressPostalCode => "Zip Code",
            ApplicationField::AddressCountryCode => "Country",
            ApplicationField::DocumentSsn => "SSN (9 digits)",
            ApplicationField::EmailAddress => "Email Address",
            ApplicationField::BirthDate => "DOB",
        }
    }

    fn rule(&self) -> Rule {
        match self {
            ApplicationField::NameFirst => Rule::NonEmpty("First name is required"),
            ApplicationField::NameLast => Rule::NonEmpty("Last name is required"),
            ApplicationField::AddressLine1 => Rule::NonEmpty("Address line 1 is required"),
            ApplicationField::AddressLine2 => Rule::Optional,
            ApplicationField::AddressCity => Rule::NonEmpty("City is required"),
            ApplicationField::AddressState => Rule::StateCode,
            ApplicationField::AddressPostalCode => Rule::PostalCode,
            ApplicationField::AddressCountryCode => Rule::CountryUs,
            ApplicationField::DocumentSsn => Rule::Ssn,
            ApplicationField::EmailAddress => Rule::Email,
            ApplicationField::BirthDate => Rule::BirthDate,
        }
    }
}

impl fmt::Display for ApplicationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    NonEmpty(&'static str),
    Optional,
    StateCode,
    PostalCode,
    CountryUs,
    Ssn,
    Email,
    BirthDate,
}

const STATE_MESSAGE: &str = "State must be two-letter code";
const POSTAL_MESSAGE: &str = "ZIP must be 5 or 9 digits";
const COUNTRY_MESSAGE: &str = "Country must be US";
const SSN_MESSAGE: &str = "SSN must be 9 digits";
const EMAIL_MESSAGE: &str = "Valid email required";
const BIRTH_DATE_MESSAGE: &str = "DOB must be YYYY-MM-DD";

static POSTAL_RE: OnceLock<Regex> = OnceLock::new();
static SSN_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static BIRTH_DATE_RE: OnceLock<Regex> = OnceLock::new();

fn postal_re() -> &'static Regex {
    POSTAL_RE.get_or_init(|| Regex::new(r"^[0-9]{5}(-[0-9]{4})?$").expect("postal pattern"))
}

fn ssn_re() -> &'static Regex {
    SSN_RE.get_or_init(|| Regex::new(r"^[0-9]{9}$").expect("ssn pattern"))
}

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(concat!(
            r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]",
            r"@(?:[A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$",
        ))
        .expect("email pattern")
    })
}

fn birth_date_re() -> &'static Regex {
    BIRTH_DATE_RE
        .get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("dob pattern"))
}

fn is_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && email_re().is_match(value)
}

impl Rule {
    fn apply(self, value: &str) -> Result<String, &'static str> {
        match self {
            Rule::NonEmpty(message) => {
                if value.is_empty() {
                    Err(message)
                } else {
                    Ok(value.to_string())
                }
            }
            Rule::Optional => Ok(value.to_string()),
            Rule::StateCode => {
                if value.chars().count() == 2 && value.chars().all(|c| c.is_ascii_alphabetic()) {
                    Ok(value.to_ascii_uppercase())
                } else {
                    Err(STATE_MESSAGE)
                }
            }
            Rule::PostalCode => accept_if(postal_re().is_match(value), value, POSTAL_MESSAGE),
            Rule::CountryUs => accept_if(value == "US", value, COUNTRY_MESSAGE),
            Rule::Ssn => accept_if(ssn_re().is_match(value), value, SSN_MESSAGE),
            Rule::Email => accept_if(is_email(value), value, EMAIL_MESSAGE),
            Rule::BirthDate => {
                accept_if(birth_date_re().is_match(value), value, BIRTH_DATE_MESSAGE)
            }
        }
    }
}

fn accept_if(ok: bool, value: &str, message: &'static str) -> Result<String, &'static str> {
    if ok {
        Ok(value.to_string())
    } else {
        Err(message)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check one field's raw value, returning the normalized text or the message
/// to report against it.
fn check_field(field: ApplicationField, raw: Option<&Value>) -> Result<String, String> {
    let rule = field.rule();
    match raw {
        Some(Value::String(value)) => rule.apply(value).map_err(str::to_string),
        _ if matches!(rule, Rule::CountryUs) => Err(COUNTRY_MESSAGE.to_string()),
        None if matches!(rule, Rule::Optional) => Ok(String::new()),
        None => Err("Required".to_string()),
        Some(other) => Err(format!("Expected string, received {}", json_type(other))),
    }
}

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Dotted path of the offending value; `payload` for the body itself.
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Non-empty, ordered list of violations for a rejected candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("application failed validation with {} violation(s)", .0.len())]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    /// `"<field>: <message>"` lines, as carried on the wire.
    pub fn details(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn message_for(&self, field: ApplicationField) -> Option<&str> {
        self.0
            .iter()
            .find(|violation| violation.field == field.key())
            .map(|violation| violation.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn payload(message: String) -> Self {
        Self(vec![FieldViolation {
            field: "payload".to_string(),
            message,
        }])
    }
}

/// A fully valid, normalized applicant record. Only [`validate`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    name_first: String,
    name_last: String,
    address_line_1: String,
    address_line_2: String,
    address_city: String,
    address_state: String,
    address_postal_code: String,
    address_country_code: String,
    document_ssn: String,
    email_address: String,
    birth_date: String,
}

impl Application {
    pub fn get(&self, field: ApplicationField) -> &str {
        match field {
            ApplicationField::NameFirst => &self.name_first,
            ApplicationField::NameLast => &self.name_last,
            ApplicationField::AddressLine1 => &self.address_line_1,
            ApplicationField::AddressLine2 => &self.address_line_2,
            ApplicationField::AddressCity => &self.address_city,
            ApplicationField::AddressState => &self.address_state,
            ApplicationField::AddressPostalCode => &self.address_postal_code,
            ApplicationField::AddressCountryCode => &self.address_country_code,
            ApplicationField::DocumentSsn => &self.document_ssn,
            ApplicationField::EmailAddress => &self.email_address,
            ApplicationField::BirthDate => &self.birth_date,
        }
    }

    pub fn name_last(&self) -> &str {
        &self.name_last
    }

    pub fn address_state(&self) -> &str {
        &self.address_state
    }
}

/// Validate a candidate record. Every field is checked; nothing short-circuits.
/// Keys outside the schema are dropped.
pub fn validate(candidate: &Value) -> Result<Application, ValidationErrors> {
    let object = match candidate {
        Value::Object(object) => object,
        other => {
            return Err(ValidationErrors::payload(format!(
                "Expected object, received {}",
                json_type(other)
            )))
        }
    };

    let mut values: [String; FIELD_COUNT] = Default::default();
    let mut violations = Vec::new();
    for field in ApplicationField::ALL {
        match check_field(field, object.get(field.key())) {
            Ok(value) => values[field as usize] = value,
            Err(message) => violations.push(FieldViolation {
                field: field.key().to_string(),
                message,
            }),
        }
    }

    if !violations.is_empty() {
        return Err(ValidationErrors(violations));
    }

    let mut take = |field: ApplicationField| std::mem::take(&mut values[field as usize]);
    Ok(Application {
        name_first: take(ApplicationField::NameFirst),
        name_last: take(ApplicationField::NameLast),
        address_line_1: take(ApplicationField::AddressLine1),
        address_line_2: take(ApplicationField::AddressLine2),
        address_city: take(ApplicationField::AddressCity),
        address_state: take(ApplicationField::AddressState),
        address_postal_code: take(ApplicationField::AddressPostalCode),
        address_country_code: take(ApplicationField::AddressCountryCode),
        document_ssn: take(ApplicationField::DocumentSsn),
        email_address: take(ApplicationField::EmailAddress),
        birth_date: take(ApplicationField::BirthDate),
    })
}

/// Raw, unvalidated values as typed into the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDraft {
    values: [String; FIELD_COUNT],
}

impl Default for ApplicationDraft {
    fn default() -> Self {
        let mut draft = Self {
            values: Default::default(),
        };
        draft.set(ApplicationField::AddressCountryCode, "US");
        draft
    }
}

impl ApplicationDraft {
    pub fn get(&self, field: ApplicationField) -> &str {
        &self.values[field as usize]
    }

    pub fn set(&mut self, field: ApplicationField, value: impl Into<String>) {
        self.values[field as usize] = value.into();
    }

    /// Build a draft from a JSON object, keeping only string values of known
    /// fields. Missing fields keep their form defaults.
    pub fn from_json(value: &Value) -> Self {
        let mut draft = Self::default();
        if let Value::Object(object) = value {
            for field in ApplicationField::ALL {
                if let Some(Value::String(raw)) = object.get(field.key()) {
                    draft.set(field, raw.clone());
                }
            }
        }
        draft
    }

    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = ApplicationField::ALL
            .into_iter()
            .map(|field| (field.key().to_string(), Value::String(self.get(field).to_string())))
            .collect();
        Value::Object(object)
    }

    pub fn validate(&self) -> Result<Application, ValidationErrors> {
        validate(&self.to_json())
    }
}
