use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("descriptor is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("descriptor must be a JSON object")]
    NotAnObject,

    #[error("field `{0}` must be a string, number or boolean")]
    NonScalarField(String),
}

/// Turns a raw queue entry into a `field -> value` map
pub trait DescriptorDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<HashMap<String, String>, DecodeError>;
}

/// Decodes a flat JSON object, stringifying scalar values and skipping `null`
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl DescriptorDecoder for JsonDecoder {
    fn decode(&self, raw: &[u8]) -> Result<HashMap<String, String>, DecodeError> {
        let Value::Object(object) = serde_json::from_slice::<Value>(raw)? else {
            return Err(DecodeError::NotAnObject);
        };

        let mut fields = HashMap::with_capacity(object.len());
        for (name, value) in object {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(DecodeError::NonScalarField(name));
                }
            };
            fields.insert(name, text);
        }
        Ok(fields)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Encrypt,
    Decrypt,
    Checksum,
    Unrecognized(String),
}

impl Action {
    /// Case-insensitive parse; anything else is kept as `Unrecognized`
    pub fn parse(raw: &str) -> Self {
        let action = raw.to_ascii_lowercase();
        match action.as_str() {
            "encrypt" => Action::Encrypt,
            "decrypt" => Action::Decrypt,
            "checksum" => Action::Checksum,
            _ => Action::Unrecognized(action),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Encrypt => f.write_str("encrypt"),
            Action::Decrypt => f.write_str("decrypt"),
            Action::Checksum => f.write_str("checksum"),
            Action::Unrecognized(name) => write!(f, "unrecognized({name})"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidJob {
    #[error("descriptor has {0} field(s), at least 2 are required")]
    TooFewFields(usize),

    #[error("descriptor is missing `{0}`")]
    MissingField(&'static str),
}

/// A validated file-processing job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub action: Action,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

impl JobDescriptor {
    pub const MIN_FIELDS: usize = 2;

    /// Build a job from decoded fields
    ///
    /// Needs at least two fields, with non-empty `action` and `input`. An
    /// empty `output` counts as absent.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, InvalidJob> {
        if fields.len() < Self::MIN_FIELDS {
            return Err(InvalidJob::TooFewFields(fields.len()));
        }

        let action = non_empty(fields, "action").ok_or(InvalidJob::MissingField("action"))?;
        let input = non_empty(fields, "input").ok_or(InvalidJob::MissingField("input"))?;

        Ok(Self {
            action: Action::parse(action),
            input: PathBuf::from(input),
            output: non_empty(fields, "output").map(PathBuf::from),
        })
    }
}

fn non_empty<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}
