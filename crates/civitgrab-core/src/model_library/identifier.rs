//! Model reference parsing.
//!
//! Accepts the shapes users paste on the command line or put into batch
//! files: a bare id (`4201`), an `id:version` pair (`4201:130072`) or a model
//! page URL (`https://civitai.com/models/4201/realistic-vision`).

use crate::error::{CivitError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static BARE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

static ID_VERSION_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<id>\d+):(?<version>\d+)$").unwrap());

static MODELS_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/models/(?<token>[^/?#]+)(?:[/?#]|$)").unwrap());

/// Query parameter Civitai uses to deep-link a version.
const VERSION_QUERY_PARAM: &str = "modelVersionId";

/// A model id with an optional version id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelReference {
    pub id: u64,
    pub version_id: Option<u64>,
}

impl ModelReference {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            version_id: None,
        }
    }

    pub fn with_version(mut self, version_id: Option<u64>) -> Self {
        if version_id.is_some() {
            self.version_id = version_id;
        }
        self
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version_id {
            Some(version) => write!(f, "{}:{}", self.id, version),
            None => write!(f, "{}", self.id),
        }
    }
}

impl FromStr for ModelReference {
    type Err = CivitError;

    fn from_str(s: &str) -> Result<Self> {
        parse_reference(s)
    }
}

impl TryFrom<u64> for ModelReference {
    type Error = CivitError;

    fn try_from(id: u64) -> Result<Self> {
        if id == 0 {
            return Err(CivitError::Parse {
                input: id.to_string(),
            });
        }
        Ok(Self::new(id))
    }
}

/// Parse a model reference from user input.
///
/// Whitespace and case are not normalized; anything that does not match one
/// of the accepted shapes is a [`CivitError::Parse`].
pub fn parse_reference(input: &str) -> Result<ModelReference> {
    let parse_error = || CivitError::Parse {
        input: input.to_string(),
    };
    let parse_id = |token: &str| -> Result<u64> {
        match token.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(parse_error()),
        }
    };

    if let Some(caps) = ID_VERSION_PAIR.captures(input) {
        let id = parse_id(&caps["id"])?;
        let version = parse_id(&caps["version"])?;
        return Ok(ModelReference::new(id).with_version(Some(version)));
    }

    if BARE_ID.is_match(input) {
        return Ok(ModelReference::new(parse_id(input)?));
    }

    let caps = MODELS_SEGMENT.captures(input).ok_or_else(parse_error)?;
    let id = parse_id(&caps["token"])?;

    Ok(ModelReference::new(id).with_version(version_from_query(input)))
}

/// Read `modelVersionId` from a URL query string, if the input is a URL.
fn version_from_query(input: &str) -> Option<u64> {
    let url = url::Url::parse(input).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == VERSION_QUERY_PARAM)
        .and_then(|(_, value)| value.parse::<u64>().ok())
        .filter(|version| *version > 0)
}
