// Response envelope: `{"success": true, "data": ...}` or `{"success": false, "error": "..."}`.
// A sum type, so data and error can never both be present.

use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success(T),
    Failure(String),
}

impl<T> ApiResult<T> {
    pub fn success(data: T) -> Self {
        ApiResult::Success(data)
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ApiResult::Failure(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResult::Success(d) => Some(d),
            ApiResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResult::Success(_) => None,
            ApiResult::Failure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiResult::Success(d) => Ok(d),
            ApiResult::Failure(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, SchemaError>> for ApiResult<T> {
    fn from(r: Result<T, SchemaError>) -> Self {
        match r {
            Ok(d) => ApiResult::Success(d),
            Err(e) => ApiResult::Failure(e.to_string()),
        }
    }
}

impl<T: Serialize> Serialize for ApiResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Result", 2)?;
        match self {
            ApiResult::Success(data) => {
                s.serialize_field("success", &true)?;
                s.serialize_field("data", data)?;
            }
            ApiResult::Failure(error) => {
                s.serialize_field("success", &false)?;
                s.serialize_field("error", error)?;
            }
        }
        s.end()
    }
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ApiResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::<T>::deserialize(deserializer)?;
        match (raw.success, raw.data, raw.error) {
            (true, Some(data), None) => Ok(ApiResult::Success(data)),
            (false, None, Some(error)) => Ok(ApiResult::Failure(error)),
            (true, _, Some(_)) => Err(D::Error::custom(
                "success envelope must not carry an error",
            )),
            (true, None, None) => Err(D::Error::custom("success envelope requires data")),
            (false, Some(_), _) => Err(D::Error::custom("failure envelope must not carry data")),
            (false, None, None) => Err(D::Error::custom("failure envelope requires an error")),
        }
    }
}
