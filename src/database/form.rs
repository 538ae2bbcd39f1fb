use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use super::error::{ApiError, FieldErrors};

pub type FormData = HashMap<String, Value>;

/// A decoded JSON request body, checked field by field before it reaches the database.
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn parse<T>(self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Validate,
    {
        let nulls: FieldErrors = self
            .inner
            .iter()
            .filter(|(_, value)| value.is_null())
            .map(|(key, _)| (key.to_owned(), vec![String::from("This field may not be null.")]))
            .collect();
        if !nulls.is_empty() {
            return Err(ApiError::Validation(nulls));
        }

        let value = Value::Object(self.inner.into_iter().collect());
        let parsed: T = serde_json::from_value(value).map_err(deserialize_error)?;
        parsed.validate()?;

        Ok(parsed)
    }
}

fn deserialize_error(err: serde_json::Error) -> ApiError {
    let message = err.to_string();

    match message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        Some(field) => ApiError::field(field, "This field is required."),
        None => ApiError::non_field(&message),
    }
}
