use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

/// Multipart body collected into named parts. Later parts with the same name win.
pub struct FormParts {
    parts: HashMap<String, Bytes>,
}

impl FormParts {
    pub async fn collect(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut parts = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read field {name}: {e}")))?;
            parts.insert(name, data);
        }
        Ok(Self { parts })
    }

    /// Text field, trimmed. Empty string when absent.
    pub fn text(&self, name: &str) -> String {
        self.parts
            .get(name)
            .map(|b| String::from_utf8_lossy(b).trim().to_string())
            .unwrap_or_default()
    }

    /// Required text field.
    pub fn require_text(&self, name: &str) -> Result<String, AppError> {
        let value = self.text(name);
        if value.is_empty() {
            return Err(AppError::Validation(format!("{name} is required")));
        }
        Ok(value)
    }

    /// Required non-empty file field.
    pub fn require_file(&self, name: &str) -> Result<Bytes, AppError> {
        match self.parts.get(name) {
            Some(data) if !data.is_empty() => Ok(data.clone()),
            _ => Err(AppError::Validation(format!("No {name} file uploaded"))),
        }
    }
}
