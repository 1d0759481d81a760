//! Request descriptors
//!
//! A descriptor is everything needed to send (and later replay) a request.
//! It is immutable once built: a replay is a new descriptor with the attempt
//! count incremented, so the coordinator can bound retries without mutating
//! shared state.

use reqwest::Method;

use crate::{Result, TransportError};

/// Payload of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Sent as `multipart/form-data`; the transport writes the boundary header.
    Multipart(MultipartForm),
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Multipart form kept as plain data so a request can be replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(str::to_owned),
            bytes,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Build a fresh reqwest form. Called once per attempt since reqwest forms
    /// are consumed on send.
    pub(crate) fn to_form(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            TransportError::InvalidRequest(format!(
                                "invalid mime type {mime:?} for part {name}: {e}"
                            ))
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Verb, path, payload, and auth requirement of one logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: Option<serde_json::Value>,
    body: RequestBody,
    requires_auth: bool,
    attempt: u32,
}

impl RequestDescriptor {
    /// New authenticated request with no payload.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: RequestBody::Empty,
            requires_auth: true,
            attempt: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Query parameters, serialized from a flat JSON object.
    pub fn query(mut self, params: serde_json::Value) -> Self {
        self.query = Some(params);
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn with_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Send without a bearer credential (login, refresh, public endpoints).
    pub fn without_auth(self) -> Self {
        self.with_auth(false)
    }

    /// The same request, one attempt later.
    pub fn replay(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> Option<&serde_json::Value> {
        self.query.as_ref()
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// 0 for the original send, 1 for the post-refresh replay.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_authenticated_first_attempt() {
        let request = RequestDescriptor::get("/user/profile");
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/user/profile");
        assert!(request.requires_auth());
        assert_eq!(request.attempt(), 0);
        assert_eq!(request.body(), &RequestBody::Empty);
    }

    #[test]
    fn replay_increments_attempt_and_keeps_payload() {
        let original = RequestDescriptor::post("/orders")
            .json(serde_json::json!({"item": 7}))
            .without_auth();
        let replayed = original.replay();

        assert_eq!(original.attempt(), 0, "original is untouched");
        assert_eq!(replayed.attempt(), 1);
        assert_eq!(replayed.body(), original.body());
        assert!(!replayed.requires_auth());
        assert_eq!(replayed.replay().attempt(), 2);
    }

    #[test]
    fn multipart_form_keeps_part_order() {
        let form = MultipartForm::new()
            .text("title", "receipt")
            .file("image", "r.png", Some("image/png"), vec![1, 2, 3]);
        assert_eq!(form.parts().len(), 2);
        assert!(matches!(&form.parts()[0], FormPart::Text { name, .. } if name == "title"));
        assert!(form.to_form().is_ok());
    }

    #[test]
    fn invalid_mime_is_rejected() {
        let form = MultipartForm::new().file("image", "r.png", Some("not a mime"), vec![]);
        assert!(matches!(
            form.to_form(),
            Err(TransportError::InvalidRequest(_))
        ));
    }
}
