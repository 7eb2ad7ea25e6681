use std::fmt;

use scraper::{Html, Selector};

use super::error::ApiError;

/// Anti-forgery token scraped from the sign-in form. Required again at logout.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticityToken(String);

impl AuthenticityToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the token out of logs that print session state.
impl fmt::Debug for AuthenticityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthenticityToken(<redacted>)")
    }
}

/// Extract the `authenticity_token` hidden input from the sign-in page markup.
pub fn extract_authenticity_token(html: &str) -> Result<AuthenticityToken, ApiError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"input[name="authenticity_token"]"#)
        .map_err(|e| ApiError::malformed("sign-in page", format!("bad selector: {e:?}")))?;

    let input = document
        .select(&selector)
        .next()
        .ok_or(ApiError::AuthTokenMissing)?;

    match input.value().attr("value").map(str::trim) {
        Some(value) if !value.is_empty() => Ok(AuthenticityToken(value.to_string())),
        _ => Err(ApiError::AuthTokenEmpty),
    }
}
