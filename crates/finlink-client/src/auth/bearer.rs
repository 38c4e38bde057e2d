/*
[INPUT]:  Sandbox access key
[OUTPUT]: Authorization: Bearer header
[POS]:    Auth layer - sandbox authentication (no secret key involved)
[UPDATE]: When sandbox auth scheme changes
*/

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;

use crate::credentials::Credentials;

use super::{Authenticator, SigningError};

/// Bearer-token authentication keyed by the access key only
#[derive(Debug, Clone)]
pub struct BearerAuth {
    access_key: String,
}

impl BearerAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            access_key: credentials.access_key.clone(),
        }
    }
}

impl Authenticator for BearerAuth {
    fn scheme(&self) -> &'static str {
        "bearer"
    }

    fn authenticate(&self, request: &mut Request) -> Result<(), SigningError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.access_key))
            .map_err(|_| SigningError::InvalidHeaderValue("authorization"))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    #[test]
    fn test_bearer_header() {
        let auth = BearerAuth::new(&Credentials::sandbox("sbx-key"));
        let mut request = Request::new(Method::GET, Url::parse("https://x.test/v1").unwrap());

        auth.authenticate(&mut request).unwrap();

        assert_eq!(request.headers()[AUTHORIZATION], "Bearer sbx-key");
        assert!(request.headers().get("x-signature").is_none());
    }

    #[test]
    fn test_bearer_rejects_unrepresentable_key() {
        let auth = BearerAuth::new(&Credentials::sandbox("bad\nkey"));
        let mut request = Request::new(Method::GET, Url::parse("https://x.test/v1").unwrap());
        assert!(matches!(
            auth.authenticate(&mut request),
            Err(SigningError::InvalidHeaderValue(_))
        ));
    }
}
