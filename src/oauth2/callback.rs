//! The browser redirect boundary of OAuth2 account provisioning
//!
//! The control plane finishes the authorization code exchange and then sends
//! the browser back to a callback URL pre-registered under the caller's
//! origin. That URL carries a `return_to` parameter so the caller resumes
//! where the user started, and on failure an `error` plus optional
//! `message`. Reaching the callback does not prove the account exists;
//! confirm with [`crate::provision::ConnectedAccountProvisioner::confirm_account`].

use url::Url;

use crate::error::{OnboardError, Result};

/// Query parameter naming the post-login location.
pub const RETURN_TO_PARAM: &str = "return_to";

/// The pre-registered callback location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    origin: Url,
    path: String,
}

impl CallbackTarget {
    /// Creates a target from an origin and an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Config`] when the origin does not parse or
    /// the path does not start with `/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_onboard::oauth2::callback::CallbackTarget;
    ///
    /// let target = CallbackTarget::new("https://app.example.com", "/oauth2/callback").unwrap();
    /// let url = target.redirect_url(Some("/bundles"));
    /// assert_eq!(
    ///     url.as_str(),
    ///     "https://app.example.com/oauth2/callback?return_to=%2Fbundles"
    /// );
    /// ```
    pub fn new(origin: &str, path: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|e| OnboardError::Config(format!("invalid callback origin '{origin}': {e}")))?;
        if !path.starts_with('/') {
            return Err(OnboardError::Config(format!(
                "callback path '{path}' must start with '/'"
            ))
            .into());
        }
        Ok(Self {
            origin,
            path: path.to_string(),
        })
    }

    /// Builds `{origin}{path}`, appending `return_to` when given.
    pub fn redirect_url(&self, return_to: Option<&str>) -> Url {
        let mut url = self.origin.clone();
        url.set_path(&self.path);
        url.set_query(None);
        url.set_fragment(None);
        if let Some(return_to) = return_to.filter(|r| !r.is_empty()) {
            url.query_pairs_mut().append_pair(RETURN_TO_PARAM, return_to);
        }
        url
    }
}

/// What the callback URL reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The control plane reported success
    Completed {
        /// Where to send the user next
        return_to: Option<String>,
    },
    /// The control plane or authorization server reported an error
    Failed {
        /// Error code
        error: String,
        /// Human-readable detail, if provided
        message: Option<String>,
    },
}

/// Interprets the query of a callback URL.
///
/// Missing or empty parameters are treated as absent. Undecodable percent
/// sequences are passed through lossily.
pub fn parse_callback(url: &Url) -> CallbackOutcome {
    let mut error = None;
    let mut message = None;
    let mut return_to = None;

    for (key, value) in url.query_pairs() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "error" => error = Some(value.to_string()),
            "message" => message = Some(value.to_string()),
            RETURN_TO_PARAM => return_to = Some(value.to_string()),
            _ => {}
        }
    }

    match error {
        Some(error) => CallbackOutcome::Failed { error, message },
        None => CallbackOutcome::Completed { return_to },
    }
}

/// Returns `url` without its `error` and `message` parameters.
pub fn clean_callback_url(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "error" && k != "message")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_relative_path() {
        assert!(CallbackTarget::new("https://app.example.com", "callback").is_err());
        assert!(CallbackTarget::new("not a url", "/callback").is_err());
    }

    #[test]
    fn test_redirect_url_without_return_to() {
        let target = CallbackTarget::new("https://app.example.com/ignored?x=1", "/cb").unwrap();
        assert_eq!(target.redirect_url(None).as_str(), "https://app.example.com/cb");
    }

    #[test]
    fn test_parse_callback_success_with_return_to() {
        let url = Url::parse("https://app.example.com/cb?return_to=%2Fbundles%3Ftab%3D1").unwrap();
        assert_eq!(
            parse_callback(&url),
            CallbackOutcome::Completed {
                return_to: Some("/bundles?tab=1".to_string())
            }
        );
    }

    #[test]
    fn test_parse_callback_error_with_message() {
        let url =
            Url::parse("https://app.example.com/cb?error=access_denied&message=User+declined")
                .unwrap();
        assert_eq!(
            parse_callback(&url),
            CallbackOutcome::Failed {
                error: "access_denied".to_string(),
                message: Some("User declined".to_string())
            }
        );
    }

    #[test]
    fn test_parse_callback_tolerates_bad_input() {
        let url = Url::parse("https://app.example.com/cb?error=&message=%ZZ&&=").unwrap();
        assert_eq!(
            parse_callback(&url),
            CallbackOutcome::Completed { return_to: None }
        );
    }

    #[test]
    fn test_clean_callback_url_strips_error_params() {
        let url =
            Url::parse("https://app.example.com/cb?error=x&return_to=%2Fhome&message=y").unwrap();
        let cleaned = clean_callback_url(&url);
        assert_eq!(cleaned.as_str(), "https://app.example.com/cb?return_to=%2Fhome");

        let only_error = Url::parse("https://app.example.com/cb?error=x").unwrap();
        assert_eq!(
            clean_callback_url(&only_error).as_str(),
            "https://app.example.com/cb"
        );
    }
}
