use url::Url;

pub const MAX_LONG_URL_LENGTH: usize = 2048;

/// Checks a trimmed long URL and returns a user-facing message on rejection.
pub fn validate_long_url(long_url: &str) -> Result<(), String> {
    if long_url.is_empty() {
        return Err("Long URL cannot be empty".to_string());
    }
    if long_url.chars().count() > MAX_LONG_URL_LENGTH {
        return Err(format!(
            "Long URL must be at most {MAX_LONG_URL_LENGTH} characters"
        ));
    }

    let invalid = || "Invalid URL format. URL must start with http:// or https://".to_string();
    let url = Url::parse(long_url).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => Err(invalid()),
    }
}
