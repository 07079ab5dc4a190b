use url::Url;

const FILE_SCHEME: &str = "file://";
const LOCALHOST_PREFIX: &str = "file://localhost";

/// Rewrites track locations by swapping a leading prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapper {
    rule: Option<(String, String)>,
    localhost_prefix: bool,
}

impl PathMapper {
    /// A mapper that returns every path unchanged.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            rule: Some((search.into(), replacement.into())),
            localhost_prefix: false,
        }
    }

    /// Rewritten paths are additionally emitted as `file://localhost/...` URLs.
    pub fn with_localhost_prefix(mut self, enabled: bool) -> Self {
        self.localhost_prefix = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.rule.is_some()
    }

    pub fn map_path(&self, path: &str) -> String {
        let Some((search, replacement)) = &self.rule else {
            return path.to_string();
        };
        let Some(suffix) = path.strip_prefix(search.as_str()) else {
            return path.to_string();
        };

        let mapped = format!("{replacement}{suffix}");
        if self.localhost_prefix {
            add_localhost_prefix(mapped)
        } else {
            mapped
        }
    }
}

fn add_localhost_prefix(location: String) -> String {
    if location.starts_with(LOCALHOST_PREFIX) {
        return location;
    }
    if let Some(rest) = location.strip_prefix(FILE_SCHEME) {
        return format!("{LOCALHOST_PREFIX}{rest}");
    }
    // Plain filesystem path: percent-encode it as a file URL first.
    match Url::from_file_path(&location) {
        Ok(url) => format!("{LOCALHOST_PREFIX}{}", url.path()),
        Err(()) => location,
    }
}
