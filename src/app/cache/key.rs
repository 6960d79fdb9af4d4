//! Cache keys and resource versions
//!
//! A resource is identified on disk by the MD5 of its URI and revised by the
//! remote last-modified timestamp. Neither is persisted as an object; both are
//! recomputed on every lookup.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use url::Url;

use crate::app::hash::{InvalidHash, Md5Hash};

/// Stable, filesystem-safe identifier of a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceKey(Md5Hash);

impl ResourceKey {
    /// Derive the key of a resource from its URI
    ///
    /// `Url` serializes to ASCII (IDNA hosts, percent-escaped paths), so the
    /// hash input is the ASCII form of the URI.
    ///
    /// ```rust
    /// use fetch_cache::app::cache::ResourceKey;
    /// use url::Url;
    ///
    /// let uri = Url::parse("https://my-server.com/path/to/config/config.xml").unwrap();
    /// assert_eq!(ResourceKey::derive(&uri), ResourceKey::derive(&uri.clone()));
    /// assert_eq!(ResourceKey::derive(&uri).to_string().len(), 32);
    /// ```
    pub fn derive(uri: &Url) -> Self {
        ResourceKey(Md5Hash::compute(uri.as_str().as_bytes()))
    }

    /// Underlying hash
    pub fn hash(&self) -> &Md5Hash {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ResourceKey {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Md5Hash::from_hex(s).map(ResourceKey)
    }
}

/// One revision of a remote resource: its last-modified epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(epoch_millis: i64) -> Self {
        Version(epoch_millis)
    }

    /// Epoch milliseconds of a timestamp; times before the epoch map to 0
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Version(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Version)
    }
}

impl From<i64> for Version {
    fn from(epoch_millis: i64) -> Self {
        Version(epoch_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_key_is_md5_of_ascii_uri() {
        let uri = Url::parse("https://my-server.com/path/to/config/config.xml").unwrap();
        let key = ResourceKey::derive(&uri);

        assert_eq!(key.hash(), &Md5Hash::compute(uri.as_str()));
        assert!(key
            .to_string()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_key_distinguishes_uris() {
        let a = Url::parse("https://my-server.com/a.jar").unwrap();
        let b = Url::parse("https://my-server.com/b.jar").unwrap();
        assert_ne!(ResourceKey::derive(&a), ResourceKey::derive(&b));
    }

    #[test]
    fn test_key_uses_escaped_form() {
        let uri = Url::parse("https://my-server.com/dir/naïve file.jar").unwrap();
        assert!(uri.as_str().is_ascii());
        assert_eq!(
            ResourceKey::derive(&uri).hash(),
            &Md5Hash::compute("https://my-server.com/dir/na%C3%AFve%20file.jar")
        );
    }

    #[test]
    fn test_key_round_trips_through_directory_name() {
        let uri = Url::parse("file:///etc/hosts").unwrap();
        let key = ResourceKey::derive(&uri);
        let parsed: ResourceKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("not-a-key".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn test_version_ordering_and_parsing() {
        let v1: Version = "1525456404".parse().unwrap();
        let v2 = Version::new(1525456405);

        assert!(v1 < v2);
        assert_eq!(v1.to_string(), "1525456404");
        assert!("latest".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_from_system_time() {
        let time = UNIX_EPOCH + Duration::from_millis(1_000);
        assert_eq!(Version::from_system_time(time), Version::new(1_000));
        assert_eq!(
            Version::from_system_time(UNIX_EPOCH - Duration::from_secs(1)),
            Version::new(0)
        );
    }
}
