//! Station credentials owned by the Wi-Fi manager.
//!
//! Platform-independent so validation and the stored byte format can be
//! tested on the host.
//!
//! ```
//! use esp32_wifi_manager_app::wifi::WifiCredentials;
//!
//! let creds = WifiCredentials::new("MyNetwork", "MyPassword").unwrap();
//! assert!(!creds.is_open());
//! ```

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum WPA2 passphrase length.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum WPA2 passphrase length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Credentials for joining an access point in station mode.
///
/// The password is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WifiCredentials {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Passphrase (8-64 bytes, empty for open networks).
    pub password: String,
}

impl WifiCredentials {
    /// Create validated credentials.
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let creds = Self {
            ssid: ssid.into(),
            password: password.into(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Credentials for an open network.
    pub fn open(ssid: impl Into<String>) -> Result<Self, CredentialError> {
        Self::new(ssid, String::new())
    }

    /// Validate SSID and password lengths.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.ssid.is_empty() {
            return Err(CredentialError::SsidEmpty);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(CredentialError::SsidTooLong {
                len: self.ssid.len(),
                max: MAX_SSID_LEN,
            });
        }
        if !self.password.is_empty() && self.password.len() < MIN_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooShort {
                len: self.password.len(),
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooLong {
                len: self.password.len(),
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// True when no password is set.
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }

    /// Encode for storage as `[ssid_len:1][ssid][password_len:1][password]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.ssid.len() + self.password.len());
        bytes.push(self.ssid.len() as u8);
        bytes.extend_from_slice(self.ssid.as_bytes());
        bytes.push(self.password.len() as u8);
        bytes.extend_from_slice(self.password.as_bytes());
        bytes
    }

    /// Decode the storage format written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        let (ssid, rest) = take_field(bytes, "SSID")?;
        let (password, _) = take_field(rest, "password")?;
        Self::new(ssid, password)
    }
}

/// Split one length-prefixed UTF-8 field off the front of `bytes`.
fn take_field<'a>(bytes: &'a [u8], what: &str) -> Result<(String, &'a [u8]), CredentialError> {
    let (&len, rest) = bytes
        .split_first()
        .ok_or_else(|| CredentialError::InvalidFormat(format!("missing {} length", what)))?;
    let len = len as usize;
    if rest.len() < len {
        return Err(CredentialError::InvalidFormat(format!("truncated {}", what)));
    }
    let (field, rest) = rest.split_at(len);
    let field = String::from_utf8(field.to_vec())
        .map_err(|_| CredentialError::InvalidFormat(format!("invalid {} UTF-8", what)))?;
    Ok((field, rest))
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &if self.is_open() { "" } else { "****" })
            .finish()
    }
}

/// Credential validation and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Password is too short for WPA2.
    PasswordTooShort { len: usize, min: usize },
    /// Password exceeds maximum length.
    PasswordTooLong { len: usize, max: usize },
    /// Stored bytes could not be decoded.
    InvalidFormat(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooShort { len, min } => {
                write!(f, "password too short: {} bytes (min {})", len, min)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
        }
    }
}

impl std::error::Error for CredentialError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let creds = WifiCredentials::new("MyNetwork", "MyPassword").unwrap();
        assert_eq!(creds.ssid, "MyNetwork");
        assert!(!creds.is_open());
    }

    #[test]
    fn test_open_network() {
        let creds = WifiCredentials::open("OpenNetwork").unwrap();
        assert!(creds.is_open());
    }

    #[test]
    fn test_empty_ssid() {
        assert_eq!(
            WifiCredentials::new("", "password123"),
            Err(CredentialError::SsidEmpty)
        );
    }

    #[test]
    fn test_ssid_length_limits() {
        assert!(WifiCredentials::new("a".repeat(32), "password123").is_ok());
        assert!(matches!(
            WifiCredentials::new("a".repeat(33), "password123"),
            Err(CredentialError::SsidTooLong { len: 33, max: 32 })
        ));
    }

    #[test]
    fn test_password_length_limits() {
        assert!(matches!(
            WifiCredentials::new("Net", "short"),
            Err(CredentialError::PasswordTooShort { len: 5, min: 8 })
        ));
        assert!(WifiCredentials::new("Net", "12345678").is_ok());
        assert!(WifiCredentials::new("Net", "a".repeat(64)).is_ok());
        assert!(matches!(
            WifiCredentials::new("Net", "a".repeat(65)),
            Err(CredentialError::PasswordTooLong { .. })
        ));
    }

    #[test]
    fn test_stored_format_layout() {
        let creds = WifiCredentials::new("Net", "12345678").unwrap();
        let bytes = creds.to_bytes();
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..4], b"Net");
        assert_eq!(bytes[4], 8);
        assert_eq!(WifiCredentials::from_bytes(&bytes).unwrap(), creds);
    }

    #[test]
    fn test_decode_open_network() {
        let bytes = WifiCredentials::open("OpenNet").unwrap().to_bytes();
        assert!(WifiCredentials::from_bytes(&bytes).unwrap().is_open());
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(
            WifiCredentials::from_bytes(&[]),
            Err(CredentialError::InvalidFormat(_))
        ));
        // SSID claims 5 bytes but only 4 follow.
        assert!(matches!(
            WifiCredentials::from_bytes(&[5, b'h', b'e', b'l', b'l']),
            Err(CredentialError::InvalidFormat(_))
        ));
        // Password length byte missing.
        assert!(matches!(
            WifiCredentials::from_bytes(&[2, b'h', b'i']),
            Err(CredentialError::InvalidFormat(_))
        ));
        assert!(matches!(
            WifiCredentials::from_bytes(&[2, 0xff, 0xfe, 0]),
            Err(CredentialError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = WifiCredentials::new("Net", "supersecret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("Net"));
        assert!(!debug.contains("supersecret"));
    }
}
