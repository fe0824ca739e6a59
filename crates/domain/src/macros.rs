//! Macro for implementing Display and FromStr for label enums
//!
//! Scheduler kinds, scheduler phases and HTTP methods all travel through
//! logs and configuration as short lowercase labels. This macro keeps the
//! `Display`/`FromStr` pair for each of them in one place.
//!
//! # Example
//!
//! ```rust
//! use odp_session_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Primary,
//!     Fallback,
//! }
//!
//! impl_label_conversions!(Channel {
//!     Primary => "primary",
//!     Fallback => "fallback",
//! });
//!
//! assert_eq!(Channel::Primary.to_string(), "primary");
//! assert_eq!("FALLBACK".parse::<Channel>(), Ok(Channel::Fallback));
//! ```

/// Implements Display and FromStr traits for label enums
///
/// - Display writes the label verbatim
/// - FromStr matches case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Lane {
        Fast,
        Slow,
    }

    impl_label_conversions!(Lane {
        Fast => "fast",
        Slow => "slow",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(Lane::Fast.to_string(), "fast");
        assert_eq!(Lane::Slow.to_string(), "slow");
    }

    #[test]
    fn test_fromstr_is_case_insensitive() {
        assert_eq!(Lane::from_str("fast").unwrap(), Lane::Fast);
        assert_eq!(Lane::from_str("SLOW").unwrap(), Lane::Slow);
        assert_eq!(Lane::from_str("FaSt").unwrap(), Lane::Fast);
    }

    #[test]
    fn test_fromstr_invalid() {
        let err = Lane::from_str("sideways").unwrap_err();
        assert!(err.contains("Lane"));
        assert!(err.contains("sideways"));
    }
}
