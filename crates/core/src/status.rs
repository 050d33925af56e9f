//! Helper for SCREAMING_CASE status enums persisted as TEXT.

/// Implements `ALL`, `as_str`, `Display` and `FromStr` for a status enum.
///
/// Parsing is case-insensitive and reports the accepted values on failure.
#[macro_export]
macro_rules! status_enum {
    ($t:ident, $label:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $t {
            pub const ALL: &'static [$t] = &[$($t::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($t::$variant => $s),+
                }
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($s => Ok($t::$variant),)+
                    other => Err($crate::DomainError::validation(format!(
                        "{} must be one of {} (got '{}')",
                        $label,
                        [$($s),+].join(", "),
                        other
                    ))),
                }
            }
        }
    };
}
