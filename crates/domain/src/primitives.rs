//! Domain primitives with validated constructors.

use serde::{Deserialize, Serialize};
use std::fmt;
use tundra_shared::{ErrorCode, ErrorEnvelope};

/// Separator between a service's interface (folder path) and its local name.
pub const SERVICE_NAME_SEPARATOR: char = ':';

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `ServiceName` is empty after trimming.
    EmptyServiceName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `ServiceName` is not of the form `folder.sub:service`.
    InvalidServiceName {
        /// Trimmed service name that failed validation.
        input: String,
    },
    /// `PackageName` is empty after trimming.
    EmptyPackageName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `SessionId` is empty after trimming.
    EmptySessionId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `UserName` is empty after trimming.
    EmptyUserName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// A pipeline was built from a JSON value that is not an object.
    PipelineNotDocument {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyServiceName { .. } | Self::InvalidServiceName { .. } => {
                ErrorCode::new("domain", "invalid_service_name")
            },
            Self::EmptyPackageName { .. } => ErrorCode::new("domain", "invalid_package_name"),
            Self::EmptySessionId { .. } => ErrorCode::new("domain", "invalid_session_id"),
            Self::EmptyUserName { .. } => ErrorCode::new("domain", "invalid_user_name"),
            Self::PipelineNotDocument { .. } => ErrorCode::new("domain", "invalid_pipeline"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyServiceName { .. } => formatter.write_str("ServiceName must be non-empty"),
            Self::InvalidServiceName { .. } => {
                formatter.write_str("ServiceName must look like `folder.subfolder:service`")
            },
            Self::EmptyPackageName { .. } => formatter.write_str("PackageName must be non-empty"),
            Self::EmptySessionId { .. } => formatter.write_str("SessionId must be non-empty"),
            Self::EmptyUserName { .. } => formatter.write_str("UserName must be non-empty"),
            Self::PipelineNotDocument { found } => {
                write!(formatter, "Pipeline must be a JSON object, found {found}")
            },
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());

        match error {
            PrimitiveError::EmptyServiceName { input_length }
            | PrimitiveError::EmptyPackageName { input_length }
            | PrimitiveError::EmptySessionId { input_length }
            | PrimitiveError::EmptyUserName { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
            PrimitiveError::InvalidServiceName { input } => envelope.with_metadata("input", input),
            PrimitiveError::PipelineNotDocument { found } => envelope.with_metadata("found", found),
        }
    }
}

/// Namespace-qualified service identifier, e.g. `tundra.list:sort`.
///
/// The part before the separator is the interface (a dot-separated folder
/// path); the part after it is the service's local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName {
    full: Box<str>,
    split_at: usize,
}

impl ServiceName {
    /// Parse a service name from its fully-qualified form.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyServiceName {
                input_length: raw.len(),
            });
        };

        let invalid = || PrimitiveError::InvalidServiceName {
            input: trimmed.to_owned(),
        };
        let split_at = trimmed.find(SERVICE_NAME_SEPARATOR).ok_or_else(invalid)?;
        let (interface, rest) = trimmed.split_at(split_at);
        let local = rest.trim_start_matches(SERVICE_NAME_SEPARATOR);

        if rest.len() != local.len() + SERVICE_NAME_SEPARATOR.len_utf8()
            || !is_valid_interface(interface)
            || !is_valid_segment(local)
        {
            return Err(invalid());
        }

        Ok(Self {
            full: trimmed.to_owned().into_boxed_str(),
            split_at,
        })
    }

    /// The interface (folder path) portion, e.g. `tundra.list`.
    #[must_use]
    pub fn interface(&self) -> &str {
        self.full.get(..self.split_at).unwrap_or_default()
    }

    /// The local service name, e.g. `sort`.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.full
            .get(self.split_at + SERVICE_NAME_SEPARATOR.len_utf8()..)
            .unwrap_or_default()
    }

    /// The fully-qualified name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for ServiceName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ServiceName> for String {
    fn from(value: ServiceName) -> Self {
        value.full.into_string()
    }
}

macro_rules! non_empty_text {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Box<str>);

        impl $name {
            /// Parse from user input; the value is trimmed and must be non-empty.
            pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
                let raw = input.as_ref();
                let Some(trimmed) = trimmed_non_empty(raw) else {
                    return Err(PrimitiveError::$variant {
                        input_length: raw.len(),
                    });
                };
                Ok(Self(trimmed.to_owned().into_boxed_str()))
            }

            /// Access the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $name {
            type Error = PrimitiveError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0.into_string()
            }
        }
    };
}

non_empty_text!(
    /// Name of the package that owns a service.
    PackageName,
    EmptyPackageName
);

non_empty_text!(
    /// Identifier of the session a service call runs under.
    SessionId,
    EmptySessionId
);

non_empty_text!(
    /// Name of the authenticated user invoking a service.
    UserName,
    EmptyUserName
);

/// A service together with the package that provides it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Fully-qualified service name.
    pub name: ServiceName,
    /// Owning package.
    pub package: PackageName,
}

impl ServiceDescriptor {
    /// Build a descriptor from raw strings.
    pub fn parse(name: impl AsRef<str>, package: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        Ok(Self {
            name: ServiceName::parse(name)?,
            package: PackageName::parse(package)?,
        })
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn is_valid_interface(interface: &str) -> bool {
    !interface.is_empty() && interface.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_splits_interface_and_local_name() -> Result<(), PrimitiveError> {
        let name = ServiceName::parse("  tundra.list:sort ")?;
        assert_eq!(name.as_str(), "tundra.list:sort");
        assert_eq!(name.interface(), "tundra.list");
        assert_eq!(name.local_name(), "sort");
        Ok(())
    }

    #[test]
    fn service_name_rejects_malformed_input() {
        for input in ["noseparator", ":svc", "ns:", "ns::svc", "a..b:svc", "ns:sv c", "1ns:svc"] {
            assert!(
                matches!(
                    ServiceName::parse(input),
                    Err(PrimitiveError::InvalidServiceName { .. })
                ),
                "{input} should be rejected"
            );
        }
        assert!(matches!(
            ServiceName::parse("   "),
            Err(PrimitiveError::EmptyServiceName { input_length: 3 })
        ));
    }

    #[test]
    fn service_name_deserialization_validates() {
        let parsed: Result<ServiceName, _> = serde_json::from_str("\"ns:foo\"");
        assert!(parsed.is_ok());
        let parsed: Result<ServiceName, _> = serde_json::from_str("\"nope\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn non_empty_text_types_trim() -> Result<(), PrimitiveError> {
        assert_eq!(PackageName::parse(" Tundra ")?.as_str(), "Tundra");
        assert!(SessionId::parse("").is_err());
        assert!(UserName::parse("\t").is_err());
        Ok(())
    }

    #[test]
    fn primitive_errors_map_into_envelopes() {
        let envelope: ErrorEnvelope = PrimitiveError::InvalidServiceName {
            input: "nope".to_string(),
        }
        .into();
        assert_eq!(envelope.code.namespace(), "domain");
        assert_eq!(envelope.code.code(), "invalid_service_name");
        assert_eq!(envelope.metadata.get("input").map(String::as_str), Some("nope"));
    }
}
