use std::error::Error as StdError;
use std::panic::Location;

use thiserror::Error;

use crate::kind::MetricKind;

/// Errors that can occur while declaring metrics or activating the registry.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// An option was supplied that the metric kind does not accept.
    #[error("option '{option}' is not available for {kind} '{metric}'")]
    UnknownOption {
        /// Name of the rejected option.
        option: &'static str,
        /// Kind of the metric being declared.
        kind: MetricKind,
        /// Qualified name of the metric being declared.
        metric: String,
    },

    /// An option required by the metric kind was not supplied.
    #[error("option '{option}' is required for {kind} '{metric}'")]
    MissingOption {
        /// Name of the missing option.
        option: &'static str,
        /// Kind of the metric being declared.
        kind: MetricKind,
        /// Qualified name of the metric being declared.
        metric: String,
    },

    /// A metric with the same qualified name is already registered.
    #[error("metric '{name}' is already registered")]
    DuplicateMetric {
        /// Qualified name of the existing metric.
        name: String,
    },

    /// An adapter override or group allow-list named an adapter that is not
    /// currently registered.
    #[error("invalid adapter name '{adapter}' for metric '{metric}'")]
    InvalidAdapter {
        /// The unrecognized adapter name.
        adapter: String,
        /// Qualified name of the metric whose scope was being resolved.
        metric: String,
    },

    /// An adapter allow-list was declared with no names.
    #[error("adapter restriction requires at least one adapter name")]
    EmptyAdapterList,

    /// An adapter allow-list was declared outside of a group.
    #[error("adapters can't be restricted outside of a group")]
    AdapterOutsideGroup,

    /// An adapter's registration hook failed while a metric was being
    /// registered with it.
    #[error("adapter '{adapter}' failed to register metric '{metric}': {source}")]
    AdapterRegistration {
        /// Name the adapter was registered under.
        adapter: String,
        /// Qualified name of the metric being registered.
        metric: String,
        /// The failure reported by the adapter.
        #[source]
        source: AdapterError,
    },

    /// The registry was already activated.
    #[error(transparent)]
    AlreadyConfigured(#[from] AlreadyConfiguredError),
}

/// Error returned when [`Registry::activate`](crate::Registry::activate) is
/// called on a registry that was already activated.
///
/// Carries the call site of the activation that won, so the offending second
/// call can be tracked down from the error message alone.
#[derive(Debug, Clone, Copy, Error)]
#[error("metrics registry was already configured at {origin}")]
pub struct AlreadyConfiguredError {
    origin: &'static Location<'static>,
}

impl AlreadyConfiguredError {
    pub(crate) fn new(origin: &'static Location<'static>) -> Self {
        AlreadyConfiguredError { origin }
    }

    /// Call site of the activation that configured the registry.
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }
}

/// Errors raised by adapter hooks.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter does not implement the invoked hook.
    ///
    /// This is the default behavior for every registration and write hook on
    /// the [`Adapter`](crate::Adapter) trait, so an adapter that receives an
    /// operation it never implemented fails loudly instead of dropping the
    /// write.
    #[error("operation '{operation}' is not supported by this adapter")]
    Unsupported {
        /// Name of the hook that was invoked.
        operation: &'static str,
    },

    /// A failure specific to the adapter's backend.
    #[error(transparent)]
    Backend(#[from] Box<dyn StdError + Send + Sync + 'static>),
}

impl AdapterError {
    /// Creates an [`AdapterError::Unsupported`] for the named hook.
    pub fn unsupported(operation: &'static str) -> Self {
        AdapterError::Unsupported { operation }
    }

    /// Wraps an adapter-specific failure.
    pub fn backend(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        AdapterError::Backend(err.into())
    }
}

/// Any error returned by this crate.
///
/// Declaration and activation surface [`ConfigurationError`]s; value writes
/// surface whichever of the two lower classes occurred, since a write both
/// resolves the metric's adapter scope and runs adapter hooks.
#[derive(Debug, Error)]
pub enum Error {
    /// Declaring a metric, resolving an adapter scope, or activating the
    /// registry failed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// An adapter hook failed during dispatch.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl From<AlreadyConfiguredError> for Error {
    fn from(err: AlreadyConfiguredError) -> Self {
        Error::Configuration(ConfigurationError::AlreadyConfigured(err))
    }
}
