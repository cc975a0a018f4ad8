//! QUARRY - Observation and condition core for industrial telemetry agents
//!
//! Every value an adapter reports for a monitored data source becomes an
//! [`Observation`]: a versioned, immutable record shared between the ring
//! buffer, serializers and client iterators through [`ObservationRef`]
//! handles. Alarm and condition sources additionally accumulate their
//! observations in a [`ConditionChain`], so several faults and warnings can be
//! outstanding at the same time until the source reports them cleared.
//!
//! # Layout
//!
//! - [`value`] / [`codec`]: numeric-or-text values and `|`-delimited payloads
//! - [`level`]: NORMAL / WARNING / FAULT classification
//! - [`observation`]: records, cached attributes and shared handles
//! - [`chain`]: per-source condition chains
//! - [`registry`]: sequence assignment and the ingestion path
//!
//! # Examples
//!
//! ```rust
//! use quarry::{Config, Level, SourceRegistry};
//!
//! let config = Config::from_yaml(r#"
//! data_items:
//!   - id: "servo_cond"
//!     category: CONDITION
//! "#)?;
//! let registry = SourceRegistry::from_config(&config)?;
//!
//! registry.ingest("servo_cond", "2024-03-01T08:00:00Z", "FAULT|OVERLOAD")?;
//! let head = registry.ingest("servo_cond", "2024-03-01T08:00:05Z", "WARNING|DRIFT")?;
//!
//! let chain = registry.chain("servo_cond").unwrap();
//! let levels: Vec<Level> = chain.list(&head)?.iter().map(|o| o.level()).collect();
//! assert_eq!(levels, vec![Level::Warning, Level::Fault]);
//! # Ok::<(), quarry::QuarryError>(())
//! ```

#![warn(missing_docs)]

// ============================================================================
// CORE MODULES
// ============================================================================

/// Structured error handling
pub mod error;

/// Numeric-or-text observation values
pub mod value;

/// Catalog view of monitored data sources
pub mod data_item;

/// Decoding of raw observation text
pub mod codec;

/// Severity level classification
pub mod level;

/// Observation records and shared handles
pub mod observation;

/// Per-source condition chains
pub mod chain;

/// Source registry and ingestion path
pub mod registry;

/// Configuration management with YAML support and validation
pub mod config;

// ============================================================================
// PUBLIC RE-EXPORTS
// ============================================================================

pub use chain::ConditionChain;
pub use codec::{AlarmFields, ConditionFields, Payload};
pub use config::{Config, LoggingConfig, RegistryConfig};
pub use data_item::{Category, Conversion, DataItem, Shape};
pub use error::{QuarryError, Result};
pub use level::{Level, SeverityPolicy};
pub use observation::{Attributes, Observation, ObservationRef, WeakObservation};
pub use registry::SourceRegistry;
pub use value::Value;

// ============================================================================
// VERSION INFORMATION
// ============================================================================

/// QUARRY version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QUARRY authors
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Build information
pub mod build_info {
    /// Git commit hash (if available)
    pub const GIT_HASH: Option<&str> = option_env!("QUARRY_GIT_HASH");

    /// Build timestamp
    pub const BUILD_TIMESTAMP: Option<&str> = option_env!("QUARRY_BUILD_TIMESTAMP");

    /// Rust version used for compilation
    pub const RUSTC_VERSION: Option<&str> = option_env!("QUARRY_RUST_VERSION");

    /// Target triple
    pub const TARGET: Option<&str> = option_env!("QUARRY_TARGET");

    /// Build profile (debug/release)
    pub const PROFILE: Option<&str> = option_env!("QUARRY_PROFILE");
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize logging with the default filter
///
/// `RUST_LOG` takes precedence over the default `quarry=info` directive.
/// Calling this more than once, or after the host application installed its
/// own subscriber, is harmless.
///
/// # Examples
///
/// ```rust
/// quarry::init();
/// quarry::init();
/// ```
pub fn init() {
    init_with(&LoggingConfig::default());
}

/// Initialize logging from a [`LoggingConfig`]
pub fn init_with(logging: &LoggingConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("quarry=info"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(logging.ansi),
    );

    if subscriber.try_init().is_err() {
        // Already initialized by the host application
        return;
    }

    tracing::info!("QUARRY {} initialized", VERSION);
}

/// Print version and build information
pub fn print_system_info() {
    println!("QUARRY System Information");
    println!("=========================");
    println!("Version: {}", VERSION);
    println!("Authors: {}", AUTHORS);

    if let Some(git_hash) = build_info::GIT_HASH {
        println!("Git Hash: {}", git_hash);
    }

    let or_unknown = |v: Option<&'static str>| v.unwrap_or("unknown");
    println!("Build Target: {}", or_unknown(build_info::TARGET));
    println!("Build Profile: {}", or_unknown(build_info::PROFILE));
    println!("Build Time: {}", or_unknown(build_info::BUILD_TIMESTAMP));
    println!("Rust Version: {}", or_unknown(build_info::RUSTC_VERSION));
}
