//! Property tests for observations, payload decoding and condition chains

mod chain_prop;
mod observation_prop;
