//! Receivers: components that bring telemetry into the collector.

pub mod kafka;
