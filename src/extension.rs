//! Extensions: auxiliary components that are not part of a pipeline.

pub mod dbstorage;
