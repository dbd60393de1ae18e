/*!

Provides utilities for testing the Apicurito install tooling using `kind` and `docker`.
We call this testing modality `selftest` to distinguish it from the application's own test suites.

!*/

pub mod cluster;
mod test_settings;

pub use cluster::Cluster;
