// Engine configuration: process settings and the feature mapping snapshot.
pub mod mapping;
pub mod settings;
