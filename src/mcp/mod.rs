mod server;

pub use server::ComplianceCatalogServer;
