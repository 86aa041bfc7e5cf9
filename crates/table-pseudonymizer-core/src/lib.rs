pub mod anonymizer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod faker;
pub mod ingest;
pub mod server;
pub mod table;

pub use anonymizer::{clean_numerical, clean_phone_number, clean_string, FieldAnonymizer};
pub use classifier::{ColumnClassifier, ColumnKind};
pub use config::{Config, FakerConfig, ServerConfig, UploadConfig};
pub use error::{PseudonymizeError, PseudonymizeResult};
pub use faker::{FakerEngine, SyntheticSource};
pub use ingest::{read_csv, read_excel, read_table, FileFormat};
pub use server::{AppState, AnonymizeRequest, PseudonymizedResponse};
pub use table::{Row, Table};
