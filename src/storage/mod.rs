mod db;

pub use db::{keys, Storage, StorageError};
