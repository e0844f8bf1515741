mod client;
mod models;
mod repositories;

pub use client::{MongoConfig, MongoPersistenceClient};
