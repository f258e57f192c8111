pub mod configuration;
pub mod connectors;
pub mod db;
pub mod health;
mod helpers;
pub mod models;
pub mod routes;
pub mod services;
pub mod startup;
pub mod telemetry;
