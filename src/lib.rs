//! Client for the Tiktek textbook-solutions catalog: remote calls, a persisted favorites
//! list and headless screen state machines for browsing books and viewing solutions.

pub mod config;
pub mod domain;
pub mod error;
pub mod navigation;
pub mod repository;
pub mod screens;
pub mod shell;
pub mod storage;
pub mod tiktek_client;

pub type TiktekResult<T> = anyhow::Result<T>;
