//! # Ragify Client
//!
//! A resilient client for RAG-style corpus, document, and search services.
//!
//! The backend this client talks to is inconsistent by nature: response
//! envelopes change shape between endpoints, identity fields go by several
//! names, and the whole service may be unreachable. The client's job is to
//! keep working anyway — remote-first reads degrade to a locally persisted
//! shadow store, and every search payload is normalized into one stable
//! contract before the rest of the application sees it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────┐   ┌───────────────┐
//! │   CLI    │──▶│ Corpus / Document   │──▶│  Transport    │──▶ remote API
//! │ (ragify) │   │ resolvers, Search   │   │  (reqwest)    │
//! └──────────┘   │ normalizer, Session │   └───────┬───────┘
//!                └─────────┬──────────┘       failure │
//!                          ▼                         ▼
//!                   ┌────────────┐           ┌──────────────┐
//!                   │ Chunk rank │           │ Shadow store │
//!                   │ + paging   │           │ (persisted)  │
//!                   └────────────┘           └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy (transport / shape / identity / not-found) |
//! | [`models`] | The stable client-side data contract |
//! | [`transport`] | Wire transport trait and reqwest implementation |
//! | [`storage`] | Namespaced key/value persistence |
//! | [`shadow`] | Persisted fallback snapshot of corpora and documents |
//! | [`corpus`] | Corpus listing and creation with shadow fallback |
//! | [`document`] | Document listing (strategy chain) and deletion |
//! | [`upload`] | File/URL upload pipeline |
//! | [`search`] | Query issuing and response normalization |
//! | [`rank`] | Chunk relevance filtering and display pagination |
//! | [`session`] | Durable authenticated-identity persistence |
//! | [`export`] | Result rendering into downloadable blobs |

pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod export;
pub mod models;
pub mod rank;
pub mod search;
pub mod session;
pub mod shadow;
pub mod storage;
pub mod transport;
pub mod upload;

pub use error::{Error, Result};
