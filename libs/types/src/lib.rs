//! # MAL Type System - Data Model for the Generic Transport Core
//!
//! ## Purpose
//!
//! This crate contains the pure data layer of the MAL transport stack:
//! - `TypeId` - bijective 64-bit type identifiers with the scalar/list sign
//!   convention
//! - `Element` - the object-safe data element contract plus the standard
//!   attribute set and list container
//! - `ElementRegistry` - explicit TypeId-to-factory registry used by all
//!   body decoding
//! - Interaction pattern model - the six MAL patterns, their stage tables
//!   and the client-initiates/error-stage queries
//! - `OperationSpec`/`OperationLookup` - the minimal per-operation metadata
//!   contract the body decoder consumes
//!
//! ## What This Crate Does NOT Contain
//! - Wire encoding rules (belongs in mal-codec)
//! - Transport, queueing or endpoint logic (belongs in mal-transport)
//!
//! ## Architecture Role
//!
//! ```text
//! mal-types → mal-codec → mal-transport
//!     ↑           ↓            ↓
//! Pure Data   Codec Rules   Delivery
//! TypeId      Header/Body   Endpoints
//! Elements    Stage codes   Queue pump
//! ```

pub mod attribute;
pub mod composite;
pub mod element;
pub mod error_number;
pub mod interaction;
pub mod operation;
pub mod registry;
pub mod stream;
pub mod type_id;

pub use attribute::Attribute;
pub use composite::{EntityKey, Subscription, UpdateHeader, UpdateType};
pub use element::{Element, ElementError, ElementFactory, ElementList};
pub use interaction::{InteractionType, QosLevel, SessionType};
pub use operation::{
    FieldSpec, FieldType, MapOperationLookup, OperationKey, OperationLookup, OperationSpec,
};
pub use registry::{register_core_types, ElementRegistry, RegistryError};
pub use stream::{ElementDecoder, ElementEncoder, StreamFactory};
pub use type_id::TypeId;
