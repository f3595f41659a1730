//! Group id generation seam.

use uuid::Uuid;

/// Source of globally-unique opaque group ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator backed by random uuids.
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
