//! Correlation/causation id generation for the thin command adapter.
//!
//! §6 requires every command to carry a `correlationId`/`causationId` pair
//! even though the HTTP middleware that would normally mint one is out of
//! scope (Non-goal, §1). A fresh top-level command gets a new correlation
//! id acting as its own causation id; a command issued in reaction to
//! another keeps the parent's correlation id and sets causation to the
//! parent event's id.

use uuid::Uuid;

pub fn new_root_correlation() -> Uuid {
    Uuid::new_v4()
}
